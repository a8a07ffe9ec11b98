use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use lumen_content::ContentItem;

/// Ordered playlist with a cursor
///
/// The cursor is `-1` exactly when the queue is empty and otherwise always
/// indexes an item.
#[derive(Debug, Clone, Default)]
pub struct ContentQueue {
    items: Vec<ContentItem>,
    cursor: Option<usize>,
}

impl ContentQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[ContentItem] {
        &self.items
    }

    pub fn cursor(&self) -> isize {
        self.cursor.map_or(-1, |c| c as isize)
    }

    pub fn current(&self) -> Option<&ContentItem> {
        self.cursor.and_then(|c| self.items.get(c))
    }

    pub fn is_at_end(&self) -> bool {
        match self.cursor {
            Some(c) => c + 1 >= self.items.len(),
            None => true,
        }
    }

    /// Append; the first item becomes current.
    pub fn add(&mut self, item: ContentItem) {
        self.items.push(item);
        if self.cursor.is_none() {
            self.cursor = Some(0);
        }
    }

    /// Remove by id, keeping the cursor on the same item when it survives.
    pub fn remove(&mut self, id: &str) -> bool {
        let Some(index) = self.items.iter().position(|i| i.id == id) else {
            return false;
        };
        self.items.remove(index);

        self.cursor = match self.cursor {
            _ if self.items.is_empty() => None,
            Some(c) if index < c => Some(c - 1),
            Some(c) => Some(c.min(self.items.len() - 1)),
            None => Some(0),
        };
        true
    }

    /// Reorder, keeping the cursor on the item it pointed at.
    pub fn move_item(&mut self, from: usize, to: usize) -> bool {
        if from >= self.items.len() || to >= self.items.len() {
            return false;
        }
        let current_id = self.current().map(|i| i.id.clone());
        let item = self.items.remove(from);
        self.items.insert(to, item);

        if let Some(id) = current_id {
            self.cursor = self.items.iter().position(|i| i.id == id);
        }
        true
    }

    /// Advance, stopping at the last item.
    pub fn next(&mut self) -> Option<&ContentItem> {
        let last = self.items.len().checked_sub(1)?;
        self.cursor = self.cursor.map(|c| (c + 1).min(last));
        self.current()
    }

    /// Step back, stopping at the first item.
    pub fn previous(&mut self) -> Option<&ContentItem> {
        self.cursor = self.cursor.map(|c| c.saturating_sub(1));
        self.current()
    }

    pub fn jump(&mut self, index: usize) -> Option<&ContentItem> {
        if index >= self.items.len() {
            return None;
        }
        self.cursor = Some(index);
        self.current()
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.cursor = None;
    }
}

/// One-shot timer that fires a callback after a fixed delay
///
/// Re-arming or cancelling aborts the pending shot. The callback may re-arm
/// the timer for the next step.
#[derive(Clone, Default)]
pub struct AutoAdvance {
    pending: Arc<Mutex<Option<JoinHandle<()>>>>,
    generation: Arc<AtomicU64>,
}

impl AutoAdvance {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm<F, Fut>(&self, delay: Duration, on_fire: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        let generation = self.generation.load(Ordering::SeqCst);
        let pending = self.pending.clone();
        let current = self.generation.clone();

        // Held across the spawn so the task cannot look for its handle first
        let mut slot = self.pending.lock();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut pending = pending.lock();
                if current.load(Ordering::SeqCst) != generation {
                    return;
                }
                // Detach so a re-arm from `on_fire` does not abort this task
                pending.take();
            }
            on_fire().await;
        });
        *slot = Some(handle);
    }

    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(handle) = self.pending.lock().take() {
            handle.abort();
        }
    }

    pub fn is_armed(&self) -> bool {
        self.pending.lock().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn queue_of(n: usize) -> ContentQueue {
        let mut queue = ContentQueue::new();
        for i in 0..n {
            queue.add(ContentItem::slide(format!("Slide {}", i), "body"));
        }
        queue
    }

    fn assert_cursor_invariant(queue: &ContentQueue) {
        if queue.is_empty() {
            assert_eq!(queue.cursor(), -1);
        } else {
            assert!(queue.cursor() >= 0 && (queue.cursor() as usize) < queue.len());
        }
    }

    #[test]
    fn test_empty_queue_cursor() {
        let mut queue = ContentQueue::new();
        assert_eq!(queue.cursor(), -1);
        assert!(queue.next().is_none());
        assert!(queue.previous().is_none());
        assert!(queue.jump(0).is_none());
        assert_eq!(queue.cursor(), -1);
    }

    #[test]
    fn test_navigation_clamps() {
        let mut queue = queue_of(3);
        assert_eq!(queue.cursor(), 0);
        queue.previous();
        assert_eq!(queue.cursor(), 0);

        queue.next();
        queue.next();
        queue.next();
        assert_eq!(queue.cursor(), 2);
        assert!(queue.is_at_end());

        assert!(queue.jump(3).is_none());
        assert_eq!(queue.cursor(), 2);
        assert!(queue.jump(1).is_some());
        assert_eq!(queue.cursor(), 1);
    }

    #[test]
    fn test_remove_at_cursor_clamps_to_last() {
        let mut queue = queue_of(3);
        queue.jump(2);
        let id = queue.current().unwrap().id.clone();
        assert!(queue.remove(&id));
        assert_eq!(queue.cursor(), 1);
    }

    #[test]
    fn test_remove_before_cursor_keeps_item() {
        let mut queue = queue_of(3);
        queue.jump(2);
        let current = queue.current().unwrap().id.clone();
        let first = queue.items()[0].id.clone();
        queue.remove(&first);
        assert_eq!(queue.current().unwrap().id, current);
    }

    #[test]
    fn test_remove_last_item_empties_cursor() {
        let mut queue = queue_of(1);
        let id = queue.items()[0].id.clone();
        assert!(queue.remove(&id));
        assert_eq!(queue.cursor(), -1);
        assert!(!queue.remove(&id));
    }

    #[test]
    fn test_move_item_follows_current() {
        let mut queue = queue_of(3);
        queue.jump(0);
        let current = queue.current().unwrap().id.clone();
        assert!(queue.move_item(0, 2));
        assert_eq!(queue.cursor(), 2);
        assert_eq!(queue.current().unwrap().id, current);
        assert!(!queue.move_item(0, 5));
    }

    #[test]
    fn test_cursor_invariant_under_mixed_operations() {
        let mut queue = queue_of(4);
        let ids: Vec<String> = queue.items().iter().map(|i| i.id.clone()).collect();

        queue.next();
        assert_cursor_invariant(&queue);
        queue.remove(&ids[3]);
        assert_cursor_invariant(&queue);
        queue.next();
        queue.next();
        assert_cursor_invariant(&queue);
        queue.remove(&ids[2]);
        assert_cursor_invariant(&queue);
        queue.remove(&ids[0]);
        assert_cursor_invariant(&queue);
        queue.remove(&ids[1]);
        assert_cursor_invariant(&queue);
        queue.add(ContentItem::logo());
        assert_eq!(queue.cursor(), 0);
        queue.clear();
        assert_cursor_invariant(&queue);
    }

    #[tokio::test]
    async fn test_auto_advance_fires_once() {
        let fired = Arc::new(AtomicUsize::new(0));
        let timer = AutoAdvance::new();

        let counter = fired.clone();
        timer.arm(Duration::from_millis(10), move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert!(timer.is_armed());

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!timer.is_armed());
    }

    #[tokio::test]
    async fn test_cancel_prevents_fire() {
        let fired = Arc::new(AtomicUsize::new(0));
        let timer = AutoAdvance::new();

        let counter = fired.clone();
        timer.arm(Duration::from_millis(30), move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        timer.cancel();

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_rearm_replaces_pending_shot() {
        let fired = Arc::new(AtomicUsize::new(0));
        let timer = AutoAdvance::new();

        for _ in 0..3 {
            let counter = fired.clone();
            timer.arm(Duration::from_millis(20), move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
