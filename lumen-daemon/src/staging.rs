//! Preview / live staging
//!
//! Preview and live always hold an item, the placeholder when nothing has
//! been staged. Promotion copies preview into live and hands it to the
//! [`ContentSink`]; preview is never touched by it.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use lumen_content::{ContentItem, TransitionSpec, Verse};

pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Where live content goes
#[async_trait]
pub trait ContentSink: Send + Sync {
    async fn present(&self, item: &ContentItem, transition: Option<TransitionSpec>);

    async fn clear(&self);
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub item: ContentItem,
    pub promoted_at: DateTime<Utc>,
}

/// Serializable view of the staging model
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentationState {
    pub preview_item: ContentItem,
    pub live_item: ContentItem,
    pub history: Vec<HistoryEntry>,
    pub staged: Vec<ContentItem>,
}

pub struct StagingModel {
    preview: ContentItem,
    live: ContentItem,
    history: VecDeque<HistoryEntry>,
    history_limit: usize,
    staged: Vec<ContentItem>,
    transition: Option<TransitionSpec>,
    sink: Arc<dyn ContentSink>,
}

impl StagingModel {
    pub fn new(sink: Arc<dyn ContentSink>, history_limit: usize) -> Self {
        Self {
            preview: ContentItem::placeholder(),
            live: ContentItem::placeholder(),
            history: VecDeque::new(),
            history_limit: history_limit.min(DEFAULT_HISTORY_LIMIT),
            staged: Vec::new(),
            transition: None,
            sink,
        }
    }

    /// Transition sent with every promotion; `None` defers to the theme.
    pub fn with_transition(mut self, transition: Option<TransitionSpec>) -> Self {
        self.transition = transition;
        self
    }

    pub fn preview(&self) -> &ContentItem {
        &self.preview
    }

    pub fn live(&self) -> &ContentItem {
        &self.live
    }

    pub fn history(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.history.iter()
    }

    pub fn set_preview(&mut self, item: ContentItem) {
        debug!("Preview ← {} ({})", item.kind(), item.id);
        self.preview = item;
    }

    pub fn clear_preview(&mut self) {
        self.preview = ContentItem::placeholder();
    }

    /// Copy preview into live and broadcast it.
    ///
    /// Promoting the placeholder clears the output instead.
    pub async fn promote(&mut self) -> ContentItem {
        let item = self.preview.clone();
        self.go_live(item.clone()).await;
        item
    }

    pub async fn clear_live(&mut self) {
        self.live = ContentItem::placeholder();
        info!("Live cleared");
        self.sink.clear().await;
    }

    pub fn send_verse_to_preview(&mut self, verse: &Verse) {
        self.set_preview(ContentItem::from_verse(verse));
    }

    /// Straight to live; preview keeps whatever it held.
    pub async fn send_verse_to_live(&mut self, verse: &Verse) -> ContentItem {
        let item = ContentItem::from_verse(verse);
        self.go_live(item.clone()).await;
        item
    }

    async fn go_live(&mut self, item: ContentItem) {
        self.live = item;

        if self.live.is_placeholder() {
            info!("Live ← placeholder");
            self.sink.clear().await;
            return;
        }

        info!("Live ← {} ({})", self.live.kind(), self.live.id);
        self.record_history();
        self.sink.present(&self.live, self.transition).await;
    }

    fn record_history(&mut self) {
        let repeat = self
            .history
            .front()
            .is_some_and(|last| last.item.same_content(&self.live));
        if repeat {
            return;
        }

        self.history.push_front(HistoryEntry {
            item: self.live.clone(),
            promoted_at: Utc::now(),
        });
        self.history.truncate(self.history_limit);
    }

    /// Add to the staging list; `false` if an item with that id is already there.
    pub fn stage(&mut self, item: ContentItem) -> bool {
        if self.staged.iter().any(|s| s.id == item.id) {
            return false;
        }
        self.staged.push(item);
        true
    }

    pub fn unstage(&mut self, id: &str) -> bool {
        let before = self.staged.len();
        self.staged.retain(|s| s.id != id);
        self.staged.len() != before
    }

    pub fn staged(&self) -> &[ContentItem] {
        &self.staged
    }

    /// Copy a staged item into preview.
    pub fn stage_to_preview(&mut self, id: &str) -> bool {
        match self.staged.iter().find(|s| s.id == id) {
            Some(item) => {
                let item = item.clone();
                self.set_preview(item);
                true
            }
            None => false,
        }
    }

    pub fn snapshot(&self) -> PresentationState {
        PresentationState {
            preview_item: self.preview.clone(),
            live_item: self.live.clone(),
            history: self.history.iter().cloned().collect(),
            staged: self.staged.clone(),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    pub(crate) enum Sent {
        Present(ContentItem),
        Clear,
    }

    #[derive(Default)]
    pub(crate) struct RecordingSink {
        pub(crate) sent: Mutex<Vec<Sent>>,
    }

    #[async_trait]
    impl ContentSink for RecordingSink {
        async fn present(&self, item: &ContentItem, _transition: Option<TransitionSpec>) {
            self.sent.lock().push(Sent::Present(item.clone()));
        }

        async fn clear(&self) {
            self.sent.lock().push(Sent::Clear);
        }
    }

    fn model() -> (StagingModel, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        (StagingModel::new(sink.clone(), DEFAULT_HISTORY_LIMIT), sink)
    }

    fn verse() -> Verse {
        Verse {
            reference: "John 3:16".to_string(),
            text: "For God so loved the world".to_string(),
            translation: Some("KJV".to_string()),
            book: Some("John".to_string()),
            chapter: Some(3),
            verse: Some(16),
        }
    }

    #[test]
    fn test_starts_with_placeholders() {
        let (model, _) = model();
        assert!(model.preview().is_placeholder());
        assert!(model.live().is_placeholder());
    }

    #[tokio::test]
    async fn test_promote_keeps_preview() {
        let (mut model, sink) = model();
        let item = ContentItem::slide("Welcome", "Service starts at 10");
        model.set_preview(item.clone());

        let live = model.promote().await;
        assert_eq!(live, item);
        assert_eq!(model.live(), &item);
        assert_eq!(model.preview(), &item);
        assert_eq!(sink.sent.lock().as_slice(), &[Sent::Present(item)]);
    }

    #[tokio::test]
    async fn test_double_promote_broadcasts_twice_records_once() {
        let (mut model, sink) = model();
        model.set_preview(ContentItem::song("Amazing Grace", "Amazing grace..."));

        model.promote().await;
        model.promote().await;

        let sent = sink.sent.lock();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0], sent[1]);
        assert_eq!(model.history().count(), 1);
    }

    #[tokio::test]
    async fn test_promoting_placeholder_clears() {
        let (mut model, sink) = model();
        model.promote().await;
        assert_eq!(sink.sent.lock().as_slice(), &[Sent::Clear]);
        assert_eq!(model.history().count(), 0);
    }

    #[tokio::test]
    async fn test_verse_to_preview_then_promote() {
        let (mut model, _) = model();
        let verse = verse();
        model.send_verse_to_preview(&verse);
        let live = model.promote().await;

        match live.body {
            lumen_content::ContentBody::Scripture(s) => {
                assert_eq!(s.reference, verse.reference);
                assert_eq!(s.text, verse.text);
                assert_eq!(s.translation, verse.translation);
            }
            other => panic!("expected scripture, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_verse_to_live_skips_preview() {
        let (mut model, sink) = model();
        model.send_verse_to_live(&verse()).await;
        assert!(model.preview().is_placeholder());
        assert_eq!(model.live().kind(), lumen_content::ContentKind::Scripture);
        assert_eq!(sink.sent.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_clear_live_and_preview() {
        let (mut model, sink) = model();
        model.set_preview(ContentItem::logo());
        model.promote().await;
        model.clear_live().await;
        model.clear_preview();

        assert!(model.live().is_placeholder());
        assert!(model.preview().is_placeholder());
        assert_eq!(sink.sent.lock().last(), Some(&Sent::Clear));
    }

    #[tokio::test]
    async fn test_history_is_bounded_most_recent_first() {
        let sink = Arc::new(RecordingSink::default());
        let mut model = StagingModel::new(sink, 3);
        for n in 0..5 {
            model.set_preview(ContentItem::slide(format!("Slide {}", n), "body"));
            model.promote().await;
        }

        let titles: Vec<String> = model
            .history()
            .map(|entry| match &entry.item.body {
                lumen_content::ContentBody::Slide(s) => s.title.clone(),
                _ => String::new(),
            })
            .collect();
        assert_eq!(titles, vec!["Slide 4", "Slide 3", "Slide 2"]);
    }

    #[tokio::test]
    async fn test_history_never_exceeds_fifty() {
        let sink = Arc::new(RecordingSink::default());
        let mut model = StagingModel::new(sink, 1000);
        for n in 0..60 {
            model.set_preview(ContentItem::slide(format!("Slide {}", n), "body"));
            model.promote().await;
        }
        assert_eq!(model.history().count(), DEFAULT_HISTORY_LIMIT);
    }

    #[test]
    fn test_staging_list_dedupes_by_id() {
        let (mut model, _) = model();
        let item = ContentItem::announcement("Potluck", "Sunday after service");
        assert!(model.stage(item.clone()));
        assert!(!model.stage(item.clone()));
        assert_eq!(model.staged().len(), 1);

        assert!(model.stage_to_preview(&item.id));
        assert_eq!(model.preview(), &item);

        assert!(model.unstage(&item.id));
        assert!(!model.unstage(&item.id));
        assert!(!model.stage_to_preview(&item.id));
    }
}
