use std::time::{Duration, Instant};

use tempfile::tempdir;
use tokio::sync::mpsc;

use lumen_broadcaster::{ContentBroadcaster, OutputEvent, OutputReceiver, WindowCommand};
use lumen_content::{ContentItem, TransitionSpec};
use lumen_output::{ContentRenderer, LogSurface, OutputLoop, Placement, RendererState, Visual};

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn update(item: &ContentItem) -> OutputEvent {
    OutputEvent::ContentUpdate {
        item: item.clone(),
        transition: None,
    }
}

#[test]
fn test_newer_content_supersedes_running_transition() {
    let mut renderer = ContentRenderer::default();
    let t0 = Instant::now();
    let a = ContentItem::slide("A", "first");
    let b = ContentItem::slide("B", "second");

    renderer.apply(update(&a), t0);
    // Halfway through A's 500ms fade
    renderer.apply(update(&b), t0 + ms(250));

    let mid = renderer.tick(t0 + ms(400));
    assert_eq!(mid.layers.len(), 2);
    assert_eq!(mid.layers[1].frame.item_id, b.id);

    let done = renderer.tick(t0 + ms(750));
    assert!(done.is_settled());
    assert_eq!(done.top().unwrap().frame.item_id, b.id);
    assert!(done.layers.iter().all(|l| l.frame.item_id != a.id));
    assert_eq!(renderer.current_item().unwrap().id, b.id);
}

#[test]
fn test_content_after_black_exits_overlay() {
    let mut renderer = ContentRenderer::default();
    let t0 = Instant::now();
    let c = ContentItem::scripture("Psalm 23:1", "The Lord is my shepherd");

    renderer.apply(OutputEvent::ShowBlack, t0);
    assert_eq!(renderer.state(), RendererState::Black);

    renderer.apply(update(&c), t0 + ms(10));
    assert_eq!(renderer.state(), RendererState::Rendering);

    let settled = renderer.tick(t0 + ms(1000));
    match &settled.top().unwrap().frame.visual {
        Visual::Scripture {
            reference, text, ..
        } => {
            assert_eq!(reference, "Psalm 23:1");
            assert_eq!(text, "The Lord is my shepherd");
        }
        other => panic!("unexpected visual {:?}", other),
    }
}

#[test]
fn test_clear_exits_black_and_logo() {
    let mut renderer = ContentRenderer::default();
    let t0 = Instant::now();
    renderer.apply(update(&ContentItem::slide("Welcome", "")), t0);

    renderer.apply(OutputEvent::ShowBlack, t0);
    renderer.apply(OutputEvent::ContentClear, t0);
    assert_eq!(renderer.state(), RendererState::Idle);

    renderer.apply(OutputEvent::ShowLogo, t0);
    assert_eq!(renderer.state(), RendererState::Logo);
    renderer.apply(OutputEvent::ContentClear, t0);
    assert_eq!(renderer.state(), RendererState::Idle);

    let settled = renderer.tick(t0 + ms(1000));
    assert_eq!(settled.top().unwrap().frame.visual, Visual::Placeholder);
}

#[test]
fn test_promote_twice_changes_nothing_the_second_time() {
    let mut renderer = ContentRenderer::default();
    let t0 = Instant::now();
    let verse = ContentItem::scripture("John 3:16", "For God so loved...");

    assert!(renderer.apply(update(&verse), t0));
    let first = renderer.tick(t0 + ms(1000));

    assert!(!renderer.apply(update(&verse), t0 + ms(1000)));
    let second = renderer.tick(t0 + ms(1000));
    assert_eq!(first, second);
}

#[test]
fn test_per_update_transition_overrides_theme() {
    let mut renderer = ContentRenderer::default();
    let t0 = Instant::now();
    renderer.apply(
        OutputEvent::ContentUpdate {
            item: ContentItem::slide("Cut", ""),
            transition: Some(TransitionSpec::none()),
        },
        t0,
    );
    assert!(!renderer.is_animating());
}

#[tokio::test]
async fn test_channel_to_surface() {
    let dir = tempdir().unwrap();
    let socket_path = dir.path().join("output.sock");
    let broadcaster = ContentBroadcaster::new(&socket_path).await.unwrap();
    broadcaster.start().await.unwrap();

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let mut receiver = OutputReceiver::new(&socket_path).with_reconnect_delay(ms(20));
    tokio::spawn(async move { receiver.listen(event_tx).await });

    for _ in 0..50 {
        if broadcaster.client_count().await >= 1 {
            break;
        }
        tokio::time::sleep(ms(20)).await;
    }
    assert_eq!(broadcaster.client_count().await, 1);

    let placement = Placement {
        display_id: 2,
        x: 1920,
        y: 0,
        width: 1920,
        height: 1080,
    };
    let output = OutputLoop::new(ContentRenderer::default(), LogSurface::new(placement, true))
        .with_frame_interval(ms(5));
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(output.run(event_rx, command_rx));

    let item = ContentItem::scripture("John 3:16", "For God so loved...");
    broadcaster
        .send_content(item.clone(), Some(TransitionSpec::fade(50)))
        .await;
    tokio::time::sleep(ms(200)).await;
    command_tx.send(WindowCommand::Close).unwrap();

    let surface = tokio::time::timeout(Duration::from_secs(1), task)
        .await
        .unwrap()
        .unwrap();
    let last = surface.last().unwrap();
    assert!(last.is_settled());
    assert_eq!(last.top().unwrap().frame.item_id, item.id);

    broadcaster.stop().await.unwrap();
}
