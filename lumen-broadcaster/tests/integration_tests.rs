use lumen_broadcaster::{ContentBroadcaster, OutputEvent, OutputReceiver};
use lumen_content::{ContentItem, ThemeUpdate, TransitionSpec};
use std::time::Duration;
use tempfile::tempdir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::mpsc;

async fn wait_for_clients(broadcaster: &ContentBroadcaster, count: usize) {
    for _ in 0..50 {
        if broadcaster.client_count().await >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("receivers never attached");
}

#[tokio::test]
async fn test_broadcaster_lifecycle() {
    let temp_dir = tempdir().unwrap();
    let socket_path = temp_dir.path().join("test.sock");

    let broadcaster = ContentBroadcaster::new(&socket_path).await.unwrap();

    broadcaster.start().await.unwrap();
    assert!(socket_path.exists());

    broadcaster.stop().await.unwrap();
    assert!(!socket_path.exists());
}

#[tokio::test]
async fn test_late_receiver_gets_no_backlog() {
    let temp_dir = tempdir().unwrap();
    let socket_path = temp_dir.path().join("late.sock");

    let broadcaster = ContentBroadcaster::new(&socket_path).await.unwrap();
    broadcaster.start().await.unwrap();

    // Sent before anyone is attached
    broadcaster
        .send_content(ContentItem::scripture("John 3:16", "For God so loved..."), None)
        .await;

    let mut client = UnixStream::connect(&socket_path).await.unwrap();
    wait_for_clients(&broadcaster, 1).await;

    broadcaster.show_black().await;

    let mut reader = BufReader::new(&mut client);
    let mut line = String::new();
    tokio::time::timeout(Duration::from_millis(500), reader.read_line(&mut line))
        .await
        .expect("expected a line")
        .unwrap();

    let first: serde_json::Value = serde_json::from_str(&line).unwrap();
    assert_eq!(first["type"], "show-black", "only post-attach events are delivered");
    assert_eq!(first["v"], 1);

    broadcaster.stop().await.unwrap();
}

#[tokio::test]
async fn test_fifo_order_per_receiver() {
    let temp_dir = tempdir().unwrap();
    let socket_path = temp_dir.path().join("fifo.sock");

    let broadcaster = ContentBroadcaster::new(&socket_path).await.unwrap();
    broadcaster.start().await.unwrap();

    let client = UnixStream::connect(&socket_path).await.unwrap();
    wait_for_clients(&broadcaster, 1).await;

    broadcaster.send_content(ContentItem::slide("One", "first"), None).await;
    broadcaster.show_logo().await;
    broadcaster.clear_content().await;
    broadcaster
        .update_theme(ThemeUpdate {
            text_color: Some("#ffee00".to_string()),
            ..Default::default()
        })
        .await;

    let mut lines = BufReader::new(client).lines();
    let mut types = Vec::new();
    let mut seqs = Vec::new();
    for _ in 0..4 {
        let line = tokio::time::timeout(Duration::from_millis(500), lines.next_line())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        types.push(value["type"].as_str().unwrap().to_string());
        seqs.push(value["seq"].as_u64().unwrap());
    }

    assert_eq!(types, vec!["content-update", "show-logo", "content-clear", "theme-update"]);
    assert!(seqs.windows(2).all(|w| w[0] < w[1]));

    broadcaster.stop().await.unwrap();
}

#[tokio::test]
async fn test_broadcast_to_multiple_receivers() {
    let temp_dir = tempdir().unwrap();
    let socket_path = temp_dir.path().join("multi.sock");

    let broadcaster = ContentBroadcaster::new(&socket_path).await.unwrap();
    broadcaster.start().await.unwrap();

    let client1 = UnixStream::connect(&socket_path).await.unwrap();
    let client2 = UnixStream::connect(&socket_path).await.unwrap();
    wait_for_clients(&broadcaster, 2).await;

    let delivered = broadcaster.show_black().await;
    assert_eq!(delivered, 2);

    for client in [client1, client2] {
        let mut lines = BufReader::new(client).lines();
        let line = tokio::time::timeout(Duration::from_millis(500), lines.next_line())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert!(line.contains("\"type\":\"show-black\""));
    }

    broadcaster.stop().await.unwrap();
}

#[tokio::test]
async fn test_dead_receiver_is_dropped() {
    let temp_dir = tempdir().unwrap();
    let socket_path = temp_dir.path().join("dead.sock");

    let broadcaster = ContentBroadcaster::new(&socket_path).await.unwrap();
    broadcaster.start().await.unwrap();

    let client = UnixStream::connect(&socket_path).await.unwrap();
    wait_for_clients(&broadcaster, 1).await;
    drop(client);

    // The first write after the peer closed may still succeed; a later one fails.
    for _ in 0..5 {
        broadcaster.show_logo().await;
        if broadcaster.client_count().await == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(broadcaster.client_count().await, 0);

    broadcaster.stop().await.unwrap();
}

#[tokio::test]
async fn test_receiver_decodes_and_forwards() {
    let temp_dir = tempdir().unwrap();
    let socket_path = temp_dir.path().join("recv.sock");

    let broadcaster = ContentBroadcaster::new(&socket_path).await.unwrap();
    broadcaster.start().await.unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut receiver =
        OutputReceiver::new(&socket_path).with_reconnect_delay(Duration::from_millis(20));
    let task = tokio::spawn(async move { receiver.listen(tx).await });

    wait_for_clients(&broadcaster, 1).await;

    let item = ContentItem::scripture("John 3:16", "For God so loved...");
    broadcaster
        .send_content(item.clone(), Some(TransitionSpec::none()))
        .await;

    let event = tokio::time::timeout(Duration::from_millis(500), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        event,
        OutputEvent::ContentUpdate {
            item,
            transition: Some(TransitionSpec::none())
        }
    );

    drop(rx);
    broadcaster.show_black().await;
    tokio::time::timeout(Duration::from_secs(1), task)
        .await
        .expect("receiver should stop once its consumer is gone")
        .unwrap();

    broadcaster.stop().await.unwrap();
}

#[tokio::test]
async fn test_receiver_skips_malformed_lines() {
    let temp_dir = tempdir().unwrap();
    let socket_path = temp_dir.path().join("raw.sock");

    // Hand-rolled operator so we can write arbitrary bytes
    let listener = UnixListener::bind(&socket_path).unwrap();
    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        stream.write_all(b"not json\n").await.unwrap();
        stream
            .write_all(b"{\"v\":2,\"seq\":1,\"type\":\"show-black\"}\n")
            .await
            .unwrap();
        stream
            .write_all(b"{\"v\":1,\"seq\":2,\"type\":\"hologram\"}\n")
            .await
            .unwrap();
        stream
            .write_all(b"{\"v\":1,\"seq\":3,\"type\":\"show-logo\"}\n")
            .await
            .unwrap();
        stream
    });

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut receiver = OutputReceiver::new(&socket_path);
    let task = tokio::spawn(async move { receiver.listen(tx).await });

    let event = tokio::time::timeout(Duration::from_millis(500), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event, OutputEvent::ShowLogo);

    task.abort();
    let _ = server.await;
}
