use std::sync::Arc;
use std::time::Duration;

use envdash::core::dashboard::{
    supervise, Backoff, ChannelEvent, ChannelState, IngestionChannel, LiveReadingPolicy,
    LiveSnapshot, SensorState,
};
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;

use super::support::{flaky_ws_server, text, ws_server};

const WAIT: Duration = Duration::from_secs(5);

async fn next_event(rx: &mut mpsc::Receiver<ChannelEvent>) -> ChannelEvent {
    timeout(WAIT, rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event queue closed")
}

#[tokio::test]
async fn test_frames_become_typed_events() {
    let frames = vec![
        text(r#"{"status":{"dht22":"active","ldr":"inactive"}}"#),
        text(r#"{"temperature":21.5,"humidity":40,"lightLevel":300}"#),
        // zero fails the live check and is dropped
        text(r#"{"temperature":0,"humidity":50,"lightLevel":10}"#),
        text("{not json"),
        text(
            r#"{"history":[
                {"timestamp":"2024-05-01T10:00:00Z","temperature":20,"humidity":41,"lightLevel":5},
                {"timestamp":"2024-05-01T10:01:00Z","temperature":"warm","humidity":41,"lightLevel":5}
            ]}"#,
        ),
        Message::binary(br#"{"temperature":22,"humidity":45,"lightLevel":310}"#.to_vec()),
    ];
    let (url, server) = ws_server(frames, false).await;

    let (tx, mut rx) = mpsc::channel(16);
    let channel = IngestionChannel::new(url, LiveReadingPolicy::Truthy, tx);
    channel.open().await.unwrap();

    match next_event(&mut rx).await {
        ChannelEvent::StatusUpdate(status) => {
            assert_eq!(status.get("dht22"), SensorState::Active);
            assert_eq!(status.get("ldr"), SensorState::Inactive);
        }
        other => panic!("expected status update, got {:?}", other),
    }

    assert_eq!(
        next_event(&mut rx).await,
        ChannelEvent::LiveReading(LiveSnapshot {
            temperature: 21.5,
            humidity: 40.0,
            light_level: 300.0,
        })
    );

    match next_event(&mut rx).await {
        ChannelEvent::FullHistorySnapshot(readings) => {
            assert_eq!(readings.len(), 1);
            assert_eq!(readings[0].temperature, 20.0);
        }
        other => panic!("expected history snapshot, got {:?}", other),
    }

    assert_eq!(
        next_event(&mut rx).await,
        ChannelEvent::LiveReading(LiveSnapshot {
            temperature: 22.0,
            humidity: 45.0,
            light_level: 310.0,
        })
    );

    timeout(WAIT, channel.disconnected()).await.unwrap();
    assert_eq!(channel.state(), ChannelState::Disconnected);
    assert!(rx.try_recv().is_err());

    timeout(WAIT, server).await.unwrap().unwrap();
}

#[tokio::test]
async fn test_presence_policy_accepts_zero() {
    let frames = vec![text(r#"{"temperature":0,"humidity":50,"lightLevel":10}"#)];
    let (url, _server) = ws_server(frames, false).await;

    let (tx, mut rx) = mpsc::channel(16);
    let channel = IngestionChannel::new(url, LiveReadingPolicy::Presence, tx);
    channel.open().await.unwrap();

    assert_eq!(
        next_event(&mut rx).await,
        ChannelEvent::LiveReading(LiveSnapshot {
            temperature: 0.0,
            humidity: 50.0,
            light_level: 10.0,
        })
    );
}

#[tokio::test]
async fn test_close_is_terminal() {
    let (url, server) = ws_server(Vec::new(), true).await;

    let (tx, _rx) = mpsc::channel(16);
    let channel = IngestionChannel::new(url, LiveReadingPolicy::Truthy, tx);
    channel.open().await.unwrap();
    assert_eq!(channel.state(), ChannelState::Connected);

    channel.close();
    channel.close();
    assert_eq!(channel.state(), ChannelState::Closed);

    // the server sees the close frame and finishes
    timeout(WAIT, server).await.unwrap().unwrap();

    assert!(channel.open().await.unwrap_err().is_transport());
    assert_eq!(channel.state(), ChannelState::Closed);
}

#[tokio::test]
async fn test_supervisor_reconnects_after_drop() {
    let (release_tx, release_rx) = oneshot::channel();
    let frames = vec![text(r#"{"temperature":19.5,"humidity":55,"lightLevel":120}"#)];
    let (url, server) = flaky_ws_server(release_rx, frames).await;

    let (tx, mut rx) = mpsc::channel(16);
    let channel = Arc::new(IngestionChannel::new(url, LiveReadingPolicy::Truthy, tx));
    let mut states = channel.state_changes();

    // long enough that the disconnected state is observable before the retry
    let backoff = Backoff::new(Duration::from_millis(300), Duration::from_millis(300), 0.0);
    let supervisor = tokio::spawn(supervise(Arc::clone(&channel), backoff, true));

    timeout(WAIT, states.wait_for(|s| *s == ChannelState::Connected))
        .await
        .unwrap()
        .unwrap();

    release_tx.send(()).unwrap();
    timeout(WAIT, states.wait_for(|s| *s == ChannelState::Disconnected))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(
        next_event(&mut rx).await,
        ChannelEvent::LiveReading(LiveSnapshot {
            temperature: 19.5,
            humidity: 55.0,
            light_level: 120.0,
        })
    );
    assert_eq!(channel.state(), ChannelState::Connected);

    channel.close();
    timeout(WAIT, supervisor).await.unwrap().unwrap();
    timeout(WAIT, server).await.unwrap().unwrap();
}
