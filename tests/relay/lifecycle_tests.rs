//! Session lifecycle: greeting, replacement, heartbeat eviction, history

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use relay_server::application::relay::{
    ConnectionHandle, LivenessMonitor, MessageRouter, Outbound, Relay, RelayConfig,
};
use relay_server::domain::MessageStore;
use relay_server::infrastructure::storage::MemoryMessageStore;

use crate::common::{assert_consistent, connect, relay, send, TestClient};

const INTERVAL: Duration = Duration::from_secs(30);

#[tokio::test]
async fn test_init_lists_online_sessions_and_rooms() {
    let (relay, _router) = relay();
    let _alice = connect(&relay, "alice");

    let (conn, rx) = ConnectionHandle::channel();
    relay.connect("bob", conn.clone(), Vec::new()).unwrap();
    let mut bob = TestClient {
        id: "bob".into(),
        conn,
        rx,
    };

    let frames = bob.frames();
    assert_eq!(frames[0]["type"], "init");
    assert_eq!(frames[0]["sessionId"], "bob");
    assert_eq!(frames[0]["online"], json!(["alice"]));
    assert_eq!(frames[0]["rooms"], json!(["general", "random", "support"]));
    assert!(frames[0].get("room").is_none());
    assert_eq!(frames[1]["type"], "user_list");
}

#[tokio::test]
async fn test_auto_join_room_on_connect() {
    let relay = Relay::new(RelayConfig {
        auto_join_room: Some("general".into()),
        ..RelayConfig::default()
    });
    let (conn, rx) = ConnectionHandle::channel();
    relay.connect("alice", conn.clone(), Vec::new()).unwrap();
    let mut alice = TestClient {
        id: "alice".into(),
        conn,
        rx,
    };

    let init = alice.frames_of("init");
    assert_eq!(init[0]["room"], "general");
    assert_eq!(relay.room_of("alice").as_deref(), Some("general"));
    assert_consistent(&relay);
}

#[tokio::test]
async fn test_second_connection_replaces_first() {
    let (relay, router) = relay();
    let mut first = connect(&relay, "d1");
    let peer = connect(&relay, "d2");
    send(&router, &first, json!({"type": "join_room", "room": "general"})).await;
    send(&router, &peer, json!({"type": "connect_accept", "targetId": "d1"})).await;
    first.frames();

    let second = connect(&relay, "d1");

    let outbound = first.outbound();
    assert!(matches!(
        outbound.first(),
        Some(Outbound::Text(text)) if text.contains("session_replaced")
    ));
    assert_eq!(outbound.last(), Some(&Outbound::Close));
    assert!(first.conn.is_closed());

    assert_eq!(relay.session_count(), 2);
    assert_eq!(relay.room_of("d1"), None);
    assert_eq!(relay.peer_of("d2"), None);

    // the old connection's teardown must not remove its successor
    assert!(!relay.disconnect("d1", first.conn.id()));
    assert!(relay.is_connected("d1"));
    assert!(relay.disconnect("d1", second.conn.id()));
    assert!(!relay.disconnect("d1", second.conn.id()));
    assert_consistent(&relay);
}

#[tokio::test]
async fn test_frames_from_replaced_connection_ignored() {
    let (relay, router) = relay();
    let first = connect(&relay, "d1");
    let _second = connect(&relay, "d1");

    send(&router, &first, json!({"type": "join_room", "room": "general"})).await;

    assert_eq!(relay.room_of("d1"), None);
}

#[tokio::test(start_paused = true)]
async fn test_two_missed_heartbeats_evict_and_notify_peer() {
    let (relay, router) = relay();
    let mut silent = connect(&relay, "silent");
    let mut peer = connect(&relay, "peer");
    send(&router, &peer, json!({"type": "connect_accept", "targetId": "silent"})).await;
    send(&router, &silent, json!({"type": "join_room", "room": "general"})).await;
    peer.frames();

    let cancel = CancellationToken::new();
    let monitor = LivenessMonitor::new(relay.clone(), INTERVAL, cancel.clone()).spawn();

    // first heartbeat
    tokio::time::sleep(INTERVAL + Duration::from_millis(10)).await;
    assert!(relay.is_connected("silent"));
    assert!(silent.outbound().contains(&Outbound::Ping));
    send(&router, &peer, json!({"type": "pong"})).await;

    // second heartbeat finds no acknowledgement
    tokio::time::sleep(INTERVAL).await;
    assert!(!relay.is_connected("silent"));
    assert!(silent.conn.is_closed());
    assert!(relay.is_connected("peer"));
    assert_eq!(relay.peer_of("peer"), None);
    assert_eq!(relay.room_members("general"), Some(vec![]));
    assert_eq!(
        peer.frames_of("peer_disconnected"),
        vec![json!({"type": "peer_disconnected", "deviceId": "silent"})]
    );
    assert_consistent(&relay);

    cancel.cancel();
    monitor.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_acknowledging_session_survives() {
    let (relay, router) = relay();
    let client = connect(&relay, "steady");

    let cancel = CancellationToken::new();
    let monitor = LivenessMonitor::new(relay.clone(), INTERVAL, cancel.clone()).spawn();

    tokio::time::sleep(Duration::from_millis(10)).await;
    for _ in 0..5 {
        tokio::time::sleep(INTERVAL).await;
        send(&router, &client, json!({"type": "pong"})).await;
    }

    assert!(relay.is_connected("steady"));
    cancel.cancel();
    monitor.await.unwrap();
}

#[tokio::test]
async fn test_history_persisted_and_replayed_on_join() {
    let store: Arc<dyn MessageStore> = Arc::new(MemoryMessageStore::new(10));
    let relay = Arc::new(Relay::new(RelayConfig::default()));
    let router = MessageRouter::new(relay.clone(), Some(store.clone()));
    let alice = connect(&relay, "alice");
    send(&router, &alice, json!({"type": "join_room", "room": "general"})).await;
    send(&router, &alice, json!({"type": "message", "room": "general", "content": "first"})).await;

    // persistence runs on a spawned task
    for _ in 0..10 {
        if !router.history("general").await.is_empty() {
            break;
        }
        tokio::task::yield_now().await;
    }

    let mut bob = connect(&relay, "bob");
    send(&router, &bob, json!({"type": "join_room", "room": "general"})).await;

    let history = bob.frames_of("history");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["messages"][0]["content"], "first");
    assert_eq!(history[0]["messages"][0]["sessionId"], "alice");
}
