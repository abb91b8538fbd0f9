//! Mixed operation sequences against the membership and pairing invariants

use std::collections::HashMap;

use pretty_assertions::assert_eq;
use serde_json::json;

use relay_server::application::relay::{MessageRouter, Relay};

use crate::common::{assert_consistent, connect, relay, send, TestClient};

#[derive(Debug, Clone, Copy)]
enum Step {
    Connect(&'static str),
    Disconnect(&'static str),
    Join(&'static str, &'static str),
    Leave(&'static str),
    Request(&'static str, &'static str),
    Accept(&'static str, &'static str),
    DropPeer(&'static str),
    Pong(&'static str),
    Sweep,
}

const DEVICES: [&str; 4] = ["d1", "d2", "d3", "d4"];
const ROOMS: [&str; 3] = ["general", "random", "support"];

async fn apply(
    relay: &Relay,
    router: &MessageRouter,
    clients: &mut HashMap<&'static str, TestClient>,
    step: Step,
) {
    match step {
        Step::Connect(id) => {
            clients.insert(id, connect(relay, id));
        }
        Step::Disconnect(id) => {
            if let Some(client) = clients.remove(id) {
                relay.disconnect(id, client.conn.id());
                client.conn.close();
            }
        }
        Step::Sweep => {
            relay.sweep();
        }
        Step::Join(id, room) => {
            frame(router, clients, id, json!({"type": "join_room", "room": room})).await
        }
        Step::Leave(id) => frame(router, clients, id, json!({"type": "leave_room"})).await,
        Step::Request(id, target) => {
            let request = json!({"type": "connect_request", "targetId": target, "publicKey": "pk"});
            frame(router, clients, id, request).await
        }
        Step::Accept(id, target) => {
            let accept = json!({"type": "connect_accept", "targetId": target, "publicKey": "pk"});
            frame(router, clients, id, accept).await
        }
        Step::DropPeer(id) => frame(router, clients, id, json!({"type": "disconnect_peer"})).await,
        Step::Pong(id) => frame(router, clients, id, json!({"type": "pong"})).await,
    }

    for client in clients.values_mut() {
        client.outbound();
    }
}

async fn frame(
    router: &MessageRouter,
    clients: &HashMap<&'static str, TestClient>,
    id: &str,
    frame: serde_json::Value,
) {
    if let Some(client) = clients.get(id) {
        send(router, client, frame).await;
    }
}

fn check(relay: &Relay, index: usize, step: Step) {
    let violations = relay.consistency_violations();
    assert!(
        violations.is_empty(),
        "after step {} {:?}: {:?}",
        index,
        step,
        violations
    );
}

#[tokio::test]
async fn test_scripted_sequence_keeps_invariants() {
    use Step::*;

    let steps = [
        Connect("d1"),
        Connect("d2"),
        Connect("d3"),
        Join("d1", "general"),
        Join("d2", "general"),
        Join("d3", "random"),
        Request("d1", "d2"),
        Accept("d2", "d1"),
        Accept("d3", "d1"),
        Join("d1", "random"),
        Connect("d1"),
        Join("d1", "support"),
        Accept("d1", "d3"),
        Leave("d3"),
        DropPeer("d3"),
        Accept("d2", "d3"),
        Sweep,
        Pong("d1"),
        Pong("d3"),
        Sweep,
        Join("d2", "general"),
        Connect("d2"),
        Accept("d2", "d1"),
        Disconnect("d1"),
        Disconnect("d1"),
        Leave("d2"),
        Sweep,
        Pong("d2"),
        Sweep,
        Connect("d4"),
        Accept("d4", "d2"),
        Join("d4", "support"),
        DropPeer("d2"),
        Disconnect("d3"),
        Disconnect("d2"),
    ];

    let (relay, router) = relay();
    let mut clients = HashMap::new();
    for (index, step) in steps.into_iter().enumerate() {
        apply(&relay, &router, &mut clients, step).await;
        check(&relay, index, step);
    }

    assert_eq!(relay.session_count(), 1);
    assert_eq!(relay.room_of("d4").as_deref(), Some("support"));
    assert_eq!(relay.peer_of("d4"), None);
}

#[tokio::test]
async fn test_rotating_sequence_keeps_invariants() {
    let (relay, router) = relay();
    let mut clients = HashMap::new();

    for index in 0..400 {
        let id = DEVICES[(index * 7) % DEVICES.len()];
        let other = DEVICES[(index * 5 + 1) % DEVICES.len()];
        let room = ROOMS[(index / 3) % ROOMS.len()];
        let step = match (index * 11) % 13 {
            0 | 1 => Step::Connect(id),
            2 | 3 => Step::Join(id, room),
            4 => Step::Leave(id),
            5 => Step::Request(id, other),
            6 | 7 => Step::Accept(id, other),
            8 => Step::DropPeer(id),
            9 => Step::Disconnect(id),
            10 | 11 => Step::Pong(id),
            _ => Step::Sweep,
        };
        apply(&relay, &router, &mut clients, step).await;
        check(&relay, index, step);
    }
}

#[tokio::test]
async fn test_disconnect_after_eviction_is_noop() {
    let (relay, router) = relay();
    let evicted = connect(&relay, "evicted");
    let mut other = connect(&relay, "other");
    send(&router, &evicted, json!({"type": "join_room", "room": "general"})).await;
    send(&router, &other, json!({"type": "join_room", "room": "general"})).await;
    send(&router, &other, json!({"type": "connect_accept", "targetId": "evicted"})).await;

    assert!(relay.sweep().is_empty());
    send(&router, &other, json!({"type": "pong"})).await;
    assert_eq!(relay.sweep(), vec!["evicted".to_string()]);
    other.frames();

    assert!(!relay.disconnect("evicted", evicted.conn.id()));

    assert_eq!(relay.session_count(), 1);
    assert_eq!(relay.room_members("general"), Some(vec!["other".to_string()]));
    assert_eq!(relay.peer_of("other"), None);
    assert!(other.frames().is_empty());
    assert_consistent(&relay);

    // a fresh connection under the same id is not torn down by the stale one
    let _returned = connect(&relay, "evicted");
    assert!(!relay.disconnect("evicted", evicted.conn.id()));
    assert!(relay.is_connected("evicted"));
    assert_consistent(&relay);
}
