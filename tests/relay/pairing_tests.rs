//! Peer pairing scenarios

use pretty_assertions::assert_eq;
use serde_json::json;

use crate::common::{assert_consistent, connect, relay, send};

#[tokio::test]
async fn test_pairing_scenario_d1_d2() {
    let (relay, router) = relay();
    let mut d1 = connect(&relay, "d1");
    let mut d2 = connect(&relay, "d2");

    send(
        &router,
        &d1,
        json!({"type": "connect_request", "targetId": "d2", "publicKey": "pk-1"}),
    )
    .await;
    let requests = d2.frames_of("connect_request");
    assert_eq!(
        requests,
        vec![json!({"type": "connect_request", "fromDeviceId": "d1", "publicKey": "pk-1"})]
    );
    assert_eq!(relay.peer_of("d1"), None);

    send(
        &router,
        &d2,
        json!({"type": "connect_accept", "targetId": "d1", "publicKey": "pk-2"}),
    )
    .await;
    assert_eq!(relay.peer_of("d1").as_deref(), Some("d2"));
    assert_eq!(relay.peer_of("d2").as_deref(), Some("d1"));
    assert_eq!(
        d1.frames_of("connect_accepted"),
        vec![json!({"type": "connect_accepted", "fromDeviceId": "d2", "publicKey": "pk-2"})]
    );

    send(
        &router,
        &d1,
        json!({"type": "encrypted_message", "targetId": "d2", "encryptedContent": "ciphertext", "iv": "nonce"}),
    )
    .await;
    let relayed = d2.frames_of("encrypted_message");
    assert_eq!(relayed.len(), 1);
    assert_eq!(relayed[0]["fromDeviceId"], "d1");
    assert_eq!(relayed[0]["content"], "ciphertext");
    assert_eq!(relayed[0]["iv"], "nonce");
    assert_consistent(&relay);
}

#[tokio::test]
async fn test_request_to_offline_target_gets_error() {
    let (relay, router) = relay();
    let mut d1 = connect(&relay, "d1");

    send(&router, &d1, json!({"type": "connect_request", "targetId": "ghost"})).await;

    let errors = d1.frames_of("error");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["message"], "Target device not found or offline");
}

#[tokio::test]
async fn test_encrypted_message_requires_link() {
    let (relay, router) = relay();
    let d1 = connect(&relay, "d1");
    let mut d2 = connect(&relay, "d2");

    send(
        &router,
        &d1,
        json!({"type": "encrypted_message", "targetId": "d2", "content": "sneaky"}),
    )
    .await;

    assert!(d2.frames().is_empty());
}

#[tokio::test]
async fn test_new_link_displaces_old_peer() {
    let (relay, router) = relay();
    let a = connect(&relay, "a");
    let b = connect(&relay, "b");
    let mut c = connect(&relay, "c");

    send(&router, &b, json!({"type": "connect_accept", "targetId": "c"})).await;
    assert_eq!(relay.peer_of("c").as_deref(), Some("b"));
    c.frames();

    send(&router, &a, json!({"type": "connect_accept", "targetId": "b"})).await;

    assert_eq!(relay.peer_of("a").as_deref(), Some("b"));
    assert_eq!(relay.peer_of("b").as_deref(), Some("a"));
    assert_eq!(relay.peer_of("c"), None);
    assert_eq!(
        c.frames_of("peer_disconnected"),
        vec![json!({"type": "peer_disconnected", "deviceId": "b"})]
    );
    assert_consistent(&relay);
}

#[tokio::test]
async fn test_disconnect_peer_notifies_other_side() {
    let (relay, router) = relay();
    let a = connect(&relay, "a");
    let mut b = connect(&relay, "b");
    send(&router, &b, json!({"type": "connect_accept", "targetId": "a"})).await;
    b.frames();

    send(&router, &a, json!({"type": "disconnect_peer"})).await;

    assert_eq!(relay.peer_of("a"), None);
    assert_eq!(relay.peer_of("b"), None);
    assert_eq!(
        b.frames_of("peer_disconnected"),
        vec![json!({"type": "peer_disconnected", "deviceId": "a"})]
    );
}

#[tokio::test]
async fn test_peer_notified_when_session_leaves() {
    let (relay, router) = relay();
    let a = connect(&relay, "a");
    let mut b = connect(&relay, "b");
    send(&router, &b, json!({"type": "connect_accept", "targetId": "a"})).await;
    b.frames();

    assert!(relay.disconnect("a", a.conn.id()));

    assert_eq!(relay.peer_of("b"), None);
    assert_eq!(b.frames_of("peer_disconnected").len(), 1);
    assert_consistent(&relay);
}

#[tokio::test]
async fn test_self_pairing_rejected() {
    let (relay, router) = relay();
    let mut a = connect(&relay, "a");

    send(&router, &a, json!({"type": "connect_accept", "targetId": "a"})).await;

    assert_eq!(relay.peer_of("a"), None);
    assert_eq!(a.frames_of("error")[0]["message"], "Cannot connect to yourself");
}

#[tokio::test]
async fn test_at_most_one_link_after_random_operations() {
    let (relay, router) = relay();
    let ids = ["p0", "p1", "p2", "p3"];
    let clients: Vec<_> = ids.iter().map(|id| connect(&relay, id)).collect();

    let script = [
        (0, 1, "connect_accept"),
        (2, 3, "connect_accept"),
        (1, 2, "connect_accept"),
        (3, 0, "connect_accept"),
        (0, 0, "disconnect_peer"),
        (2, 1, "connect_accept"),
        (1, 1, "disconnect_peer"),
        (3, 2, "connect_accept"),
    ];
    for (from, to, kind) in script {
        let frame = match kind {
            "disconnect_peer" => json!({"type": "disconnect_peer"}),
            _ => json!({"type": kind, "targetId": ids[to]}),
        };
        send(&router, &clients[from], frame).await;
        assert_consistent(&relay);
    }

    assert_eq!(relay.peer_of("p3").as_deref(), Some("p2"));
    assert_eq!(relay.peer_of("p2").as_deref(), Some("p3"));
}
