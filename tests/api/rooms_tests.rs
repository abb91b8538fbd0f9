//! Room listing API tests

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::json;

use crate::common::{connect, json_body, TestApp};

#[tokio::test]
async fn test_lists_default_rooms() {
    let app = TestApp::new();

    let response = app.get("/api/rooms").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!({
            "rooms": [
                {"name": "general", "memberCount": 0},
                {"name": "random", "memberCount": 0},
                {"name": "support", "memberCount": 0},
            ]
        })
    );
}

#[tokio::test]
async fn test_member_counts_follow_joins() {
    let app = TestApp::new();
    let relay = &app.state.relay;
    let _a = connect(relay, "alice");
    let _b = connect(relay, "bob");
    relay.join_room("alice", "general").unwrap();
    relay.join_room("bob", "general").unwrap();
    relay.create_room("lounge").unwrap();

    let json = json_body(app.get("/api/rooms").await).await;

    let rooms = json["rooms"].as_array().unwrap();
    assert_eq!(rooms.len(), 4);
    assert_eq!(rooms[0], json!({"name": "general", "memberCount": 2}));
    assert_eq!(rooms[1], json!({"name": "lounge", "memberCount": 0}));
}

#[tokio::test]
async fn test_rate_limit_headers_on_api() {
    let app = TestApp::new();

    let response = app.get("/api/rooms").await;

    assert_eq!(response.headers().get("X-RateLimit-Limit").unwrap(), "100");
    assert_eq!(response.headers().get("X-RateLimit-Remaining").unwrap(), "99");
}

#[tokio::test]
async fn test_rate_limit_rejects_excess_requests() {
    let app = TestApp::with_settings(|s| {
        s.rate_limit.max_requests = 2;
    });

    assert_eq!(app.get("/api/rooms").await.status(), StatusCode::OK);
    assert_eq!(app.get("/api/rooms").await.status(), StatusCode::OK);
    let rejected = app.get("/api/rooms").await;

    assert_eq!(rejected.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(rejected.headers().get("retry-after").is_some());
    let json = json_body(rejected).await;
    assert_eq!(json["code"], 10006);
    assert_eq!(json["rate_limit"]["remaining"], 0);

    // probes are not limited
    assert_eq!(app.get("/health").await.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_rate_limit_disabled() {
    let app = TestApp::with_settings(|s| {
        s.rate_limit.enabled = false;
        s.rate_limit.max_requests = 1;
    });

    for _ in 0..3 {
        let response = app.get("/api/rooms").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get("X-RateLimit-Limit").is_none());
    }
}
