//! WebSocket upgrade endpoint tests
//!
//! `oneshot` requests carry no upgradable connection, so an accepted
//! identity surfaces as 426 from the upgrade extractor while a rejected
//! one stops at 401.

use axum::http::{header, request::Builder, Request, StatusCode};
use jsonwebtoken::{encode, EncodingKey, Header};

use relay_server::infrastructure::identity::Claims;

use crate::common::{json_body, TestApp};

const SECRET: &str = "integration-test-secret-at-least-32-chars";

fn upgrade(uri: &str) -> Builder {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header(header::CONNECTION, "upgrade")
        .header(header::UPGRADE, "websocket")
        .header(header::SEC_WEBSOCKET_VERSION, "13")
        .header(header::SEC_WEBSOCKET_KEY, "dGhlIHNhbXBsZSBub25jZQ==")
}

fn token(sub: &str, ttl_secs: i64) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: sub.to_string(),
        exp: now + ttl_secs,
        iat: now,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

fn jwt_app() -> TestApp {
    TestApp::with_settings(|s| {
        s.auth.jwt_secret = Some(SECRET.to_string());
        s.auth.allow_anonymous = false;
    })
}

#[tokio::test]
async fn test_device_id_passes_identity() {
    let app = TestApp::new();

    let response = app.request(upgrade("/ws?deviceId=device-1")).await;

    assert_eq!(response.status(), StatusCode::UPGRADE_REQUIRED);
}

#[tokio::test]
async fn test_anonymous_allowed_by_default() {
    let app = TestApp::new();

    let response = app.request(upgrade("/ws")).await;

    assert_eq!(response.status(), StatusCode::UPGRADE_REQUIRED);
}

#[tokio::test]
async fn test_missing_identity_is_unauthorized() {
    let app = TestApp::with_settings(|s| s.auth.allow_anonymous = false);

    let response = app.request(upgrade("/ws")).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = json_body(response).await;
    assert_eq!(json["code"], 10003);
}

#[tokio::test]
async fn test_invalid_device_id_is_unauthorized() {
    let app = TestApp::new();

    let response = app.request(upgrade("/ws?deviceId=has%20space")).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_identity_checked_before_upgrade_headers() {
    let app = TestApp::with_settings(|s| s.auth.allow_anonymous = false);

    let response = app.get("/ws").await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_bearer_token_accepted() {
    let app = jwt_app();

    let response = app
        .request(upgrade("/ws").header(header::AUTHORIZATION, format!("Bearer {}", token("d1", 60))))
        .await;

    assert_eq!(response.status(), StatusCode::UPGRADE_REQUIRED);
}

#[tokio::test]
async fn test_query_token_accepted() {
    let app = jwt_app();

    let response = app
        .request(upgrade(&format!("/ws?token={}", token("d1", 60))))
        .await;

    assert_eq!(response.status(), StatusCode::UPGRADE_REQUIRED);
}

#[tokio::test]
async fn test_expired_token_rejected() {
    let app = jwt_app();

    let response = app
        .request(upgrade("/ws").header(header::AUTHORIZATION, format!("Bearer {}", token("d1", -3600))))
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["message"], "Token expired");
}

#[tokio::test]
async fn test_device_id_ignored_when_tokens_required() {
    let app = jwt_app();

    let response = app.request(upgrade("/ws?deviceId=device-1")).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_custom_upgrade_path() {
    let app = TestApp::with_settings(|s| s.websocket.path = "/relay".to_string());

    assert_eq!(
        app.request(upgrade("/relay?deviceId=d1")).await.status(),
        StatusCode::UPGRADE_REQUIRED
    );
    assert_eq!(
        app.request(upgrade("/ws?deviceId=d1")).await.status(),
        StatusCode::NOT_FOUND
    );
}
