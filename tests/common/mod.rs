//! Common Test Utilities
//!
//! Shared helpers for driving the HTTP router and the relay hub.

#![allow(dead_code)]

use std::sync::Arc;

use axum::{body::Body, http::Request, response::Response, Router};
use serde_json::Value;
use tokio::sync::mpsc::UnboundedReceiver;
use tower::ServiceExt;

use relay_server::application::relay::{
    ConnectionHandle, MessageRouter, Outbound, Relay, RelayConfig,
};
use relay_server::config::Settings;
use relay_server::domain::MessageStore;
use relay_server::infrastructure::storage::MemoryMessageStore;
use relay_server::presentation::http::routes;
use relay_server::startup::AppState;

/// Router plus the state behind it, backed by the in-memory store
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_settings(|_| {})
    }

    /// Build from the default settings after applying `configure`
    pub fn with_settings(configure: impl FnOnce(&mut Settings)) -> Self {
        let mut settings = Settings::defaults().expect("default settings are valid");
        configure(&mut settings);

        let store: Arc<dyn MessageStore> =
            Arc::new(MemoryMessageStore::new(settings.storage.retention));
        let state = AppState::build(settings, Some(store));
        let router = routes::create_router(state.clone());
        Self { router, state }
    }

    /// Make a GET request to the application
    pub async fn get(&self, uri: &str) -> Response {
        self.request(Request::builder().method("GET").uri(uri))
            .await
    }

    /// Send a request built by the caller
    pub async fn request(&self, builder: axum::http::request::Builder) -> Response {
        self.router
            .clone()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }
}

/// Read a response body as JSON
pub async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// A connected test client: the handle the relay holds plus the queue
/// its writer would drain.
pub struct TestClient {
    pub id: String,
    pub conn: Arc<ConnectionHandle>,
    pub rx: UnboundedReceiver<Outbound>,
}

impl TestClient {
    /// Drain every queued text frame as JSON
    pub fn frames(&mut self) -> Vec<Value> {
        let mut frames = Vec::new();
        while let Ok(outbound) = self.rx.try_recv() {
            if let Outbound::Text(text) = outbound {
                frames.push(serde_json::from_str(&text).unwrap());
            }
        }
        frames
    }

    /// Drain queued frames and keep those of one `type`
    pub fn frames_of(&mut self, kind: &str) -> Vec<Value> {
        self.frames()
            .into_iter()
            .filter(|f| f["type"] == kind)
            .collect()
    }

    /// Drain everything, including pings and closes
    pub fn outbound(&mut self) -> Vec<Outbound> {
        let mut all = Vec::new();
        while let Ok(outbound) = self.rx.try_recv() {
            all.push(outbound);
        }
        all
    }
}

/// Relay plus router without a store
pub fn relay_with(config: RelayConfig) -> (Arc<Relay>, MessageRouter) {
    let relay = Arc::new(Relay::new(config));
    let router = MessageRouter::new(relay.clone(), None);
    (relay, router)
}

pub fn relay() -> (Arc<Relay>, MessageRouter) {
    relay_with(RelayConfig::default())
}

/// Connect `id` and discard its greeting frames
pub fn connect(relay: &Relay, id: &str) -> TestClient {
    let (conn, rx) = ConnectionHandle::channel();
    relay.connect(id, conn.clone(), Vec::new()).unwrap();
    let mut client = TestClient {
        id: id.to_string(),
        conn,
        rx,
    };
    client.frames();
    client
}

/// Route one JSON frame as if `client` had sent it
pub async fn send(router: &MessageRouter, client: &TestClient, frame: Value) {
    router
        .route(&client.id, &client.conn, &frame.to_string())
        .await;
}

/// Assert the hub's membership and pairing invariants hold
pub fn assert_consistent(relay: &Relay) {
    let violations = relay.consistency_violations();
    assert!(violations.is_empty(), "invariant violations: {:?}", violations);
}
