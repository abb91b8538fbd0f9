//! WebSocket Connection Handler
//!
//! Resolves the caller's identity, upgrades the connection, and bridges
//! the socket to the relay: a writer task drains the connection's outbound
//! queue while the reader loop feeds text frames to the message router.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::{IntoResponse, Response},
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use futures::{SinkExt, StreamExt};
use tokio::time::timeout;

use crate::application::relay::{ConnectionHandle, Outbound};
use crate::domain::ConnectCredentials;
use crate::infrastructure::metrics;
use crate::startup::AppState;

/// Time the writer gets to flush queued frames after the reader stops.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// WebSocket upgrade handler.
///
/// Identity is resolved before the upgrade so unidentified clients get a
/// plain 401 instead of a socket.
pub async fn ws_handler(
    State(state): State<AppState>,
    Query(mut credentials): Query<ConnectCredentials>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    if credentials.token.is_none() {
        credentials.token = bearer.map(|TypedHeader(auth)| auth.token().to_string());
    }

    let identity = match state.identity.identify(&credentials).await {
        Ok(identity) => identity,
        Err(e) => {
            tracing::debug!(error = %e, "Rejected WebSocket upgrade");
            return e.into_response();
        }
    };

    let ws = match upgrade {
        Ok(ws) => ws,
        Err(rejection) => return rejection.into_response(),
    };

    let max_message_size = state.settings.websocket.max_message_size;
    ws.max_message_size(max_message_size)
        .on_upgrade(move |socket| handle_socket(socket, state, identity.session_id))
}

/// Drive one upgraded connection until it closes.
async fn handle_socket(socket: WebSocket, state: AppState, session_id: String) {
    let (mut sink, mut stream) = socket.split();
    let (conn, mut rx) = ConnectionHandle::channel();

    let mut writer = tokio::spawn(async move {
        while let Some(outbound) = rx.recv().await {
            let result = match outbound {
                Outbound::Text(text) => sink.send(Message::Text(text.to_string().into())).await,
                Outbound::Ping => sink.send(Message::Ping(Default::default())).await,
                Outbound::Close => {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
            };
            if result.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    let history = match state.relay.config().auto_join_room.as_deref() {
        Some(room) => state.router.history(room).await,
        None => Vec::new(),
    };

    match state.relay.connect(&session_id, Arc::clone(&conn), history) {
        Ok(outcome) => {
            tracing::info!(
                session_id = %session_id,
                replaced = outcome.replaced,
                "WebSocket connected"
            );
        }
        Err(e) => {
            tracing::warn!(session_id = %session_id, error = %e, "Failed to register session");
            conn.close();
            finish_writer(&mut writer).await;
            return;
        }
    }

    loop {
        tokio::select! {
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    state.router.route(&session_id, &conn, text.as_str()).await;
                }
                Some(Ok(Message::Pong(_))) => conn.mark_alive(),
                Some(Ok(Message::Binary(_))) => {
                    metrics::record_rejected("binary");
                    tracing::trace!(session_id = %session_id, "Dropped binary frame");
                }
                // answered by the transport
                Some(Ok(Message::Ping(_))) => {}
                Some(Ok(Message::Close(_))) | None => {
                    tracing::debug!(session_id = %session_id, "Connection closed by client");
                    break;
                }
                Some(Err(e)) => {
                    tracing::debug!(session_id = %session_id, error = %e, "WebSocket transport error");
                    break;
                }
            },
            _ = conn.closed() => {
                tracing::debug!(session_id = %session_id, "Connection closed by relay");
                break;
            }
        }
    }

    state.relay.disconnect(&session_id, conn.id());
    conn.close();
    finish_writer(&mut writer).await;
}

async fn finish_writer(writer: &mut tokio::task::JoinHandle<()>) {
    if timeout(WRITER_DRAIN_TIMEOUT, &mut *writer).await.is_err() {
        writer.abort();
    }
}
