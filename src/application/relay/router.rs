//! Inbound frame routing.
//!
//! Decodes one text frame, validates it, and dispatches to the hub.
//! Validation happens before any state is touched, so a rejected frame
//! leaves no trace beyond its `error` reply.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use validator::Validate;

use super::broadcaster;
use super::connection::ConnectionHandle;
use super::error::RelayError;
use super::hub::Relay;
use crate::application::dto::{ChatMessage, ClientMessage, RoomRequest, ServerMessage};
use crate::domain::{MessageStore, StoredMessage};
use crate::infrastructure::metrics;
use crate::shared::validation::first_message;

pub struct MessageRouter {
    relay: Arc<Relay>,
    store: Option<Arc<dyn MessageStore>>,
    writer: Option<mpsc::UnboundedSender<StoredMessage>>,
}

impl MessageRouter {
    /// Must be called inside a tokio runtime when `store` is set, since
    /// appends are drained by a spawned writer task.
    pub fn new(relay: Arc<Relay>, store: Option<Arc<dyn MessageStore>>) -> Self {
        let writer = store.clone().map(spawn_writer);
        Self {
            relay,
            store,
            writer,
        }
    }

    pub fn relay(&self) -> &Arc<Relay> {
        &self.relay
    }

    /// Handle one inbound text frame from `session_id`.
    ///
    /// Oversized frames get an `error` reply; undecodable frames and
    /// unknown types are dropped. Frames from a connection that has been
    /// closed (replaced or evicted) are ignored.
    pub async fn route(&self, session_id: &str, connection: &ConnectionHandle, frame: &str) {
        if connection.is_closed() {
            return;
        }

        let max = self.relay.config().max_frame_bytes;
        if frame.len() > max {
            self.reject(
                session_id,
                connection,
                RelayError::FrameTooLarge {
                    size: frame.len(),
                    max,
                },
            );
            return;
        }

        let message = match serde_json::from_str::<ClientMessage>(frame) {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!(session_id = %session_id, error = %e, "Dropping malformed frame");
                self.reject(session_id, connection, RelayError::MalformedInput);
                return;
            }
        };

        let kind = message.kind();
        metrics::record_inbound(kind);
        tracing::trace!(session_id = %session_id, kind, "Inbound frame");

        if let Err(e) = self.dispatch(session_id, connection, message).await {
            self.reject(session_id, connection, e);
        }
    }

    async fn dispatch(
        &self,
        session_id: &str,
        connection: &ConnectionHandle,
        message: ClientMessage,
    ) -> Result<(), RelayError> {
        match message {
            ClientMessage::Message(chat) => self.post(session_id, chat),
            ClientMessage::JoinRoom(request) => {
                validate_room_request(&request)?;
                if self.relay.join_room(session_id, &request.room)? {
                    let messages = self.history(&request.room).await;
                    broadcaster::send_direct(
                        connection,
                        &ServerMessage::History {
                            room: request.room,
                            messages,
                        },
                    );
                }
                Ok(())
            }
            ClientMessage::LeaveRoom => {
                self.relay.leave_room(session_id, true);
                Ok(())
            }
            ClientMessage::CreateRoom(request) => {
                validate_room_request(&request)?;
                self.relay.create_room(&request.room)?;
                Ok(())
            }
            ClientMessage::ListRooms => {
                broadcaster::send_direct(
                    connection,
                    &ServerMessage::RoomList {
                        rooms: self.relay.list_rooms(),
                    },
                );
                Ok(())
            }
            ClientMessage::ConnectRequest(request) => self.relay.request_connect(session_id, request),
            ClientMessage::ConnectAccept(request) => {
                self.relay.accept_connect(session_id, request)?;
                Ok(())
            }
            ClientMessage::EncryptedMessage(payload) => {
                self.relay.relay_to_peer(session_id, payload);
                Ok(())
            }
            ClientMessage::DisconnectPeer => {
                self.relay.disconnect_peer(session_id);
                Ok(())
            }
            ClientMessage::Ping => {
                connection.mark_alive();
                broadcaster::send_direct(connection, &ServerMessage::Pong);
                Ok(())
            }
            ClientMessage::Pong => {
                connection.mark_alive();
                Ok(())
            }
        }
    }

    fn post(&self, session_id: &str, chat: ChatMessage) -> Result<(), RelayError> {
        chat.validate()
            .map_err(|e| RelayError::Validation(first_message(&e)))?;

        let content = chat.content.trim();
        if content.is_empty() {
            return Err(RelayError::Validation("Message content cannot be empty".into()));
        }
        let max = self.relay.config().max_content_chars;
        if content.chars().count() > max {
            return Err(RelayError::Validation(format!(
                "Message too long (max {} characters)",
                max
            )));
        }

        let record = self
            .relay
            .post_message(session_id, &chat.room, content, chat.user)?;
        self.persist(record);
        Ok(())
    }

    /// Queue a message for the store without holding up the sender.
    fn persist(&self, record: StoredMessage) {
        let Some(writer) = self.writer.as_ref() else {
            return;
        };
        if let Err(e) = writer.send(record) {
            tracing::warn!(room = %e.0.room, "Store writer stopped, message not persisted");
        }
    }

    /// Recent messages of `room`, oldest first. Best effort: a store
    /// failure or a read slower than `history_timeout` yields an empty
    /// history.
    pub async fn history(&self, room: &str) -> Vec<StoredMessage> {
        let Some(store) = self.store.as_ref() else {
            return Vec::new();
        };
        let config = self.relay.config();
        let started = Instant::now();
        let result =
            tokio::time::timeout(config.history_timeout, store.recent(room, config.history_limit))
                .await;
        metrics::record_store_operation(store.backend(), "recent", started.elapsed().as_secs_f64());
        match result {
            Ok(Ok(messages)) => messages,
            Ok(Err(e)) => {
                tracing::warn!(room = %room, error = %e, "Failed to load history");
                Vec::new()
            }
            Err(_) => {
                tracing::warn!(
                    room = %room,
                    timeout_ms = config.history_timeout.as_millis() as u64,
                    "Timed out loading history"
                );
                Vec::new()
            }
        }
    }

    fn reject(&self, session_id: &str, connection: &ConnectionHandle, error: RelayError) {
        metrics::record_rejected(error.kind());
        match error.reply() {
            Some(text) => {
                tracing::debug!(session_id = %session_id, error = %error, "Rejected frame");
                broadcaster::send_direct(connection, &ServerMessage::error(text));
            }
            None => {
                tracing::trace!(session_id = %session_id, error = %error, "Dropped frame");
            }
        }
    }
}

fn validate_room_request(request: &RoomRequest) -> Result<(), RelayError> {
    request.validate().map_err(|_| RelayError::InvalidRoomName)
}

/// Single task appending in queue order, so stored history matches the
/// order messages were broadcast in.
fn spawn_writer(store: Arc<dyn MessageStore>) -> mpsc::UnboundedSender<StoredMessage> {
    let (tx, mut rx) = mpsc::unbounded_channel::<StoredMessage>();
    tokio::spawn(async move {
        while let Some(record) = rx.recv().await {
            let started = Instant::now();
            if let Err(e) = store.append(&record).await {
                tracing::warn!(room = %record.room, error = %e, "Failed to persist message");
            }
            metrics::record_store_operation(
                store.backend(),
                "append",
                started.elapsed().as_secs_f64(),
            );
        }
        tracing::debug!(backend = store.backend(), "Store writer stopped");
    });
    tx
}
