//! Relay-to-client messages.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::domain::StoredMessage;

/// Every frame the relay sends, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// First frame on every connection.
    #[serde(rename_all = "camelCase")]
    Init {
        session_id: String,
        online: Vec<String>,
        rooms: Vec<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        room: Option<String>,
        history: Vec<StoredMessage>,
    },

    Error { message: String },

    /// Room broadcast.
    #[serde(rename_all = "camelCase")]
    Message {
        room: String,
        content: String,
        session_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        user: Option<String>,
        timestamp: i64,
    },

    History {
        room: String,
        messages: Vec<StoredMessage>,
    },

    #[serde(rename_all = "camelCase")]
    UserJoined { room: String, session_id: String },

    #[serde(rename_all = "camelCase")]
    UserLeft { room: String, session_id: String },

    UserList { users: Vec<UserEntry> },

    RoomList { rooms: Vec<String> },

    #[serde(rename_all = "camelCase")]
    ConnectRequest {
        from_device_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        public_key: Option<Value>,
    },

    #[serde(rename_all = "camelCase")]
    ConnectAccepted {
        from_device_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        public_key: Option<Value>,
    },

    #[serde(rename_all = "camelCase")]
    EncryptedMessage {
        from_device_id: String,
        content: Value,
        #[serde(skip_serializing_if = "Option::is_none")]
        iv: Option<Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        timestamp: Option<Value>,
    },

    #[serde(rename_all = "camelCase")]
    PeerDisconnected { device_id: String },

    SessionReplaced { message: String },

    Pong,
}

/// One row of a `user_list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserEntry {
    pub id: String,
    pub room: Option<String>,
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }

    /// Serialize once for fan-out.
    pub fn encode(&self) -> Option<Arc<str>> {
        match serde_json::to_string(self) {
            Ok(text) => Some(Arc::from(text)),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize outbound message");
                None
            }
        }
    }
}
