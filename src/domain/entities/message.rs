//! Stored room message and the persistence contract.
//!
//! The relay core never depends on storage: the router hands accepted
//! room messages to a `MessageStore` through a detached writer task, and
//! history is fetched on a best-effort basis.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::error::AppError;

/// A room message as recorded by the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredMessage {
    pub id: Uuid,
    pub room: String,
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    pub content: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl StoredMessage {
    /// Create a message stamped with the current time.
    pub fn new(
        room: impl Into<String>,
        session_id: impl Into<String>,
        user: Option<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            room: room.into(),
            session_id: session_id.into(),
            user,
            content: content.into(),
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}

/// Durable (or not) record of room traffic.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Record one accepted room message.
    async fn append(&self, message: &StoredMessage) -> Result<(), AppError>;

    /// Most recent `limit` messages of a room, oldest first.
    async fn recent(&self, room: &str, limit: usize) -> Result<Vec<StoredMessage>, AppError>;

    /// Backend reachability, used by the readiness probe.
    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }

    /// Short backend name for logs and health output.
    fn backend(&self) -> &'static str;
}
