//! Redis-backed message store.
//!
//! One list per room, newest at the head, trimmed to the retention size
//! on every append.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use tracing::{debug, instrument};

use crate::domain::{MessageStore, StoredMessage};
use crate::infrastructure::cache::keys;
use crate::shared::error::AppError;

#[derive(Clone)]
pub struct RedisMessageStore {
    conn: ConnectionManager,
    prefix: String,
    retention: usize,
}

impl RedisMessageStore {
    pub fn new(conn: ConnectionManager, prefix: impl Into<String>, retention: usize) -> Self {
        Self {
            conn,
            prefix: prefix.into(),
            retention: retention.max(1),
        }
    }

    fn key(&self, room: &str) -> String {
        keys::room_history(&self.prefix, room)
    }
}

#[async_trait]
impl MessageStore for RedisMessageStore {
    #[instrument(skip(self, message), fields(room = %message.room))]
    async fn append(&self, message: &StoredMessage) -> Result<(), AppError> {
        let key = self.key(&message.room);
        let payload = serde_json::to_string(message)?;
        let mut conn = self.conn.clone();

        let _: () = redis::pipe()
            .atomic()
            .cmd("LPUSH")
            .arg(&key)
            .arg(payload)
            .ignore()
            .cmd("LTRIM")
            .arg(&key)
            .arg(0)
            .arg(self.retention as isize - 1)
            .ignore()
            .query_async(&mut conn)
            .await?;

        debug!("Message appended to history");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn recent(&self, room: &str, limit: usize) -> Result<Vec<StoredMessage>, AppError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut conn = self.conn.clone();
        let raw: Vec<String> = redis::cmd("LRANGE")
            .arg(self.key(room))
            .arg(0)
            .arg(limit as isize - 1)
            .query_async(&mut conn)
            .await?;

        // stored newest first
        let mut messages = Vec::with_capacity(raw.len());
        for entry in raw.iter().rev() {
            match serde_json::from_str::<StoredMessage>(entry) {
                Ok(message) => messages.push(message),
                Err(e) => tracing::warn!(room = %room, error = %e, "Skipping corrupt history entry"),
            }
        }
        Ok(messages)
    }

    async fn ping(&self) -> Result<(), AppError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}
