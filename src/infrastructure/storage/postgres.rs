//! PostgreSQL message store.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{MessageStore, StoredMessage};
use crate::shared::error::AppError;

/// Durable history in the `relay_messages` table.
pub struct PgMessageStore {
    pool: PgPool,
}

impl PgMessageStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Row type matching the `relay_messages` migration.
#[derive(Debug, sqlx::FromRow)]
struct MessageRow {
    id: Uuid,
    room: String,
    session_id: String,
    user_name: Option<String>,
    content: String,
    created_at_ms: i64,
}

impl MessageRow {
    fn into_message(self) -> StoredMessage {
        StoredMessage {
            id: self.id,
            room: self.room,
            session_id: self.session_id,
            user: self.user_name,
            content: self.content,
            timestamp: self.created_at_ms,
        }
    }
}

#[async_trait]
impl MessageStore for PgMessageStore {
    async fn append(&self, message: &StoredMessage) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO relay_messages (id, room, session_id, user_name, content, created_at_ms)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(message.id)
        .bind(&message.room)
        .bind(&message.session_id)
        .bind(&message.user)
        .bind(&message.content)
        .bind(message.timestamp)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Newest `limit` rows, returned oldest first.
    async fn recent(&self, room: &str, limit: usize) -> Result<Vec<StoredMessage>, AppError> {
        let rows = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT id, room, session_id, user_name, content, created_at_ms
            FROM (
                SELECT id, room, session_id, user_name, content, created_at_ms
                FROM relay_messages
                WHERE room = $1
                ORDER BY created_at_ms DESC
                LIMIT $2
            ) newest
            ORDER BY created_at_ms ASC
            "#,
        )
        .bind(room)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(MessageRow::into_message).collect())
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}
