//! Cache Module
//!
//! Redis connection management and key naming for the `redis` message
//! store backend.

use redis::aio::ConnectionManager;
use redis::Client;
use tracing::{info, instrument};

use crate::config::RedisSettings;

/// Creates a Redis connection manager with automatic reconnection.
///
/// # Errors
/// Returns `redis::RedisError` if the URL is invalid or the first
/// connection fails.
#[instrument(skip(settings), fields(url = %settings.url))]
pub async fn create_redis_client(
    settings: &RedisSettings,
) -> Result<ConnectionManager, redis::RedisError> {
    info!("Connecting to Redis...");
    let client = Client::open(settings.url.as_str())?;
    let manager = ConnectionManager::new(client).await?;
    info!("Redis connection established");
    Ok(manager)
}

/// Cache key helpers.
pub mod keys {
    /// Segment for per-room message lists (e.g., "relay:history:general")
    pub const ROOM_HISTORY: &str = "history:";

    /// Generates the history list key of a room
    #[inline]
    pub fn room_history(prefix: &str, room: &str) -> String {
        format!("{}{}{}", prefix, ROOM_HISTORY, room)
    }
}
