//! Message Storage
//!
//! `MessageStore` backends, selected by `storage.backend`.

mod memory;
mod postgres;
mod redis_store;

pub use memory::MemoryMessageStore;
pub use postgres::PgMessageStore;
pub use redis_store::RedisMessageStore;

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::{Settings, StorageBackend};
use crate::domain::MessageStore;
use crate::infrastructure::{cache, database};

/// Connect the configured backend. `None` disables persistence.
pub async fn connect(settings: &Settings) -> Result<Option<Arc<dyn MessageStore>>> {
    let retention = settings.storage.retention;

    let store: Arc<dyn MessageStore> = match settings.storage.backend {
        StorageBackend::None => {
            tracing::info!("Message persistence disabled");
            return Ok(None);
        }
        StorageBackend::Memory => Arc::new(MemoryMessageStore::new(retention)),
        StorageBackend::Redis => {
            let redis = settings
                .redis
                .as_ref()
                .context("redis settings missing for the redis storage backend")?;
            let conn = cache::create_redis_client(redis).await?;
            Arc::new(RedisMessageStore::new(conn, redis.key_prefix.clone(), retention))
        }
        StorageBackend::Postgres => {
            let db = settings
                .database
                .as_ref()
                .context("database settings missing for the postgres storage backend")?;
            let pool = database::create_pool(db).await?;
            tracing::info!("Database connection pool created");
            database::run_migrations(&pool).await?;
            tracing::info!("Database migrations applied");
            Arc::new(PgMessageStore::new(pool))
        }
    };

    tracing::info!(backend = store.backend(), retention, "Message store ready");
    Ok(Some(store))
}
