//! In-process message store.

use std::collections::VecDeque;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::domain::{MessageStore, StoredMessage};
use crate::shared::error::AppError;

/// Bounded per-room ring of recent messages. Lost on restart.
pub struct MemoryMessageStore {
    rooms: DashMap<String, VecDeque<StoredMessage>>,
    retention: usize,
}

impl MemoryMessageStore {
    pub fn new(retention: usize) -> Self {
        Self {
            rooms: DashMap::new(),
            retention: retention.max(1),
        }
    }
}

#[async_trait]
impl MessageStore for MemoryMessageStore {
    async fn append(&self, message: &StoredMessage) -> Result<(), AppError> {
        let mut ring = self.rooms.entry(message.room.clone()).or_default();
        if ring.len() == self.retention {
            ring.pop_front();
        }
        ring.push_back(message.clone());
        Ok(())
    }

    async fn recent(&self, room: &str, limit: usize) -> Result<Vec<StoredMessage>, AppError> {
        let Some(ring) = self.rooms.get(room) else {
            return Ok(Vec::new());
        };
        let skip = ring.len().saturating_sub(limit);
        Ok(ring.iter().skip(skip).cloned().collect())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
