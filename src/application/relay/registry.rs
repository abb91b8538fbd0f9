//! Session registry.
//!
//! Sole owner of session records. Rooms and peer links refer to sessions
//! by id only, so a closed connection is never reachable from a stale
//! reference.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::connection::ConnectionHandle;
use super::error::RelayError;

pub type SessionId = String;

/// Server-side state of one connected client.
#[derive(Debug)]
pub struct Session {
    pub id: SessionId,
    pub connection: Arc<ConnectionHandle>,
    /// Current room, if any.
    pub room: Option<String>,
    /// Exclusive peer, if linked. Always mirrored on the peer's session.
    pub peer: Option<SessionId>,
    pub connected_at: DateTime<Utc>,
}

impl Session {
    fn new(id: SessionId, connection: Arc<ConnectionHandle>) -> Self {
        Self {
            id,
            connection,
            room: None,
            peer: None,
            connected_at: Utc::now(),
        }
    }

    /// Whether frames can still be delivered to this session.
    pub fn is_open(&self) -> bool {
        !self.connection.is_closed()
    }
}

#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<SessionId, Session>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new session; rejects an id that is already registered.
    pub fn register(
        &mut self,
        id: SessionId,
        connection: Arc<ConnectionHandle>,
    ) -> Result<&Session, RelayError> {
        use std::collections::hash_map::Entry;

        match self.sessions.entry(id) {
            Entry::Occupied(entry) => Err(RelayError::DuplicateSession(entry.key().clone())),
            Entry::Vacant(entry) => {
                let id = entry.key().clone();
                Ok(&*entry.insert(Session::new(id, connection)))
            }
        }
    }

    pub fn lookup(&self, id: &str) -> Option<&Session> {
        self.sessions.get(id)
    }

    pub fn lookup_mut(&mut self, id: &str) -> Option<&mut Session> {
        self.sessions.get_mut(id)
    }

    /// Look up a session whose connection is still open.
    pub fn lookup_open(&self, id: &str) -> Option<&Session> {
        self.sessions.get(id).filter(|s| s.is_open())
    }

    pub fn unregister(&mut self, id: &str) -> Option<Session> {
        self.sessions.remove(id)
    }

    pub fn all(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }

    /// Registered ids, sorted for stable presence listings.
    pub fn ids(&self) -> Vec<SessionId> {
        let mut ids: Vec<_> = self.sessions.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
