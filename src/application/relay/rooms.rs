//! Room directory.
//!
//! Membership sets keyed by room name, with bounded creation. The
//! directory only tracks ids; keeping `Session::room` in step is the
//! hub's job, done under the same lock.

use std::collections::{HashMap, HashSet};

use super::error::RelayError;
use super::registry::SessionId;
use crate::domain::{validate_room, RoomSummary};

#[derive(Debug)]
pub struct RoomDirectory {
    rooms: HashMap<String, HashSet<SessionId>>,
    max_rooms: usize,
}

impl RoomDirectory {
    pub fn new(max_rooms: usize) -> Self {
        Self {
            rooms: HashMap::new(),
            max_rooms,
        }
    }

    /// Directory pre-populated with `defaults`. Invalid names are skipped
    /// and defaults count against the limit like any other room.
    pub fn with_defaults<I, S>(max_rooms: usize, defaults: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut directory = Self::new(max_rooms);
        for name in defaults {
            let name = name.into();
            if let Err(e) = directory.create(&name) {
                tracing::warn!(room = %name, error = %e, "Skipping default room");
            }
        }
        directory
    }

    /// Create a room if absent.
    ///
    /// Returns `Ok(true)` when a room was inserted and `Ok(false)` when it
    /// already existed. The limit is checked first, so even an existing
    /// room is refused once the directory is full.
    pub fn create(&mut self, name: &str) -> Result<bool, RelayError> {
        if self.rooms.len() >= self.max_rooms {
            return Err(RelayError::RoomLimitExceeded {
                max: self.max_rooms,
            });
        }
        if !validate_room(name) {
            return Err(RelayError::InvalidRoomName);
        }
        if self.rooms.contains_key(name) {
            tracing::debug!(room = %name, "Room already exists");
            return Ok(false);
        }
        self.rooms.insert(name.to_string(), HashSet::new());
        Ok(true)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.rooms.contains_key(name)
    }

    /// Add a member to an existing room.
    pub fn add_member(&mut self, name: &str, session_id: &str) -> Result<(), RelayError> {
        match self.rooms.get_mut(name) {
            Some(members) => {
                members.insert(session_id.to_string());
                Ok(())
            }
            None => Err(RelayError::RoomNotFound(name.to_string())),
        }
    }

    /// Remove a member. Returns whether it was present.
    pub fn remove_member(&mut self, name: &str, session_id: &str) -> bool {
        self.rooms
            .get_mut(name)
            .map(|members| members.remove(session_id))
            .unwrap_or(false)
    }

    pub fn members(&self, name: &str) -> Option<&HashSet<SessionId>> {
        self.rooms.get(name)
    }

    pub fn is_member(&self, name: &str, session_id: &str) -> bool {
        self.rooms
            .get(name)
            .map(|members| members.contains(session_id))
            .unwrap_or(false)
    }

    /// Room names, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<_> = self.rooms.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn summaries(&self) -> Vec<RoomSummary> {
        let mut summaries: Vec<_> = self
            .rooms
            .iter()
            .map(|(name, members)| RoomSummary {
                name: name.clone(),
                member_count: members.len(),
            })
            .collect();
        summaries.sort_by(|a, b| a.name.cmp(&b.name));
        summaries
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}
