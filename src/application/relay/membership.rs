//! Room operations on the hub.
//!
//! `Session::room` and the directory's member sets change together here,
//! under one lock, so a session is listed in exactly the room it records.

use super::broadcaster;
use super::error::RelayError;
use super::hub::Relay;
use crate::application::dto::ServerMessage;
use crate::domain::{validate_room, StoredMessage};

impl Relay {
    /// Move a session into `room`.
    ///
    /// The old room (if any) gets `user_left`, the new room (joiner
    /// included) gets `user_joined`. Returns `Ok(false)` when the session
    /// was already there.
    pub fn join_room(&self, id: &str, room: &str) -> Result<bool, RelayError> {
        if !validate_room(room) {
            return Err(RelayError::InvalidRoomName);
        }

        self.with_state(|state| {
            if !state.rooms.contains(room) {
                return Err(RelayError::RoomNotFound(room.to_string()));
            }
            let session = state
                .registry
                .lookup_mut(id)
                .ok_or_else(|| RelayError::UnknownSession(id.to_string()))?;
            if session.room.as_deref() == Some(room) {
                return Ok(false);
            }
            let previous = session.room.replace(room.to_string());

            if let Some(old) = previous.as_deref() {
                state.rooms.remove_member(old, id);
                broadcaster::to_room(
                    &state.registry,
                    &state.rooms,
                    old,
                    &ServerMessage::UserLeft {
                        room: old.to_string(),
                        session_id: id.to_string(),
                    },
                    None,
                );
            }

            state.rooms.add_member(room, id)?;
            broadcaster::to_room(
                &state.registry,
                &state.rooms,
                room,
                &ServerMessage::UserJoined {
                    room: room.to_string(),
                    session_id: id.to_string(),
                },
                None,
            );

            tracing::debug!(session_id = %id, room = %room, from = ?previous, "Joined room");
            Ok(true)
        })
    }

    /// Take a session out of its room. With `announce`, the remaining
    /// members get `user_left`. Returns the room left.
    pub fn leave_room(&self, id: &str, announce: bool) -> Option<String> {
        self.with_state(|state| {
            let room = state.registry.lookup_mut(id)?.room.take()?;
            state.rooms.remove_member(&room, id);
            if announce {
                broadcaster::to_room(
                    &state.registry,
                    &state.rooms,
                    &room,
                    &ServerMessage::UserLeft {
                        room: room.clone(),
                        session_id: id.to_string(),
                    },
                    None,
                );
            }
            Some(room)
        })
    }

    /// Create a room. Everyone gets the new `room_list` when a room was
    /// actually inserted; creating an existing room is a no-op.
    pub fn create_room(&self, room: &str) -> Result<bool, RelayError> {
        self.with_state(|state| {
            let created = state.rooms.create(room)?;
            if created {
                broadcaster::to_all(
                    &state.registry,
                    &ServerMessage::RoomList {
                        rooms: state.rooms.list(),
                    },
                );
                state.publish_gauges();
                tracing::info!(room = %room, rooms = state.rooms.len(), "Room created");
            }
            Ok(created)
        })
    }

    /// Sorted room names.
    pub fn list_rooms(&self) -> Vec<String> {
        self.with_state(|state| state.rooms.list())
    }

    /// Broadcast an already validated message to every member of `room`,
    /// sender included. The sender must be a member.
    ///
    /// Returns the record to persist.
    pub fn post_message(
        &self,
        id: &str,
        room: &str,
        content: &str,
        user: Option<String>,
    ) -> Result<StoredMessage, RelayError> {
        self.with_state(|state| {
            if !state.rooms.contains(room) {
                return Err(RelayError::RoomNotFound(room.to_string()));
            }
            if !state.rooms.is_member(room, id) {
                return Err(RelayError::NotInRoom(room.to_string()));
            }

            let record = StoredMessage::new(room, id, user, content);
            let delivered = broadcaster::to_room(
                &state.registry,
                &state.rooms,
                room,
                &ServerMessage::Message {
                    room: record.room.clone(),
                    content: record.content.clone(),
                    session_id: record.session_id.clone(),
                    user: record.user.clone(),
                    timestamp: record.timestamp,
                },
                None,
            );
            tracing::trace!(session_id = %id, room = %room, delivered, "Room message");
            Ok(record)
        })
    }
}
