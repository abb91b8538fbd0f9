//! Relay hub.
//!
//! Owns the session registry and room directory behind one lock. Every
//! public operation takes the lock once, mutates synchronously, enqueues
//! its sends and returns; nothing awaits while the lock is held, so a
//! frame's effects are observed all at once or not at all.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::broadcaster;
use super::connection::ConnectionHandle;
use super::error::RelayError;
use super::registry::{Session, SessionId, SessionRegistry};
use super::rooms::RoomDirectory;
use crate::application::dto::{ServerMessage, UserEntry};
use crate::domain::{RoomSummary, StoredMessage};
use crate::infrastructure::metrics;

/// Tunables of the relay core.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Upper bound on the number of rooms, default rooms included.
    pub max_rooms: usize,
    /// Longest accepted room message, in characters after trimming.
    pub max_content_chars: usize,
    /// Largest accepted inbound text frame, in bytes.
    pub max_frame_bytes: usize,
    pub heartbeat_interval: Duration,
    pub default_rooms: Vec<String>,
    /// Room every new session joins, when it exists.
    pub auto_join_room: Option<String>,
    /// Number of stored messages replayed on connect or join.
    pub history_limit: usize,
    /// Store reads for history give up after this long.
    pub history_timeout: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            max_rooms: 50,
            max_content_chars: 1000,
            max_frame_bytes: 16 * 1024,
            heartbeat_interval: Duration::from_secs(30),
            default_rooms: vec!["general".into(), "random".into(), "support".into()],
            auto_join_room: None,
            history_limit: 50,
            history_timeout: Duration::from_secs(2),
        }
    }
}

/// What [`Relay::connect`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectOutcome {
    /// An earlier connection with the same session id was displaced.
    pub replaced: bool,
}

/// Shared relay state. Only reachable through the hub's lock.
#[derive(Debug)]
pub struct RelayState {
    pub(crate) registry: SessionRegistry,
    pub(crate) rooms: RoomDirectory,
}

impl RelayState {
    /// Remove a session and reconcile rooms and peer links.
    ///
    /// Remaining room members get `user_left`, a linked peer gets
    /// `peer_disconnected`. Returns `None` if the session was already gone.
    pub(crate) fn teardown(&mut self, id: &str) -> Option<Session> {
        let former_peer = self.unlink(id);
        let session = self.registry.unregister(id)?;

        if let Some(room) = session.room.as_deref() {
            self.rooms.remove_member(room, id);
            broadcaster::to_room(
                &self.registry,
                &self.rooms,
                room,
                &ServerMessage::UserLeft {
                    room: room.to_string(),
                    session_id: id.to_string(),
                },
                None,
            );
        }
        if let Some(peer) = former_peer {
            self.notify_peer_disconnected(&peer, id);
        }
        Some(session)
    }

    fn user_list(&self) -> ServerMessage {
        let mut users: Vec<_> = self
            .registry
            .all()
            .map(|s| UserEntry {
                id: s.id.clone(),
                room: s.room.clone(),
            })
            .collect();
        users.sort_by(|a, b| a.id.cmp(&b.id));
        ServerMessage::UserList { users }
    }

    pub(crate) fn broadcast_user_list(&self) {
        broadcaster::to_all(&self.registry, &self.user_list());
    }

    fn peer_link_count(&self) -> usize {
        self.registry.all().filter(|s| s.peer.is_some()).count() / 2
    }

    pub(crate) fn publish_gauges(&self) {
        metrics::set_relay_gauges(self.registry.len(), self.rooms.len(), self.peer_link_count());
    }
}

/// The relay coordinator shared by every connection task.
pub struct Relay {
    state: Mutex<RelayState>,
    config: RelayConfig,
}

impl Relay {
    pub fn new(config: RelayConfig) -> Self {
        let rooms = RoomDirectory::with_defaults(config.max_rooms, config.default_rooms.iter().cloned());
        let state = RelayState {
            registry: SessionRegistry::new(),
            rooms,
        };
        state.publish_gauges();
        Self {
            state: Mutex::new(state),
            config,
        }
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Run `f` with exclusive access to the state.
    pub(crate) fn with_state<R>(&self, f: impl FnOnce(&mut RelayState) -> R) -> R {
        let mut state = self.state.lock();
        f(&mut state)
    }

    /// Register a connection under `id`.
    ///
    /// A session already registered under `id` is replaced: it is torn
    /// down like a normal close, told `session_replaced`, and its
    /// connection is closed. The new connection then receives `init`
    /// (with `history` for the auto-join room) and everyone receives the
    /// updated `user_list`.
    pub fn connect(
        &self,
        id: &str,
        connection: Arc<ConnectionHandle>,
        history: Vec<StoredMessage>,
    ) -> Result<ConnectOutcome, RelayError> {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let replaced = match state.teardown(id) {
            Some(previous) => {
                broadcaster::send_direct(
                    &previous.connection,
                    &ServerMessage::SessionReplaced {
                        message: "Session replaced by a new connection".into(),
                    },
                );
                previous.connection.close();
                metrics::record_session_replaced();
                tracing::info!(session_id = %id, "Session replaced by a new connection");
                true
            }
            None => false,
        };

        state.registry.register(id.to_string(), connection)?;

        let room = self
            .config
            .auto_join_room
            .as_deref()
            .filter(|room| state.rooms.contains(room))
            .map(str::to_string);
        if let Some(room) = room.as_deref() {
            state.rooms.add_member(room, id)?;
            if let Some(session) = state.registry.lookup_mut(id) {
                session.room = Some(room.to_string());
            }
            broadcaster::to_room(
                &state.registry,
                &state.rooms,
                room,
                &ServerMessage::UserJoined {
                    room: room.to_string(),
                    session_id: id.to_string(),
                },
                Some(id),
            );
        }

        let online = state
            .registry
            .ids()
            .into_iter()
            .filter(|other| other != id)
            .collect();
        let init = ServerMessage::Init {
            session_id: id.to_string(),
            online,
            rooms: state.rooms.list(),
            history: if room.is_some() { history } else { Vec::new() },
            room,
        };
        broadcaster::to_session(&state.registry, id, &init);

        state.broadcast_user_list();
        state.publish_gauges();

        tracing::info!(session_id = %id, sessions = state.registry.len(), "Session connected");
        Ok(ConnectOutcome { replaced })
    }

    /// Tear down the session `id` if it is still bound to `connection_id`.
    ///
    /// Idempotent, and a close arriving from a connection that was
    /// already replaced leaves the new session alone. Returns whether a
    /// session was removed.
    pub fn disconnect(&self, id: &str, connection_id: u64) -> bool {
        let mut state = self.state.lock();
        let bound = state
            .registry
            .lookup(id)
            .map(|s| s.connection.id() == connection_id)
            .unwrap_or(false);
        if !bound {
            return false;
        }

        let removed = state.teardown(id).is_some();
        if removed {
            state.broadcast_user_list();
            state.publish_gauges();
            tracing::info!(session_id = %id, sessions = state.registry.len(), "Session disconnected");
        }
        removed
    }

    /// One heartbeat tick over every session.
    ///
    /// Sessions that did not acknowledge the previous probe are closed
    /// and torn down; all others are marked pending and probed again.
    /// Returns the evicted ids.
    pub fn sweep(&self) -> Vec<SessionId> {
        let mut state = self.state.lock();

        let mut stale = Vec::new();
        for session in state.registry.all() {
            if session.connection.check_alive() {
                session.connection.ping();
            } else {
                stale.push(session.id.clone());
            }
        }

        for id in &stale {
            if let Some(session) = state.teardown(id) {
                session.connection.close();
                metrics::record_eviction();
                tracing::warn!(
                    session_id = %id,
                    last_seen_ms = session.connection.last_seen_elapsed().as_millis() as u64,
                    "Evicting unresponsive session"
                );
            }
        }

        if !stale.is_empty() {
            state.broadcast_user_list();
            state.publish_gauges();
        }
        stale
    }

    pub fn session_count(&self) -> usize {
        self.state.lock().registry.len()
    }

    pub fn is_connected(&self, id: &str) -> bool {
        self.state.lock().registry.lookup(id).is_some()
    }

    pub fn room_of(&self, id: &str) -> Option<String> {
        self.state.lock().registry.lookup(id).and_then(|s| s.room.clone())
    }

    pub fn peer_of(&self, id: &str) -> Option<SessionId> {
        self.state.lock().registry.lookup(id).and_then(|s| s.peer.clone())
    }

    pub fn room_count(&self) -> usize {
        self.state.lock().rooms.len()
    }

    /// Sorted member ids of a room; `None` if the room does not exist.
    pub fn room_members(&self, room: &str) -> Option<Vec<SessionId>> {
        let state = self.state.lock();
        state.rooms.members(room).map(|members| {
            let mut ids: Vec<_> = members.iter().cloned().collect();
            ids.sort();
            ids
        })
    }

    pub fn room_summaries(&self) -> Vec<RoomSummary> {
        self.state.lock().rooms.summaries()
    }

    /// Check the membership and pairing invariants.
    ///
    /// Returns a description of every violation; empty when consistent.
    pub fn consistency_violations(&self) -> Vec<String> {
        let state = self.state.lock();
        let mut violations = Vec::new();

        for session in state.registry.all() {
            if let Some(room) = session.room.as_deref() {
                if !state.rooms.is_member(room, &session.id) {
                    violations.push(format!("{} has room {} but is not a member", session.id, room));
                }
            }
            if let Some(peer) = session.peer.as_deref() {
                let mirrored = state
                    .registry
                    .lookup(peer)
                    .and_then(|p| p.peer.as_deref())
                    == Some(session.id.as_str());
                if !mirrored {
                    violations.push(format!("{} -> {} is not mirrored", session.id, peer));
                }
            }
        }

        for room in state.rooms.list() {
            for member in state.rooms.members(&room).into_iter().flatten() {
                let current = state.registry.lookup(member).and_then(|s| s.room.as_deref());
                if current != Some(room.as_str()) {
                    violations.push(format!("{} listed in {} but its room is {:?}", member, room, current));
                }
            }
        }
        violations
    }
}
