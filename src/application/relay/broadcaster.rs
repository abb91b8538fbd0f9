//! Fan-out sends.
//!
//! Every function serializes the message once and enqueues it on each
//! recipient's connection. Recipients whose connection already closed
//! are skipped; a failed enqueue is never an error.

use super::connection::ConnectionHandle;
use super::registry::SessionRegistry;
use super::rooms::RoomDirectory;
use crate::application::dto::ServerMessage;

/// Send to every open member of `room`, optionally skipping one session.
/// Returns the number of deliveries.
pub fn to_room(
    registry: &SessionRegistry,
    rooms: &RoomDirectory,
    room: &str,
    message: &ServerMessage,
    except: Option<&str>,
) -> usize {
    let Some(members) = rooms.members(room) else {
        return 0;
    };
    if members.is_empty() {
        return 0;
    }
    let Some(text) = message.encode() else {
        return 0;
    };

    members
        .iter()
        .filter(|id| Some(id.as_str()) != except)
        .filter_map(|id| registry.lookup_open(id))
        .filter(|session| session.connection.send_text(text.clone()))
        .count()
}

/// Send to every open session.
pub fn to_all(registry: &SessionRegistry, message: &ServerMessage) -> usize {
    if registry.is_empty() {
        return 0;
    }
    let Some(text) = message.encode() else {
        return 0;
    };

    let delivered = registry
        .all()
        .filter(|session| session.is_open())
        .filter(|session| session.connection.send_text(text.clone()))
        .count();
    tracing::trace!(delivered, "Broadcast to all sessions");
    delivered
}

/// Direct send. Returns `false` if the session is unknown or closed.
pub fn to_session(registry: &SessionRegistry, session_id: &str, message: &ServerMessage) -> bool {
    let Some(session) = registry.lookup_open(session_id) else {
        return false;
    };
    match message.encode() {
        Some(text) => session.connection.send_text(text),
        None => false,
    }
}

/// Send on a connection that is no longer (or not yet) in the registry.
pub fn send_direct(connection: &ConnectionHandle, message: &ServerMessage) -> bool {
    match message.encode() {
        Some(text) => connection.send_text(text),
        None => false,
    }
}
