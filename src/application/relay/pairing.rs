//! Exclusive peer links.
//!
//! A link is stored on both sessions and only ever changed here, under
//! the hub lock, so `A.peer == Some(B)` holds exactly when
//! `B.peer == Some(A)`. Encrypted payloads are forwarded without being
//! inspected.

use super::broadcaster;
use super::error::RelayError;
use super::hub::{Relay, RelayState};
use super::registry::SessionId;
use crate::application::dto::{EncryptedPayload, PeerRequest, ServerMessage};

impl RelayState {
    /// Clear `id`'s link and its mirror. Returns the former peer.
    pub(crate) fn unlink(&mut self, id: &str) -> Option<SessionId> {
        let peer = self.registry.lookup_mut(id)?.peer.take()?;
        if let Some(other) = self.registry.lookup_mut(&peer) {
            if other.peer.as_deref() == Some(id) {
                other.peer = None;
            }
        }
        Some(peer)
    }

    /// Link `a` and `b`, dropping any other link either side had.
    ///
    /// Returns `(displaced, by)` pairs: each displaced session lost its
    /// link to `by`. Both sessions must be registered.
    pub(crate) fn link(&mut self, a: &str, b: &str) -> Vec<(SessionId, SessionId)> {
        let already = self.registry.lookup(a).and_then(|s| s.peer.as_deref()) == Some(b);
        if already {
            return Vec::new();
        }

        let mut displaced = Vec::new();
        for side in [a, b] {
            if let Some(old) = self.unlink(side) {
                if old != a && old != b {
                    displaced.push((old, side.to_string()));
                }
            }
        }

        if let Some(session) = self.registry.lookup_mut(a) {
            session.peer = Some(b.to_string());
        }
        if let Some(session) = self.registry.lookup_mut(b) {
            session.peer = Some(a.to_string());
        }
        displaced
    }

    pub(crate) fn notify_peer_disconnected(&self, recipient: &str, departed: &str) {
        broadcaster::to_session(
            &self.registry,
            recipient,
            &ServerMessage::PeerDisconnected {
                device_id: departed.to_string(),
            },
        );
    }
}

impl Relay {
    /// Forward a pairing offer. Creates no state.
    pub fn request_connect(&self, from: &str, request: PeerRequest) -> Result<(), RelayError> {
        if request.target_id == from {
            return Err(RelayError::Validation("Cannot connect to yourself".into()));
        }

        self.with_state(|state| {
            if state.registry.lookup(from).is_none() {
                return Err(RelayError::UnknownSession(from.to_string()));
            }
            let delivered = broadcaster::to_session(
                &state.registry,
                &request.target_id,
                &ServerMessage::ConnectRequest {
                    from_device_id: from.to_string(),
                    public_key: request.public_key,
                },
            );
            if !delivered {
                return Err(RelayError::TargetUnavailable(request.target_id));
            }
            tracing::debug!(from = %from, to = %request.target_id, "Forwarded connect request");
            Ok(())
        })
    }

    /// Accept an offer and link the two sessions.
    ///
    /// Prior links of either side are torn down first and the displaced
    /// peers get `peer_disconnected`. Returns `Ok(false)` without any
    /// change when the requester is gone.
    pub fn accept_connect(&self, from: &str, request: PeerRequest) -> Result<bool, RelayError> {
        if request.target_id == from {
            return Err(RelayError::Validation("Cannot connect to yourself".into()));
        }

        self.with_state(|state| {
            if state.registry.lookup(from).is_none() {
                return Err(RelayError::UnknownSession(from.to_string()));
            }
            let to = request.target_id.as_str();
            if state.registry.lookup_open(to).is_none() {
                tracing::debug!(from = %from, to = %to, "Dropping accept for unavailable requester");
                return Ok(false);
            }

            for (displaced, by) in state.link(from, to) {
                state.notify_peer_disconnected(&displaced, &by);
            }

            broadcaster::to_session(
                &state.registry,
                to,
                &ServerMessage::ConnectAccepted {
                    from_device_id: from.to_string(),
                    public_key: request.public_key,
                },
            );
            state.publish_gauges();
            tracing::info!(a = %from, b = %to, "Peers linked");
            Ok(true)
        })
    }

    /// Forward an opaque payload to the sender's linked peer.
    ///
    /// Dropped unless the sender is linked to exactly the named target and
    /// that peer is still open. Returns whether it was delivered.
    pub fn relay_to_peer(&self, from: &str, payload: EncryptedPayload) -> bool {
        self.with_state(|state| {
            let peer = state.registry.lookup(from).and_then(|s| s.peer.as_deref());
            if peer != Some(payload.target_id.as_str()) {
                tracing::debug!(from = %from, to = %payload.target_id, "Dropping encrypted message for unlinked target");
                return false;
            }
            broadcaster::to_session(
                &state.registry,
                &payload.target_id,
                &ServerMessage::EncryptedMessage {
                    from_device_id: from.to_string(),
                    content: payload.content,
                    iv: payload.iv,
                    timestamp: payload.timestamp,
                },
            )
        })
    }

    /// Dissolve the sender's link. The former peer gets `peer_disconnected`.
    pub fn disconnect_peer(&self, from: &str) -> Option<SessionId> {
        self.with_state(|state| {
            let former = state.unlink(from)?;
            state.notify_peer_disconnected(&former, from);
            state.publish_gauges();
            tracing::info!(a = %from, b = %former, "Peers unlinked");
            Some(former)
        })
    }
}
