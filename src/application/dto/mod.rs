//! Data Transfer Objects
//!
//! Wire messages of the relay protocol: JSON text frames tagged by `type`.

pub mod inbound;
pub mod outbound;

pub use inbound::{ChatMessage, ClientMessage, EncryptedPayload, PeerRequest, RoomRequest};
pub use outbound::{ServerMessage, UserEntry};
