//! # Domain Entities
//!
//! Core domain types of the relay.
//!
//! - **Room**: name policy and listing projection
//! - **StoredMessage**: a persisted room message, plus the `MessageStore` trait
//! - **Identity**: verified connection identity, plus the `IdentityProvider` trait
//!
//! Live session state is deliberately absent: sessions exist only inside the
//! relay hub and never outlive their connection.

mod identity;
mod message;
mod room;

pub use identity::{ConnectCredentials, Identity, IdentityProvider};
pub use message::{MessageStore, StoredMessage};
pub use room::{validate_room, RoomSummary, ROOM_NAME_MAX_LEN, ROOM_NAME_MIN_LEN};

#[cfg(test)]
pub use message::MockMessageStore;
