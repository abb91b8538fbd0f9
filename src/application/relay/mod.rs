//! Relay core.
//!
//! Session registry, room directory, peer pairing, liveness and routing.
//! All shared state sits behind the [`Relay`] hub; connection tasks only
//! hold a [`ConnectionHandle`] and their session id.

pub mod broadcaster;
pub mod connection;
pub mod error;
pub mod hub;
pub mod liveness;
mod membership;
mod pairing;
pub mod registry;
pub mod rooms;
pub mod router;

pub use connection::{ConnectionHandle, Outbound};
pub use error::RelayError;
pub use hub::{ConnectOutcome, Relay, RelayConfig};
pub use liveness::LivenessMonitor;
pub use registry::{Session, SessionId, SessionRegistry};
pub use rooms::RoomDirectory;
pub use router::MessageRouter;
