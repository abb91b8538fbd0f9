//! WebSocket Transport
//!
//! Upgrade endpoint bridging sockets to the relay.

pub mod handler;

pub use handler::ws_handler;
