//! HTTP Handlers
//!
//! Request handlers for the relay's HTTP endpoints.

pub mod health;
pub mod rooms;
