//! Application Layer
//!
//! The relay core and the wire messages it exchanges with clients.
//! This layer sits between the WebSocket transport in the presentation
//! layer and the storage collaborators in infrastructure.

pub mod dto;
pub mod relay;
