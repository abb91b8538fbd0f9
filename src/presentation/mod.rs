//! Presentation Layer
//!
//! HTTP routes, middleware, and the WebSocket endpoint.

pub mod http;
pub mod websocket;
pub mod middleware;
