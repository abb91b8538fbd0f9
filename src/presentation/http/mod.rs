//! HTTP Surface
//!
//! Routes, probes, and the room listing API.

pub mod handlers;
pub mod routes;
