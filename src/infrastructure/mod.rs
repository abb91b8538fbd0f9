//! Infrastructure Layer
//!
//! Implementations of the relay's collaborators:
//! - Message stores (memory, Redis, PostgreSQL)
//! - Identity providers (device id, JWT)
//! - Prometheus metrics

pub mod cache;
pub mod database;
pub mod identity;
pub mod metrics;
pub mod storage;
