//! # Domain Layer
//!
//! Relay-independent types and the contracts of the relay's external
//! collaborators (identity and persistence).
//!
//! ## Design Principles
//!
//! - No dependencies on infrastructure or presentation layers
//! - Collaborator traits are implemented in the infrastructure layer

pub mod entities;

pub use entities::*;
