//! # Relay Server Library
//!
//! This crate provides a real-time WebSocket relay with:
//! - Named broadcast rooms with presence and message history
//! - One-to-one peer pairing for end-to-end encrypted payloads
//! - Heartbeat liveness monitoring
//! - Pluggable identity (device id or JWT) and storage (memory, Redis, PostgreSQL)
//!
//! ## Architecture
//!
//! The crate follows Clean Architecture principles:
//!
//! - **Domain Layer**: Room name policy, stored messages, collaborator traits
//! - **Application Layer**: The relay hub, message router, and wire DTOs
//! - **Infrastructure Layer**: Identity providers, message stores, metrics
//! - **Presentation Layer**: HTTP routes, middleware, and the WebSocket endpoint
//!
//! ## Module Structure
//!
//! ```text
//! relay_server/
//! +-- config/         Configuration management
//! +-- domain/         Domain entities and collaborator traits
//! +-- application/    Relay hub, router, and DTOs
//! +-- infrastructure/ Storage, identity, and metrics implementations
//! +-- presentation/   HTTP routes and WebSocket handler
//! +-- shared/         Common utilities (errors, validation)
//! ```

// Configuration module
pub mod config;

// Domain layer - Core types and collaborator contracts
pub mod domain;

// Application layer - Relay core
pub mod application;

// Infrastructure layer - External implementations
pub mod infrastructure;

// Presentation layer - HTTP and WebSocket handlers
pub mod presentation;

// Shared utilities
pub mod shared;

// Application startup and state management
pub mod startup;

// Telemetry and observability
pub mod telemetry;
