//! Infrastructure layer for external integrations.
//!
//! This layer implements interfaces defined by the domain layer, providing
//! concrete implementations for data persistence, caching and messaging.
//!
//! # Modules
//!
//! - [`broker`] - Click event transport (Redis Streams and in-memory)
//! - [`cache`] - Caching abstractions (moka, Redis and no-op implementations)
//! - [`persistence`] - PostgreSQL and in-memory repository implementations

pub mod broker;
pub mod cache;
pub mod persistence;
