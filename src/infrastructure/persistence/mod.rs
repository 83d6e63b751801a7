//! Link and stats store implementations.
//!
//! PostgreSQL repositories use runtime-checked SQLx queries; the in-memory
//! repositories give the same atomicity guarantees within one process.
//!
//! # Repositories
//!
//! - [`PgLinkRepository`] / [`MemoryLinkRepository`] - Link storage
//! - [`PgStatsRepository`] / [`MemoryStatsRepository`] - Click counters

pub mod memory_link_repository;
pub mod memory_stats_repository;
pub mod pg_link_repository;
pub mod pg_stats_repository;

pub use memory_link_repository::MemoryLinkRepository;
pub use memory_stats_repository::MemoryStatsRepository;
pub use pg_link_repository::PgLinkRepository;
pub use pg_stats_repository::PgStatsRepository;
