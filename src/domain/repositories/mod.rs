//! Repository trait definitions for the domain layer.
//!
//! These traits abstract the two pieces of durable shared state: the link
//! store and the stats store. Concrete implementations live in
//! `crate::infrastructure::persistence`; mocks are generated via `mockall`
//! for unit tests.
//!
//! # Available Repositories
//!
//! - [`LinkRepository`] - Conditional insert, lookup and soft delete of links
//! - [`StatsRepository`] - Atomic click counters and hourly buckets

pub mod link_repository;
pub mod stats_repository;

pub use link_repository::LinkRepository;
pub use stats_repository::StatsRepository;

#[cfg(test)]
pub use link_repository::MockLinkRepository;
#[cfg(test)]
pub use stats_repository::MockStatsRepository;
