//! Caching layer for fast redirect lookups.
//!
//! Provides a [`CacheService`] trait with three implementations:
//! - [`MemoryCache`] - In-process moka cache with per-entry TTL
//! - [`RedisCache`] - Shared Redis-backed cache
//! - [`NullCache`] - No-op implementation for testing/disabled caching
//!
//! plus the two helpers the redirect path layers on top of it:
//! - [`NegativeCache`] - Short-TTL memory of unresolvable codes
//! - [`RequestCoalescer`] - Per-key in-flight registry against cache stampedes

mod coalescer;
mod memory_cache;
mod negative_cache;
mod null_cache;
mod redis_cache;
mod service;

pub use coalescer::RequestCoalescer;
pub use memory_cache::MemoryCache;
pub use negative_cache::{NegativeCache, Unresolvable};
pub use null_cache::NullCache;
pub use redis_cache::RedisCache;
pub use service::{CacheError, CacheResult, CacheService};
