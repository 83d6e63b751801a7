//! Cache service trait and error types.

use async_trait::async_trait;
use std::time::Duration;

use crate::domain::entities::Link;

/// Errors that can occur during cache operations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cache connection error: {0}")]
    ConnectionError(String),

    #[error("Cache operation error: {0}")]
    OperationError(String),
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// TTL-bounded store of `code -> Link` projections in front of the link store.
///
/// The cache is advisory: it may be cold or stale up to the TTL, and it never
/// loads on its own. Read-through is orchestrated by
/// [`crate::application::services::RedirectService`]. Callers treat any error
/// as a miss.
///
/// # Implementations
///
/// - [`crate::infrastructure::cache::MemoryCache`] - In-process moka cache
/// - [`crate::infrastructure::cache::RedisCache`] - Redis-backed cache with TTL support
/// - [`crate::infrastructure::cache::NullCache`] - No-op implementation for disabled caching
#[async_trait]
pub trait CacheService: Send + Sync {
    /// Returns the cached link, `Ok(None)` on miss.
    async fn get(&self, code: &str) -> CacheResult<Option<Link>>;

    /// Stores a projection of `link` under `code` for at most `ttl`.
    async fn set(&self, code: &str, link: &Link, ttl: Duration) -> CacheResult<()>;

    /// Removes a cached entry. Used when a link is deleted or found expired.
    async fn invalidate(&self, code: &str) -> CacheResult<()>;

    /// Checks if the cache backend is healthy.
    async fn health_check(&self) -> bool;
}
