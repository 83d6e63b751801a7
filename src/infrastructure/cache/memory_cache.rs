//! In-process cache backed by moka.

use async_trait::async_trait;
use moka::future::Cache;
use moka::policy::Expiry;
use std::time::{Duration, Instant};
use tracing::debug;

use super::service::{CacheResult, CacheService};
use crate::domain::entities::Link;

#[derive(Clone)]
struct CachedLink {
    link: Link,
    ttl: Duration,
}

/// Expiry policy honoring the TTL passed to each `set` call.
struct PerEntryTtl;

impl Expiry<String, CachedLink> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CachedLink,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CachedLink,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Size-bounded in-memory cache.
///
/// Entries expire after their own TTL; beyond that, moka evicts by its
/// frequency/recency policy once `max_capacity` is reached.
pub struct MemoryCache {
    inner: Cache<String, CachedLink>,
}

impl MemoryCache {
    pub fn new(max_capacity: u64) -> Self {
        let inner = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(PerEntryTtl)
            .build();

        debug!("MemoryCache initialized with max capacity: {}", max_capacity);

        Self { inner }
    }

    /// Applies pending evictions and expirations. Test helper.
    pub async fn sync(&self) {
        self.inner.run_pending_tasks().await;
    }
}

#[async_trait]
impl CacheService for MemoryCache {
    async fn get(&self, code: &str) -> CacheResult<Option<Link>> {
        Ok(self.inner.get(code).await.map(|cached| cached.link))
    }

    async fn set(&self, code: &str, link: &Link, ttl: Duration) -> CacheResult<()> {
        self.inner
            .insert(
                code.to_string(),
                CachedLink {
                    link: link.clone(),
                    ttl,
                },
            )
            .await;
        Ok(())
    }

    async fn invalidate(&self, code: &str) -> CacheResult<()> {
        self.inner.invalidate(code).await;
        Ok(())
    }

    async fn health_check(&self) -> bool {
        true
    }
}
