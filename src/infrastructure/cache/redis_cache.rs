//! Redis-backed cache implementation.

use super::service::{CacheError, CacheResult, CacheService};
use crate::domain::entities::Link;
use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Redis cache implementation for fast link lookups.
///
/// Links are stored as JSON under `link:<code>` with `SET EX`. All operations
/// are fail-open: errors are logged and reported as misses or successes so a
/// Redis outage only costs latency.
pub struct RedisCache {
    client: ConnectionManager,
    key_prefix: String,
}

impl RedisCache {
    /// Connects to Redis and validates the connection with a PING.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::ConnectionError`] if the URL is invalid, the connection cannot
    /// be established, or the PING health check fails.
    pub async fn connect(redis_url: &str) -> CacheResult<Self> {
        info!("Connecting to Redis cache");

        let client = Client::open(redis_url).map_err(|e| {
            CacheError::ConnectionError(format!("Failed to create Redis client: {}", e))
        })?;

        let manager = ConnectionManager::new(client).await.map_err(|e| {
            CacheError::ConnectionError(format!("Failed to connect to Redis: {}", e))
        })?;

        let mut test_conn = manager.clone();
        test_conn
            .ping::<()>()
            .await
            .map_err(|e| CacheError::ConnectionError(format!("Redis PING failed: {}", e)))?;

        info!("✓ Connected to Redis cache");

        Ok(Self {
            client: manager,
            key_prefix: "link:".to_string(),
        })
    }

    /// Constructs the full Redis key with namespace prefix.
    fn build_key(&self, code: &str) -> String {
        format!("{}{}", self.key_prefix, code)
    }
}

/// Redis `EX` takes whole seconds; sub-second TTLs round up to one.
fn ttl_seconds(ttl: Duration) -> u64 {
    ttl.as_secs_f64().ceil().max(1.0) as u64
}

#[async_trait]
impl CacheService for RedisCache {
    async fn get(&self, code: &str) -> CacheResult<Option<Link>> {
        let key = self.build_key(code);
        let mut conn = self.client.clone();

        match conn.get::<_, Option<String>>(&key).await {
            Ok(Some(raw)) => match serde_json::from_str::<Link>(&raw) {
                Ok(link) => {
                    debug!("Cache HIT: {}", code);
                    Ok(Some(link))
                }
                Err(e) => {
                    warn!("Discarding undecodable cache entry for {}: {}", code, e);
                    Ok(None)
                }
            },
            Ok(None) => {
                debug!("Cache MISS: {}", code);
                Ok(None)
            }
            Err(e) => {
                error!("Redis GET error for {}: {}", code, e);
                Ok(None)
            }
        }
    }

    async fn set(&self, code: &str, link: &Link, ttl: Duration) -> CacheResult<()> {
        let key = self.build_key(code);
        let value = serde_json::to_string(link)
            .map_err(|e| CacheError::OperationError(format!("Failed to encode link: {}", e)))?;
        let mut conn = self.client.clone();
        let seconds = ttl_seconds(ttl);

        match conn.set_ex::<_, _, ()>(&key, value, seconds).await {
            Ok(_) => {
                debug!("Cache SET: {} (TTL: {}s)", code, seconds);
                Ok(())
            }
            Err(e) => {
                warn!("Redis SET error for {}: {}", code, e);
                Ok(())
            }
        }
    }

    async fn invalidate(&self, code: &str) -> CacheResult<()> {
        let key = self.build_key(code);
        let mut conn = self.client.clone();

        match conn.del::<_, i32>(&key).await {
            Ok(deleted) => {
                if deleted > 0 {
                    debug!("Cache INVALIDATE: {}", code);
                }
                Ok(())
            }
            Err(e) => {
                warn!("Redis DEL error for {}: {}", code, e);
                Ok(())
            }
        }
    }

    async fn health_check(&self) -> bool {
        let mut conn = self.client.clone();
        conn.ping::<()>().await.is_ok()
    }
}
