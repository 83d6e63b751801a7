//! Shared application state and core wiring.
//!
//! [`AppState`] is the facade the service boundaries call into: link
//! creation, redirect resolution, stats reads and administrative deletes.

use anyhow::{Context, Result};
use chrono::{DateTime, TimeDelta, Utc};
use std::sync::Arc;
use std::time::Duration;

use crate::application::services::{
    EventPublisher, LinkService, RedirectService, RedirectSettings, StatsService,
};
use crate::config::{BrokerBackend, CacheBackend, Config};
use crate::domain::entities::{HourlyClicks, Link, StatsRecord};
use crate::domain::repositories::{LinkRepository, StatsRepository};
use crate::error::AppError;
use crate::infrastructure::broker::{MemoryBroker, MessageBroker, RedisStreamBroker};
use crate::infrastructure::cache::{CacheService, MemoryCache, NegativeCache, NullCache, RedisCache};
use crate::utils::code_generator::CodeGenerator;

/// Typed settings for [`AppState::new`].
#[derive(Debug, Clone)]
pub struct CoreSettings {
    pub generator: CodeGenerator,
    pub default_link_ttl: Option<TimeDelta>,
    pub redirect: RedirectSettings,
    /// `None` disables the negative cache.
    pub negative_cache_ttl: Option<Duration>,
    pub negative_cache_capacity: u64,
    pub enqueue_timeout: Duration,
}

impl Default for CoreSettings {
    fn default() -> Self {
        Self {
            generator: CodeGenerator::default(),
            default_link_ttl: None,
            redirect: RedirectSettings::default(),
            negative_cache_ttl: Some(Duration::from_secs(5)),
            negative_cache_capacity: 100_000,
            enqueue_timeout: Duration::from_millis(50),
        }
    }
}

impl CoreSettings {
    /// Derives the settings from a validated [`Config`].
    ///
    /// # Errors
    ///
    /// Returns an error if the code generator settings are invalid.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            generator: config.code_generator()?,
            default_link_ttl: config.default_link_ttl(),
            redirect: config.redirect_settings(),
            negative_cache_ttl: config.negative_cache_ttl(),
            negative_cache_capacity: config.cache_capacity,
            enqueue_timeout: config.enqueue_timeout(),
        })
    }
}

/// Shared application state, cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub links: Arc<LinkService<dyn LinkRepository>>,
    pub redirects: Arc<RedirectService<dyn LinkRepository>>,
    pub stats: Arc<StatsService<dyn StatsRepository>>,
    pub publisher: Arc<EventPublisher>,
}

impl AppState {
    /// Wires the core services over the given stores, cache and broker.
    pub fn new(
        link_repository: Arc<dyn LinkRepository>,
        stats_repository: Arc<dyn StatsRepository>,
        cache: Arc<dyn CacheService>,
        broker: Arc<dyn MessageBroker>,
        settings: CoreSettings,
    ) -> Self {
        let publisher = Arc::new(EventPublisher::new(broker, settings.enqueue_timeout));
        let negative = settings
            .negative_cache_ttl
            .map(|ttl| Arc::new(NegativeCache::new(settings.negative_cache_capacity, ttl)));

        let links = Arc::new(LinkService::new(
            Arc::clone(&link_repository),
            settings.generator,
            settings.default_link_ttl,
        ));
        let redirects = Arc::new(RedirectService::new(
            link_repository,
            cache,
            negative,
            Arc::clone(&publisher),
            settings.redirect,
        ));
        let stats = Arc::new(StatsService::new(stats_repository));

        Self {
            links,
            redirects,
            stats,
            publisher,
        }
    }

    /// Creates a link under a generated code and primes the cache with it.
    pub async fn create_link(
        &self,
        target_url: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<Link, AppError> {
        let link = self.links.create_link(target_url, expires_at).await?;
        self.redirects.warm(&link).await;
        Ok(link)
    }

    /// Creates a link under a caller-chosen code and primes the cache with it.
    pub async fn create_custom_link(
        &self,
        code: &str,
        target_url: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<Link, AppError> {
        let link = self
            .links
            .create_custom_link(code, target_url, expires_at)
            .await?;
        self.redirects.warm(&link).await;
        Ok(link)
    }

    /// Resolves a code for a redirect and records the click.
    pub async fn redirect_link(&self, code: &str) -> Result<String, AppError> {
        self.redirects.resolve(code).await
    }

    pub async fn link_stats(&self, code: &str) -> Result<Option<StatsRecord>, AppError> {
        self.stats.get_stats(code).await
    }

    pub async fn hourly_clicks(
        &self,
        code: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<HourlyClicks>, AppError> {
        self.stats.hourly_clicks(code, from, to).await
    }

    /// Soft-deletes a link and evicts it from the local caches.
    ///
    /// Other nodes' in-process caches keep serving it until their TTL runs out.
    pub async fn delete_link(&self, code: &str) -> Result<bool, AppError> {
        let deleted = self.links.delete_link(code).await?;
        self.redirects.evict(code).await;
        Ok(deleted)
    }
}

/// Builds the cache selected by `CACHE_BACKEND`.
///
/// An unreachable Redis degrades to [`NullCache`], as the cache is advisory.
pub async fn build_cache(config: &Config) -> Arc<dyn CacheService> {
    match (config.cache_backend, config.redis_url.as_deref()) {
        (CacheBackend::Memory, _) => {
            tracing::info!("Cache enabled (memory, capacity {})", config.cache_capacity);
            Arc::new(MemoryCache::new(config.cache_capacity))
        }
        (CacheBackend::Redis, Some(redis_url)) => match RedisCache::connect(redis_url).await {
            Ok(redis) => {
                tracing::info!("Cache enabled (Redis)");
                Arc::new(redis)
            }
            Err(e) => {
                tracing::warn!("Failed to connect to Redis: {}. Using NullCache.", e);
                Arc::new(NullCache::new())
            }
        },
        (CacheBackend::Redis, None) | (CacheBackend::None, _) => {
            tracing::info!("Cache disabled (NullCache)");
            Arc::new(NullCache::new())
        }
    }
}

/// Builds the broker selected by `BROKER_BACKEND`.
///
/// # Errors
///
/// Returns an error if the Redis broker is selected but cannot be reached.
pub async fn build_broker(config: &Config) -> Result<Arc<dyn MessageBroker>> {
    match config.broker_backend {
        BrokerBackend::Memory => {
            tracing::info!(
                "Broker: in-memory (capacity {})",
                config.broker_queue_capacity
            );
            Ok(Arc::new(MemoryBroker::new(config.broker_queue_capacity)))
        }
        BrokerBackend::Redis => {
            let redis_url = config
                .redis_url
                .as_deref()
                .context("REDIS_URL must be set for the redis broker")?;
            let broker = RedisStreamBroker::connect(redis_url, config.stream_settings())
                .await
                .context("Failed to connect to the Redis stream broker")?;
            Ok(Arc::new(broker))
        }
    }
}
