#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;
use url_shortener_core::application::services::{AggregatorSettings, StatsAggregator};
use url_shortener_core::domain::entities::{HourlyClicks, Link, NewLink, StatsRecord};
use url_shortener_core::domain::repositories::{LinkRepository, StatsRepository};
use url_shortener_core::error::AppError;
use url_shortener_core::infrastructure::broker::MemoryBroker;
use url_shortener_core::infrastructure::cache::{CacheResult, CacheService, MemoryCache};
use url_shortener_core::infrastructure::persistence::{MemoryLinkRepository, MemoryStatsRepository};
use url_shortener_core::state::{AppState, CoreSettings};

/// Link store that counts reads and can slow them down.
#[derive(Default)]
pub struct CountingLinkRepository {
    pub inner: MemoryLinkRepository,
    reads: AtomicUsize,
    read_delay: Duration,
}

impl CountingLinkRepository {
    pub fn with_delay(read_delay: Duration) -> Self {
        Self {
            read_delay,
            ..Self::default()
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LinkRepository for CountingLinkRepository {
    async fn create(&self, new_link: NewLink) -> Result<Link, AppError> {
        self.inner.create(new_link).await
    }

    async fn get(&self, code: &str) -> Result<Link, AppError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if !self.read_delay.is_zero() {
            tokio::time::sleep(self.read_delay).await;
        }
        self.inner.get(code).await
    }

    async fn delete(&self, code: &str) -> Result<bool, AppError> {
        self.inner.delete(code).await
    }
}

/// Stats store whose first `failures` writes fail.
#[derive(Default)]
pub struct FlakyStatsRepository {
    pub inner: MemoryStatsRepository,
    failures_left: AtomicU32,
}

impl FlakyStatsRepository {
    pub fn failing(failures: u32) -> Self {
        Self {
            inner: MemoryStatsRepository::new(),
            failures_left: AtomicU32::new(failures),
        }
    }
}

#[async_trait]
impl StatsRepository for FlakyStatsRepository {
    async fn record_click(&self, code: &str, clicked_at: DateTime<Utc>) -> Result<(), AppError> {
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();

        if failing {
            return Err(AppError::StoreUnavailable("stats store down".to_string()));
        }
        self.inner.record_click(code, clicked_at).await
    }

    async fn get(&self, code: &str) -> Result<Option<StatsRecord>, AppError> {
        self.inner.get(code).await
    }

    async fn hourly(
        &self,
        code: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<HourlyClicks>, AppError> {
        self.inner.hourly(code, from, to).await
    }
}

/// Cache backend that accepts calls and never answers them.
pub struct StalledCache;

#[async_trait]
impl CacheService for StalledCache {
    async fn get(&self, _code: &str) -> CacheResult<Option<Link>> {
        std::future::pending().await
    }

    async fn set(&self, _code: &str, _link: &Link, _ttl: Duration) -> CacheResult<()> {
        std::future::pending().await
    }

    async fn invalidate(&self, _code: &str) -> CacheResult<()> {
        std::future::pending().await
    }

    async fn health_check(&self) -> bool {
        false
    }
}

/// The whole core wired over in-memory backends.
pub struct TestCore {
    pub state: AppState,
    pub links: Arc<CountingLinkRepository>,
    pub stats: Arc<MemoryStatsRepository>,
    pub cache: Arc<MemoryCache>,
    pub broker: Arc<MemoryBroker>,
    pub aggregator: StatsAggregator<MemoryStatsRepository>,
}

pub fn aggregator_settings() -> AggregatorSettings {
    AggregatorSettings {
        write_retries: 1,
        max_delivery_attempts: 3,
        receive_wait: Duration::from_millis(20),
        ..AggregatorSettings::default()
    }
}

pub fn test_core(settings: CoreSettings, read_delay: Duration) -> TestCore {
    let links = Arc::new(CountingLinkRepository::with_delay(read_delay));
    let stats = Arc::new(MemoryStatsRepository::new());
    let cache = Arc::new(MemoryCache::new(10_000));
    let broker = Arc::new(MemoryBroker::new(10_000));

    let state = AppState::new(
        links.clone(),
        stats.clone(),
        cache.clone() as Arc<dyn CacheService>,
        broker.clone(),
        settings,
    );
    let aggregator = StatsAggregator::new(broker.clone(), stats.clone(), aggregator_settings());

    TestCore {
        state,
        links,
        stats,
        cache,
        broker,
        aggregator,
    }
}

/// Waits until the detached publishes have reached the broker.
pub async fn wait_for_published(core: &TestCore, expected: u64) {
    for _ in 0..100 {
        if core.state.publisher.published_count() + core.state.publisher.dropped_count()
            >= expected
        {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
