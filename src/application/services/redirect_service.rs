//! Cache-aside resolution of short codes.

use chrono::Utc;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

use crate::application::services::EventPublisher;
use crate::domain::click_event::ClickEvent;
use crate::domain::entities::Link;
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;
use crate::infrastructure::cache::{CacheService, NegativeCache, RequestCoalescer, Unresolvable};
use crate::utils::code_generator::is_plausible_code;

/// Tunables for [`RedirectService`].
#[derive(Debug, Clone)]
pub struct RedirectSettings {
    /// Upper bound on how long a cache entry may live.
    pub cache_ttl: Duration,
    /// Upper bound on one cache call. A call that takes longer counts as a
    /// miss, or as a skipped write.
    pub cache_op_timeout: Duration,
    /// Upper bound on one link store read.
    pub store_read_timeout: Duration,
}

impl Default for RedirectSettings {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(3600),
            cache_op_timeout: Duration::from_millis(100),
            store_read_timeout: Duration::from_millis(500),
        }
    }
}

/// Redirect hot path: cache, then one coalesced store read per code.
///
/// Every cache and store call is time-bounded, so a stalled backend slows a
/// redirect by at most `cache_op_timeout` per cache call plus
/// `store_read_timeout`. Each successful resolve emits a [`ClickEvent`] from
/// a detached task; the publish outcome never reaches the caller.
pub struct RedirectService<L: LinkRepository + ?Sized> {
    links: Arc<L>,
    cache: Arc<dyn CacheService>,
    negative: Option<Arc<NegativeCache>>,
    coalescer: RequestCoalescer<Link>,
    publisher: Arc<EventPublisher>,
    settings: RedirectSettings,
    /// Bumped by every [`RedirectService::warm`]. A load that sees it move
    /// does not leave a negative entry behind.
    warm_epoch: Arc<AtomicU64>,
}

impl<L: LinkRepository + ?Sized + 'static> RedirectService<L> {
    /// Creates the resolver.
    ///
    /// # Arguments
    ///
    /// * `links` - Source of truth for links
    /// * `cache` - Advisory cache in front of `links`
    /// * `negative` - Optional short-lived memory of unresolvable codes
    /// * `publisher` - Receives one click event per successful resolve
    /// * `settings` - TTL and timeout bounds
    pub fn new(
        links: Arc<L>,
        cache: Arc<dyn CacheService>,
        negative: Option<Arc<NegativeCache>>,
        publisher: Arc<EventPublisher>,
        settings: RedirectSettings,
    ) -> Self {
        Self {
            links,
            cache,
            negative,
            coalescer: RequestCoalescer::new(),
            publisher,
            settings,
            warm_epoch: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Resolves `code` to its target URL and records a click.
    ///
    /// # Errors
    ///
    /// - [`AppError::NotFound`] for unknown, deleted or malformed codes
    /// - [`AppError::Expired`] for links past their expiry
    /// - [`AppError::StoreUnavailable`] if the cache missed and the store did
    ///   not answer in time
    pub async fn resolve(&self, code: &str) -> Result<String, AppError> {
        let link = self.lookup(code).await?;
        self.publisher.publish_detached(ClickEvent::new(code));
        Ok(link.target_url)
    }

    /// Resolves `code` without recording a click.
    ///
    /// # Errors
    ///
    /// Same as [`Self::resolve`].
    pub async fn lookup(&self, code: &str) -> Result<Link, AppError> {
        if !is_plausible_code(code) {
            return Err(AppError::not_found(code));
        }

        let op_timeout = self.settings.cache_op_timeout;
        match cached(self.cache.as_ref(), code, op_timeout).await {
            Some(link) if !link.is_expired() => {
                metrics::counter!("redirect_cache_hits_total").increment(1);
                return Ok(link);
            }
            Some(_) => {
                debug!(code, "cached link expired, invalidating");
                invalidate(self.cache.as_ref(), code, op_timeout).await;
            }
            None => {}
        }
        metrics::counter!("redirect_cache_misses_total").increment(1);

        if let Some(negative) = &self.negative
            && let Some(outcome) = negative.get(code).await
        {
            return Err(outcome.into_error(code));
        }

        self.coalescer.run(code, self.load(code)).await
    }

    /// Primes the cache with a freshly created link.
    pub async fn warm(&self, link: &Link) {
        if let Some(negative) = &self.negative {
            self.warm_epoch.fetch_add(1, Ordering::SeqCst);
            negative.remove(&link.code).await;
        }
        write_back(
            self.cache.as_ref(),
            link,
            self.settings.cache_ttl,
            self.settings.cache_op_timeout,
        )
        .await;
    }

    /// Drops every cached trace of `code`.
    pub async fn evict(&self, code: &str) {
        if let Some(negative) = &self.negative {
            negative.remove(code).await;
        }
        invalidate(self.cache.as_ref(), code, self.settings.cache_op_timeout).await;
    }

    /// Store read plus cache write-back, run once per code at a time.
    fn load(
        &self,
        code: &str,
    ) -> impl Future<Output = Result<Link, AppError>> + Send + 'static + use<L> {
        let links = Arc::clone(&self.links);
        let cache = Arc::clone(&self.cache);
        let negative = self.negative.clone();
        let warm_epoch = Arc::clone(&self.warm_epoch);
        let started_at = warm_epoch.load(Ordering::SeqCst);
        let settings = self.settings.clone();
        let code = code.to_string();

        async move {
            let timeout = settings.store_read_timeout;
            let result = match tokio::time::timeout(timeout, links.get(&code)).await {
                Ok(result) => result,
                Err(_) => Err(AppError::StoreUnavailable(format!(
                    "Link store read timed out after {:?}",
                    timeout
                ))),
            };

            match &result {
                Ok(link) => {
                    write_back(cache.as_ref(), link, settings.cache_ttl, settings.cache_op_timeout)
                        .await
                }
                Err(e) => {
                    if let (Some(negative), Some(outcome)) = (&negative, Unresolvable::from_error(e))
                    {
                        negative.mark(&code, outcome).await;
                        // A warm that ran during the read may already have
                        // cleared the entry this mark replaces.
                        if warm_epoch.load(Ordering::SeqCst) != started_at {
                            negative.remove(&code).await;
                        }
                    }
                }
            }

            result
        }
    }
}

/// Cache read bounded by `op_timeout`. Errors and stalls count as a miss.
async fn cached(cache: &dyn CacheService, code: &str, op_timeout: Duration) -> Option<Link> {
    match tokio::time::timeout(op_timeout, cache.get(code)).await {
        Ok(Ok(hit)) => hit,
        Ok(Err(e)) => {
            warn!(code, "cache read failed, treating as miss: {}", e);
            None
        }
        Err(_) => {
            warn!(code, "cache read timed out after {:?}, treating as miss", op_timeout);
            None
        }
    }
}

async fn invalidate(cache: &dyn CacheService, code: &str, op_timeout: Duration) {
    match tokio::time::timeout(op_timeout, cache.invalidate(code)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(code, "cache invalidate failed: {}", e),
        Err(_) => warn!(code, "cache invalidate timed out after {:?}", op_timeout),
    }
}

/// Caches `link` for `min(cache_ttl, time left until expiry)`.
async fn write_back(cache: &dyn CacheService, link: &Link, cache_ttl: Duration, op_timeout: Duration) {
    let ttl = link
        .time_to_expiry(Utc::now())
        .map_or(cache_ttl, |left| left.min(cache_ttl));

    if ttl.is_zero() {
        return;
    }

    match tokio::time::timeout(op_timeout, cache.set(&link.code, link, ttl)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(code = %link.code, "cache write-back failed: {}", e),
        Err(_) => warn!(code = %link.code, "cache write-back timed out after {:?}", op_timeout),
    }
}
