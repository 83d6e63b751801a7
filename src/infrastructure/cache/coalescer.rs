//! Per-key coalescing of concurrent loads.

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

use crate::error::AppError;

type SharedLoad<T> = Shared<BoxFuture<'static, Result<T, AppError>>>;

/// Registry of in-flight loads keyed by cache key.
///
/// The first caller for a key spawns the load; callers arriving while it runs
/// await the same result instead of starting their own. Keys never wait on
/// each other. The load runs on its own task and removes its registry entry
/// when done, so a caller that goes away mid-load neither cancels it for the
/// others nor leaves a stale entry behind.
pub struct RequestCoalescer<T> {
    in_flight: Arc<Mutex<HashMap<String, SharedLoad<T>>>>,
}

impl<T> Default for RequestCoalescer<T> {
    fn default() -> Self {
        Self {
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<T> RequestCoalescer<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `load` for `key` unless a load for `key` is already in flight,
    /// in which case its result is awaited instead. `load` is dropped unused
    /// when joining.
    ///
    /// # Errors
    ///
    /// Returns the load's own error, or [`AppError::Internal`] if the load task
    /// panicked.
    pub async fn run<F>(&self, key: &str, load: F) -> Result<T, AppError>
    where
        F: Future<Output = Result<T, AppError>> + Send + 'static,
    {
        let shared = {
            let mut in_flight = self.in_flight.lock();

            if let Some(existing) = in_flight.get(key) {
                debug!(key, "joining in-flight load");
                existing.clone()
            } else {
                let registry = Arc::clone(&self.in_flight);
                let owned_key = key.to_string();

                let handle = tokio::spawn(async move {
                    let result = load.await;
                    registry.lock().remove(&owned_key);
                    result
                });

                let shared = async move {
                    handle.await.unwrap_or_else(|e| {
                        Err(AppError::internal(format!("Coalesced load failed: {}", e)))
                    })
                }
                .boxed()
                .shared();

                in_flight.insert(key.to_string(), shared.clone());
                shared
            }
        };

        shared.await
    }

    /// Number of keys with a load currently running.
    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().len()
    }
}
