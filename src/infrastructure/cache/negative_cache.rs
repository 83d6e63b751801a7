//! Short-lived memory of codes that could not be resolved.

use moka::future::Cache;
use std::time::Duration;
use tracing::trace;

use crate::error::AppError;

/// Why a code could not be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unresolvable {
    NotFound,
    Expired,
}

impl Unresolvable {
    /// Extracts the outcome from an error, `None` for real faults.
    pub fn from_error(error: &AppError) -> Option<Self> {
        match error {
            AppError::NotFound { .. } => Some(Self::NotFound),
            AppError::Expired { .. } => Some(Self::Expired),
            _ => None,
        }
    }

    pub fn into_error(self, code: &str) -> AppError {
        match self {
            Self::NotFound => AppError::not_found(code),
            Self::Expired => AppError::expired(code),
        }
    }
}

/// Bounds repeated-miss storms on invalid codes.
///
/// Every entry lives for the same fixed TTL, separate from and normally much
/// shorter than the positive cache TTL.
pub struct NegativeCache {
    inner: Cache<String, Unresolvable>,
}

impl NegativeCache {
    pub fn new(max_capacity: u64, ttl: Duration) -> Self {
        let inner = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(ttl)
            .build();

        trace!(
            "NegativeCache initialized: max_capacity={}, ttl={:?}",
            max_capacity, ttl
        );

        Self { inner }
    }

    pub async fn get(&self, code: &str) -> Option<Unresolvable> {
        let result = self.inner.get(code).await;
        if result.is_some() {
            trace!("Negative cache hit for code: {}", code);
        }
        result
    }

    pub async fn mark(&self, code: &str, outcome: Unresolvable) {
        trace!("Marking code as unresolvable: {} ({:?})", code, outcome);
        self.inner.insert(code.to_string(), outcome).await;
    }

    pub async fn remove(&self, code: &str) {
        self.inner.invalidate(code).await;
    }
}
