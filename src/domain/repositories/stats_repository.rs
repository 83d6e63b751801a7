//! Repository trait for aggregated click statistics.

use crate::domain::entities::{HourlyClicks, StatsRecord};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Durable per-code click counters.
///
/// Only the stats aggregator writes here. Every write is a single atomic
/// increment, which keeps aggregation commutative under reordering.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgStatsRepository`] - PostgreSQL implementation
/// - [`crate::infrastructure::persistence::MemoryStatsRepository`] - In-process implementation
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StatsRepository: Send + Sync {
    /// Atomically counts one click for `code`.
    ///
    /// Creates the record on first click, increments `total_clicks`, moves
    /// `last_click_at` forward to `clicked_at` if it is newer, and bumps the
    /// hour bucket containing `clicked_at`.
    async fn record_click(&self, code: &str, clicked_at: DateTime<Utc>) -> Result<(), AppError>;

    /// Returns the counters for `code`, or `None` before its first click.
    async fn get(&self, code: &str) -> Result<Option<StatsRecord>, AppError>;

    /// Returns hour buckets with `from <= bucket_start < to`, oldest first.
    async fn hourly(
        &self,
        code: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<HourlyClicks>, AppError>;
}
