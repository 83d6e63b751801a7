//! Read side of click statistics.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::domain::entities::{HourlyClicks, StatsRecord};
use crate::domain::repositories::StatsRepository;
use crate::error::AppError;

/// Service for retrieving click statistics.
///
/// Counts are eventually consistent: a click becomes visible once the stats
/// aggregator has processed its event.
pub struct StatsService<R: StatsRepository + ?Sized> {
    repository: Arc<R>,
}

impl<R: StatsRepository + ?Sized> StatsService<R> {
    /// Creates a new statistics service.
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Returns the counters for `code`, `None` if no click was counted yet.
    ///
    /// Stats of expired or deleted links remain readable.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::StoreUnavailable`] or [`AppError::Internal`] on
    /// storage failures.
    pub async fn get_stats(&self, code: &str) -> Result<Option<StatsRecord>, AppError> {
        self.repository.get(code).await
    }

    /// Returns hourly click buckets in `[from, to)`, oldest first.
    ///
    /// An empty or inverted range yields no buckets.
    pub async fn hourly_clicks(
        &self,
        code: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<HourlyClicks>, AppError> {
        if from >= to {
            return Ok(Vec::new());
        }

        self.repository.hourly(code, from, to).await
    }
}
