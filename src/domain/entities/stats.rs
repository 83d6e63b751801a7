//! Aggregated click statistics.

use chrono::{DateTime, DurationRound, TimeDelta, Utc};

/// Per-code click counters maintained by the stats aggregator.
///
/// Created lazily on the first processed click and retained after the link
/// itself expires. `total_clicks` only ever grows.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct StatsRecord {
    pub code: String,
    pub total_clicks: i64,
    pub last_click_at: DateTime<Utc>,
}

/// Click count for one hour-aligned bucket.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct HourlyClicks {
    pub bucket_start: DateTime<Utc>,
    pub clicks: i64,
}

/// Truncates a timestamp to the start of its hour.
pub fn hour_bucket(at: DateTime<Utc>) -> DateTime<Utc> {
    at.duration_trunc(TimeDelta::hours(1)).unwrap_or(at)
}
