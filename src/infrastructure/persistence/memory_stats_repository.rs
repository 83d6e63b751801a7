//! In-process stats repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::BTreeMap;

use crate::domain::entities::{HourlyClicks, StatsRecord, hour_bucket};
use crate::domain::repositories::StatsRepository;
use crate::error::AppError;

struct CodeStats {
    record: StatsRecord,
    hourly: BTreeMap<DateTime<Utc>, i64>,
}

/// Stats store backed by a concurrent map.
///
/// Each increment happens under the entry lock of its code, so concurrent
/// aggregators never lose updates.
#[derive(Default)]
pub struct MemoryStatsRepository {
    stats: DashMap<String, CodeStats>,
}

impl MemoryStatsRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StatsRepository for MemoryStatsRepository {
    async fn record_click(&self, code: &str, clicked_at: DateTime<Utc>) -> Result<(), AppError> {
        let bucket = hour_bucket(clicked_at);

        let mut entry = self
            .stats
            .entry(code.to_string())
            .or_insert_with(|| CodeStats {
                record: StatsRecord {
                    code: code.to_string(),
                    total_clicks: 0,
                    last_click_at: clicked_at,
                },
                hourly: BTreeMap::new(),
            });

        entry.record.total_clicks += 1;
        entry.record.last_click_at = entry.record.last_click_at.max(clicked_at);
        *entry.hourly.entry(bucket).or_insert(0) += 1;

        Ok(())
    }

    async fn get(&self, code: &str) -> Result<Option<StatsRecord>, AppError> {
        Ok(self.stats.get(code).map(|entry| entry.record.clone()))
    }

    async fn hourly(
        &self,
        code: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<HourlyClicks>, AppError> {
        let Some(entry) = self.stats.get(code) else {
            return Ok(Vec::new());
        };

        Ok(entry
            .hourly
            .range(from..to)
            .map(|(bucket_start, clicks)| HourlyClicks {
                bucket_start: *bucket_start,
                clicks: *clicks,
            })
            .collect())
    }
}
