//! PostgreSQL implementation of statistics repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;

use crate::domain::entities::{HourlyClicks, StatsRecord, hour_bucket};
use crate::domain::repositories::StatsRepository;
use crate::error::AppError;

/// PostgreSQL repository for click counters.
///
/// Both the running total and the hour bucket are bumped with
/// `INSERT .. ON CONFLICT DO UPDATE`, inside one transaction, so there is no
/// read-modify-write window between concurrent aggregators.
pub struct PgStatsRepository {
    pool: Arc<PgPool>,
}

impl PgStatsRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StatsRepository for PgStatsRepository {
    async fn record_click(&self, code: &str, clicked_at: DateTime<Utc>) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO link_stats (code, total_clicks, last_click_at)
            VALUES ($1, 1, $2)
            ON CONFLICT (code) DO UPDATE
            SET total_clicks = link_stats.total_clicks + 1,
                last_click_at = GREATEST(link_stats.last_click_at, EXCLUDED.last_click_at)
            "#,
        )
        .bind(code)
        .bind(clicked_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO link_stats_hourly (code, bucket_start, clicks)
            VALUES ($1, $2, 1)
            ON CONFLICT (code, bucket_start) DO UPDATE
            SET clicks = link_stats_hourly.clicks + 1
            "#,
        )
        .bind(code)
        .bind(hour_bucket(clicked_at))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }

    async fn get(&self, code: &str) -> Result<Option<StatsRecord>, AppError> {
        let record = sqlx::query_as::<_, StatsRecord>(
            r#"
            SELECT code, total_clicks, last_click_at
            FROM link_stats
            WHERE code = $1
            "#,
        )
        .bind(code)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(record)
    }

    async fn hourly(
        &self,
        code: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<HourlyClicks>, AppError> {
        let rows = sqlx::query_as::<_, HourlyClicks>(
            r#"
            SELECT bucket_start, clicks
            FROM link_stats_hourly
            WHERE code = $1 AND bucket_start >= $2 AND bucket_start < $3
            ORDER BY bucket_start ASC
            "#,
        )
        .bind(code)
        .bind(from)
        .bind(to)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows)
    }
}
