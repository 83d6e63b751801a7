use chrono::{TimeDelta, TimeZone, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use url_shortener_core::domain::repositories::StatsRepository;
use url_shortener_core::infrastructure::persistence::PgStatsRepository;

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_first_click_creates_record(pool: PgPool) {
    let repo = PgStatsRepository::new(Arc::new(pool));
    let at = Utc.with_ymd_and_hms(2026, 3, 1, 10, 15, 0).unwrap();

    assert!(repo.get("abc1234").await.unwrap().is_none());

    repo.record_click("abc1234", at).await.unwrap();

    let record = repo.get("abc1234").await.unwrap().unwrap();
    assert_eq!(record.code, "abc1234");
    assert_eq!(record.total_clicks, 1);
    assert_eq!(record.last_click_at, at);
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_last_click_keeps_latest(pool: PgPool) {
    let repo = PgStatsRepository::new(Arc::new(pool));
    let later = Utc.with_ymd_and_hms(2026, 3, 1, 10, 30, 0).unwrap();

    repo.record_click("abc1234", later).await.unwrap();
    repo.record_click("abc1234", later - TimeDelta::minutes(20))
        .await
        .unwrap();

    let record = repo.get("abc1234").await.unwrap().unwrap();
    assert_eq!(record.total_clicks, 2);
    assert_eq!(record.last_click_at, later);
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_hourly_buckets(pool: PgPool) {
    let repo = PgStatsRepository::new(Arc::new(pool));
    let ten = Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap();

    repo.record_click("abc1234", ten + TimeDelta::minutes(5))
        .await
        .unwrap();
    repo.record_click("abc1234", ten + TimeDelta::minutes(59))
        .await
        .unwrap();
    repo.record_click("abc1234", ten + TimeDelta::minutes(61))
        .await
        .unwrap();
    repo.record_click("other12", ten).await.unwrap();

    let buckets = repo
        .hourly("abc1234", ten, ten + TimeDelta::hours(3))
        .await
        .unwrap();

    assert_eq!(buckets.len(), 2);
    assert_eq!(buckets[0].bucket_start, ten);
    assert_eq!(buckets[0].clicks, 2);
    assert_eq!(buckets[1].bucket_start, ten + TimeDelta::hours(1));
    assert_eq!(buckets[1].clicks, 1);

    let narrowed = repo
        .hourly("abc1234", ten + TimeDelta::hours(1), ten + TimeDelta::hours(2))
        .await
        .unwrap();
    assert_eq!(narrowed.len(), 1);
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_concurrent_clicks_are_not_lost(pool: PgPool) {
    let repo = Arc::new(PgStatsRepository::new(Arc::new(pool)));
    let at = Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap();

    let mut handles = Vec::new();
    for _ in 0..50 {
        let repo = repo.clone();
        handles.push(tokio::spawn(async move {
            repo.record_click("hot1234", at).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let record = repo.get("hot1234").await.unwrap().unwrap();
    assert_eq!(record.total_clicks, 50);

    let buckets = repo
        .hourly("hot1234", at, at + TimeDelta::hours(1))
        .await
        .unwrap();
    assert_eq!(buckets[0].clicks, 50);
}
