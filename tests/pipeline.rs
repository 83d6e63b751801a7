mod common;

use chrono::{TimeDelta, Utc};
use std::time::Duration;
use url_shortener_core::error::AppError;
use url_shortener_core::state::CoreSettings;

#[tokio::test]
async fn test_create_resolve_count() {
    let core = common::test_core(CoreSettings::default(), Duration::ZERO);

    let link = core
        .state
        .create_link("https://example.com/a", None)
        .await
        .unwrap();
    assert_eq!(link.code.len(), 7);
    assert!(link.code.chars().all(|c| c.is_ascii_alphanumeric()));

    assert_eq!(
        core.state.redirect_link(&link.code).await.unwrap(),
        "https://example.com/a"
    );

    common::wait_for_published(&core, 1).await;
    assert_eq!(core.aggregator.drain().await.unwrap(), 1);

    let stats = core.state.link_stats(&link.code).await.unwrap().unwrap();
    assert_eq!(stats.total_clicks, 1);
    assert_eq!(stats.code, link.code);
}

#[tokio::test]
async fn test_unknown_code_is_not_found() {
    let core = common::test_core(CoreSettings::default(), Duration::ZERO);

    assert_eq!(
        core.state.redirect_link("unknown1").await.unwrap_err(),
        AppError::not_found("unknown1")
    );
    assert!(core.state.link_stats("unknown1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_link_created_in_the_past_is_expired() {
    let core = common::test_core(CoreSettings::default(), Duration::ZERO);

    let link = core
        .state
        .create_link(
            "https://example.com/old",
            Some(Utc::now() - TimeDelta::seconds(1)),
        )
        .await
        .unwrap();

    assert_eq!(
        core.state.redirect_link(&link.code).await.unwrap_err(),
        AppError::expired(&link.code)
    );
}

#[tokio::test]
async fn test_link_expires_while_cached() {
    let core = common::test_core(CoreSettings::default(), Duration::ZERO);

    let link = core
        .state
        .create_link(
            "https://example.com/short",
            Some(Utc::now() + TimeDelta::milliseconds(100)),
        )
        .await
        .unwrap();
    assert!(core.state.redirect_link(&link.code).await.is_ok());

    tokio::time::sleep(Duration::from_millis(150)).await;

    assert_eq!(
        core.state.redirect_link(&link.code).await.unwrap_err(),
        AppError::expired(&link.code)
    );
}

#[tokio::test]
async fn test_deleted_code_is_never_reissued() {
    let core = common::test_core(CoreSettings::default(), Duration::ZERO);

    core.state
        .create_custom_link("promo2026", "https://example.com/a", None)
        .await
        .unwrap();
    assert!(core.state.delete_link("promo2026").await.unwrap());

    assert!(core.state.redirect_link("promo2026").await.unwrap_err().is_unresolvable());
    assert_eq!(
        core.state
            .create_custom_link("promo2026", "https://example.com/b", None)
            .await
            .unwrap_err(),
        AppError::already_exists("promo2026")
    );
}

#[tokio::test]
async fn test_stats_survive_expiry() {
    let core = common::test_core(CoreSettings::default(), Duration::ZERO);

    let link = core
        .state
        .create_link(
            "https://example.com/brief",
            Some(Utc::now() + TimeDelta::milliseconds(100)),
        )
        .await
        .unwrap();
    core.state.redirect_link(&link.code).await.unwrap();
    common::wait_for_published(&core, 1).await;
    core.aggregator.drain().await.unwrap();

    tokio::time::sleep(Duration::from_millis(150)).await;

    assert!(core.state.redirect_link(&link.code).await.is_err());
    assert_eq!(
        core.state
            .link_stats(&link.code)
            .await
            .unwrap()
            .unwrap()
            .total_clicks,
        1
    );

    let now = Utc::now();
    let hourly = core
        .state
        .hourly_clicks(&link.code, now - TimeDelta::hours(2), now + TimeDelta::hours(1))
        .await
        .unwrap();
    assert_eq!(hourly.iter().map(|b| b.clicks).sum::<i64>(), 1);
}
