//! Stats worker: consumes click events and maintains click counters.

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use url_shortener_core::application::services::StatsAggregator;
use url_shortener_core::config::{self, Config};
use url_shortener_core::infrastructure::persistence::PgStatsRepository;
use url_shortener_core::state::build_broker;
use url_shortener_core::telemetry::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = config::load_from_env().context("Failed to load configuration")?;
    init_tracing(&config);
    config.print_summary();

    let pool = connect_database(&config).await?;
    tracing::info!("Connected to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;

    let broker = build_broker(&config).await?;
    let stats_repository = Arc::new(PgStatsRepository::new(Arc::new(pool)));
    let aggregator = StatsAggregator::new(broker, stats_repository, config.aggregator_settings());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Shutdown signal received"),
            Err(e) => {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
        }
        let _ = shutdown_tx.send(true);
    });

    aggregator.run(shutdown_rx).await;

    Ok(())
}

async fn connect_database(config: &Config) -> Result<sqlx::PgPool> {
    PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_connect_timeout))
        .idle_timeout(Duration::from_secs(config.db_idle_timeout))
        .max_lifetime(Duration::from_secs(config.db_max_lifetime))
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")
}
