//! CLI administration tool for url-shortener-core.
//!
//! Provides commands for managing links, viewing statistics, and performing
//! database operations through the same core services the service
//! boundaries use.
//!
//! # Usage
//!
//! ```bash
//! # Create a short link (default lifetime from DEFAULT_LINK_TTL_SECONDS)
//! cargo run --bin admin -- create https://example.com/page
//!
//! # Custom code, expiring in one hour
//! cargo run --bin admin -- create https://example.com --code promo2026 --expires-in 3600
//!
//! # Show where a code points (does not count a click)
//! cargo run --bin admin -- resolve abc1234
//!
//! # View click statistics
//! cargo run --bin admin -- stats abc1234
//!
//! # Soft-delete a link
//! cargo run --bin admin -- delete abc1234
//!
//! # Check database connection
//! cargo run --bin admin -- db check
//! ```
//!
//! # Environment Variables
//!
//! Same as the worker, see `url_shortener_core::config`.

use url_shortener_core::AppError;
use url_shortener_core::config::{self, Config};
use url_shortener_core::infrastructure::broker::MemoryBroker;
use url_shortener_core::infrastructure::persistence::{PgLinkRepository, PgStatsRepository};
use url_shortener_core::state::{AppState, CoreSettings, build_cache};

use anyhow::{Context, Result};
use chrono::{TimeDelta, Utc};
use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::Confirm;
use sqlx::PgPool;
use std::sync::Arc;

/// CLI tool for managing url-shortener-core.
#[derive(Parser)]
#[command(name = "admin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Top-level commands.
#[derive(Subcommand)]
enum Commands {
    /// Create a short link
    Create {
        /// Target URL (http or https)
        url: String,

        /// Expire the link after this many seconds
        #[arg(short, long)]
        expires_in: Option<i64>,

        /// Use this code instead of a generated one
        #[arg(short, long)]
        code: Option<String>,
    },

    /// Show the target of a short code
    Resolve {
        code: String,
    },

    /// Show click statistics for a short code
    Stats {
        code: String,
    },

    /// Delete a short link (the code stays reserved)
    Delete {
        code: String,

        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Database operations
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
}

/// Database operation subcommands.
#[derive(Subcommand)]
enum DbAction {
    /// Check database connection
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = config::load_from_env().context("Failed to load configuration")?;

    let pool = PgPool::connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    match cli.command {
        Commands::Db { action } => handle_db_action(action, &pool).await?,
        command => {
            let state = build_state(&config, pool).await?;
            handle_link_command(command, &state).await?;
        }
    }

    Ok(())
}

/// Wires the core over PostgreSQL and the configured cache.
///
/// The admin tool never counts clicks, so an in-process broker is enough.
async fn build_state(config: &Config, pool: PgPool) -> Result<AppState> {
    let pool = Arc::new(pool);
    let cache = build_cache(config).await;

    Ok(AppState::new(
        Arc::new(PgLinkRepository::new(pool.clone())),
        Arc::new(PgStatsRepository::new(pool)),
        cache,
        Arc::new(MemoryBroker::new(config.broker_queue_capacity)),
        CoreSettings::from_config(config)?,
    ))
}

async fn handle_link_command(command: Commands, state: &AppState) -> Result<()> {
    match command {
        Commands::Create {
            url,
            expires_in,
            code,
        } => create_link(state, url, expires_in, code).await,
        Commands::Resolve { code } => resolve_link(state, code).await,
        Commands::Stats { code } => show_stats(state, code).await,
        Commands::Delete { code, yes } => delete_link(state, code, yes).await,
        Commands::Db { .. } => Ok(()),
    }
}

async fn create_link(
    state: &AppState,
    url: String,
    expires_in: Option<i64>,
    code: Option<String>,
) -> Result<()> {
    println!("{}", "🔗 Create Short Link".bright_blue().bold());
    println!();

    let expires_at = match expires_in {
        Some(secs) => Some(
            TimeDelta::try_seconds(secs)
                .and_then(|ttl| Utc::now().checked_add_signed(ttl))
                .context("--expires-in is out of range")?,
        ),
        None => None,
    };

    let result = match code {
        Some(code) => state.create_custom_link(&code, &url, expires_at).await,
        None => state.create_link(&url, expires_at).await,
    };

    let link = match result {
        Ok(link) => link,
        Err(e @ (AppError::InvalidUrl(_) | AppError::InvalidCode(_) | AppError::CodeAlreadyExists { .. })) => {
            println!("{}", format!("❌ {}", e).red());
            return Ok(());
        }
        Err(e) => return Err(anyhow::anyhow!("Failed to create link: {}", e)),
    };

    println!("{}", "✅ Link created successfully!".green().bold());
    println!();
    println!("  Code:    {}", link.code.bright_yellow().bold());
    println!("  Target:  {}", link.target_url.cyan());
    match link.expires_at {
        Some(expires_at) => println!(
            "  Expires: {}",
            expires_at.format("%Y-%m-%d %H:%M:%S UTC").to_string().bright_black()
        ),
        None => println!("  Expires: {}", "never".bright_black()),
    }
    println!();

    Ok(())
}

async fn resolve_link(state: &AppState, code: String) -> Result<()> {
    match state.redirects.lookup(&code).await {
        Ok(link) => {
            println!("  {} → {}", code.bright_yellow(), link.target_url.cyan());
        }
        Err(AppError::NotFound { .. }) => {
            println!("{}", format!("❌ No link for code '{}'", code).red());
        }
        Err(AppError::Expired { .. }) => {
            println!("{}", format!("⚠️  Link '{}' has expired", code).yellow());
        }
        Err(e) => return Err(anyhow::anyhow!("Failed to resolve link: {}", e)),
    }

    Ok(())
}

/// Displays counters and the last 24 hourly buckets for a code.
///
/// # Output Format
///
/// ```text
/// 📊 Statistics for abc1234
///
///   Total clicks: 42
///   Last click:   2026-01-15 10:30:12 UTC
///
///   Hour (UTC)          Clicks
///   ──────────────────────────
///   2026-01-15 09:00    17
///   2026-01-15 10:00    25
/// ```
async fn show_stats(state: &AppState, code: String) -> Result<()> {
    println!(
        "{}",
        format!("📊 Statistics for {}", code).bright_blue().bold()
    );
    println!();

    let record = state
        .link_stats(&code)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to load stats: {}", e))?;

    let Some(record) = record else {
        println!("{}", "  No clicks recorded yet".yellow());
        println!();
        return Ok(());
    };

    println!(
        "  Total clicks: {}",
        record.total_clicks.to_string().bright_green().bold()
    );
    println!(
        "  Last click:   {}",
        record
            .last_click_at
            .format("%Y-%m-%d %H:%M:%S UTC")
            .to_string()
            .bright_black()
    );
    println!();

    let now = Utc::now();
    let buckets = state
        .hourly_clicks(&code, now - TimeDelta::hours(24), now)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to load hourly stats: {}", e))?;

    if !buckets.is_empty() {
        println!(
            "  {:<19} {}",
            "Hour (UTC)".bright_white().bold(),
            "Clicks".bright_white().bold()
        );
        println!("  {}", "─".repeat(26).bright_black());

        for bucket in &buckets {
            println!(
                "  {:<19} {}",
                bucket.bucket_start.format("%Y-%m-%d %H:%M").to_string(),
                bucket.clicks.to_string().bright_green()
            );
        }
        println!();
    }

    Ok(())
}

/// Soft-deletes a link with confirmation prompt.
///
/// # Safety
///
/// - Requires confirmation (default: No) unless `--yes`
/// - The code is never handed out again
async fn delete_link(state: &AppState, code: String, skip_confirm: bool) -> Result<()> {
    println!("{}", "🗑️  Delete Short Link".bright_blue().bold());
    println!();

    match state.links.get_link(&code).await {
        Ok(link) => {
            println!("  Code:   {}", link.code.cyan());
            println!("  Target: {}", link.target_url.bright_black());
            println!();
        }
        Err(AppError::NotFound { .. }) => {
            println!("{}", "⚠️  No live link with this code".yellow());
            return Ok(());
        }
        // Expired links can still be deleted.
        Err(AppError::Expired { .. }) => {}
        Err(e) => return Err(anyhow::anyhow!("Database error: {}", e)),
    }

    if !skip_confirm {
        let confirmed = Confirm::new()
            .with_prompt("Delete this link?")
            .default(false)
            .interact()?;

        if !confirmed {
            println!("{}", "❌ Cancelled".red());
            return Ok(());
        }
    }

    let deleted = state
        .delete_link(&code)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to delete link: {}", e))?;

    println!();
    if deleted {
        println!("{}", "✅ Link deleted successfully!".green().bold());
    } else {
        println!("{}", "⚠️  Link was already deleted".yellow());
    }
    println!();

    Ok(())
}

/// Handles database diagnostic commands.
async fn handle_db_action(action: DbAction, pool: &PgPool) -> Result<()> {
    match action {
        DbAction::Check => {
            println!("{}", "🔍 Checking database connection...".bright_blue());

            sqlx::query("SELECT 1").fetch_one(pool).await?;

            let links_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM links")
                .fetch_one(pool)
                .await
                .context("links table missing, run the worker once to apply migrations")?;

            println!("{}", "✅ Database connection OK".green().bold());
            println!(
                "  Links: {}",
                links_count.to_string().bright_green().bold()
            );
        }
    }

    Ok(())
}
