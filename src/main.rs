//! # Ranking Digest
//!
//! Scrapes the Naver News per-outlet ranking page, keeps a daily rolling
//! JSON store of every article seen per outlet, and sends a Telegram digest.
//!
//! ## Usage
//!
//! ```sh
//! TELEGRAM_BOT_TOKEN=... TELEGRAM_CHAT_ID=... ranking_digest --store-path ./news_data.json
//! ```
//!
//! ## Architecture
//!
//! Each invocation is one run:
//! 1. **Fetching**: Get the rendered ranking page (HTTP or headless browser)
//! 2. **Extraction**: Parse outlets and their ranked articles
//! 3. **Merging**: Fold new articles into the store, resetting stale outlets
//! 4. **Delivery**: Format a MarkdownV2 digest and send it
//!
//! Faults are logged here and never crash the process. Only configuration
//! errors, which happen before a run starts, produce a non-zero exit.

use chrono::Local;
use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};
use url::Url;

mod cli;
mod config;
mod digest;
mod error;
mod fetch;
mod models;
mod pipeline;
mod publish;
mod scrapers;
mod store;
mod utils;

use cli::Cli;
use config::Settings;
use error::RunError;
use fetch::Fetcher;
use pipeline::{RunOutcome, RunPlan, run_once};
use publish::{StdoutPublisher, TelegramPublisher};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("ranking_digest starting up");

    let args = Cli::parse();
    let settings = Settings::resolve(&args)?;
    debug!(store_path = ?settings.store_path, fetch_mode = ?settings.fetch.mode, digest = ?settings.digest, "Resolved settings");

    let chat_id = if settings.dry_run {
        settings.chat_id().unwrap_or("dry-run").to_string()
    } else {
        settings.chat_id()?.to_string()
    };
    let plan = RunPlan {
        url: settings.url.clone(),
        base_url: Url::parse(&settings.base_url)?,
        store_path: settings.store_path.clone(),
        digest: settings.digest.clone(),
        chat_id,
    };
    let fetcher = Fetcher::from_settings(&settings.fetch)?;

    let run_at = Local::now().naive_local();
    info!(run_at = %run_at.format(store::TIMESTAMP_FORMAT), "Starting run");

    let result = if settings.dry_run {
        run_once(&fetcher, &StdoutPublisher, &plan, run_at).await
    } else {
        let publisher = TelegramPublisher::new(settings.telegram_config()?)?;
        run_once(&fetcher, &publisher, &plan, run_at).await
    };

    report(result);

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
    Ok(())
}

/// Log how the run ended.
fn report(result: Result<RunOutcome, RunError>) {
    match result {
        Ok(RunOutcome::Published {
            outlets,
            new_articles,
        }) => info!(outlets, new_articles, "Digest delivered successfully"),
        Ok(RunOutcome::NothingToSave) => {
            warn!("No outlets or articles found; check the page structure. Nothing saved or sent")
        }
        Ok(RunOutcome::EmptyDigest { new_articles }) => {
            info!(new_articles, "Store updated; digest empty so nothing sent")
        }
        Err(e @ RunError::Delivery(_)) => {
            error!(kind = e.kind(), error = %e, "Store saved but digest delivery failed")
        }
        Err(e) => error!(kind = e.kind(), error = %e, "Run aborted"),
    }
}
