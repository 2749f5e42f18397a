//! One run: fetch → extract → merge → format → publish.
//!
//! Stages run strictly in order. Where each kind of fault stops the run:
//!
//! | Fault | Store written? | Digest sent? |
//! |-------|----------------|--------------|
//! | Transport (fetch) | no | no |
//! | Structure (page layout) | no | no |
//! | Nothing extracted | no | no |
//! | Empty digest | yes | no |
//! | Delivery | yes (kept) | no |

use crate::digest::{DigestMode, DigestOptions, format_digest};
use crate::error::{RunError, StoreError};
use crate::fetch::PageFetcher;
use crate::models::ExtractedOutlet;
use crate::publish::Publisher;
use crate::scrapers::ranking::extract_rankings;
use crate::store::{MergeReport, Store, StoreLock};
use crate::utils::ensure_parent_dir;
use chrono::NaiveDateTime;
use std::path::PathBuf;
use tracing::{info, instrument};
use url::Url;

/// Everything a run needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub url: String,
    pub base_url: Url,
    pub store_path: PathBuf,
    pub digest: DigestOptions,
    pub chat_id: String,
}

/// How a run that did not fault ended.
#[derive(Debug, PartialEq, Eq)]
pub enum RunOutcome {
    /// Digest delivered.
    Published {
        outlets: usize,
        new_articles: usize,
    },
    /// Page had no usable outlets or articles; store and chat untouched.
    NothingToSave,
    /// Store updated, but there was nothing to put in the digest.
    EmptyDigest { new_articles: usize },
}

/// Execute one run at `run_at` (local wall-clock time).
#[instrument(level = "info", skip_all, fields(url = %plan.url, store = %plan.store_path.display()))]
pub async fn run_once<F, P>(
    fetcher: &F,
    publisher: &P,
    plan: &RunPlan,
    run_at: NaiveDateTime,
) -> Result<RunOutcome, RunError>
where
    F: PageFetcher,
    P: Publisher,
{
    let html = fetcher.fetch(&plan.url).await?;
    let outlets = extract_rankings(&html, &plan.base_url)?;

    let article_count: usize = outlets.iter().map(|o| o.articles.len()).sum();
    if article_count == 0 {
        info!(outlets = outlets.len(), "No articles extracted; nothing to save");
        return Ok(RunOutcome::NothingToSave);
    }

    let report = merge_into_store(&plan.store_path, &outlets, run_at).await?;

    let selected: &[ExtractedOutlet] = match plan.digest.mode {
        DigestMode::Latest => &outlets,
        DigestMode::New => &report.new_articles,
    };
    let digest = match format_digest(selected, run_at, &plan.digest) {
        Ok(digest) => digest,
        Err(e) => {
            info!(reason = %e, "Skipping delivery");
            return Ok(RunOutcome::EmptyDigest {
                new_articles: report.articles_inserted,
            });
        }
    };

    publisher.send(&plan.chat_id, &digest).await?;
    Ok(RunOutcome::Published {
        outlets: outlets.len(),
        new_articles: report.articles_inserted,
    })
}

/// Load, merge and save the store while holding its lock.
async fn merge_into_store(
    path: &std::path::Path,
    outlets: &[ExtractedOutlet],
    run_at: NaiveDateTime,
) -> Result<MergeReport, StoreError> {
    ensure_parent_dir(path).await.map_err(|source| StoreError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let _lock = StoreLock::acquire(path)?;

    let mut store = Store::load(path).await?;
    let report = store.merge(outlets, run_at);
    info!(
        outlets = store.entries().len(),
        created = report.outlets_created,
        updated = report.outlets_updated,
        reset = report.outlets_reset,
        inserted = report.articles_inserted,
        "Merged rankings into store"
    );
    store.save(path).await?;
    Ok(report)
}
