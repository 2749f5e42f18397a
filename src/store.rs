//! The persisted outlet store: load, merge, and atomic save.
//!
//! The store is a daily rolling cache. Each run loads it, clears every
//! outlet that was last touched on an earlier calendar day, prepends the
//! articles it has not seen yet, and rewrites the whole file in one rename.
//!
//! # File Format
//!
//! ```text
//! [
//!   {
//!     "outlet_name": "연합뉴스",
//!     "articles": [ { "title": "...", "link": "https://..." } ],
//!     "last_updated": "2025-05-06 14:00:03"
//!   }
//! ]
//! ```
//!
//! # Identity
//!
//! An article is already known to an outlet if any stored article has the
//! same title OR the same link (see [`Article::same_story`]). Existing
//! articles are never removed by deduplication, only by the daily reset.

use crate::error::StoreError;
use crate::models::{Article, ExtractedOutlet, OutletEntry};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions, TryLockError};
use std::io::{ErrorKind, Write as _};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};

/// Format of `last_updated` in the store file.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// All outlets known to the store, persisted as a flat JSON array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Store {
    entries: Vec<OutletEntry>,
}

/// What a merge changed. Used for logging and for the "new articles" digest.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Per fresh outlet, in page order, the articles inserted by this merge.
    pub new_articles: Vec<ExtractedOutlet>,
    pub outlets_created: usize,
    pub outlets_updated: usize,
    /// Outlets whose articles were cleared because they were from an earlier day.
    pub outlets_reset: usize,
    pub articles_inserted: usize,
}

impl Store {
    pub fn entries(&self) -> &[OutletEntry] {
        &self.entries
    }

    /// Load the store from `path`.
    ///
    /// A missing file or one that does not parse as a store is treated as an
    /// empty store. Any other I/O failure is returned, so an unreadable file
    /// is never silently overwritten.
    ///
    /// Duplicate outlet names in a hand-edited file are collapsed, keeping
    /// the first occurrence.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub async fn load(path: &Path) -> Result<Self, StoreError> {
        let raw = match fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("No store file yet; starting empty");
                return Ok(Self::default());
            }
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                warn!(error = %e, "Store file is not valid UTF-8; starting empty");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.display().to_string(),
                    source,
                });
            }
        };

        match serde_json::from_str::<Vec<OutletEntry>>(&raw) {
            Ok(mut entries) => {
                let before = entries.len();
                let mut seen = std::collections::HashSet::new();
                entries.retain(|e| seen.insert(e.outlet_name.clone()));
                if entries.len() != before {
                    warn!(
                        dropped = before - entries.len(),
                        "Store had duplicate outlet names; kept first occurrence"
                    );
                }
                info!(outlets = entries.len(), "Loaded store");
                Ok(Self { entries })
            }
            Err(e) => {
                warn!(error = %e, "Store file is corrupt; starting empty");
                Ok(Self::default())
            }
        }
    }

    /// Merge freshly extracted outlets into the store as of `run_at`.
    ///
    /// 1. Entries last updated on a different calendar day are emptied.
    /// 2. Known outlets get `last_updated = run_at` and their unseen articles
    ///    prepended as one block, in extracted order.
    /// 3. Unknown outlets are appended with their articles in page order.
    pub fn merge(&mut self, fresh: &[ExtractedOutlet], run_at: NaiveDateTime) -> MergeReport {
        let run_date = run_at.date();
        let stamp = run_at.format(TIMESTAMP_FORMAT).to_string();
        let mut report = MergeReport::default();

        for entry in &mut self.entries {
            if entry_date(&entry.last_updated) != Some(run_date) {
                if !entry.articles.is_empty() {
                    debug!(outlet = %entry.outlet_name, last_updated = %entry.last_updated, "Daily reset");
                    report.outlets_reset += 1;
                }
                entry.articles.clear();
            }
        }

        for outlet in fresh {
            let inserted = match self
                .entries
                .iter_mut()
                .find(|e| e.outlet_name == outlet.outlet_name)
            {
                Some(entry) => {
                    entry.last_updated = stamp.clone();
                    let inserted = unseen_articles(&entry.articles, &outlet.articles);
                    let older = std::mem::replace(&mut entry.articles, inserted.clone());
                    entry.articles.extend(older);
                    report.outlets_updated += 1;
                    inserted
                }
                None => {
                    let articles = unseen_articles(&[], &outlet.articles);
                    self.entries.push(OutletEntry {
                        outlet_name: outlet.outlet_name.clone(),
                        articles: articles.clone(),
                        last_updated: stamp.clone(),
                    });
                    report.outlets_created += 1;
                    articles
                }
            };

            report.articles_inserted += inserted.len();
            report.new_articles.push(ExtractedOutlet {
                outlet_name: outlet.outlet_name.clone(),
                articles: inserted,
            });
        }

        report
    }

    /// Write the store to `path`, replacing any previous file atomically.
    ///
    /// The JSON is written to a sibling temp file, flushed to disk, then
    /// renamed over `path`, so readers see either the old or the new file.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub async fn save(&self, path: &Path) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(&self.entries)?;
        let tmp = sibling_path(path, "tmp");
        let io_err = |source| StoreError::Io {
            path: tmp.display().to_string(),
            source,
        };

        let write = async {
            let mut file = fs::File::create(&tmp).await.map_err(io_err)?;
            file.write_all(json.as_bytes()).await.map_err(io_err)?;
            file.sync_all().await.map_err(io_err)?;
            fs::rename(&tmp, path).await.map_err(|source| StoreError::Io {
                path: path.display().to_string(),
                source,
            })
        };

        if let Err(e) = write.await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e);
        }

        info!(outlets = self.entries.len(), bytes = json.len(), "Saved store");
        Ok(())
    }
}

#[cfg(test)]
impl Store {
    pub fn new(entries: Vec<OutletEntry>) -> Self {
        Self { entries }
    }

    pub fn into_entries(self) -> Vec<OutletEntry> {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, outlet_name: &str) -> Option<&OutletEntry> {
        self.entries.iter().find(|e| e.outlet_name == outlet_name)
    }
}

/// Articles from `fresh` not matching anything in `known` or earlier in
/// `fresh`, in their original order.
fn unseen_articles(known: &[Article], fresh: &[Article]) -> Vec<Article> {
    let mut unseen: Vec<Article> = Vec::new();
    for article in fresh {
        let seen = known
            .iter()
            .chain(unseen.iter())
            .any(|a| a.same_story(article));
        if !seen {
            unseen.push(article.clone());
        }
    }
    unseen
}

/// Calendar day of a stored `last_updated`, or `None` if it does not start
/// with a `YYYY-MM-DD` date.
fn entry_date(last_updated: &str) -> Option<NaiveDate> {
    let date = last_updated.get(..10)?;
    NaiveDate::parse_from_str(date, DATE_FORMAT).ok()
}

/// `dir/.name.suffix` next to `path`.
fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "store".to_string());
    path.with_file_name(format!(".{name}.{suffix}"))
}

/// Exclusive lock on a store file for the duration of one run.
///
/// Held as an OS advisory lock on `<store>.lock`. The kernel releases it when
/// the guard's handle closes, including when the process is killed, so a
/// lock file left on disk never blocks later runs. The file itself stays in
/// place: unlinking it while another run has it open would let two runs lock
/// different inodes.
#[derive(Debug)]
pub struct StoreLock {
    path: PathBuf,
    _file: File,
}

impl StoreLock {
    pub fn acquire(store_path: &Path) -> Result<Self, StoreError> {
        let mut name = store_path.as_os_str().to_owned();
        name.push(".lock");
        let path = PathBuf::from(name);
        let io_error = |source| StoreError::Io {
            path: path.display().to_string(),
            source,
        };

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(io_error)?;
        match file.try_lock() {
            Ok(()) => {}
            Err(TryLockError::WouldBlock) => {
                return Err(StoreError::Locked {
                    path: path.display().to_string(),
                });
            }
            Err(TryLockError::Error(source)) => return Err(io_error(source)),
        }

        // Informational only; the OS lock is what excludes other runs.
        if let Err(e) = file.set_len(0).and_then(|()| writeln!(file, "{}", std::process::id())) {
            debug!(path = %path.display(), error = %e, "Could not record pid in store lock");
        }
        debug!(path = %path.display(), "Acquired store lock");
        Ok(Self { path, _file: file })
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        debug!(path = %self.path.display(), "Released store lock");
    }
}
