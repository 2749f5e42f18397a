//! Data models for scraped rankings and the persisted outlet store.
//!
//! This module defines the core data structures used throughout the application:
//! - [`Article`]: A single ranked article as scraped from an outlet's list
//! - [`ExtractedOutlet`]: One outlet's ranking as it appears on the page
//! - [`OutletEntry`]: One outlet's accumulated articles in the store
//!
//! The serialized field names are the on-disk format of the store file, so
//! they must not change without a migration.

use serde::{Deserialize, Serialize};

/// A single article row from an outlet's ranking list.
///
/// Only `title` and `link` are guaranteed. The image and time label are
/// whatever the page happened to carry for this row.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Article {
    /// The article headline, whitespace-normalized.
    pub title: String,
    /// Absolute URL of the article.
    pub link: String,
    /// Absolute URL of the thumbnail, if the row had one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Free-text time label such as `"1시간전"`. Not a parsed timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_label: Option<String>,
}

impl Article {
    /// Convenience constructor for an article without optional metadata.
    #[cfg(test)]
    pub fn new(title: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            image_url: None,
            published_label: None,
        }
    }

    /// Loose identity used for deduplication: two articles are the same if
    /// EITHER their titles OR their links are equal.
    pub fn same_story(&self, other: &Article) -> bool {
        self.title == other.title || self.link == other.link
    }
}

/// One outlet's ranking as extracted from a single page load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedOutlet {
    /// Display name of the outlet (e.g. `"연합뉴스"`).
    pub outlet_name: String,
    /// Articles in the order they appear on the page.
    pub articles: Vec<Article>,
}

/// An outlet's accumulated articles in the persisted store.
///
/// `articles` is ordered newest first across runs. `last_updated` is the
/// local run timestamp formatted as `YYYY-MM-DD HH:MM:SS`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct OutletEntry {
    pub outlet_name: String,
    pub articles: Vec<Article>,
    pub last_updated: String,
}
