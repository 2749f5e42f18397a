//! Telegram MarkdownV2 digest rendering.
//!
//! A digest looks like:
//!
//! ```text
//! *2025년 05월 06일 14시 기준 언론사별 뉴스 랭킹*
//!
//!
//! 📰 *연합뉴스*
//! 1\. [첫 번째 기사](https://n.news.naver.com/article/001/0001)
//! 2\. [두 번째 기사](https://n.news.naver.com/article/001/0002)
//! ```
//!
//! Literal text (timestamp label, outlet names, titles) is escaped for
//! MarkdownV2; links are embedded as is.

use crate::error::DigestError;
use crate::models::ExtractedOutlet;
use chrono::NaiveDateTime;
use itertools::Itertools;
use serde::Deserialize;
use tracing::{debug, warn};

/// Telegram's message length limit.
pub const MAX_MESSAGE_LEN: usize = 4096;

const TRUNCATE_TO: usize = MAX_MESSAGE_LEN - 6;
/// `...` escaped for MarkdownV2, where `.` is reserved.
const ELLIPSIS: &str = "\\.\\.\\.";

const MARKDOWN_V2_SPECIAL: &[char] = &[
    '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
];

/// Which articles go into the digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DigestMode {
    /// The current ranking of each outlet, as extracted this run.
    #[default]
    Latest,
    /// Only articles this run added to the store.
    New,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DigestOptions {
    pub max_outlets: usize,
    pub max_articles: usize,
    pub mode: DigestMode,
}

impl Default for DigestOptions {
    fn default() -> Self {
        Self {
            max_outlets: 5,
            max_articles: 5,
            mode: DigestMode::Latest,
        }
    }
}

/// Backslash-escape every MarkdownV2 special character in `text`.
pub fn escape_markdown_v2(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if MARKDOWN_V2_SPECIAL.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Render `outlets` into a single MarkdownV2 message.
///
/// Outlets with no articles are skipped; at most `max_outlets` outlets and
/// `max_articles` articles per outlet are shown, in the given order.
///
/// # Errors
///
/// [`DigestError::Empty`] if no outlet contributed anything beyond the header.
pub fn format_digest(
    outlets: &[ExtractedOutlet],
    run_at: NaiveDateTime,
    options: &DigestOptions,
) -> Result<String, DigestError> {
    let label = run_at.format("%Y년 %m월 %d일 %H시 기준").to_string();
    let mut parts = vec![format!("*{} 언론사별 뉴스 랭킹*", escape_markdown_v2(&label))];

    for outlet in outlets
        .iter()
        .filter(|o| !o.articles.is_empty())
        .take(options.max_outlets)
    {
        parts.push(format!("\n\n📰 *{}*", escape_markdown_v2(&outlet.outlet_name)));
        for (i, article) in outlet.articles.iter().take(options.max_articles).enumerate() {
            parts.push(format!(
                "{}\\. [{}]({})",
                i + 1,
                escape_markdown_v2(&article.title),
                article.link
            ));
        }
    }

    if parts.len() == 1 {
        return Err(DigestError::Empty);
    }

    let message = parts.iter().join("\n");
    debug!(chars = message.chars().count(), sections = parts.len(), "Composed digest");
    Ok(truncate_message(message))
}

/// Cut messages longer than [`MAX_MESSAGE_LEN`] characters.
///
/// The first `MAX_MESSAGE_LEN - 6` characters are kept, then trimmed back to
/// the last complete line so no inline link or escape is split, and an
/// escaped ellipsis is appended. The result never exceeds the limit.
pub fn truncate_message(message: String) -> String {
    let len = message.chars().count();
    if len <= MAX_MESSAGE_LEN {
        return message;
    }
    warn!(chars = len, max = MAX_MESSAGE_LEN, "Digest too long; truncating");
    let mut cut: String = message.chars().take(TRUNCATE_TO).collect();
    match cut.rfind('\n') {
        Some(end) => cut.truncate(end + 1),
        None => {
            // A single oversized line: at least avoid a dangling escape.
            let trailing = cut.chars().rev().take_while(|&c| c == '\\').count();
            if trailing % 2 == 1 {
                cut.pop();
            }
        }
    }
    cut.push_str(ELLIPSIS);
    cut
}
