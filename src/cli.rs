//! Command-line interface definitions for the ranking digest.
//!
//! Every flag is optional: unset flags fall back to the config file and then
//! to built-in defaults (see [`crate::config::Settings`]). Credentials are
//! normally supplied through the environment.

use crate::config::FetchMode;
use crate::digest::DigestMode;
use clap::Parser;
use std::path::PathBuf;

/// Run the scrape → merge → digest pipeline once.
///
/// # Examples
///
/// ```sh
/// # Credentials from the environment, default store next to the binary
/// TELEGRAM_BOT_TOKEN=... TELEGRAM_CHAT_ID=... ranking_digest
///
/// # Expand the full page in a headless browser and only send new articles
/// ranking_digest --fetch-mode browser --digest-mode new
///
/// # Print the digest instead of sending it
/// ranking_digest --dry-run
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML settings file
    #[arg(short, long, env = "RANKING_DIGEST_CONFIG")]
    pub config: Option<String>,

    /// Ranking page URL
    #[arg(long)]
    pub url: Option<String>,

    /// Path of the JSON store file
    #[arg(short, long, env = "RANKING_DIGEST_STORE")]
    pub store_path: Option<PathBuf>,

    /// How to fetch the page
    #[arg(long, value_enum)]
    pub fetch_mode: Option<FetchMode>,

    /// Telegram bot token
    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    pub bot_token: Option<String>,

    /// Telegram chat id to deliver the digest to
    #[arg(long, env = "TELEGRAM_CHAT_ID")]
    pub chat_id: Option<String>,

    /// Maximum number of outlets in the digest
    #[arg(long)]
    pub max_outlets: Option<usize>,

    /// Maximum number of articles per outlet in the digest
    #[arg(long)]
    pub max_articles: Option<usize>,

    /// Which articles the digest shows
    #[arg(long, value_enum)]
    pub digest_mode: Option<DigestMode>,

    /// Print the digest instead of sending it
    #[arg(long)]
    pub dry_run: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing_defaults_to_unset() {
        let cli = Cli::parse_from(["ranking_digest"]);
        assert!(cli.url.is_none());
        assert!(cli.fetch_mode.is_none());
        assert!(!cli.dry_run);
    }

    #[test]
    fn test_cli_value_enums() {
        let cli = Cli::parse_from([
            "ranking_digest",
            "--fetch-mode",
            "browser",
            "--digest-mode",
            "new",
            "-s",
            "/tmp/news.json",
        ]);

        assert_eq!(cli.fetch_mode, Some(FetchMode::Browser));
        assert_eq!(cli.digest_mode, Some(DigestMode::New));
        assert_eq!(cli.store_path, Some(PathBuf::from("/tmp/news.json")));
    }
}
