//! Resolved run settings.
//!
//! Settings come from three layers, later ones winning:
//! 1. Built-in defaults ([`Settings::default`])
//! 2. An optional YAML file (`--config`)
//! 3. Command-line flags and their environment variables ([`Cli`])
//!
//! The result is passed explicitly to each component. Nothing reads the
//! environment after startup.
//!
//! # Example file
//!
//! ```yaml
//! store_path: /var/lib/ranking_digest/news_data.json
//! fetch:
//!   mode: browser
//!   settle_secs: 3
//!   max_expansions: 30
//! digest:
//!   max_outlets: 5
//!   mode: new
//! telegram:
//!   chat_id: "-100123456789"
//! ```

use crate::cli::Cli;
use crate::digest::DigestOptions;
use crate::error::ConfigError;
use crate::publish::TelegramConfig;
use crate::scrapers::ranking::{NAVER_NEWS_ORIGIN, RANKING_PAGE_URL};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// How the ranking page is fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FetchMode {
    /// Plain HTTP GET of the server-rendered page.
    #[default]
    Http,
    /// Headless Chromium with "load more" expansion.
    Browser,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    pub mode: FetchMode,
    pub user_agent: String,
    pub request_timeout_secs: u64,
    pub navigation_timeout_secs: u64,
    /// CSS selector of the "load more" control.
    pub expand_selector: String,
    pub settle_secs: u64,
    pub max_expansions: usize,
    pub max_expansion_secs: u64,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            mode: FetchMode::Http,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout_secs: 30,
            navigation_timeout_secs: 60,
            expand_selector: ".button_rankingnews_more".to_string(),
            settle_secs: 3,
            max_expansions: 50,
            max_expansion_secs: 180,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TelegramSettings {
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
    pub api_base: String,
    pub timeout_secs: u64,
}

impl Default for TelegramSettings {
    fn default() -> Self {
        Self {
            bot_token: None,
            chat_id: None,
            api_base: "https://api.telegram.org".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Ranking page to fetch.
    pub url: String,
    /// Origin used to resolve relative links.
    pub base_url: String,
    pub store_path: PathBuf,
    pub fetch: FetchSettings,
    pub digest: DigestOptions,
    pub telegram: TelegramSettings,
    pub dry_run: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            url: RANKING_PAGE_URL.to_string(),
            base_url: NAVER_NEWS_ORIGIN.to_string(),
            store_path: PathBuf::from("news_data.json"),
            fetch: FetchSettings::default(),
            digest: DigestOptions::default(),
            telegram: TelegramSettings::default(),
            dry_run: false,
        }
    }
}

impl Settings {
    /// Build settings from the CLI, reading `--config` if given.
    pub fn resolve(cli: &Cli) -> Result<Self, ConfigError> {
        let mut settings = match &cli.config {
            Some(path) => Self::from_file(Path::new(path))?,
            None => Self::default(),
        };
        settings.apply_cli(cli);
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(raw)
    }

    fn apply_cli(&mut self, cli: &Cli) {
        if let Some(url) = &cli.url {
            self.url = url.clone();
        }
        if let Some(path) = &cli.store_path {
            self.store_path = path.clone();
        }
        if let Some(mode) = cli.fetch_mode {
            self.fetch.mode = mode;
        }
        if let Some(n) = cli.max_outlets {
            self.digest.max_outlets = n;
        }
        if let Some(n) = cli.max_articles {
            self.digest.max_articles = n;
        }
        if let Some(mode) = cli.digest_mode {
            self.digest.mode = mode;
        }
        if let Some(token) = &cli.bot_token {
            self.telegram.bot_token = Some(token.clone());
        }
        if let Some(chat_id) = &cli.chat_id {
            self.telegram.chat_id = Some(chat_id.clone());
        }
        self.dry_run |= cli.dry_run;
    }

    /// Chat to deliver to. Required unless this is a dry run.
    pub fn chat_id(&self) -> Result<&str, ConfigError> {
        non_empty(&self.telegram.chat_id).ok_or(ConfigError::Missing("telegram chat id (TELEGRAM_CHAT_ID)"))
    }

    /// Publisher configuration. Requires both a bot token and a chat id.
    pub fn telegram_config(&self) -> Result<TelegramConfig, ConfigError> {
        let bot_token = non_empty(&self.telegram.bot_token)
            .ok_or(ConfigError::Missing("telegram bot token (TELEGRAM_BOT_TOKEN)"))?;
        self.chat_id()?;
        Ok(TelegramConfig {
            bot_token: bot_token.to_string(),
            api_base: self.telegram.api_base.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(self.telegram.timeout_secs),
        })
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
