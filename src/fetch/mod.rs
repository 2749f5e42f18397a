//! Page fetching: obtain fully rendered markup for the ranking page.
//!
//! Two fetchers implement [`PageFetcher`]:
//!
//! | Mode | Module | Notes |
//! |------|--------|-------|
//! | `http` | [`http`] | Plain GET with a browser `User-Agent`; server-rendered page only |
//! | `browser` | `browser` | Headless Chromium; clicks "load more" until it disappears (feature `browser`) |
//!
//! The "load more" loop itself is [`expand_until_exhausted`], written against
//! the small [`ExpansionControl`] trait so it can be exercised without a
//! browser.

#[cfg(feature = "browser")]
pub mod browser;
pub mod http;

use crate::config::{FetchMode, FetchSettings};
use crate::error::{ConfigError, FetchError};
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

/// Anything that can turn a URL into rendered page markup.
pub trait PageFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// A "load more" style control on a rendered page.
#[cfg_attr(not(feature = "browser"), allow(dead_code))]
pub trait ExpansionControl {
    /// Whether the control currently exists and is visible. A missing
    /// control is `Ok(false)`.
    async fn is_visible(&self) -> Result<bool, FetchError>;
    /// Click the control once.
    async fn activate(&self) -> Result<(), FetchError>;
}

/// Bounds for the "load more" loop.
#[cfg_attr(not(feature = "browser"), allow(dead_code))]
#[derive(Debug, Clone)]
pub struct ExpansionPolicy {
    /// Wait after each click for new content to render.
    pub settle: Duration,
    /// Stop after this many clicks even if the control is still visible.
    pub max_clicks: usize,
    /// Stop once this much time has passed since the first check.
    pub max_duration: Duration,
}

impl From<&FetchSettings> for ExpansionPolicy {
    fn from(settings: &FetchSettings) -> Self {
        Self {
            settle: Duration::from_secs(settings.settle_secs),
            max_clicks: settings.max_expansions,
            max_duration: Duration::from_secs(settings.max_expansion_secs),
        }
    }
}

/// Click `control` until it is no longer visible, returning the click count.
///
/// Errors while checking or clicking end the loop quietly: the page is
/// treated as fully expanded and whatever has rendered so far is used.
#[cfg_attr(not(feature = "browser"), allow(dead_code))]
#[instrument(level = "info", skip_all, fields(max_clicks = policy.max_clicks))]
pub async fn expand_until_exhausted<C: ExpansionControl>(control: &C, policy: &ExpansionPolicy) -> usize {
    let t0 = Instant::now();
    let mut clicks = 0usize;

    loop {
        if clicks >= policy.max_clicks || t0.elapsed() >= policy.max_duration {
            warn!(
                clicks,
                elapsed_ms = t0.elapsed().as_millis() as u64,
                "Expansion control still present after limit; page never stabilized"
            );
            break;
        }

        match control.is_visible().await {
            Ok(true) => {}
            Ok(false) => {
                debug!(clicks, "Expansion control no longer visible");
                break;
            }
            Err(e) => {
                info!(clicks, error = %e, "Expansion control check failed; treating page as expanded");
                break;
            }
        }

        if let Err(e) = control.activate().await {
            info!(clicks, error = %e, "Expansion click failed; treating page as expanded");
            break;
        }
        clicks += 1;
        sleep(policy.settle).await;
    }

    info!(clicks, elapsed_ms = t0.elapsed().as_millis() as u64, "Page expansion finished");
    clicks
}

/// The fetcher selected by configuration.
#[derive(Debug)]
pub enum Fetcher {
    Http(http::HttpFetcher),
    #[cfg(feature = "browser")]
    Browser(browser::BrowserFetcher),
}

impl Fetcher {
    pub fn from_settings(settings: &FetchSettings) -> Result<Self, ConfigError> {
        match settings.mode {
            FetchMode::Http => Ok(Fetcher::Http(http::HttpFetcher::new(settings)?)),
            #[cfg(feature = "browser")]
            FetchMode::Browser => Ok(Fetcher::Browser(browser::BrowserFetcher::new(settings))),
            #[cfg(not(feature = "browser"))]
            FetchMode::Browser => Err(ConfigError::BrowserUnavailable),
        }
    }
}

impl PageFetcher for Fetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        match self {
            Fetcher::Http(f) => f.fetch(url).await,
            #[cfg(feature = "browser")]
            Fetcher::Browser(f) => f.fetch(url).await,
        }
    }
}
