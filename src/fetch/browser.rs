//! Headless Chromium fetcher using chromiumoxide.
//!
//! Navigates to the ranking page, clicks the "load more" control until it is
//! gone (bounded by [`ExpansionPolicy`]), then returns the rendered DOM.
//! Each fetch owns one browser session and closes it on every exit path.

use super::{ExpansionControl, ExpansionPolicy, PageFetcher, expand_until_exhausted};
use crate::config::FetchSettings;
use crate::error::FetchError;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone)]
pub struct BrowserFetcher {
    expand_selector: String,
    user_agent: String,
    navigation_timeout: Duration,
    policy: ExpansionPolicy,
}

impl BrowserFetcher {
    pub fn new(settings: &FetchSettings) -> Self {
        Self {
            expand_selector: settings.expand_selector.clone(),
            user_agent: settings.user_agent.clone(),
            navigation_timeout: Duration::from_secs(settings.navigation_timeout_secs),
            policy: ExpansionPolicy::from(settings),
        }
    }

    /// Upper bound on one whole render: navigation, the expansion loop with
    /// one more settle and check past its own limit, and reading the DOM.
    fn render_deadline(&self) -> Duration {
        self.navigation_timeout * 2 + self.policy.max_duration + self.policy.settle * 2
    }

    async fn render(&self, session: &BrowserSession, url: &str) -> Result<String, FetchError> {
        let page = session.browser.new_page(url).await.map_err(browser_err)?;
        page.wait_for_navigation().await.map_err(browser_err)?;

        let control = SelectorControl {
            page: &page,
            selector: &self.expand_selector,
        };
        expand_until_exhausted(&control, &self.policy).await;

        let html = page.content().await.map_err(browser_err)?;
        if let Err(e) = page.close().await {
            debug!(error = %e, "Failed to close page");
        }
        Ok(html)
    }
}

impl PageFetcher for BrowserFetcher {
    #[instrument(level = "info", skip(self))]
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let session = BrowserSession::launch(&self.user_agent).await?;
        let deadline = self.render_deadline();
        let result = match timeout(deadline, self.render(&session, url)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(secs = deadline.as_secs(), "Page render stalled; giving up");
                Err(FetchError::Timeout {
                    url: url.to_string(),
                    secs: deadline.as_secs(),
                })
            }
        };
        session.close().await;

        if let Ok(html) = &result {
            info!(bytes = html.len(), "Rendered page");
        }
        result
    }
}

/// A launched browser plus its CDP event loop.
struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl BrowserSession {
    async fn launch(user_agent: &str) -> Result<Self, FetchError> {
        let config = BrowserConfig::builder()
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg(format!("--user-agent={user_agent}"))
            .build()
            .map_err(FetchError::Browser)?;

        let (browser, mut handler) = Browser::launch(config).await.map_err(browser_err)?;
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });
        debug!("Launched headless browser");

        Ok(Self { browser, handler })
    }

    async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!(error = %e, "Failed to close browser");
        }
        if let Err(e) = self.browser.wait().await {
            warn!(error = %e, "Failed to reap browser process");
        }
        self.handler.abort();
        debug!("Closed headless browser");
    }
}

/// The "load more" button, located by CSS selector on each check.
struct SelectorControl<'a> {
    page: &'a Page,
    selector: &'a str,
}

impl ExpansionControl for SelectorControl<'_> {
    async fn is_visible(&self) -> Result<bool, FetchError> {
        let selector = serde_json::to_string(self.selector)
            .map_err(|e| FetchError::Browser(e.to_string()))?;
        let script = format!(
            "(() => {{
                const el = document.querySelector({selector});
                if (!el) return false;
                const style = window.getComputedStyle(el);
                const rect = el.getBoundingClientRect();
                return style.display !== 'none' && style.visibility !== 'hidden'
                    && rect.width > 0 && rect.height > 0;
            }})()"
        );
        let result = self.page.evaluate(script).await.map_err(browser_err)?;
        result
            .into_value::<bool>()
            .map_err(|e| FetchError::Browser(e.to_string()))
    }

    async fn activate(&self) -> Result<(), FetchError> {
        let element = self.page.find_element(self.selector).await.map_err(browser_err)?;
        element.click().await.map_err(browser_err)?;
        Ok(())
    }
}

fn browser_err(e: chromiumoxide::error::CdpError) -> FetchError {
    FetchError::Browser(e.to_string())
}
