//! Plain HTTP fetcher.
//!
//! Gets the server-rendered page with a desktop browser `User-Agent`. The
//! ranking page renders its first outlets without JavaScript, so this is
//! enough for the default digest of the top five outlets.

use super::PageFetcher;
use crate::config::FetchSettings;
use crate::error::{ConfigError, FetchError};
use reqwest::Client;
use std::time::Duration;
use tracing::{info, instrument};

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(settings: &FetchSettings) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .user_agent(settings.user_agent.as_str())
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()?;
        Ok(Self { client })
    }
}

impl PageFetcher for HttpFetcher {
    #[instrument(level = "info", skip(self))]
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text().await?;
        info!(bytes = body.len(), status = status.as_u16(), "Fetched page");
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new(&FetchSettings::default()).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_sends_browser_user_agent() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/main/ranking/popularDay.naver")
                .header_exists("user-agent");
            then.status(200).body("<div class=\"_popularRanking\"></div>");
        });

        let body = fetcher()
            .fetch(&server.url("/main/ranking/popularDay.naver"))
            .await
            .unwrap();

        mock.assert();
        assert!(body.contains("_popularRanking"));
    }

    #[tokio::test]
    async fn test_non_success_status_is_transport_fault() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/ranking");
            then.status(503);
        });

        let err = fetcher().fetch(&server.url("/ranking")).await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_connection_failure_is_network_fault() {
        // Port 9 (discard) on localhost is not listening in test environments.
        let err = fetcher().fetch("http://127.0.0.1:9/ranking").await.unwrap_err();
        assert!(matches!(err, FetchError::Network(_)));
    }
}
