//! Digest delivery to a Telegram chat.
//!
//! [`TelegramPublisher`] calls the Bot API `sendMessage` method with
//! MarkdownV2 parsing and link previews disabled, matching the escaping done
//! by [`crate::digest`]. [`StdoutPublisher`] prints the digest instead, for
//! dry runs.
//!
//! Credentials are passed in through [`TelegramConfig`] at construction;
//! nothing here reads the environment.

use crate::error::{ConfigError, DeliveryError};
use crate::utils::truncate_for_log;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{error, info, instrument};

/// Anything that can deliver a formatted digest to a chat.
pub trait Publisher {
    async fn send(&self, chat_id: &str, text: &str) -> Result<(), DeliveryError>;
}

/// Telegram Bot API connection settings.
#[derive(Clone)]
pub struct TelegramConfig {
    /// Bot token from @BotFather.
    pub bot_token: String,
    /// API origin, `https://api.telegram.org` outside of tests.
    pub api_base: String,
    pub timeout: Duration,
}

impl fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug)]
pub struct TelegramPublisher {
    client: Client,
    config: TelegramConfig,
}

impl TelegramPublisher {
    pub fn new(config: TelegramConfig) -> Result<Self, ConfigError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!("{}/bot{}/sendMessage", self.config.api_base, self.config.bot_token)
    }
}

impl Publisher for TelegramPublisher {
    #[instrument(level = "info", skip(self, text), fields(chars = text.chars().count()))]
    async fn send(&self, chat_id: &str, text: &str) -> Result<(), DeliveryError> {
        let t0 = Instant::now();
        let body = SendMessage {
            chat_id,
            text,
            parse_mode: "MarkdownV2",
            disable_web_page_preview: true,
        };

        let response = self.client.post(self.endpoint()).json(&body).send().await?;
        let status = response.status();
        let raw = response.text().await?;
        let parsed = serde_json::from_str::<ApiResponse>(&raw).ok();

        match parsed {
            Some(ApiResponse { ok: true, .. }) if status.is_success() => {
                info!(elapsed_ms = t0.elapsed().as_millis() as u64, "Digest sent");
                Ok(())
            }
            _ => {
                let description = parsed
                    .and_then(|r| r.description)
                    .unwrap_or_else(|| truncate_for_log(&raw, 300));
                error!(status = status.as_u16(), %description, "Telegram rejected message");
                Err(DeliveryError::Rejected {
                    status: status.as_u16(),
                    description,
                })
            }
        }
    }
}

/// Prints the digest to stdout instead of sending it.
#[derive(Debug, Default)]
pub struct StdoutPublisher;

impl Publisher for StdoutPublisher {
    async fn send(&self, chat_id: &str, text: &str) -> Result<(), DeliveryError> {
        info!(%chat_id, "Dry run; printing digest instead of sending");
        println!("{text}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn publisher(api_base: String) -> TelegramPublisher {
        TelegramPublisher::new(TelegramConfig {
            bot_token: "123:abc".to_string(),
            api_base,
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_send_posts_markdown_v2_without_preview() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/bot123:abc/sendMessage")
                .json_body(json!({
                    "chat_id": "-10042",
                    "text": "*hello*",
                    "parse_mode": "MarkdownV2",
                    "disable_web_page_preview": true
                }));
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(json!({"ok": true, "result": {"message_id": 1}}));
        });

        publisher(server.base_url()).send("-10042", "*hello*").await.unwrap();
        mock.assert();
    }

    #[tokio::test]
    async fn test_rejection_carries_description() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/bot123:abc/sendMessage");
            then.status(400).json_body(json!({
                "ok": false,
                "error_code": 400,
                "description": "Bad Request: can't parse entities"
            }));
        });

        let err = publisher(server.base_url()).send("1", "x.").await.unwrap_err();
        match err {
            DeliveryError::Rejected { status, description } => {
                assert_eq!(status, 400);
                assert!(description.contains("can't parse entities"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_ok_false_with_http_200_is_rejected() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/bot123:abc/sendMessage");
            then.status(200).json_body(json!({
                "ok": false,
                "description": "Forbidden: bot was blocked by the user"
            }));
        });

        let err = publisher(server.base_url()).send("1", "x").await.unwrap_err();
        assert!(matches!(
            err,
            DeliveryError::Rejected { status: 200, ref description } if description.contains("blocked")
        ));
    }

    #[tokio::test]
    async fn test_non_json_error_body_is_reported() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/bot123:abc/sendMessage");
            then.status(502).body("Bad Gateway");
        });

        let err = publisher(server.base_url()).send("1", "x").await.unwrap_err();
        assert!(matches!(
            err,
            DeliveryError::Rejected { status: 502, ref description } if description == "Bad Gateway"
        ));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        let err = publisher("http://127.0.0.1:9".to_string())
            .send("1", "x")
            .await
            .unwrap_err();
        assert!(matches!(err, DeliveryError::Transport(_)));
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = TelegramConfig {
            bot_token: "123:secret".to_string(),
            api_base: "https://api.telegram.org".to_string(),
            timeout: Duration::from_secs(30),
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
