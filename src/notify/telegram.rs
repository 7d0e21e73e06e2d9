use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{DispatchError, Notifier};
use crate::config::{Config, ConfigError};
use crate::error::Result;

/// `sendMessage` request body.
#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
    disable_web_page_preview: bool,
}

/// Error envelope returned by the Bot API.
#[derive(Debug, Default, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    description: Option<String>,
}

/// Sends alerts to one Telegram chat through the Bot API.
#[derive(Clone)]
pub struct TelegramNotifier {
    http: reqwest::Client,
    api_url: String,
    bot_token: Option<String>,
    chat_id: Option<String>,
}

impl TelegramNotifier {
    /// Build a notifier from configuration.
    ///
    /// Missing credentials are not an error until [`Notifier::send`] is called.
    #[must_use]
    pub fn new(http: reqwest::Client, config: &Config) -> Self {
        Self {
            http,
            api_url: config.telegram_api_url.trim_end_matches('/').to_string(),
            bot_token: config.telegram_bot_token.clone(),
            chat_id: config.telegram_chat_id.clone(),
        }
    }

    fn credentials(&self) -> Result<(&str, &str), ConfigError> {
        let token = self
            .bot_token
            .as_deref()
            .ok_or_else(|| ConfigError::MissingEnvVar("TELEGRAM_BOT_TOKEN".to_string()))?;
        let chat_id = self
            .chat_id
            .as_deref()
            .ok_or_else(|| ConfigError::MissingEnvVar("TELEGRAM_CHAT_ID".to_string()))?;
        Ok((token, chat_id))
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str) -> Result<()> {
        let (token, chat_id) = self.credentials()?;

        let payload = SendMessage {
            chat_id,
            text,
            parse_mode: "Markdown",
            disable_web_page_preview: false,
        };

        // The URL embeds the bot token, so it is kept out of logs and errors.
        let url = format!("{}/bot{token}/sendMessage", self.api_url);
        debug!(chat_id = %chat_id, "Sending Telegram message");

        let response = self
            .http
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| DispatchError::Request(e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            let body: ApiResponse = response.json().await.unwrap_or_default();
            return Err(DispatchError::Rejected {
                status,
                description: body
                    .description
                    .unwrap_or_else(|| "no description".to_string()),
            }
            .into());
        }

        Ok(())
    }
}
