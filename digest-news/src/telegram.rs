//! Telegram Bot API delivery

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{error, info};

use crate::error::NewsError;
use crate::notifier::Notifier;

const TELEGRAM_API_URL: &str = "https://api.telegram.org";

/// Sends digest messages to a single Telegram chat
pub struct TelegramNotifier {
    client: Client,
    api_url: String,
    bot_token: String,
    chat_id: String,
}

impl TelegramNotifier {
    /// Create a notifier for `chat_id` using `bot_token`
    pub fn new(
        bot_token: impl Into<String>,
        chat_id: impl Into<String>,
    ) -> Result<Self, NewsError> {
        Self::with_api_url(TELEGRAM_API_URL, bot_token, chat_id)
    }

    /// Create a notifier against a different Bot API host
    pub fn with_api_url(
        api_url: &str,
        bot_token: impl Into<String>,
        chat_id: impl Into<String>,
    ) -> Result<Self, NewsError> {
        let bot_token = bot_token.into();
        let chat_id = chat_id.into();

        if bot_token.trim().is_empty() {
            return Err(NewsError::InvalidConfig("Telegram bot token is empty".to_string()));
        }
        if chat_id.trim().is_empty() {
            return Err(NewsError::InvalidConfig("Telegram chat id is empty".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .map_err(|e| NewsError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            bot_token,
            chat_id,
        })
    }

    fn send_message_url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_url, self.bot_token)
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str) -> Result<(), NewsError> {
        let payload = [
            ("chat_id", self.chat_id.as_str()),
            ("text", text),
            ("disable_web_page_preview", "true"),
        ];

        // The request URL embeds the bot token
        let response = self
            .client
            .post(self.send_message_url())
            .form(&payload)
            .send()
            .await
            .map_err(|e| NewsError::from(e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Telegram sendMessage failed ({}): {}", status.as_u16(), body);
            return Err(NewsError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        // Drain the body so the connection can be reused
        response
            .bytes()
            .await
            .map_err(|e| NewsError::from(e.without_url()))?;

        info!("Delivered digest to Telegram chat {}", self.chat_id);
        Ok(())
    }
}
