use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

use crate::config::BotConfig;
use crate::notify::Messenger;
use crate::utils::error::AppError;
use crate::Result;

/// Longest text accepted by `sendMessage`.
pub const MESSAGE_LIMIT: usize = 4096;

#[derive(Debug, Clone, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub message_id: i64,
    pub from: Option<User>,
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    pub first_name: String,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chat {
    pub id: i64,
}

/// Minimal client for the Telegram Bot HTTP API.
#[derive(Clone)]
pub struct TelegramClient {
    client: Client,
    base_url: String,
    poll_timeout_secs: u64,
    request_timeout: Duration,
}

impl std::fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The base url embeds the token
        f.debug_struct("TelegramClient")
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

impl TelegramClient {
    pub fn new(config: &BotConfig, token: &str) -> Result<Self> {
        let client = Client::builder().build()?;

        Ok(Self {
            client,
            base_url: format!("{}/bot{}", config.api_url.trim_end_matches('/'), token),
            poll_timeout_secs: config.poll_timeout_secs,
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        payload: serde_json::Value,
        timeout: Duration,
    ) -> Result<T> {
        let response = self
            .client
            .post(format!("{}/{}", self.base_url, method))
            .timeout(timeout)
            .json(&payload)
            .send()
            .await
            .map_err(|e| AppError::Http(e.without_url()))?;

        let body: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| AppError::Http(e.without_url()))?;

        if !body.ok {
            return Err(AppError::BotApi {
                method: method.to_string(),
                description: body.description.unwrap_or_else(|| "unknown error".to_string()),
            });
        }

        body.result.ok_or_else(|| AppError::BotApi {
            method: method.to_string(),
            description: "response without result".to_string(),
        })
    }

    /// Checks the token by asking for the bot's own account.
    pub async fn get_me(&self) -> Result<User> {
        self.call("getMe", json!({}), self.request_timeout).await
    }

    /// Long-polls for updates after `offset`.
    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>> {
        let payload = json!({
            "offset": offset,
            "timeout": self.poll_timeout_secs,
            "allowed_updates": ["message"],
        });

        // The server holds the request for up to poll_timeout_secs
        let timeout = Duration::from_secs(self.poll_timeout_secs) + self.request_timeout;
        self.call("getUpdates", payload, timeout).await
    }

    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        for chunk in split_message(text, MESSAGE_LIMIT) {
            let payload = json!({
                "chat_id": chat_id,
                "text": chunk,
                "disable_web_page_preview": true,
            });
            let _: serde_json::Value = self
                .call("sendMessage", payload, self.request_timeout)
                .await?;
        }

        Ok(())
    }
}

#[async_trait]
impl Messenger for TelegramClient {
    async fn send(&self, recipient: i64, text: &str) -> Result<()> {
        self.send_message(recipient, text).await
    }
}

/// Splits `text` into chunks of at most `limit` characters, preferring
/// line boundaries. Lines longer than `limit` are cut hard.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    if text.chars().count() <= limit {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split_inclusive('\n') {
        let line_len = line.chars().count();

        if current_len + line_len > limit && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if line_len > limit {
            let chars: Vec<char> = line.chars().collect();
            for piece in chars.chunks(limit) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }

        current.push_str(line);
        current_len += line_len;
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}
