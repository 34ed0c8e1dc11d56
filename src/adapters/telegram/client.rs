//! Telegram Bot API client implementing the MessagingGateway port.
//!
//! # Configuration
//!
//! ```ignore
//! let config = BotApiConfig::new(token).with_api_base_url("https://api.telegram.org");
//! let client = TelegramClient::new(config)?;
//! ```

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, Secret};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

use super::updates::{RemoteFile, Update};
use crate::domain::form::{FileRef, Reply, ReplyMarkup, TextFormat};
use crate::domain::foundation::UserId;
use crate::ports::{GatewayError, MessagingGateway};

/// Configuration for the Bot API client.
#[derive(Debug, Clone)]
pub struct BotApiConfig {
    bot_token: Secret<String>,
    /// Base URL for the API (default: https://api.telegram.org).
    pub api_base_url: String,
    /// Timeout for ordinary requests; long polls add their own wait on top.
    pub request_timeout: Duration,
}

impl BotApiConfig {
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self {
            bot_token: Secret::new(bot_token.into()),
            api_base_url: "https://api.telegram.org".to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    fn token(&self) -> &str {
        self.bot_token.expose_secret()
    }
}

/// Bot API response envelope.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    error_code: Option<i64>,
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<Value>,
    disable_web_page_preview: bool,
}

/// Bot API client.
pub struct TelegramClient {
    config: BotApiConfig,
    client: Client,
}

impl TelegramClient {
    pub fn new(config: BotApiConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| GatewayError::transport(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }

    fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.config.api_base_url,
            self.config.token(),
            method
        )
    }

    fn file_url(&self, file_path: &str) -> String {
        format!(
            "{}/file/bot{}/{}",
            self.config.api_base_url,
            self.config.token(),
            file_path
        )
    }

    async fn call<P, R>(&self, method: &str, params: &P, timeout: Option<Duration>) -> Result<R, GatewayError>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let mut request = self.client.post(self.method_url(method)).json(params);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        let response = request.send().await.map_err(transport_error)?;
        parse_envelope(response).await
    }

    /// Long-polls for updates after `offset`.
    pub async fn get_updates(&self, offset: i64, poll_timeout: Duration) -> Result<Vec<Update>, GatewayError> {
        let params = json!({
            "offset": offset,
            "timeout": poll_timeout.as_secs(),
            "allowed_updates": ["message", "callback_query"],
        });
        self.call(
            "getUpdates",
            &params,
            Some(self.config.request_timeout + poll_timeout),
        )
        .await
    }

    /// Stops the client-side spinner on a pressed button.
    pub async fn answer_callback_query(&self, callback_id: &str) -> Result<(), GatewayError> {
        let _: bool = self
            .call(
                "answerCallbackQuery",
                &json!({ "callback_query_id": callback_id }),
                None,
            )
            .await?;
        Ok(())
    }
}

fn transport_error(e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::transport(format!("Request timed out: {}", e))
    } else if e.is_connect() {
        GatewayError::transport(format!("Connection failed: {}", e))
    } else {
        GatewayError::transport(e.to_string())
    }
}

async fn parse_envelope<R: DeserializeOwned>(response: Response) -> Result<R, GatewayError> {
    let status = response.status();
    let body = response.text().await.map_err(transport_error)?;
    let envelope: ApiResponse<R> = serde_json::from_str(&body).map_err(|e| {
        GatewayError::transport(format!("Unexpected response ({}): {}", status, e))
    })?;

    match (envelope.ok, envelope.result) {
        (true, Some(result)) => Ok(result),
        _ => Err(GatewayError::Rejected {
            code: envelope.error_code.unwrap_or_else(|| i64::from(status.as_u16())),
            description: envelope
                .description
                .unwrap_or_else(|| "no description".to_string()),
        }),
    }
}

/// Bot API `reply_markup` for a reply keyboard.
pub fn reply_markup_json(markup: &ReplyMarkup) -> Option<Value> {
    match markup {
        ReplyMarkup::None => None,
        ReplyMarkup::Inline(buttons) => Some(json!({
            "inline_keyboard": buttons
                .iter()
                .map(|b| vec![json!({ "text": b.label, "callback_data": b.id })])
                .collect::<Vec<_>>(),
        })),
        ReplyMarkup::RequestLocation { label } => Some(json!({
            "keyboard": [[{ "text": label, "request_location": true }]],
            "resize_keyboard": true,
            "one_time_keyboard": true,
        })),
        ReplyMarkup::RemoveKeyboard => Some(json!({ "remove_keyboard": true })),
    }
}

#[async_trait]
impl MessagingGateway for TelegramClient {
    async fn send(&self, recipient: &UserId, reply: &Reply) -> Result<(), GatewayError> {
        let message = SendMessage {
            chat_id: recipient.as_str(),
            text: &reply.text,
            parse_mode: match reply.format {
                TextFormat::Html => Some("HTML"),
                TextFormat::Plain => None,
            },
            reply_markup: reply_markup_json(&reply.markup),
            disable_web_page_preview: true,
        };
        let _: Value = self.call("sendMessage", &message, None).await?;
        Ok(())
    }

    async fn download_to(&self, file: &FileRef, dest: &Path) -> Result<u64, GatewayError> {
        let remote: RemoteFile = self
            .call("getFile", &json!({ "file_id": file.as_str() }), None)
            .await
            .map_err(|e| GatewayError::FileUnavailable(e.to_string()))?;
        let file_path = remote
            .file_path
            .ok_or_else(|| GatewayError::FileUnavailable(format!("{} has no path", remote.file_id)))?;

        let response = self
            .client
            .get(self.file_url(&file_path))
            .send()
            .await
            .map_err(transport_error)?;
        if !response.status().is_success() {
            return Err(GatewayError::FileUnavailable(format!(
                "download returned {}",
                response.status()
            )));
        }

        let mut out = tokio::fs::File::create(dest)
            .await
            .map_err(|e| GatewayError::Io(e.to_string()))?;
        let mut written = 0u64;
        let mut chunks = response.bytes_stream();
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk.map_err(transport_error)?;
            out.write_all(&chunk)
                .await
                .map_err(|e| GatewayError::Io(e.to_string()))?;
            written += chunk.len() as u64;
        }
        out.flush().await.map_err(|e| GatewayError::Io(e.to_string()))?;
        Ok(written)
    }
}
