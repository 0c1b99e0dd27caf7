use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use forumbot_core::{ChatId, UserId};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("platform returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("no delivery address known for user {0}")]
    MissingDestination(UserId),
}

/// One button in an inline keyboard row. Serialized straight into the
/// platform's attachment payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Button {
    Callback { text: String, payload: String },
    Link { text: String, url: String },
}

impl Button {
    pub fn callback(text: impl Into<String>, payload: impl Into<String>) -> Self {
        Self::Callback { text: text.into(), payload: payload.into() }
    }

    pub fn link(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self::Link { text: text.into(), url: url.into() }
    }
}

/// Outbound message: text plus optional button rows and an optional image.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub text: String,
    pub buttons: Vec<Vec<Button>>,
    pub image_url: Option<String>,
}

impl OutgoingMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into(), ..Self::default() }
    }

    pub fn with_buttons(mut self, rows: Vec<Vec<Button>>) -> Self {
        self.buttons = rows;
        self
    }

    pub fn with_image(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }
}

/// Outbound side of the messaging platform. `send` returns the platform's
/// reference for the delivered message when one is available, so callers can
/// delete it later; `delete` reports whether the message still existed.
#[async_trait]
pub trait MessageGateway: Send + Sync {
    async fn send(&self, chat: ChatId, message: &OutgoingMessage) -> Result<Option<String>, GatewayError>;

    async fn delete(&self, message_ref: &str) -> Result<bool, GatewayError>;
}

/// HTTP client for the MAX platform API.
pub struct MaxGateway {
    http: reqwest::Client,
    base_url: String,
    token: SecretString,
}

impl MaxGateway {
    pub fn new(
        base_url: impl Into<String>,
        token: SecretString,
        request_timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder().timeout(request_timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Ok(Self { http, base_url, token })
    }
}

#[async_trait]
impl MessageGateway for MaxGateway {
    async fn send(&self, chat: ChatId, message: &OutgoingMessage) -> Result<Option<String>, GatewayError> {
        let mut attachments = Vec::new();
        if let Some(url) = &message.image_url {
            attachments.push(json!({
                "type": "image",
                "payload": { "url": url },
            }));
        }
        if !message.buttons.is_empty() {
            attachments.push(json!({
                "type": "inline_keyboard",
                "payload": { "buttons": message.buttons },
            }));
        }

        let body = json!({
            "text": message.text,
            "attachments": attachments,
        });

        let response = self
            .http
            .post(format!("{}/messages", self.base_url))
            .query(&[("chat_id", chat.0)])
            .header("Authorization", self.token.expose_secret())
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let payload: serde_json::Value = response.json().await?;
        let message_ref = payload
            .pointer("/message/body/mid")
            .and_then(|v| v.as_str())
            .map(str::to_owned);
        debug!(chat = %chat, message_ref = ?message_ref, "message delivered");
        Ok(message_ref)
    }

    async fn delete(&self, message_ref: &str) -> Result<bool, GatewayError> {
        let response = self
            .http
            .delete(format!("{}/messages", self.base_url))
            .query(&[("message_id", message_ref)])
            .header("Authorization", self.token.expose_secret())
            .send()
            .await?;

        // already gone counts as deleted-enough
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(false);
        }
        if !response.status().is_success() {
            return Err(status_error(response).await);
        }
        Ok(true)
    }
}

pub(crate) async fn status_error(response: reqwest::Response) -> GatewayError {
    let status = response.status().as_u16();
    let mut body = response.text().await.unwrap_or_default();
    if body.len() > 200 {
        body.truncate(200);
    }
    GatewayError::Status { status, body }
}

#[cfg(test)]
mod tests {
    use super::{Button, OutgoingMessage};

    #[test]
    fn buttons_serialize_with_a_type_tag() {
        let row = vec![
            Button::callback("Да", "registered"),
            Button::link("Сайт", "https://example.ru"),
        ];
        let json = serde_json::to_value(&row).expect("serialize");
        assert_eq!(json[0]["type"], "callback");
        assert_eq!(json[0]["payload"], "registered");
        assert_eq!(json[1]["type"], "link");
        assert_eq!(json[1]["url"], "https://example.ru");
    }

    #[test]
    fn builder_composes_image_and_buttons() {
        let message = OutgoingMessage::text("привет")
            .with_image("https://img.example.ru/a.png")
            .with_buttons(vec![vec![Button::callback("Ок", "ok")]]);
        assert_eq!(message.text, "привет");
        assert_eq!(message.image_url.as_deref(), Some("https://img.example.ru/a.png"));
        assert_eq!(message.buttons.len(), 1);
    }
}
