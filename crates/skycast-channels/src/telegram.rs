//! Telegram Bot channel: long polling + message sending via Bot API.

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use skycast_core::config::TelegramConfig;
use skycast_core::error::{Result, SkycastError};
use skycast_core::traits::MessageSink;
use skycast_core::types::RecipientId;

use crate::command::{BotCommand, ChatEvent};

/// Seconds Telegram may hold a `getUpdates` call open.
const LONG_POLL_SECS: u64 = 30;

/// Telegram Bot API client.
#[derive(Debug, Clone)]
pub struct TelegramChannel {
    bot_token: String,
    api_base: String,
    poll_interval: u64,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(bot_token: &str, config: &TelegramConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.send_timeout_secs))
            .build()
            .map_err(|e| SkycastError::Config(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            bot_token: bot_token.to_string(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            poll_interval: config.poll_interval,
            client,
        })
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.bot_token, method)
    }

    /// Get updates after `offset` using long polling.
    pub async fn get_updates(&self, offset: i64) -> Result<Vec<TelegramUpdate>> {
        let response = self
            .client
            .get(self.api_url("getUpdates"))
            .query(&[
                ("offset", offset.to_string()),
                ("timeout", LONG_POLL_SECS.to_string()),
                ("allowed_updates", "[\"message\"]".into()),
            ])
            .timeout(Duration::from_secs(LONG_POLL_SECS + 10))
            .send()
            .await
            .map_err(|e| SkycastError::Upstream(format!("Telegram getUpdates failed: {e}")))?;

        let body: TelegramApiResponse<Vec<TelegramUpdate>> = response
            .json()
            .await
            .map_err(|e| SkycastError::Upstream(format!("Invalid Telegram response: {e}")))?;

        if !body.ok {
            return Err(SkycastError::Upstream(format!(
                "Telegram API error: {}",
                body.description.unwrap_or_default()
            )));
        }
        Ok(body.result.unwrap_or_default())
    }

    /// Send a silent text message.
    pub async fn send_message(&self, chat_id: RecipientId, text: &str) -> Result<()> {
        let body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
            "disable_notification": true,
        });

        let response = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&body)
            .send()
            .await
            .map_err(|e| SkycastError::Delivery(format!("sendMessage failed: {e}")))?;

        let status = response.status();
        let result: TelegramApiResponse<serde_json::Value> = response.json().await.map_err(|e| {
            SkycastError::Delivery(format!("Invalid send response ({status}): {e}"))
        })?;

        if !result.ok {
            return Err(SkycastError::Delivery(format!(
                "Send to {chat_id} failed: {}",
                result.description.unwrap_or_default()
            )));
        }
        Ok(())
    }

    /// Get bot info.
    pub async fn get_me(&self) -> Result<TelegramUser> {
        let response = self
            .client
            .get(self.api_url("getMe"))
            .send()
            .await
            .map_err(|e| SkycastError::Upstream(format!("getMe failed: {e}")))?;
        let body: TelegramApiResponse<TelegramUser> = response
            .json()
            .await
            .map_err(|e| SkycastError::Upstream(format!("Invalid getMe response: {e}")))?;
        if !body.ok {
            return Err(SkycastError::Config(format!(
                "Telegram rejected the bot token: {}",
                body.description.unwrap_or_default()
            )));
        }
        body.result
            .ok_or_else(|| SkycastError::Upstream("No bot info".into()))
    }

    /// Start polling loop: returns a stream of chat events for bot `me`.
    pub fn start_polling(&self, me: TelegramUser) -> TelegramPollingStream {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let channel = self.clone();

        tokio::spawn(async move {
            let mut offset = 0i64;
            tracing::info!("Telegram polling loop started");

            loop {
                match channel.get_updates(offset).await {
                    Ok(updates) => {
                        for update in updates {
                            offset = offset.max(update.update_id + 1);
                            let Some(event) = update.to_event(&me) else {
                                continue;
                            };
                            if tx.send(event).is_err() {
                                tracing::info!("Telegram polling stopped (receiver dropped)");
                                return;
                            }
                        }
                    }
                    Err(e) => {
                        tracing::error!("Telegram polling error: {e}");
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }

                tokio::time::sleep(Duration::from_secs(channel.poll_interval)).await;
            }
        });

        TelegramPollingStream { rx }
    }
}

/// Stream of chat events from polling.
pub struct TelegramPollingStream {
    rx: tokio::sync::mpsc::UnboundedReceiver<ChatEvent>,
}

impl Stream for TelegramPollingStream {
    type Item = ChatEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

#[async_trait]
impl MessageSink for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send(&self, recipient: RecipientId, text: &str) -> Result<()> {
        self.send_message(recipient, text).await
    }
}

// --- Telegram API Types ---

#[derive(Debug, Deserialize)]
pub struct TelegramApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramUpdate {
    pub update_id: i64,
    pub message: Option<TelegramMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramMessage {
    pub message_id: i64,
    pub from: Option<TelegramUser>,
    pub chat: TelegramChat,
    pub text: Option<String>,
    pub date: i64,
    #[serde(default)]
    pub new_chat_members: Vec<TelegramUser>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramUser {
    pub id: i64,
    pub is_bot: bool,
    pub first_name: String,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramChat {
    pub id: i64,
    #[serde(rename = "type")]
    pub chat_type: String,
    pub title: Option<String>,
}

impl TelegramUpdate {
    /// Convert to a chat event, from the point of view of bot `me`.
    pub fn to_event(&self, me: &TelegramUser) -> Option<ChatEvent> {
        let msg = self.message.as_ref()?;
        let chat_id = msg.chat.id;

        if msg.new_chat_members.iter().any(|m| m.id == me.id) {
            return Some(ChatEvent::BotAdded { chat_id });
        }

        // Skip bot messages
        if msg.from.as_ref().is_some_and(|f| f.is_bot) {
            return None;
        }

        let command = BotCommand::parse(msg.text.as_deref()?, me.username.as_deref())?;
        Some(ChatEvent::Command { chat_id, command })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn me() -> TelegramUser {
        TelegramUser {
            id: 999,
            is_bot: true,
            first_name: "Sky".into(),
            username: Some("SkyBot".into()),
        }
    }

    fn channel(server: &MockServer) -> TelegramChannel {
        let config = TelegramConfig {
            api_base: server.uri(),
            ..TelegramConfig::default()
        };
        TelegramChannel::new("TOKEN", &config).unwrap()
    }

    fn update(json: serde_json::Value) -> TelegramUpdate {
        serde_json::from_value(json).unwrap()
    }

    #[tokio::test]
    async fn test_send_message_ok() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/botTOKEN/sendMessage"))
            .and(body_partial_json(serde_json::json!({
                "chat_id": -100123,
                "text": "hi",
                "disable_notification": true
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "result": {"message_id": 1}
            })))
            .expect(1)
            .mount(&server)
            .await;

        channel(&server).send(-100123, "hi").await.unwrap();
    }

    #[tokio::test]
    async fn test_blocked_chat_is_delivery_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/botTOKEN/sendMessage"))
            .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
                "ok": false,
                "error_code": 403,
                "description": "Forbidden: bot was blocked by the user"
            })))
            .mount(&server)
            .await;

        let err = channel(&server).send(5, "hi").await.unwrap_err();
        assert!(matches!(err, SkycastError::Delivery(_)));
        assert!(err.to_string().contains("blocked"));
    }

    #[tokio::test]
    async fn test_non_json_reply_is_delivery_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
            .mount(&server)
            .await;

        let err = channel(&server).send(5, "hi").await.unwrap_err();
        assert!(matches!(err, SkycastError::Delivery(_)));
    }

    #[tokio::test]
    async fn test_get_updates_parses_result() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/botTOKEN/getUpdates"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "result": [{
                    "update_id": 7,
                    "message": {
                        "message_id": 1,
                        "from": {"id": 1, "is_bot": false, "first_name": "A"},
                        "chat": {"id": 42, "type": "private"},
                        "text": "/today",
                        "date": 0
                    }
                }]
            })))
            .mount(&server)
            .await;

        let updates = channel(&server).get_updates(0).await.unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(
            updates[0].to_event(&me()),
            Some(ChatEvent::Command { chat_id: 42, command: BotCommand::Today })
        );
    }

    #[test]
    fn test_bot_added_to_group() {
        let u = update(serde_json::json!({
            "update_id": 1,
            "message": {
                "message_id": 1,
                "from": {"id": 1, "is_bot": false, "first_name": "Admin"},
                "chat": {"id": -100500, "type": "supergroup", "title": "Dacha"},
                "date": 0,
                "new_chat_members": [
                    {"id": 2, "is_bot": false, "first_name": "Someone"},
                    {"id": 999, "is_bot": true, "first_name": "Sky", "username": "SkyBot"}
                ]
            }
        }));
        assert_eq!(u.to_event(&me()), Some(ChatEvent::BotAdded { chat_id: -100500 }));
    }

    #[test]
    fn test_other_member_added_is_ignored() {
        let u = update(serde_json::json!({
            "update_id": 1,
            "message": {
                "message_id": 1,
                "chat": {"id": -1, "type": "group"},
                "date": 0,
                "new_chat_members": [{"id": 2, "is_bot": false, "first_name": "Someone"}]
            }
        }));
        assert_eq!(u.to_event(&me()), None);
    }

    #[test]
    fn test_messages_from_bots_are_ignored() {
        let u = update(serde_json::json!({
            "update_id": 1,
            "message": {
                "message_id": 1,
                "from": {"id": 3, "is_bot": true, "first_name": "Spam"},
                "chat": {"id": 10, "type": "group"},
                "text": "/stop",
                "date": 0
            }
        }));
        assert_eq!(u.to_event(&me()), None);
    }
}
