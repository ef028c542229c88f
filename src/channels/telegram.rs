//! Telegram channel — long-polls the Bot API for updates and sends replies.
//!
//! Inbound: text messages and inline-button presses. Outbound: the
//! `Transport` impl used by the delivery queue. Throttling (HTTP 429) is
//! reported with the server's `retry_after` and never retried here.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::channels::{Channel, EventKind, EventStream, InboundEvent};
use crate::config::TelegramConfig;
use crate::conversation::ConversationId;
use crate::delivery::{
    InteractionAck, OutboundMessage, ParseMode, ReplyControls, Transport, pick_data,
};
use crate::error::{ChannelError, TransportError};

/// Maximum message length for Telegram's sendMessage API.
const TELEGRAM_MAX_MESSAGE_LENGTH: usize = 4096;

/// Buttons per row on inline keyboards.
const BUTTONS_PER_ROW: usize = 2;

/// Pause after a failed or rejected poll.
const POLL_ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Telegram channel — connects to the Bot API via long-polling.
pub struct TelegramChannel {
    bot_token: String,
    allowed_users: Vec<String>,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(bot_token: String, allowed_users: Vec<String>) -> Self {
        Self {
            bot_token,
            allowed_users,
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &TelegramConfig) -> Self {
        Self::new(config.bot_token.clone(), config.allowed_users.clone())
    }

    fn api_url(&self, method: &str) -> String {
        format!("https://api.telegram.org/bot{}/{method}", self.bot_token)
    }

    /// Check if a username is in the allowed list.
    pub fn is_user_allowed(&self, username: &str) -> bool {
        self.allowed_users.iter().any(|u| u == "*" || u == username)
    }

    /// Send one chunk. A formatting rejection is retried once as plain text.
    async fn send_chunk(&self, body: Value) -> Result<(), TransportError> {
        match self.call("sendMessage", &body).await {
            Err(TransportError::Failed(reason))
                if body.get("parse_mode").is_some() && reason.contains("can't parse entities") =>
            {
                tracing::warn!("Telegram rejected formatted text; retrying without parse_mode");
                let mut plain = body;
                if let Some(obj) = plain.as_object_mut() {
                    obj.remove("parse_mode");
                }
                self.call("sendMessage", &plain).await
            }
            other => other,
        }
    }

    async fn call(&self, method: &str, body: &Value) -> Result<(), TransportError> {
        let resp = self
            .client
            .post(self.api_url(method))
            .json(body)
            .send()
            .await
            .map_err(|e| TransportError::Failed(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }

        let data: Value = resp.json().await.unwrap_or(Value::Null);
        Err(api_error(status.as_u16(), &data))
    }
}

/// Map a failed Bot API response onto a transport error.
fn api_error(status: u16, data: &Value) -> TransportError {
    if status == 429 {
        let secs = data
            .pointer("/parameters/retry_after")
            .and_then(Value::as_u64)
            .unwrap_or(1);
        return TransportError::RateLimited {
            retry_after: Duration::from_secs(secs),
        };
    }
    let description = data
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or("no description");
    TransportError::Failed(format!("HTTP {status}: {description}"))
}

/// Pause before polling again after a response without updates. Honors the
/// server's `retry_after` when it sends one.
fn poll_backoff(data: &Value) -> Duration {
    data.pointer("/parameters/retry_after")
        .and_then(Value::as_u64)
        .map(Duration::from_secs)
        .unwrap_or(POLL_ERROR_BACKOFF)
}

/// Telegram `reply_markup` for the given controls.
fn reply_markup(controls: &ReplyControls) -> Option<Value> {
    match controls {
        ReplyControls::None => None,
        ReplyControls::Choices { key, options } => {
            let buttons: Vec<Value> = options
                .iter()
                .enumerate()
                .map(|(i, label)| json!({"text": label, "callback_data": pick_data(key, i)}))
                .collect();
            let rows: Vec<Vec<Value>> = buttons
                .chunks(BUTTONS_PER_ROW)
                .map(<[Value]>::to_vec)
                .collect();
            Some(json!({ "inline_keyboard": rows }))
        }
        ReplyControls::Actions(actions) => {
            let rows: Vec<Vec<Value>> = actions
                .iter()
                .map(|(label, data)| vec![json!({"text": label, "callback_data": data})])
                .collect();
            Some(json!({ "inline_keyboard": rows }))
        }
        ReplyControls::Menu(rows) => {
            let keyboard: Vec<Vec<Value>> = rows
                .iter()
                .map(|row| row.iter().map(|label| json!({ "text": label })).collect())
                .collect();
            Some(json!({ "keyboard": keyboard, "resize_keyboard": true }))
        }
        ReplyControls::RemoveKeyboard => Some(json!({ "remove_keyboard": true })),
    }
}

/// sendMessage bodies for one outbound message. Controls ride on the last chunk.
fn message_bodies(chat_id: &str, message: &OutboundMessage) -> Vec<Value> {
    let chunks = split_message(&message.text, TELEGRAM_MAX_MESSAGE_LENGTH);
    let last = chunks.len().saturating_sub(1);
    chunks
        .into_iter()
        .enumerate()
        .map(|(i, chunk)| {
            let mut body = json!({ "chat_id": chat_id, "text": chunk });
            if message.parse_mode == ParseMode::Html {
                body["parse_mode"] = json!("HTML");
            }
            if i == last
                && let Some(markup) = reply_markup(&message.controls)
            {
                body["reply_markup"] = markup;
            }
            body
        })
        .collect()
}

#[async_trait]
impl Transport for TelegramChannel {
    async fn send(
        &self,
        conversation: &ConversationId,
        message: &OutboundMessage,
    ) -> Result<(), TransportError> {
        for body in message_bodies(conversation.as_str(), message) {
            self.send_chunk(body).await?;
        }
        Ok(())
    }

    async fn acknowledge(&self, ack: &InteractionAck) -> Result<(), TransportError> {
        let mut body = json!({ "callback_query_id": ack.interaction_id });
        if let Some(text) = &ack.text {
            body["text"] = json!(text);
        }
        self.call("answerCallbackQuery", &body).await
    }
}

// ── Channel trait implementation ────────────────────────────────────

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn start(&self) -> Result<EventStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let url = self.api_url("getUpdates");
        let allowed_users = self.allowed_users.clone();
        let client = self.client.clone();

        tokio::spawn(async move {
            let mut offset: i64 = 0;

            tracing::info!("Telegram channel listening for updates...");

            loop {
                let body = json!({
                    "offset": offset,
                    "timeout": 30,
                    "allowed_updates": ["message", "callback_query"]
                });

                let resp = match client.post(&url).json(&body).send().await {
                    Ok(r) => r,
                    Err(e) => {
                        tracing::warn!("Telegram poll error: {e}");
                        tokio::time::sleep(POLL_ERROR_BACKOFF).await;
                        continue;
                    }
                };

                let data: Value = match resp.json().await {
                    Ok(d) => d,
                    Err(e) => {
                        tracing::warn!("Telegram parse error: {e}");
                        tokio::time::sleep(POLL_ERROR_BACKOFF).await;
                        continue;
                    }
                };

                let Some(results) = data.get("result").and_then(Value::as_array) else {
                    let wait = poll_backoff(&data);
                    tracing::warn!(
                        description = data.get("description").and_then(serde_json::Value::as_str).unwrap_or(""),
                        wait_secs = wait.as_secs(),
                        "Telegram poll rejected"
                    );
                    tokio::time::sleep(wait).await;
                    continue;
                };

                for update in results {
                    // Advance offset past this update
                    if let Some(uid) = update.get("update_id").and_then(Value::as_i64) {
                        offset = uid + 1;
                    }

                    let Some(event) = parse_update(update, &allowed_users) else {
                        continue;
                    };

                    if tx.send(event).is_err() {
                        tracing::info!("Telegram listener channel closed");
                        return;
                    }
                }
            }
        });

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        });

        Ok(Box::pin(stream))
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        let resp = self
            .client
            .get(self.api_url("getMe"))
            .send()
            .await
            .map_err(|e| ChannelError::StartupFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(ChannelError::StartupFailed {
                name: "telegram".into(),
                reason: format!("getMe returned {}", resp.status()),
            })
        }
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        tracing::info!("Telegram channel shutting down");
        Ok(())
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

/// Turn one update into an event, or `None` if it is not for us.
fn parse_update(update: &Value, allowed_users: &[String]) -> Option<InboundEvent> {
    let (from, chat, kind) = if let Some(message) = update.get("message") {
        let text = message.get("text").and_then(Value::as_str)?;
        (message.get("from")?, message.get("chat")?, EventKind::Text(text.to_string()))
    } else if let Some(query) = update.get("callback_query") {
        let id = query.get("id").and_then(Value::as_str)?;
        let data = query.get("data").and_then(Value::as_str)?;
        let chat = query.get("message").and_then(|m| m.get("chat"))?;
        (
            query.get("from")?,
            chat,
            EventKind::Interaction {
                interaction_id: id.to_string(),
                data: data.to_string(),
            },
        )
    } else {
        return None;
    };

    let username = from.get("username").and_then(Value::as_str).unwrap_or("unknown");
    let user_id = from.get("id").and_then(Value::as_i64).map(|id| id.to_string());

    // Check allowlist against both username and numeric ID
    let mut identities = vec![username];
    if let Some(ref id) = user_id {
        identities.push(id.as_str());
    }
    if !check_user_allowed(allowed_users, identities.iter().copied()) {
        tracing::warn!(
            "Telegram: ignoring update from unauthorized user: username={username}, user_id={}",
            user_id.as_deref().unwrap_or("unknown")
        );
        return None;
    }

    let chat_id = chat.get("id").and_then(Value::as_i64)?;
    Some(InboundEvent {
        conversation: ConversationId::from(chat_id),
        user: user_id.unwrap_or_else(|| username.to_string()),
        kind,
    })
}

/// Check if any identity in the iterator matches the allowed users list.
fn check_user_allowed<'a>(
    allowed_users: &[String],
    identities: impl IntoIterator<Item = &'a str>,
) -> bool {
    let ids: Vec<&str> = identities.into_iter().collect();
    allowed_users
        .iter()
        .any(|u| u == "*" || ids.contains(&u.as_str()))
}

/// Split a message into chunks that fit Telegram's length limit.
/// Tries to split on newlines, then spaces, then hard-cuts on a char boundary.
fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        if remaining.len() <= max_len {
            chunks.push(remaining.to_string());
            break;
        }

        let mut limit = max_len;
        while !remaining.is_char_boundary(limit) {
            limit -= 1;
        }

        // Find a good split point
        let chunk = &remaining[..limit];
        let split_at = chunk
            .rfind('\n')
            .or_else(|| chunk.rfind(' '))
            .unwrap_or(limit);

        // Don't split at position 0 (infinite loop guard)
        let split_at = if split_at == 0 { limit } else { split_at };

        chunks.push(remaining[..split_at].to_string());
        remaining = remaining[split_at..].trim_start();
    }

    chunks
}

// ── Tests ───────────────────────────────────────────────────────────
