//! LINE Messaging API: webhook payloads in, reply messages out.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::bot::quick_reply::QuickReply;

const LINE_REPLY_URL: &str = "https://api.line.me/v2/bot/message/reply";

/// LINE rejects text messages longer than this.
const MAX_TEXT_CHARS: usize = 5000;
/// LINE rejects quick-reply labels longer than this.
const MAX_LABEL_CHARS: usize = 20;

pub const NOT_A_MESSAGE: &str = "Error: Event is not a message type.";
pub const NOT_TEXT: &str = "Error: Message is not a text type.";

// ==================== WEBHOOK ====================

#[derive(Debug, Deserialize)]
pub struct WebhookBody {
    #[serde(default)]
    pub events: Vec<WebhookEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub reply_token: Option<String>,
    pub source: Option<EventSource>,
    pub message: Option<EventMessage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSource {
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EventMessage {
    #[serde(rename = "type")]
    pub message_type: String,
    pub text: Option<String>,
}

/// A webhook event reduced to what the dispatcher handles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    Text {
        user_id: String,
        reply_token: String,
        text: String,
    },
    /// Anything else; answered with a fixed error text and logged under
    /// `user_id` when the source names one.
    Unsupported {
        user_id: Option<String>,
        reply_token: String,
        /// Event or message type that was received, e.g. `follow` or `sticker`.
        received: String,
        reason: &'static str,
    },
}

impl InboundEvent {
    pub fn reply_token(&self) -> &str {
        match self {
            InboundEvent::Text { reply_token, .. } | InboundEvent::Unsupported { reply_token, .. } => reply_token,
        }
    }
}

impl WebhookEvent {
    /// `None` when the event carries no reply token, since it cannot be answered.
    pub fn into_inbound(self) -> Option<InboundEvent> {
        let reply_token = self.reply_token?;
        let user_id = self.source.and_then(|s| s.user_id);

        if self.event_type != "message" {
            return Some(unsupported(user_id, reply_token, self.event_type, NOT_A_MESSAGE));
        }
        let text = match self.message {
            Some(EventMessage { message_type, text: Some(text) }) if message_type == "text" => text,
            Some(EventMessage { message_type, .. }) => {
                return Some(unsupported(user_id, reply_token, message_type, NOT_TEXT));
            }
            None => return Some(unsupported(user_id, reply_token, self.event_type, NOT_TEXT)),
        };
        match user_id {
            Some(user_id) => Some(InboundEvent::Text { user_id, reply_token, text }),
            None => Some(unsupported(None, reply_token, "text".to_string(), NOT_A_MESSAGE)),
        }
    }
}

fn unsupported(user_id: Option<String>, reply_token: String, received: String, reason: &'static str) -> InboundEvent {
    InboundEvent::Unsupported { user_id, reply_token, received, reason }
}

// ==================== REPLY ====================

#[derive(Debug, thiserror::Error)]
pub enum ReplyError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("LINE API error {status}: {body}")]
    Api { status: u16, body: String },
}

/// Sends one reply per inbound event.
#[async_trait]
pub trait ReplySender: Send + Sync {
    async fn reply(&self, reply_token: &str, text: &str, quick_replies: &[QuickReply]) -> Result<(), ReplyError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplyRequest<'a> {
    reply_token: &'a str,
    messages: Vec<TextMessage>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TextMessage {
    #[serde(rename = "type")]
    kind: &'static str,
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    quick_reply: Option<QuickReplyBlock>,
}

#[derive(Serialize)]
struct QuickReplyBlock {
    items: Vec<QuickReplyItem>,
}

#[derive(Serialize)]
struct QuickReplyItem {
    #[serde(rename = "type")]
    kind: &'static str,
    action: MessageAction,
}

#[derive(Serialize)]
struct MessageAction {
    #[serde(rename = "type")]
    kind: &'static str,
    label: String,
    text: String,
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

fn reply_request<'a>(reply_token: &'a str, text: &str, quick_replies: &[QuickReply]) -> ReplyRequest<'a> {
    let quick_reply = (!quick_replies.is_empty()).then(|| QuickReplyBlock {
        items: quick_replies
            .iter()
            .map(|q| QuickReplyItem {
                kind: "action",
                action: MessageAction {
                    kind: "message",
                    label: truncate_chars(&q.label, MAX_LABEL_CHARS),
                    text: q.text.clone(),
                },
            })
            .collect(),
    });

    ReplyRequest {
        reply_token,
        messages: vec![TextMessage {
            kind: "text",
            text: truncate_chars(text, MAX_TEXT_CHARS),
            quick_reply,
        }],
    }
}

/// LINE API client.
pub struct LineClient {
    access_token: String,
    http: reqwest::Client,
}

impl LineClient {
    pub fn new(access_token: String) -> Self {
        Self {
            access_token,
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ReplySender for LineClient {
    async fn reply(&self, reply_token: &str, text: &str, quick_replies: &[QuickReply]) -> Result<(), ReplyError> {
        let response = self
            .http
            .post(LINE_REPLY_URL)
            .bearer_auth(&self.access_token)
            .json(&reply_request(reply_token, text, quick_replies))
            .send()
            .await
            .map_err(|e| ReplyError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReplyError::Api { status: status.as_u16(), body });
        }

        info!("💬 Replied ({} chars, {} quick replies)", text.chars().count(), quick_replies.len());
        Ok(())
    }
}
