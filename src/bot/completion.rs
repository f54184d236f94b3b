//! Chat-completion client (OpenAI `/v1/chat/completions`).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bot::database::LogEntry;

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One speaker-tagged turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self { role, content: content.into() }
    }
}

/// Expand log entries into alternating user/assistant turns.
pub fn history_turns(entries: &[LogEntry]) -> Vec<Message> {
    entries
        .iter()
        .flat_map(|e| {
            [
                Message::new(Role::User, e.user_message.clone()),
                Message::new(Role::Assistant, e.ai_response.clone()),
            ]
        })
        .collect()
}

/// The full model input: preamble, history, then the prompt.
pub fn build_messages(system_preamble: &str, history: &[Message], prompt: &str) -> Vec<Message> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(Message::new(Role::System, system_preamble));
    messages.extend_from_slice(history);
    messages.push(Message::new(Role::User, prompt));
    messages
}

#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("HTTP error: {0}")]
    Http(String),
    /// Non-success status; `body` is the provider's raw error text.
    #[error("{body}")]
    Api { status: u16, body: String },
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Empty response")]
    Empty,
}

/// Stateless text completion.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(
        &self,
        system_preamble: &str,
        history: &[Message],
        prompt: &str,
    ) -> Result<String, CompletionError>;
}

/// Request parameters sent with every completion.
#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self { model: "gpt-4".to_string(), max_tokens: 3000, temperature: 0.0 }
    }
}

pub struct OpenAiClient {
    api_key: String,
    settings: ModelSettings,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: Vec<ApiMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    frequency_penalty: f32,
    presence_penalty: f32,
}

#[derive(Serialize)]
struct ApiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ApiResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl OpenAiClient {
    pub fn new(api_key: String, settings: ModelSettings) -> Self {
        Self {
            api_key,
            settings,
            http: reqwest::Client::new(),
        }
    }

    fn request<'a>(&'a self, messages: &'a [Message]) -> ApiRequest<'a> {
        ApiRequest {
            model: &self.settings.model,
            messages: messages
                .iter()
                .map(|m| ApiMessage { role: m.role.as_str(), content: &m.content })
                .collect(),
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
        }
    }
}

fn parse_response(body: &str) -> Result<String, CompletionError> {
    let parsed: ApiResponse =
        serde_json::from_str(body).map_err(|e| CompletionError::Parse(e.to_string()))?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .ok_or(CompletionError::Empty)
}

#[async_trait]
impl CompletionService for OpenAiClient {
    async fn complete(
        &self,
        system_preamble: &str,
        history: &[Message],
        prompt: &str,
    ) -> Result<String, CompletionError> {
        let messages = build_messages(system_preamble, history, prompt);
        debug!("Completion request: {} message(s), model {}", messages.len(), self.settings.model);

        let response = self
            .http
            .post(OPENAI_API_URL)
            .bearer_auth(&self.api_key)
            .json(&self.request(&messages))
            .send()
            .await
            .map_err(|e| CompletionError::Http(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CompletionError::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(CompletionError::Api { status: status.as_u16(), body });
        }

        parse_response(&body)
    }
}
