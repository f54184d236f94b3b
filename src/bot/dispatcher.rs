//! Per-event glue: engine decision -> usage -> completion -> log -> reply.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Asia::Tokyo;
use tracing::{debug, error, info, warn};

use crate::bot::completion::{history_turns, CompletionError, CompletionService};
use crate::bot::database::{LogEntry, StoreError, UsageStore};
use crate::bot::engine::{self, Action, Decision};
use crate::bot::line::{InboundEvent, ReplySender};
use crate::bot::modes;
use crate::bot::prompts;
use crate::bot::quick_reply::quick_replies;
use crate::bot::usage::{usage_day_string, UsageError, UsageGuard};

/// Reply text when the store cannot be read or written.
pub const STORE_FAILURE: &str = "Error: failed to access the usage store.";

/// What was sent back for one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub text: String,
    pub mode: i64,
}

#[derive(Debug, thiserror::Error)]
enum DispatchError {
    #[error(transparent)]
    Usage(#[from] UsageError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Completion(#[from] CompletionError),
}

impl DispatchError {
    /// The text the user sees in place of a model response.
    fn user_message(&self) -> String {
        match self {
            DispatchError::Usage(UsageError::QuotaExceeded) => prompts::QUOTA_EXCEEDED.to_string(),
            DispatchError::Usage(UsageError::Store(_)) | DispatchError::Store(_) => STORE_FAILURE.to_string(),
            DispatchError::Completion(e) => format!("Failed to get a response from OpenAI: {e}"),
        }
    }
}

pub struct Dispatcher {
    store: Arc<dyn UsageStore>,
    completion: Arc<dyn CompletionService>,
    replies: Arc<dyn ReplySender>,
    guard: UsageGuard,
    history_limit: usize,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn UsageStore>,
        completion: Arc<dyn CompletionService>,
        replies: Arc<dyn ReplySender>,
        guard: UsageGuard,
        history_limit: usize,
    ) -> Self {
        Self { store, completion, replies, guard, history_limit }
    }

    /// Handle one inbound event and send its reply.
    pub async fn handle_event(&self, event: InboundEvent, now: DateTime<Utc>) -> Outcome {
        let outcome = match &event {
            InboundEvent::Text { user_id, text, .. } => self.handle_text(user_id, text, now).await,
            InboundEvent::Unsupported { user_id, received, reason, .. } => {
                info!("Unsupported {received} event: {reason}");
                if let Some(user_id) = user_id {
                    self.log_exchange(user_id, &format!("[{received}]"), reason, modes::IDLE, now);
                }
                Outcome { text: reason.to_string(), mode: modes::IDLE }
            }
        };
        self.send(event.reply_token(), &outcome).await;
        outcome
    }

    async fn handle_text(&self, user_id: &str, text: &str, now: DateTime<Utc>) -> Outcome {
        let current_mode = match self.store.get_user(user_id) {
            Ok(user) => user.map(|u| u.mode_code).unwrap_or(modes::IDLE),
            Err(e) => {
                error!("Failed to load user {user_id}: {e}");
                return Outcome { text: STORE_FAILURE.to_string(), mode: modes::IDLE };
            }
        };

        let decision = engine::decide(text, current_mode);
        let preview: String = text.chars().take(50).collect();
        info!(
            "📨 {user_id}: \"{preview}\" (mode {current_mode} -> {})",
            decision.next_mode
        );

        let response = match self.respond(user_id, &decision, now).await {
            Ok(response) => response,
            Err(e) => {
                match &e {
                    DispatchError::Usage(UsageError::QuotaExceeded) => info!("🚫 {user_id} hit the daily limit"),
                    other => error!("Failed to respond to {user_id}: {other}"),
                }
                e.user_message()
            }
        };

        self.persist(user_id, text, &response, decision.next_mode, now);
        Outcome { text: response, mode: decision.next_mode }
    }

    async fn respond(&self, user_id: &str, decision: &Decision, now: DateTime<Utc>) -> Result<String, DispatchError> {
        if decision.bookkeeping {
            self.guard.check_and_record(self.store.as_ref(), user_id, 0, decision.next_mode, now)?;
        }

        let prompt = match &decision.action {
            Action::Reply(text) => return Ok(text.to_string()),
            Action::Prompt(prompt) => prompt,
        };

        let history = history_turns(&self.store.recent_log(user_id, self.history_limit)?);
        let usage = self.guard.check_and_record(self.store.as_ref(), user_id, 1, decision.next_mode, now)?;
        debug!(
            "Completion for {user_id}: {} history turn(s), call {}/{}",
            history.len(),
            usage.api_count_total,
            self.guard.limit()
        );

        Ok(self.completion.complete(prompts::SYSTEM_PREAMBLE, &history, prompt).await?)
    }

    /// Store the final mode and log the exchange. Errors are logged only.
    fn persist(&self, user_id: &str, text: &str, response: &str, mode: i64, now: DateTime<Utc>) {
        if let Err(e) = self.store.set_mode(user_id, mode, &usage_day_string(now)) {
            error!("Failed to save mode for {user_id}: {e}");
        }
        self.log_exchange(user_id, text, response, mode, now);
    }

    fn log_exchange(&self, user_id: &str, text: &str, response: &str, mode: i64, now: DateTime<Utc>) {
        let entry = LogEntry {
            user_id: user_id.to_string(),
            user_message: text.to_string(),
            ai_response: response.to_string(),
            mode_code: mode,
            created_at: now.with_timezone(&Tokyo).format("%Y-%m-%d %H:%M:%S").to_string(),
        };
        if let Err(e) = self.store.append_log(&entry) {
            error!("Failed to save log for {user_id}: {e}");
        }
    }

    async fn send(&self, reply_token: &str, outcome: &Outcome) {
        let buttons = quick_replies(outcome.mode);
        if let Err(e) = self.replies.reply(reply_token, &outcome.text, &buttons).await {
            warn!("Error while replying to message: {e}");
        }
    }
}
