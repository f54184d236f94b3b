//! In-process stand-ins for the model and LINE, shared by the test suites.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::bot::completion::{CompletionError, CompletionService, Message};
use crate::bot::database::{LogEntry, StoreError, UsageStore, UserRecord};
use crate::bot::line::{ReplyError, ReplySender};
use crate::bot::quick_reply::QuickReply;

/// One recorded completion request.
#[derive(Debug, Clone)]
pub struct Call {
    pub system: String,
    pub history: Vec<Message>,
    pub prompt: String,
}

#[derive(Default)]
pub struct FakeCompletion {
    calls: Mutex<Vec<Call>>,
    /// When set, every call fails with this provider error body.
    failure: Option<String>,
}

impl FakeCompletion {
    pub fn failing(body: &str) -> Self {
        Self { calls: Mutex::new(Vec::new()), failure: Some(body.to_string()) }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionService for FakeCompletion {
    async fn complete(&self, system_preamble: &str, history: &[Message], prompt: &str) -> Result<String, CompletionError> {
        let mut calls = self.calls.lock().unwrap();
        calls.push(Call {
            system: system_preamble.to_string(),
            history: history.to_vec(),
            prompt: prompt.to_string(),
        });
        match &self.failure {
            Some(body) => Err(CompletionError::Api { status: 500, body: body.clone() }),
            None => Ok(format!("model reply {}", calls.len())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SentReply {
    pub reply_token: String,
    pub text: String,
    pub quick_replies: Vec<QuickReply>,
}

#[derive(Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<SentReply>>,
    fail: bool,
}

impl RecordingSender {
    /// Records every reply but reports each one as rejected.
    pub fn failing() -> Self {
        Self { sent: Mutex::new(Vec::new()), fail: true }
    }

    pub fn last(&self) -> SentReply {
        self.sent.lock().unwrap().last().cloned().expect("nothing sent")
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl ReplySender for RecordingSender {
    async fn reply(&self, reply_token: &str, text: &str, quick_replies: &[QuickReply]) -> Result<(), ReplyError> {
        self.sent.lock().unwrap().push(SentReply {
            reply_token: reply_token.to_string(),
            text: text.to_string(),
            quick_replies: quick_replies.to_vec(),
        });
        if self.fail {
            return Err(ReplyError::Api { status: 400, body: "Invalid reply token".to_string() });
        }
        Ok(())
    }
}


/// A store whose writes and log reads all fail, as with a locked database
/// file. `get_user` fails too unless the store is built `readable`.
pub struct BrokenStore {
    readable: bool,
}

impl BrokenStore {
    pub fn unreadable() -> Self {
        Self { readable: false }
    }

    pub fn readable() -> Self {
        Self { readable: true }
    }
}

fn busy() -> StoreError {
    StoreError::Sqlite(rusqlite::Error::SqliteFailure(
        rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
        Some("database is locked".to_string()),
    ))
}

impl UsageStore for BrokenStore {
    fn get_user(&self, _user_id: &str) -> Result<Option<UserRecord>, StoreError> {
        if self.readable { Ok(None) } else { Err(busy()) }
    }

    fn update_user(
        &self,
        _user_id: &str,
        _update: &dyn Fn(Option<&UserRecord>) -> Option<UserRecord>,
    ) -> Result<Option<UserRecord>, StoreError> {
        Err(busy())
    }

    fn set_mode(&self, _user_id: &str, _mode_code: i64, _usage_day: &str) -> Result<(), StoreError> {
        Err(busy())
    }

    fn append_log(&self, _entry: &LogEntry) -> Result<(), StoreError> {
        Err(busy())
    }

    fn recent_log(&self, _user_id: &str, _limit: usize) -> Result<Vec<LogEntry>, StoreError> {
        Err(busy())
    }
}
