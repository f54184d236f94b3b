//! Mode engine - decides, per incoming text, what to say and which mode comes next.
//!
//! Pure: no store or network access. The dispatcher carries out the
//! bookkeeping and completion call the decision asks for.

use crate::bot::modes::{self, ModeEntry};
use crate::bot::prompts;

/// Exact-text button payloads that short-circuit normal handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sentinel {
    CorrectionFinish,
    LectureFinish,
    FreeTalkFinish,
    FreeTalkDontKnow,
    PresentationFinish,
    PresentationDontKnow,
}

impl Sentinel {
    fn parse(text: &str) -> Option<Self> {
        match text {
            modes::CORRECTION_FINISH => Some(Self::CorrectionFinish),
            modes::LECTURE_FINISH => Some(Self::LectureFinish),
            modes::FREE_TALK_FINISH => Some(Self::FreeTalkFinish),
            modes::FREE_TALK_DONT_KNOW => Some(Self::FreeTalkDontKnow),
            modes::PRESENTATION_FINISH => Some(Self::PresentationFinish),
            modes::PRESENTATION_DONT_KNOW => Some(Self::PresentationDontKnow),
            _ => None,
        }
    }
}

/// Classified inbound text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input<'a> {
    Sentinel(Sentinel),
    ModeSelect(&'static ModeEntry),
    Plain(&'a str),
}

impl<'a> Input<'a> {
    /// Literal sentinels win over marker matches; anything else is plain text.
    pub fn classify(text: &'a str) -> Self {
        if let Some(sentinel) = Sentinel::parse(text) {
            return Input::Sentinel(sentinel);
        }
        match modes::match_marker(text) {
            Some(entry) => Input::ModeSelect(entry),
            None => Input::Plain(text),
        }
    }
}

/// What to send back for this message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Reply with fixed text; no model call.
    Reply(&'static str),
    /// Send this prompt to the model and reply with its output.
    Prompt(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub next_mode: i64,
    pub action: Action,
    /// Record a zero-cost usage update (mode + usage day) before acting.
    pub bookkeeping: bool,
}

impl Decision {
    fn reply(next_mode: i64, text: &'static str) -> Self {
        Self { next_mode, action: Action::Reply(text), bookkeeping: true }
    }

    fn prompt(next_mode: i64, prompt: impl Into<String>, bookkeeping: bool) -> Self {
        Self { next_mode, action: Action::Prompt(prompt.into()), bookkeeping }
    }

    pub fn prompt_text(&self) -> Option<&str> {
        match &self.action {
            Action::Prompt(p) => Some(p),
            Action::Reply(_) => None,
        }
    }

    pub fn reply_text(&self) -> Option<&'static str> {
        match self.action {
            Action::Reply(r) => Some(r),
            Action::Prompt(_) => None,
        }
    }
}

/// Decide the next mode and action for `text` given the user's current mode.
pub fn decide(text: &str, current_mode: i64) -> Decision {
    match Input::classify(text) {
        Input::Sentinel(sentinel) => on_sentinel(sentinel, current_mode),
        Input::ModeSelect(entry) => on_mode_select(entry, current_mode),
        Input::Plain(text) => Decision::prompt(current_mode, prompts::conversation_turn(text), true),
    }
}

fn on_sentinel(sentinel: Sentinel, current_mode: i64) -> Decision {
    match sentinel {
        Sentinel::CorrectionFinish | Sentinel::LectureFinish => {
            Decision::reply(modes::IDLE, idle_announcement())
        }
        Sentinel::FreeTalkFinish => {
            Decision::prompt(modes::IDLE, prompts::FREE_TALK_FEEDBACK, true)
        }
        Sentinel::PresentationFinish => {
            Decision::prompt(modes::IDLE, prompts::PRESENTATION_FEEDBACK, true)
        }
        Sentinel::FreeTalkDontKnow | Sentinel::PresentationDontKnow => {
            Decision::prompt(current_mode, prompts::ASK_DIFFERENT_QUESTION, false)
        }
    }
}

fn on_mode_select(entry: &'static ModeEntry, current_mode: i64) -> Decision {
    let changed = entry.code != current_mode;
    match (entry.prompt(), entry.announces()) {
        (Some(prompt), false) => Decision::prompt(entry.code, prompt, true),
        (Some(prompt), true) if !changed => Decision::prompt(entry.code, prompt, true),
        _ => match modes::announcement(entry.code) {
            Some(text) => Decision::reply(entry.code, text),
            // Every announcing entry has a canned text; fall back to its prompt.
            None => Decision::prompt(entry.code, entry.prompt().unwrap_or_default(), true),
        },
    }
}

fn idle_announcement() -> &'static str {
    modes::announcement(modes::IDLE).unwrap_or_default()
}
