//! Quick-reply buttons offered alongside each reply.

use serde::Serialize;

use crate::bot::modes::{self, ModeEntry};

/// A suggested reply button: tapping it sends `text` as the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuickReply {
    pub label: String,
    pub text: String,
}

impl QuickReply {
    fn new(label: &str, text: &str) -> Self {
        Self { label: label.to_string(), text: text.to_string() }
    }

    fn select(entry: &ModeEntry) -> Self {
        Self { label: entry.keyword.to_string(), text: entry.marker() }
    }
}

/// Buttons for a mode. Total over all codes; unknown codes get the top-level menu.
pub fn quick_replies(mode_code: i64) -> Vec<QuickReply> {
    match mode_code {
        modes::FREE_TALK => vec![
            QuickReply::new("完了", modes::FREE_TALK_FINISH),
            QuickReply::new("分からない", modes::FREE_TALK_DONT_KNOW),
        ],
        modes::CORRECTION => vec![QuickReply::new("完了", modes::CORRECTION_FINISH)],
        modes::PRESENTATION => vec![
            QuickReply::new("完了", modes::PRESENTATION_FINISH),
            QuickReply::new("分からない", modes::PRESENTATION_DONT_KNOW),
        ],
        modes::LECTURE_MENU => modes::topics().iter().map(QuickReply::select).collect(),
        code if modes::is_topic(code) => vec![QuickReply::new("完了", modes::LECTURE_FINISH)],
        _ => modes::top_level().iter().map(QuickReply::select).collect(),
    }
}
