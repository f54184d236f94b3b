//! Mode codes, sentinel texts and the marker table.
//!
//! The table drives both the engine (marker -> mode + prompt) and the
//! quick-reply buttons (mode -> markers to offer), so every marker string
//! lives here once.

use crate::bot::prompts;

/// Idle, no conversation script active.
pub const IDLE: i64 = 0;
pub const FREE_TALK: i64 = 1;
pub const CORRECTION: i64 = 2;
pub const PRESENTATION: i64 = 3;
pub const LECTURE_MENU: i64 = 4;

/// Prefix shared by every mode-select marker, e.g. `【モード:天気】`.
pub const MARKER_PREFIX: &str = "【モード:";

pub const CORRECTION_FINISH: &str = "【英文添削:完了】";
pub const LECTURE_FINISH: &str = "【会話フレーズ講義:完了】";
pub const FREE_TALK_FINISH: &str = "【フリートーク:完了】";
pub const FREE_TALK_DONT_KNOW: &str = "I don't know.";
pub const PRESENTATION_FINISH: &str = "【発表練習:完了】";
pub const PRESENTATION_DONT_KNOW: &str = "【発表練習:分からない】";

/// Which script a mode runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    FreeTalk,
    Correction,
    Presentation,
    /// Sub-topic picker; never generates text.
    LectureMenu,
    /// Phrase lecture on the entry's keyword.
    Topic,
}

/// One row of the marker table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeEntry {
    pub keyword: &'static str,
    pub code: i64,
    pub script: Script,
}

impl ModeEntry {
    /// The exact text a quick-reply button sends to select this mode.
    pub fn marker(&self) -> String {
        format!("{MARKER_PREFIX}{}】", self.keyword)
    }

    /// Entering this mode from another one replies with the canned
    /// announcement instead of calling the model.
    pub fn announces(&self) -> bool {
        self.script != Script::Topic
    }

    /// Prompt sent to the model when this mode is (re)selected, if any.
    pub fn prompt(&self) -> Option<String> {
        match self.script {
            Script::FreeTalk => Some(prompts::FREE_TALK.to_string()),
            Script::Correction => Some(prompts::CORRECTION.to_string()),
            Script::Presentation => Some(prompts::PRESENTATION.to_string()),
            Script::LectureMenu => None,
            Script::Topic => Some(prompts::topic_lecture(self.keyword)),
        }
    }
}

const fn entry(keyword: &'static str, code: i64, script: Script) -> ModeEntry {
    ModeEntry { keyword, code, script }
}

/// Marker keywords in match order. Matching is by substring, first hit wins.
pub static MODE_TABLE: [ModeEntry; 16] = [
    entry("フリートーク", FREE_TALK, Script::FreeTalk),
    entry("英文添削", CORRECTION, Script::Correction),
    entry("発表練習", PRESENTATION, Script::Presentation),
    entry("会話フレーズ講義", LECTURE_MENU, Script::LectureMenu),
    entry("日常生活", 5, Script::Topic),
    entry("気持ち", 6, Script::Topic),
    entry("天気", 7, Script::Topic),
    entry("観光", 8, Script::Topic),
    entry("レストラン", 9, Script::Topic),
    entry("ショッピング", 10, Script::Topic),
    entry("学校", 11, Script::Topic),
    entry("スポーツ", 12, Script::Topic),
    entry("恋愛", 13, Script::Topic),
    entry("ビジネス", 14, Script::Topic),
    entry("電話", 15, Script::Topic),
    entry("会議", 16, Script::Topic),
];

/// Top-level modes offered while idle.
pub fn top_level() -> &'static [ModeEntry] {
    &MODE_TABLE[..4]
}

/// Topic lecture modes offered from the lecture menu.
pub fn topics() -> &'static [ModeEntry] {
    &MODE_TABLE[4..]
}

pub fn is_topic(code: i64) -> bool {
    topics().iter().any(|e| e.code == code)
}

/// Find the table entry for a mode-select marker text.
pub fn match_marker(text: &str) -> Option<&'static ModeEntry> {
    if !text.starts_with(MARKER_PREFIX) {
        return None;
    }
    MODE_TABLE.iter().find(|e| text.contains(e.keyword))
}

/// Canned text shown on entering or leaving a mode.
pub fn announcement(code: i64) -> Option<&'static str> {
    match code {
        IDLE => Some("モードを終了しました。"),
        FREE_TALK => Some(
            "Alright,I'm ready to help you with your. English conversation practice!\n Please let me know the topic you'd like to talk about.\n\n話したいトピックを英語で送ってください！フリートークを完了したい場合は下の「完了」ボタンを押してください。「完了」が押されるとこれまでの会話を踏まえてのフィードバックが行われます。フリートーク中に質問が分からない場合は下の「分からない」ボタンを押してください。\n\n「完了」を押した後に会話を通してのフィードバックが送信されます。※フィードバックが生成されるのには時間が掛かります。",
        ),
        CORRECTION => Some("添削して欲しい英文を送ってください。※添削には時間が掛かります。"),
        PRESENTATION => Some(
            "練習したい発表原稿を送ってください！この原稿を元に想定される質問を考えます。質問に答えると次の質問をします。\n\n練習を完了したい場合は下の「完了」ボタンを押してください。発表中の質問で分からない質問は下の「分からない」ボタンを押してください。\n\n「完了」を押した後に発表練習を通してのフィードバックが送信されます。※フィードバックが生成されるのには時間が掛かります。",
        ),
        LECTURE_MENU => Some("習いたい講義内容を以下から選択してください！講義が始まります。講義生成には時間が掛かります。"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_codes_are_one_through_sixteen() {
        let codes: Vec<i64> = MODE_TABLE.iter().map(|e| e.code).collect();
        assert_eq!(codes, (1..=16).collect::<Vec<_>>());
    }

    #[test]
    fn test_match_marker_requires_prefix() {
        assert_eq!(match_marker("【モード:天気】").map(|e| e.code), Some(7));
        assert!(match_marker("天気").is_none());
        assert!(match_marker("【モード:宇宙】").is_none());
    }

    #[test]
    fn test_match_marker_first_keyword_wins() {
        // Both keywords appear; フリートーク sits earlier in the table.
        let entry = match_marker("【モード:会議のフリートーク】").unwrap();
        assert_eq!(entry.code, FREE_TALK);
    }

    #[test]
    fn test_marker_round_trips_through_match() {
        for entry in &MODE_TABLE {
            assert_eq!(match_marker(&entry.marker()), Some(entry));
        }
    }

    #[test]
    fn test_announcements_only_for_low_modes() {
        for code in 0..=4 {
            assert!(announcement(code).is_some(), "mode {code} should announce");
        }
        for code in 5..=16 {
            assert!(announcement(code).is_none(), "mode {code} should not announce");
        }
    }

    #[test]
    fn test_lecture_menu_has_no_prompt() {
        let menu = match_marker("【モード:会話フレーズ講義】").unwrap();
        assert!(menu.prompt().is_none());
        assert!(topics().iter().all(|e| e.prompt().is_some() && !e.announces()));
    }
}
