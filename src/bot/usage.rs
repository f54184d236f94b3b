//! Daily per-user completion quota.
//!
//! A usage day runs from 04:00 to 04:00 Japan time. Each completion call
//! costs one unit; mode changes and plain messages record zero-cost usage so
//! the stored mode and day stay current.

use chrono::{DateTime, Days, NaiveDate, Timelike, Utc};
use chrono_tz::Asia::Tokyo;

use crate::bot::database::{StoreError, UsageStore, UserRecord};
use crate::bot::prompts;

/// Local hour at which a new usage day begins.
const RESET_HOUR: u32 = 4;

/// Default completion calls per user per usage day.
pub const DEFAULT_DAILY_LIMIT: u32 = 6;

#[derive(Debug, thiserror::Error)]
pub enum UsageError {
    #[error("{}", prompts::QUOTA_EXCEEDED)]
    QuotaExceeded,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The usage day `now` falls in.
pub fn usage_day(now: DateTime<Utc>) -> NaiveDate {
    let local = now.with_timezone(&Tokyo);
    let date = local.date_naive();
    if local.hour() < RESET_HOUR {
        date.checked_sub_days(Days::new(1)).unwrap_or(date)
    } else {
        date
    }
}

pub fn usage_day_string(now: DateTime<Utc>) -> String {
    usage_day(now).format("%Y-%m-%d").to_string()
}

/// Compute the record after adding `calls` on `day`, or `None` if that
/// would exceed `limit`. A record from an earlier day counts as zero.
/// Zero-cost updates always succeed, even when a lowered limit leaves the
/// stored count above it.
pub fn apply_usage(
    current: Option<&UserRecord>,
    user_id: &str,
    calls: u32,
    mode_code: i64,
    day: &str,
    limit: u32,
) -> Option<UserRecord> {
    let prior = match current {
        Some(record) if record.last_used_date == day => record.api_count_total,
        _ => 0,
    };
    let updated = prior.saturating_add(calls);
    if calls > 0 && updated > limit {
        return None;
    }
    Some(UserRecord {
        user_id: user_id.to_string(),
        mode_code,
        api_count_total: updated,
        last_used_date: day.to_string(),
    })
}

/// Enforces the daily quota against a store.
#[derive(Debug, Clone, Copy)]
pub struct UsageGuard {
    limit: u32,
}

impl Default for UsageGuard {
    fn default() -> Self {
        Self::new(DEFAULT_DAILY_LIMIT)
    }
}

impl UsageGuard {
    pub fn new(limit: u32) -> Self {
        Self { limit }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Add `calls` to the user's count for the current usage day and record
    /// `mode_code`. Fails without writing when the limit would be exceeded.
    pub fn check_and_record(
        &self,
        store: &dyn UsageStore,
        user_id: &str,
        calls: u32,
        mode_code: i64,
        now: DateTime<Utc>,
    ) -> Result<UserRecord, UsageError> {
        let day = usage_day_string(now);
        let limit = self.limit;
        store
            .update_user(user_id, &|current| {
                apply_usage(current, user_id, calls, mode_code, &day, limit)
            })?
            .ok_or(UsageError::QuotaExceeded)
    }
}
