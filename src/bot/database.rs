//! Persistent SQLite store for per-user usage records and the conversation log.

use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Per-user mode and daily usage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub user_id: String,
    pub mode_code: i64,
    pub api_count_total: u32,
    /// Usage day (`YYYY-MM-DD`) the count belongs to.
    pub last_used_date: String,
}

/// One message/response exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub user_id: String,
    pub user_message: String,
    pub ai_response: String,
    pub mode_code: i64,
    /// UTC+9 wall clock, `YYYY-MM-DD HH:MM:SS`.
    pub created_at: String,
}

/// Storage operations the bot needs. Implemented by [`SqliteStore`].
pub trait UsageStore: Send + Sync {
    fn get_user(&self, user_id: &str) -> Result<Option<UserRecord>, StoreError>;

    /// Read the user's record, compute the replacement with `update`, and
    /// write it, all as one atomic step. When `update` declines with `None`,
    /// nothing is written and `Ok(None)` is returned.
    fn update_user(
        &self,
        user_id: &str,
        update: &dyn Fn(Option<&UserRecord>) -> Option<UserRecord>,
    ) -> Result<Option<UserRecord>, StoreError>;

    /// Set the mode only, creating a zero-usage record if needed.
    fn set_mode(&self, user_id: &str, mode_code: i64, usage_day: &str) -> Result<(), StoreError>;

    fn append_log(&self, entry: &LogEntry) -> Result<(), StoreError>;

    /// The `limit` most recent entries for a user, oldest first.
    fn recent_log(&self, user_id: &str, limit: usize) -> Result<Vec<LogEntry>, StoreError>;
}

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Create a new in-memory store.
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    /// Open (or create) the store at the given path.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let store = Self::init(Connection::open(path)?)?;
        let (users, logs) = store.get_counts()?;
        info!("Loaded database from {:?} ({} users, {} log entries)", path, users, logs);
        Ok(store)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(r#"
            CREATE TABLE IF NOT EXISTS users (
                user_id TEXT PRIMARY KEY,
                mode_code INTEGER NOT NULL DEFAULT 0,
                api_count_total INTEGER NOT NULL DEFAULT 0,
                last_used_date TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                user_message TEXT NOT NULL,
                ai_response TEXT NOT NULL,
                mode_code INTEGER NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_logs_user_created ON logs(user_id, created_at);
        "#)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn get_counts(&self) -> Result<(usize, usize), StoreError> {
        let conn = self.conn();
        let users: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        let logs: i64 = conn.query_row("SELECT COUNT(*) FROM logs", [], |row| row.get(0))?;
        Ok((users as usize, logs as usize))
    }

    /// Total log entries.
    #[cfg(test)]
    pub fn log_count(&self) -> usize {
        self.get_counts().map(|(_, logs)| logs).unwrap_or(0)
    }
}

fn read_user(conn: &Connection, user_id: &str) -> rusqlite::Result<Option<UserRecord>> {
    conn.query_row(
        "SELECT user_id, mode_code, api_count_total, last_used_date FROM users WHERE user_id = ?1",
        params![user_id],
        |row| {
            Ok(UserRecord {
                user_id: row.get(0)?,
                mode_code: row.get(1)?,
                api_count_total: row.get(2)?,
                last_used_date: row.get(3)?,
            })
        },
    )
    .optional()
}

impl UsageStore for SqliteStore {
    fn get_user(&self, user_id: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(read_user(&self.conn(), user_id)?)
    }

    fn update_user(
        &self,
        user_id: &str,
        update: &dyn Fn(Option<&UserRecord>) -> Option<UserRecord>,
    ) -> Result<Option<UserRecord>, StoreError> {
        let mut conn = self.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let current = read_user(&tx, user_id)?;
        // Dropping `tx` here rolls back.
        let Some(record) = update(current.as_ref()) else {
            return Ok(None);
        };

        tx.execute(
            "INSERT INTO users (user_id, mode_code, api_count_total, last_used_date)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_id) DO UPDATE SET
                mode_code = ?2,
                api_count_total = ?3,
                last_used_date = ?4",
            params![record.user_id, record.mode_code, record.api_count_total, record.last_used_date],
        )?;
        tx.commit()?;

        debug!(
            "Usage for {}: {} call(s) on {} (mode {})",
            record.user_id, record.api_count_total, record.last_used_date, record.mode_code
        );
        Ok(Some(record))
    }

    fn set_mode(&self, user_id: &str, mode_code: i64, usage_day: &str) -> Result<(), StoreError> {
        self.conn().execute(
            "INSERT INTO users (user_id, mode_code, api_count_total, last_used_date)
             VALUES (?1, ?2, 0, ?3)
             ON CONFLICT(user_id) DO UPDATE SET mode_code = ?2",
            params![user_id, mode_code, usage_day],
        )?;
        Ok(())
    }

    fn append_log(&self, entry: &LogEntry) -> Result<(), StoreError> {
        self.conn().execute(
            "INSERT INTO logs (user_id, user_message, ai_response, mode_code, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![entry.user_id, entry.user_message, entry.ai_response, entry.mode_code, entry.created_at],
        )?;
        Ok(())
    }

    fn recent_log(&self, user_id: &str, limit: usize) -> Result<Vec<LogEntry>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT user_id, user_message, ai_response, mode_code, created_at
             FROM logs WHERE user_id = ?1
             ORDER BY created_at DESC, id DESC LIMIT ?2",
        )?;

        let rows = stmt.query_map(params![user_id, limit as i64], |row| {
            Ok(LogEntry {
                user_id: row.get(0)?,
                user_message: row.get(1)?,
                ai_response: row.get(2)?,
                mode_code: row.get(3)?,
                created_at: row.get(4)?,
            })
        })?;

        let mut entries = rows.collect::<Result<Vec<_>, _>>()?;
        entries.reverse();
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_log(user_id: &str, created_at: &str, text: &str) -> LogEntry {
        LogEntry {
            user_id: user_id.to_string(),
            user_message: text.to_string(),
            ai_response: format!("re: {text}"),
            mode_code: 1,
            created_at: created_at.to_string(),
        }
    }

    fn record(user_id: &str, count: u32, day: &str) -> UserRecord {
        UserRecord {
            user_id: user_id.to_string(),
            mode_code: 2,
            api_count_total: count,
            last_used_date: day.to_string(),
        }
    }

    #[test]
    fn test_update_user_creates_then_replaces() {
        let db = SqliteStore::in_memory().unwrap();
        assert!(db.get_user("U1").unwrap().is_none());

        db.update_user("U1", &|current| {
            assert!(current.is_none());
            Some(record("U1", 1, "2024-05-01"))
        })
        .unwrap();

        db.update_user("U1", &|current| {
            let current = current.expect("record should exist");
            Some(record("U1", current.api_count_total + 1, "2024-05-01"))
        })
        .unwrap();

        assert_eq!(db.get_user("U1").unwrap(), Some(record("U1", 2, "2024-05-01")));
    }

    #[test]
    fn test_update_user_failure_writes_nothing() {
        let db = SqliteStore::in_memory().unwrap();
        db.update_user("U1", &|_| Some(record("U1", 6, "2024-05-01"))).unwrap();

        assert_eq!(db.update_user("U1", &|_| None).unwrap(), None);
        assert_eq!(db.get_user("U1").unwrap().unwrap().api_count_total, 6);
    }

    #[test]
    fn test_set_mode_keeps_usage() {
        let db = SqliteStore::in_memory().unwrap();
        db.set_mode("U1", 4, "2024-05-01").unwrap();
        let user = db.get_user("U1").unwrap().unwrap();
        assert_eq!((user.mode_code, user.api_count_total), (4, 0));

        db.update_user("U1", &|_| Some(record("U1", 3, "2024-05-02"))).unwrap();
        db.set_mode("U1", 9, "2024-05-03").unwrap();
        let user = db.get_user("U1").unwrap().unwrap();
        assert_eq!(user.mode_code, 9);
        assert_eq!(user.api_count_total, 3);
        assert_eq!(user.last_used_date, "2024-05-02");
    }

    #[test]
    fn test_recent_log_is_chronological_and_limited() {
        let db = SqliteStore::in_memory().unwrap();
        for i in 0..8 {
            db.append_log(&make_log("U1", &format!("2024-05-01 10:00:0{i}"), &format!("m{i}"))).unwrap();
        }
        db.append_log(&make_log("U2", "2024-05-01 11:00:00", "other")).unwrap();

        let recent = db.recent_log("U1", 6).unwrap();
        let texts: Vec<&str> = recent.iter().map(|e| e.user_message.as_str()).collect();
        assert_eq!(texts, ["m2", "m3", "m4", "m5", "m6", "m7"]);
        assert_eq!(db.log_count(), 9);
    }

    #[test]
    fn test_recent_log_same_second_keeps_insert_order() {
        let db = SqliteStore::in_memory().unwrap();
        db.append_log(&make_log("U1", "2024-05-01 10:00:00", "first")).unwrap();
        db.append_log(&make_log("U1", "2024-05-01 10:00:00", "second")).unwrap();

        let recent = db.recent_log("U1", 6).unwrap();
        assert_eq!(recent[0].user_message, "first");
        assert_eq!(recent[1].user_message, "second");
    }

    #[test]
    fn test_negative_count_is_a_read_error() {
        let db = SqliteStore::in_memory().unwrap();
        db.conn()
            .execute(
                "INSERT INTO users (user_id, mode_code, api_count_total, last_used_date) VALUES ('U1', 0, -1, '2024-05-01')",
                [],
            )
            .unwrap();
        assert!(db.get_user("U1").is_err());
    }

    #[test]
    fn test_open_persists_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eikaiwa.db");
        {
            let db = SqliteStore::open(&path).unwrap();
            db.set_mode("U1", 3, "2024-05-01").unwrap();
        }
        let db = SqliteStore::open(&path).unwrap();
        assert_eq!(db.get_user("U1").unwrap().unwrap().mode_code, 3);
    }
}
