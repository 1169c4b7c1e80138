use chrono::{DateTime, Local};
use rusqlite::{params, Connection};
use std::path::Path;

use crate::error::Result;
use crate::scorer::ResultRecord;
use crate::session::SubmitReason;

/// One finished attempt as kept in the history database
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub title: String,
    pub result: ResultRecord,
    pub cheat_count: u32,
    pub submit_reason: SubmitReason,
    pub finished_at: DateTime<Local>,
}

/// SQLite store of finished attempts
#[derive(Debug)]
pub struct HistoryDb {
    conn: Connection,
}

impl HistoryDb {
    /// Open (creating if needed) the database at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS attempts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                correct_answers INTEGER NOT NULL,
                wrong_answers INTEGER NOT NULL,
                total_marks INTEGER NOT NULL,
                time_spent_secs INTEGER NOT NULL,
                cheat_count INTEGER NOT NULL,
                submit_reason TEXT NOT NULL,
                finished_at TEXT NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_attempts_finished_at ON attempts(finished_at)",
            [],
        )?;

        Ok(HistoryDb { conn })
    }

    pub fn record(&self, entry: &HistoryEntry) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO attempts
            (title, correct_answers, wrong_answers, total_marks, time_spent_secs,
             cheat_count, submit_reason, finished_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                entry.title,
                entry.result.correct_answers,
                entry.result.wrong_answers,
                entry.result.total_marks,
                entry.result.time_spent_secs as i64,
                entry.cheat_count,
                reason_to_str(entry.submit_reason),
                entry.finished_at.to_rfc3339(),
            ],
        )?;
        log::info!("recorded attempt '{}' in history", entry.title);
        Ok(())
    }

    /// Most recent attempts first
    pub fn recent(&self, limit: usize) -> Result<Vec<HistoryEntry>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT title, correct_answers, wrong_answers, total_marks, time_spent_secs,
                   cheat_count, submit_reason, finished_at
            FROM attempts
            ORDER BY finished_at DESC, id DESC
            LIMIT ?1
            "#,
        )?;

        let rows = stmt.query_map([limit as i64], |row| {
            let reason: String = row.get(6)?;
            let finished_at: String = row.get(7)?;
            let finished_at = DateTime::parse_from_rfc3339(&finished_at)
                .map_err(|_| {
                    rusqlite::Error::InvalidColumnType(
                        7,
                        "finished_at".to_string(),
                        rusqlite::types::Type::Text,
                    )
                })?
                .with_timezone(&Local);
            let time_spent_secs: i64 = row.get(4)?;

            Ok(HistoryEntry {
                title: row.get(0)?,
                result: ResultRecord {
                    correct_answers: row.get(1)?,
                    wrong_answers: row.get(2)?,
                    total_marks: row.get(3)?,
                    time_spent_secs: time_spent_secs.max(0) as u64,
                },
                cheat_count: row.get(5)?,
                submit_reason: reason_from_str(&reason),
                finished_at,
            })
        })?;

        let mut entries = Vec::new();
        for entry in rows {
            entries.push(entry?);
        }
        Ok(entries)
    }

    pub fn count(&self) -> Result<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM attempts", [], |row| row.get(0))?)
    }
}

fn reason_to_str(reason: SubmitReason) -> &'static str {
    match reason {
        SubmitReason::Manual => "manual",
        SubmitReason::TimeUp => "time_up",
        SubmitReason::CheatLimit => "cheat_limit",
    }
}

fn reason_from_str(s: &str) -> SubmitReason {
    match s {
        "time_up" => SubmitReason::TimeUp,
        "cheat_limit" => SubmitReason::CheatLimit,
        _ => SubmitReason::Manual,
    }
}
