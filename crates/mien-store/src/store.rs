//! SQLite-backed store for sessions and emotion records.
//!
//! Schema mirrors the tracked data one-to-one: a `sessions` table keyed by
//! an external UUID, and a `records` table holding the final pipeline output
//! per saved detection. Timestamps are RFC 3339 UTC strings, which order
//! lexicographically, so plain string comparisons work in range queries.

use crate::records::{DerivedScores, EmotionRecord, SessionRow};
use chrono::{DateTime, SecondsFormat, Utc};
use mien_core::{DerivedEmotionVector, Emotion, EmotionVector};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),
    #[error("bad stored JSON: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("bad stored timestamp: {0}")]
    Timestamp(#[from] chrono::ParseError),
    #[error("session not found: {0}")]
    SessionNotFound(String),
    #[error("session already ended: {0}")]
    SessionAlreadyEnded(String),
    #[error("unknown dominant label: {0}")]
    UnknownLabel(String),
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS sessions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT NOT NULL UNIQUE,
    start_time TEXT NOT NULL,
    end_time TEXT,
    total_detections INTEGER NOT NULL DEFAULT 0
);
CREATE TABLE IF NOT EXISTS records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT NOT NULL REFERENCES sessions(session_id),
    emotions TEXT NOT NULL,
    derived TEXT NOT NULL,
    dominant TEXT NOT NULL,
    timestamp TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_records_session_ts ON records(session_id, timestamp);
CREATE INDEX IF NOT EXISTS idx_records_ts ON records(timestamp);
";

/// Owns the SQLite connection. Not `Sync`; callers serialize access (the
/// daemon touches it from its single engine thread only).
pub struct EmotionStore {
    conn: Connection,
}

impl EmotionStore {
    /// Open (or create) the database at `path` and apply the schema.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        tracing::info!(path = %path.display(), "emotion store opened");
        Ok(Self { conn })
    }

    /// In-memory store for tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Create a new session with a fresh UUID, started now.
    pub fn start_session(&self) -> Result<SessionRow, StoreError> {
        let session_id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        self.conn.execute(
            "INSERT INTO sessions (session_id, start_time) VALUES (?1, ?2)",
            params![session_id, fmt_ts(now)],
        )?;
        tracing::debug!(session = %session_id, "session started");
        self.get_session(&session_id)
    }

    /// Mark a session ended. Errors if it does not exist or already ended.
    pub fn end_session(&self, session_id: &str) -> Result<SessionRow, StoreError> {
        let session = self.get_session(session_id)?;
        if session.end_time.is_some() {
            return Err(StoreError::SessionAlreadyEnded(session_id.to_string()));
        }
        self.conn.execute(
            "UPDATE sessions SET end_time = ?1 WHERE session_id = ?2",
            params![fmt_ts(Utc::now()), session_id],
        )?;
        tracing::debug!(session = %session_id, "session ended");
        self.get_session(session_id)
    }

    pub fn get_session(&self, session_id: &str) -> Result<SessionRow, StoreError> {
        self.conn
            .query_row(
                "SELECT id, session_id, start_time, end_time, total_detections
                 FROM sessions WHERE session_id = ?1",
                params![session_id],
                row_to_session,
            )
            .optional()?
            .ok_or_else(|| StoreError::SessionNotFound(session_id.to_string()))?
    }

    /// Persist one pipeline output and bump the session's detection count.
    pub fn save_record(
        &self,
        session_id: &str,
        output: &DerivedEmotionVector,
        dominant: Emotion,
    ) -> Result<EmotionRecord, StoreError> {
        // Existence check keeps the foreign key error out of the hot path
        // and yields the typed NotFound variant instead.
        let _ = self.get_session(session_id)?;

        let emotions = serde_json::to_string(&output.primary)?;
        let derived = serde_json::to_string(&DerivedScores::from(output))?;
        let now = Utc::now();
        self.conn.execute(
            "INSERT INTO records (session_id, emotions, derived, dominant, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![session_id, emotions, derived, dominant.as_str(), fmt_ts(now)],
        )?;
        let id = self.conn.last_insert_rowid();
        self.conn.execute(
            "UPDATE sessions SET total_detections = total_detections + 1 WHERE session_id = ?1",
            params![session_id],
        )?;
        Ok(EmotionRecord {
            id,
            session_id: session_id.to_string(),
            emotions: output.primary,
            derived: DerivedScores::from(output),
            dominant,
            timestamp: now,
        })
    }

    /// Sessions, newest first.
    pub fn list_sessions(&self, limit: u32, offset: u32) -> Result<Vec<SessionRow>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, session_id, start_time, end_time, total_detections
             FROM sessions ORDER BY start_time DESC LIMIT ?1 OFFSET ?2",
        )?;
        let rows = stmt.query_map(params![limit, offset], row_to_session)?;
        collect_rows(rows)
    }

    /// All records of one session, oldest first.
    pub fn session_records(&self, session_id: &str) -> Result<Vec<EmotionRecord>, StoreError> {
        let _ = self.get_session(session_id)?;
        let mut stmt = self.conn.prepare(
            "SELECT id, session_id, emotions, derived, dominant, timestamp
             FROM records WHERE session_id = ?1 ORDER BY timestamp ASC, id ASC",
        )?;
        let rows = stmt.query_map(params![session_id], row_to_record)?;
        collect_rows(rows)
    }

    /// Records across all sessions, newest first.
    pub fn history(&self, limit: u32, offset: u32) -> Result<Vec<EmotionRecord>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, session_id, emotions, derived, dominant, timestamp
             FROM records ORDER BY timestamp DESC, id DESC LIMIT ?1 OFFSET ?2",
        )?;
        let rows = stmt.query_map(params![limit, offset], row_to_record)?;
        collect_rows(rows)
    }

    /// Records with timestamps in `[since, until)`, oldest first.
    pub(crate) fn records_between(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<EmotionRecord>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, session_id, emotions, derived, dominant, timestamp
             FROM records WHERE timestamp >= ?1 AND timestamp < ?2
             ORDER BY timestamp ASC, id ASC",
        )?;
        let rows = stmt.query_map(params![fmt_ts(since), fmt_ts(until)], row_to_record)?;
        collect_rows(rows)
    }

    pub(crate) fn count_sessions_between(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<i64, StoreError> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM sessions WHERE start_time >= ?1 AND start_time < ?2",
            params![fmt_ts(since), fmt_ts(until)],
            |row| row.get(0),
        )?)
    }

    pub(crate) fn dominant_counts_between(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<(String, i64)>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT dominant, COUNT(*) FROM records
             WHERE timestamp >= ?1 AND timestamp < ?2
             GROUP BY dominant ORDER BY COUNT(*) DESC, dominant ASC",
        )?;
        let rows = stmt.query_map(params![fmt_ts(since), fmt_ts(until)], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

/// RFC 3339 with microseconds and a `Z` suffix.
pub(crate) fn fmt_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(text: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    Ok(DateTime::parse_from_rfc3339(text)?.with_timezone(&Utc))
}

type SqlResult<T> = Result<Result<T, StoreError>, rusqlite::Error>;

fn collect_rows<T>(rows: impl Iterator<Item = SqlResult<T>>) -> Result<Vec<T>, StoreError> {
    let mut out = Vec::new();
    for row in rows {
        out.push(row??);
    }
    Ok(out)
}

fn row_to_session(row: &rusqlite::Row<'_>) -> Result<Result<SessionRow, StoreError>, rusqlite::Error> {
    let start_time: String = row.get(2)?;
    let end_time: Option<String> = row.get(3)?;
    Ok((|| {
        Ok(SessionRow {
            id: row.get(0)?,
            session_id: row.get(1)?,
            start_time: parse_ts(&start_time)?,
            end_time: end_time.as_deref().map(parse_ts).transpose()?,
            total_detections: row.get(4)?,
        })
    })())
}

fn row_to_record(row: &rusqlite::Row<'_>) -> Result<Result<EmotionRecord, StoreError>, rusqlite::Error> {
    let emotions: String = row.get(2)?;
    let derived: String = row.get(3)?;
    let dominant: String = row.get(4)?;
    let timestamp: String = row.get(5)?;
    let id: i64 = row.get(0)?;
    let session_id: String = row.get(1)?;
    Ok((|| {
        let emotions: EmotionVector = serde_json::from_str(&emotions)?;
        let derived: DerivedScores = serde_json::from_str(&derived)?;
        let dominant = Emotion::ALL
            .iter()
            .copied()
            .find(|e| e.as_str() == dominant)
            .ok_or_else(|| StoreError::UnknownLabel(dominant.clone()))?;
        Ok(EmotionRecord {
            id,
            session_id,
            emotions,
            derived,
            dominant,
            timestamp: parse_ts(&timestamp)?,
        })
    })())
}
