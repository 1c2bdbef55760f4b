//! SQLite persistence for tracking sessions and their emotion rows.

use crate::core::history::{MoodEntry, MoodHistory};
use crate::detector::types::Emotion;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

const CURRENT_SCHEMA_VERSION: i32 = 1;

const SCHEMA_V1: &str = "
CREATE TABLE IF NOT EXISTS sessions (
    session_id TEXT PRIMARY KEY,
    started_at TEXT NOT NULL,
    ended_at   TEXT
);

CREATE TABLE IF NOT EXISTS emotions (
    id         TEXT PRIMARY KEY,
    session_id TEXT NOT NULL REFERENCES sessions(session_id),
    emotion    TEXT NOT NULL,
    confidence REAL NOT NULL,
    timestamp  INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_emotions_session ON emotions(session_id, timestamp);
";

/// Store errors.
#[derive(Debug)]
pub enum StoreError {
    Sqlite(rusqlite::Error),
    UnknownSession(String),
    InvalidData(String),
    UnsupportedSchema(i32),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Sqlite(e) => write!(f, "SQLite error: {e}"),
            StoreError::UnknownSession(id) => write!(f, "Unknown session: {id}"),
            StoreError::InvalidData(e) => write!(f, "Invalid stored data: {e}"),
            StoreError::UnsupportedSchema(v) => write!(
                f,
                "Database schema version {v} is newer than supported ({CURRENT_SCHEMA_VERSION})"
            ),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Sqlite(e) => Some(e),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Sqlite(e)
    }
}

/// A stored tracking session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

fn parse_datetime(value: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::InvalidData(format!("invalid datetime '{value}': {e}")))
}

/// Session and emotion storage backed by one SQLite connection.
pub struct MoodStore {
    conn: Connection,
}

impl MoodStore {
    /// Open (creating if needed) a database file.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StoreError::InvalidData(e.to_string()))?;
            }
        }
        Self::init(Connection::open(path)?)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(mut conn: Connection) -> Result<Self, StoreError> {
        if let Err(e) = conn.pragma_update(None, "foreign_keys", "ON") {
            tracing::warn!("Failed to enable foreign keys: {}", e);
        }
        run_migrations(&mut conn)?;
        Ok(Self { conn })
    }

    /// Create a new session starting now.
    pub fn start_session(&self) -> Result<SessionRecord, StoreError> {
        let record = SessionRecord {
            session_id: Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            ended_at: None,
        };
        self.conn.execute(
            "INSERT INTO sessions (session_id, started_at) VALUES (?1, ?2)",
            params![record.session_id, record.started_at.to_rfc3339()],
        )?;
        tracing::info!(session_id = %record.session_id, "Stored session started");
        Ok(record)
    }

    /// Mark a session as ended now.
    ///
    /// Stopping again moves the end time to the latest call. Returns the
    /// stored end time, or `None` for an unknown id.
    pub fn stop_session(&self, session_id: &str) -> Result<Option<DateTime<Utc>>, StoreError> {
        let updated = self.conn.execute(
            "UPDATE sessions SET ended_at = ?1 WHERE session_id = ?2",
            params![Utc::now().to_rfc3339(), session_id],
        )?;
        if updated == 0 {
            return Ok(None);
        }
        Ok(self.session(session_id)?.and_then(|s| s.ended_at))
    }

    /// Look up a session.
    pub fn session(&self, session_id: &str) -> Result<Option<SessionRecord>, StoreError> {
        let row: Option<(String, String, Option<String>)> = self
            .conn
            .query_row(
                "SELECT session_id, started_at, ended_at FROM sessions WHERE session_id = ?1",
                params![session_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        row.map(|(session_id, started_at, ended_at)| {
            Ok(SessionRecord {
                session_id,
                started_at: parse_datetime(&started_at)?,
                ended_at: ended_at.as_deref().map(parse_datetime).transpose()?,
            })
        })
        .transpose()
    }

    /// Store one emotion observation for a session.
    pub fn record_emotion(
        &self,
        session_id: &str,
        emotion: Emotion,
        confidence: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        if self.session(session_id)?.is_none() {
            return Err(StoreError::UnknownSession(session_id.to_string()));
        }
        let entry = MoodEntry::new(timestamp.timestamp_millis(), emotion, confidence);
        self.conn.execute(
            "INSERT INTO emotions (id, session_id, emotion, confidence, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                Uuid::new_v4().to_string(),
                session_id,
                entry.emotion().as_str(),
                entry.confidence(),
                entry.timestamp(),
            ],
        )?;
        Ok(())
    }

    /// All emotions recorded for a session, oldest first.
    pub fn session_emotions(&self, session_id: &str) -> Result<MoodHistory, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT emotion, confidence, timestamp FROM emotions
             WHERE session_id = ?1 ORDER BY timestamp, rowid",
        )?;
        let rows = stmt.query_map(params![session_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, f64>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })?;

        let mut history = MoodHistory::new();
        for row in rows {
            let (label, confidence, timestamp) = row?;
            let emotion: Emotion = label
                .parse()
                .map_err(|e: crate::detector::UnknownEmotion| StoreError::InvalidData(e.to_string()))?;
            history.push(MoodEntry::new(timestamp, emotion, confidence));
        }
        Ok(history)
    }

    /// Share of focused emotions in a session; 0 when it has none.
    pub fn productivity_level(&self, session_id: &str) -> Result<f64, StoreError> {
        let (focused, total): (i64, i64) = self.conn.query_row(
            "SELECT COALESCE(SUM(emotion = 'focused'), 0), COUNT(*)
             FROM emotions WHERE session_id = ?1",
            params![session_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(focused as f64 / total.max(1) as f64)
    }

    /// All sessions, most recent first.
    pub fn sessions(&self) -> Result<Vec<SessionRecord>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT session_id, started_at, ended_at FROM sessions ORDER BY started_at DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
            ))
        })?;

        let mut sessions = Vec::new();
        for row in rows {
            let (session_id, started_at, ended_at) = row?;
            sessions.push(SessionRecord {
                session_id,
                started_at: parse_datetime(&started_at)?,
                ended_at: ended_at.as_deref().map(parse_datetime).transpose()?,
            });
        }
        Ok(sessions)
    }
}

fn run_migrations(conn: &mut Connection) -> Result<(), StoreError> {
    let version: i32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

    if version > CURRENT_SCHEMA_VERSION {
        return Err(StoreError::UnsupportedSchema(version));
    }
    if version == CURRENT_SCHEMA_VERSION {
        return Ok(());
    }

    let tx = conn.transaction()?;
    if version < 1 {
        tx.execute_batch(SCHEMA_V1)?;
    }
    tx.pragma_update(None, "user_version", CURRENT_SCHEMA_VERSION)?;
    tx.commit()?;

    tracing::debug!(from = version, to = CURRENT_SCHEMA_VERSION, "Database migrated");
    Ok(())
}
