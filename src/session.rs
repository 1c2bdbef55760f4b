//! Recorded tracking sessions on disk.
//!
//! Each session lives in its own `session_YYYYmmdd_HHMMSS` directory under
//! the sessions path:
//!
//! ```text
//! sessions/
//! └── session_20240122_101500/
//!     ├── session_emotions.jsonl   one MoodEntry per line, appended live
//!     └── summary.json             written when the session ends
//! ```

use crate::core::history::{MoodEntry, MoodHistory};
use crate::core::summary::SessionSummary;
use crate::detector::types::Detection;
use chrono::{DateTime, Utc};
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// File name of the per-session detection log.
pub const EMOTIONS_FILE: &str = "session_emotions.jsonl";

/// File name of the per-session summary.
pub const SUMMARY_FILE: &str = "summary.json";

const SESSION_PREFIX: &str = "session_";

/// Session recording errors.
#[derive(Debug)]
pub enum SessionError {
    IoError(String),
    SerializeError(String),
    ParseError { line: usize, message: String },
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::IoError(e) => write!(f, "IO error: {e}"),
            SessionError::SerializeError(e) => write!(f, "Serialize error: {e}"),
            SessionError::ParseError { line, message } => {
                write!(f, "Parse error on line {line}: {message}")
            }
        }
    }
}

impl std::error::Error for SessionError {}

impl From<std::io::Error> for SessionError {
    fn from(e: std::io::Error) -> Self {
        SessionError::IoError(e.to_string())
    }
}

/// Records one tracking session to disk.
pub struct SessionRecorder {
    name: String,
    path: PathBuf,
    started_at: DateTime<Utc>,
    history: MoodHistory,
    override_threshold: f64,
}

impl SessionRecorder {
    /// Create the session directory and start recording.
    pub fn start(
        sessions_dir: &Path,
        started_at: DateTime<Utc>,
        override_threshold: f64,
    ) -> Result<Self, SessionError> {
        std::fs::create_dir_all(sessions_dir)?;
        let (name, path) = create_session_dir(sessions_dir, started_at)?;

        tracing::info!(session = %name, path = ?path, "Session started");

        Ok(Self {
            name,
            path,
            started_at,
            history: MoodHistory::new(),
            override_threshold,
        })
    }

    /// Append a detection to the in-memory history and the session log.
    pub fn record(&mut self, detection: &Detection) -> Result<(), SessionError> {
        let entry = MoodEntry::from(detection);
        self.history.push(entry);

        let line =
            serde_json::to_string(&entry).map_err(|e| SessionError::SerializeError(e.to_string()))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.emotions_path())?;
        writeln!(file, "{line}")?;

        tracing::debug!(session = %self.name, emotion = %entry.emotion(), "Logged emotion");
        Ok(())
    }

    /// End the session and write `summary.json`.
    ///
    /// Returns `Ok(None)` when no detections were recorded.
    pub fn finish(self, ended_at: DateTime<Utc>) -> Result<Option<SessionSummary>, SessionError> {
        let summary = match SessionSummary::build(
            &self.name,
            self.started_at,
            ended_at,
            self.history.entries(),
            self.override_threshold,
        ) {
            Some(summary) => summary,
            None => return Ok(None),
        };

        let json = serde_json::to_string_pretty(&summary)
            .map_err(|e| SessionError::SerializeError(e.to_string()))?;
        std::fs::write(self.path.join(SUMMARY_FILE), json)?;

        tracing::info!(
            session = %self.name,
            duration_minutes = summary.duration_minutes,
            dominant = %summary.dominant_emotion,
            "Session summary saved"
        );
        Ok(Some(summary))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn history(&self) -> &MoodHistory {
        &self.history
    }

    pub fn emotions_path(&self) -> PathBuf {
        self.path.join(EMOTIONS_FILE)
    }
}

/// Create a fresh `session_YYYYmmdd_HHMMSS` directory.
///
/// A session started in the same second as an existing one gets a `_1`,
/// `_2`, ... suffix so it never shares files with it.
fn create_session_dir(
    sessions_dir: &Path,
    started_at: DateTime<Utc>,
) -> Result<(String, PathBuf), SessionError> {
    let base = format!("{SESSION_PREFIX}{}", started_at.format("%Y%m%d_%H%M%S"));
    let mut name = base.clone();
    let mut suffix = 0u32;

    loop {
        let path = sessions_dir.join(&name);
        match std::fs::create_dir(&path) {
            Ok(()) => return Ok((name, path)),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                suffix += 1;
                name = format!("{base}_{suffix}");
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Read a session log back into a history.
///
/// Blank lines are skipped; any other unparsable line is an error.
pub fn load_history(path: &Path) -> Result<MoodHistory, SessionError> {
    let file = std::fs::File::open(path)?;
    let mut history = MoodHistory::new();

    for (i, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let entry: MoodEntry = serde_json::from_str(&line).map_err(|e| SessionError::ParseError {
            line: i + 1,
            message: e.to_string(),
        })?;
        history.push(entry);
    }

    Ok(history)
}

/// Load a history from either a session log (`.jsonl`) or a JSON array.
pub fn load_history_file(path: &Path) -> Result<MoodHistory, SessionError> {
    if path.extension().is_some_and(|e| e == "jsonl") {
        return load_history(path);
    }
    let content = std::fs::read_to_string(path)?;
    let entries: Vec<MoodEntry> =
        serde_json::from_str(&content).map_err(|e| SessionError::ParseError {
            line: e.line(),
            message: e.to_string(),
        })?;
    Ok(entries.into_iter().collect())
}

/// Read a session's saved summary, if it has one.
pub fn load_summary(session_dir: &Path) -> Result<Option<SessionSummary>, SessionError> {
    let path = session_dir.join(SUMMARY_FILE);
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| SessionError::ParseError {
            line: e.line(),
            message: e.to_string(),
        })
}

/// Session directories under `sessions_dir`, oldest first.
pub fn list_sessions(sessions_dir: &Path) -> Result<Vec<PathBuf>, SessionError> {
    if !sessions_dir.exists() {
        return Ok(Vec::new());
    }

    let mut sessions: Vec<PathBuf> = std::fs::read_dir(sessions_dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(SESSION_PREFIX))
        })
        .collect();
    sessions.sort();
    Ok(sessions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::types::Emotion;
    use chrono::{Duration, TimeZone};

    fn detection_at(at: DateTime<Utc>, emotion: Emotion, confidence: f64) -> Detection {
        Detection {
            emotion,
            confidence,
            detected_at: at,
        }
    }

    #[test]
    fn test_session_directory_name() {
        let dir = tempfile::tempdir().unwrap();
        let start = Utc.with_ymd_and_hms(2024, 1, 22, 10, 15, 0).unwrap();
        let recorder = SessionRecorder::start(dir.path(), start, 0.1).unwrap();

        assert_eq!(recorder.name(), "session_20240122_101500");
        assert!(recorder.path().is_dir());
    }

    #[test]
    fn test_record_and_finish() {
        let dir = tempfile::tempdir().unwrap();
        let start = Utc.with_ymd_and_hms(2024, 1, 22, 10, 15, 0).unwrap();
        let mut recorder = SessionRecorder::start(dir.path(), start, 0.1).unwrap();

        recorder
            .record(&detection_at(start + Duration::seconds(3), Emotion::Focused, 0.9))
            .unwrap();
        recorder
            .record(&detection_at(start + Duration::seconds(6), Emotion::Focused, 0.8))
            .unwrap();
        recorder
            .record(&detection_at(start + Duration::seconds(9), Emotion::Tired, 0.77))
            .unwrap();

        let log_path = recorder.emotions_path();
        let session_dir = recorder.path().to_path_buf();

        let reloaded = load_history(&log_path).unwrap();
        assert_eq!(reloaded.len(), 3);
        assert_eq!(reloaded.entries()[2].emotion(), Emotion::Tired);

        let summary = recorder
            .finish(start + Duration::minutes(2))
            .unwrap()
            .unwrap();
        assert_eq!(summary.dominant_emotion, Emotion::Focused);
        assert_eq!(summary.entry_count, 3);

        let saved = load_summary(&session_dir).unwrap().unwrap();
        assert_eq!(saved.session_name, "session_20240122_101500");
        assert!((saved.duration_minutes - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_session_writes_no_summary() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = SessionRecorder::start(dir.path(), Utc::now(), 0.1).unwrap();
        let session_dir = recorder.path().to_path_buf();

        assert!(recorder.finish(Utc::now()).unwrap().is_none());
        assert!(load_summary(&session_dir).unwrap().is_none());
    }

    #[test]
    fn test_sessions_in_same_second_stay_separate() {
        let dir = tempfile::tempdir().unwrap();
        let start = Utc.with_ymd_and_hms(2024, 1, 22, 10, 15, 0).unwrap();

        let mut first = SessionRecorder::start(dir.path(), start, 0.1).unwrap();
        first
            .record(&detection_at(start, Emotion::Happy, 0.9))
            .unwrap();

        let second = SessionRecorder::start(dir.path(), start, 0.1).unwrap();
        assert_eq!(second.name(), "session_20240122_101500_1");
        assert_ne!(first.path(), second.path());
        assert!(!second.emotions_path().exists());

        let third = SessionRecorder::start(dir.path(), start, 0.1).unwrap();
        assert_eq!(third.name(), "session_20240122_101500_2");

        // Finishing the empty session leaves the first session's files alone
        assert!(second.finish(start).unwrap().is_none());
        assert_eq!(load_history(&first.emotions_path()).unwrap().len(), 1);
        assert_eq!(list_sessions(dir.path()).unwrap().len(), 3);
    }

    #[test]
    fn test_out_of_range_confidence_is_clamped_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(
            &path,
            r#"[{"timestamp":1,"emotion":"happy","confidence":5.0},
                {"timestamp":2,"emotion":"tired","confidence":-3.0}]"#,
        )
        .unwrap();

        let history = load_history_file(&path).unwrap();
        let confidences: Vec<f64> = history.iter().map(|e| e.confidence()).collect();
        assert_eq!(confidences, vec![1.0, 0.0]);
        assert!((crate::core::analytics::average_confidence(history.entries()) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_malformed_line_reports_position() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(EMOTIONS_FILE);
        std::fs::write(
            &path,
            "{\"timestamp\":1,\"emotion\":\"happy\",\"confidence\":0.8}\n\nnot json\n",
        )
        .unwrap();

        match load_history(&path) {
            Err(SessionError::ParseError { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_load_json_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seed.json");
        std::fs::write(
            &path,
            r#"[{"timestamp":1,"emotion":"happy","confidence":0.8},
                {"timestamp":2,"emotion":"tired","confidence":0.9}]"#,
        )
        .unwrap();

        let history = load_history_file(&path).unwrap();
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_list_sessions_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("session_20240102_000000")).unwrap();
        std::fs::create_dir(dir.path().join("session_20240101_000000")).unwrap();
        std::fs::create_dir(dir.path().join("other")).unwrap();

        let sessions = list_sessions(dir.path()).unwrap();
        assert_eq!(sessions.len(), 2);
        assert!(sessions[0].ends_with("session_20240101_000000"));

        assert!(list_sessions(&dir.path().join("missing")).unwrap().is_empty());
    }
}
