//! Tracking transparency log.
//!
//! Counts what the tracker did (detections emitted, entries kept, sessions
//! summarized) without storing any of the detections themselves. Totals
//! accumulate across runs in a small JSON file.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Something the tracker did that users can audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingEvent {
    /// The tracker handed a detection to its consumer
    DetectionEmitted,
    /// A detection was kept in a history or session log
    EntryRecorded,
    /// A tracking session ended
    SessionCompleted,
    /// A session summary was written to disk
    SummaryExported,
}

/// Cumulative counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransparencyStats {
    pub detections_emitted: u64,
    pub entries_recorded: u64,
    pub sessions_completed: u64,
    pub summaries_exported: u64,
}

impl TransparencyStats {
    fn apply(&mut self, event: TrackingEvent) {
        let counter = match event {
            TrackingEvent::DetectionEmitted => &mut self.detections_emitted,
            TrackingEvent::EntryRecorded => &mut self.entries_recorded,
            TrackingEvent::SessionCompleted => &mut self.sessions_completed,
            TrackingEvent::SummaryExported => &mut self.summaries_exported,
        };
        *counter += 1;
    }
}

/// On-disk layout: the counters plus when they were last written.
#[derive(Serialize, Deserialize)]
struct StatsFile {
    #[serde(flatten)]
    totals: TransparencyStats,
    last_updated: DateTime<Utc>,
}

/// Shared counter set for one run of the agent.
#[derive(Debug)]
pub struct TransparencyLog {
    totals: Mutex<TransparencyStats>,
    started_at: DateTime<Utc>,
    path: Option<PathBuf>,
}

impl TransparencyLog {
    /// In-memory log starting from zero.
    pub fn new() -> Self {
        Self {
            totals: Mutex::new(TransparencyStats::default()),
            started_at: Utc::now(),
            path: None,
        }
    }

    /// Log backed by `path`, continuing from the totals stored there.
    ///
    /// An unreadable file is logged and counting restarts from zero.
    pub fn open(path: PathBuf) -> Self {
        let totals = match Self::read_totals(&path) {
            Ok(totals) => totals.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(path = ?path, "Could not load previous transparency stats: {}", e);
                TransparencyStats::default()
            }
        };
        Self {
            totals: Mutex::new(totals),
            started_at: Utc::now(),
            path: Some(path),
        }
    }

    /// Totals stored at `path`, or `None` if nothing was saved yet.
    pub fn read_totals(path: &Path) -> Result<Option<TransparencyStats>, std::io::Error> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)?;
        let file: StatsFile = serde_json::from_str(&content).map_err(std::io::Error::other)?;
        Ok(Some(file.totals))
    }

    pub fn record(&self, event: TrackingEvent) {
        self.totals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .apply(event);
    }

    pub fn totals(&self) -> TransparencyStats {
        *self.totals.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Counters and privacy notes for terminal output.
    pub fn summary(&self) -> String {
        let totals = self.totals();
        let run_secs = (Utc::now() - self.started_at).num_seconds().max(0);
        [
            "Tracking Statistics:".to_string(),
            format!("- Detections emitted: {}", totals.detections_emitted),
            format!("- Entries recorded: {}", totals.entries_recorded),
            format!("- Sessions completed: {}", totals.sessions_completed),
            format!("- Summaries exported: {}", totals.summaries_exported),
            format!("- This run: {run_secs} seconds"),
            String::new(),
            "Privacy Guarantee:".to_string(),
            "- No video frames inspected or stored".to_string(),
            "- Only emotion labels and confidence values retained".to_string(),
        ]
        .join("\n")
    }

    /// Write the totals to the backing file. A no-op for in-memory logs.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = StatsFile {
            totals: self.totals(),
            last_updated: Utc::now(),
        };
        let json = serde_json::to_string_pretty(&file).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }
}

impl Default for TransparencyLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_update_matching_counter() {
        let log = TransparencyLog::new();

        log.record(TrackingEvent::DetectionEmitted);
        log.record(TrackingEvent::DetectionEmitted);
        log.record(TrackingEvent::EntryRecorded);

        let totals = log.totals();
        assert_eq!(totals.detections_emitted, 2);
        assert_eq!(totals.entries_recorded, 1);
        assert_eq!(totals.sessions_completed, 0);
    }

    #[test]
    fn test_totals_accumulate_across_runs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("transparency.json");

        let first = TransparencyLog::open(path.clone());
        first.record(TrackingEvent::DetectionEmitted);
        first.record(TrackingEvent::SummaryExported);
        first.save().unwrap();

        let second = TransparencyLog::open(path.clone());
        second.record(TrackingEvent::DetectionEmitted);
        second.save().unwrap();

        let stored = TransparencyLog::read_totals(&path).unwrap().unwrap();
        assert_eq!(stored.detections_emitted, 2);
        assert_eq!(stored.summaries_exported, 1);
    }

    #[test]
    fn test_missing_or_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transparency.json");
        assert!(TransparencyLog::read_totals(&path).unwrap().is_none());

        std::fs::write(&path, "not json").unwrap();
        assert!(TransparencyLog::read_totals(&path).is_err());
        assert_eq!(TransparencyLog::open(path).totals(), TransparencyStats::default());
    }

    #[test]
    fn test_summary_format() {
        let log = TransparencyLog::new();
        let summary = log.summary();

        assert!(summary.contains("Detections emitted: 0"));
        assert!(summary.contains("Privacy Guarantee"));
        assert!(summary.contains("No video frames"));
    }
}
