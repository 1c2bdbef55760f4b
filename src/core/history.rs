//! Mood entries and the append-only history they are collected into.

use crate::detector::types::{Detection, Emotion};
use chrono::{DateTime, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// A single recorded mood observation.
///
/// Entries are immutable once created: fields are read through accessors.
/// Deserialized entries go through [`MoodEntry::new`] as well.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredEntry")]
pub struct MoodEntry {
    /// Epoch milliseconds
    timestamp: i64,
    emotion: Emotion,
    /// Confidence in [0, 1]
    confidence: f64,
}

impl MoodEntry {
    /// Create an entry. Confidence is clamped into [0, 1]; NaN becomes 0.
    pub fn new(timestamp: i64, emotion: Emotion, confidence: f64) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self {
            timestamp,
            emotion,
            confidence,
        }
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn emotion(&self) -> Emotion {
        self.emotion
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// The timestamp as a UTC datetime, if it is in chrono's range.
    pub fn recorded_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }

    /// Hour of day (0-23) of this entry in the given time zone.
    pub fn hour_in<Tz: TimeZone>(&self, tz: &Tz) -> Option<u32> {
        self.recorded_at()
            .map(|utc| utc.with_timezone(tz).hour())
    }
}

/// Wire form of [`MoodEntry`] before validation.
#[derive(Deserialize)]
struct StoredEntry {
    timestamp: i64,
    emotion: Emotion,
    confidence: f64,
}

impl From<StoredEntry> for MoodEntry {
    fn from(stored: StoredEntry) -> Self {
        MoodEntry::new(stored.timestamp, stored.emotion, stored.confidence)
    }
}

impl From<Detection> for MoodEntry {
    fn from(detection: Detection) -> Self {
        MoodEntry::new(
            detection.detected_at.timestamp_millis(),
            detection.emotion,
            detection.confidence,
        )
    }
}

impl From<&Detection> for MoodEntry {
    fn from(detection: &Detection) -> Self {
        MoodEntry::from(detection.clone())
    }
}

/// Ordered, append-only sequence of mood entries.
///
/// Insertion order is treated as chronological order. Out-of-order
/// timestamps are accepted but logged and counted; the history is never
/// reordered.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MoodHistory {
    entries: Vec<MoodEntry>,
    #[serde(skip)]
    out_of_order: usize,
}

impl MoodHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry to the end of the history.
    pub fn push(&mut self, entry: MoodEntry) {
        if let Some(last) = self.entries.last() {
            if entry.timestamp < last.timestamp {
                self.out_of_order += 1;
                tracing::warn!(
                    previous = last.timestamp,
                    timestamp = entry.timestamp,
                    "Mood entry appended out of order"
                );
            }
        }
        self.entries.push(entry);
    }

    /// Append a detector output.
    pub fn record(&mut self, detection: &Detection) {
        self.push(MoodEntry::from(detection));
    }

    pub fn entries(&self) -> &[MoodEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn latest(&self) -> Option<&MoodEntry> {
        self.entries.last()
    }

    /// Number of appends whose timestamp went backwards.
    pub fn out_of_order_count(&self) -> usize {
        self.out_of_order
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MoodEntry> {
        self.entries.iter()
    }
}

impl FromIterator<MoodEntry> for MoodHistory {
    fn from_iter<I: IntoIterator<Item = MoodEntry>>(iter: I) -> Self {
        let mut history = MoodHistory::new();
        for entry in iter {
            history.push(entry);
        }
        history
    }
}

impl Extend<MoodEntry> for MoodHistory {
    fn extend<I: IntoIterator<Item = MoodEntry>>(&mut self, iter: I) {
        for entry in iter {
            self.push(entry);
        }
    }
}

impl<'a> IntoIterator for &'a MoodHistory {
    type Item = &'a MoodEntry;
    type IntoIter = std::slice::Iter<'a, MoodEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl AsRef<[MoodEntry]> for MoodHistory {
    fn as_ref(&self) -> &[MoodEntry] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_is_clamped() {
        assert_eq!(MoodEntry::new(0, Emotion::Happy, 1.5).confidence(), 1.0);
        assert_eq!(MoodEntry::new(0, Emotion::Happy, -0.2).confidence(), 0.0);
        assert_eq!(MoodEntry::new(0, Emotion::Happy, f64::NAN).confidence(), 0.0);
    }

    #[test]
    fn test_deserialized_confidence_is_clamped() {
        let entry: MoodEntry =
            serde_json::from_str(r#"{"timestamp":5,"emotion":"tired","confidence":5.0}"#).unwrap();
        assert_eq!(entry.confidence(), 1.0);
        assert_eq!(entry.timestamp(), 5);

        let entry: MoodEntry =
            serde_json::from_str(r#"{"timestamp":5,"emotion":"tired","confidence":-3.0}"#).unwrap();
        assert_eq!(entry.confidence(), 0.0);
    }

    #[test]
    fn test_append_preserves_insertion_order() {
        let mut history = MoodHistory::new();
        history.push(MoodEntry::new(1_000, Emotion::Focused, 0.9));
        history.push(MoodEntry::new(2_000, Emotion::Tired, 0.8));

        assert_eq!(history.len(), 2);
        assert_eq!(history.latest().unwrap().emotion(), Emotion::Tired);
        assert_eq!(history.out_of_order_count(), 0);
    }

    #[test]
    fn test_out_of_order_entries_are_kept_and_counted() {
        let mut history = MoodHistory::new();
        history.push(MoodEntry::new(5_000, Emotion::Focused, 0.9));
        history.push(MoodEntry::new(1_000, Emotion::Happy, 0.9));

        assert_eq!(history.len(), 2);
        assert_eq!(history.out_of_order_count(), 1);
        assert_eq!(history.entries()[1].timestamp(), 1_000);
    }

    #[test]
    fn test_detection_conversion() {
        let detection = Detection::new(Emotion::Stressed, 0.81);
        let entry = MoodEntry::from(&detection);
        assert_eq!(entry.emotion(), Emotion::Stressed);
        assert_eq!(entry.timestamp(), detection.detected_at.timestamp_millis());
    }

    #[test]
    fn test_hour_in_timezone() {
        // 2024-01-22T07:30:00Z
        let entry = MoodEntry::new(1_705_908_600_000, Emotion::Neutral, 0.8);
        assert_eq!(entry.hour_in(&Utc), Some(7));
        assert_eq!(entry.hour_in(&chrono_tz::Asia::Tokyo), Some(16));
    }
}
