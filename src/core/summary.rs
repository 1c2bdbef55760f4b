//! End-of-session summaries.
//!
//! Per-emotion scores are averaged over every record in a session. Neutral
//! tends to dominate raw averages, so a neutral winner is overridden by the
//! first other emotion whose average clears the override threshold.

use crate::core::history::MoodEntry;
use crate::detector::types::Emotion;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default threshold for overriding a neutral dominant emotion.
pub const DEFAULT_OVERRIDE_THRESHOLD: f64 = 0.1;

/// Per-emotion scores for one record.
pub type EmotionScores = BTreeMap<Emotion, f64>;

/// Coarse productivity reading derived from the dominant emotion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductivityState {
    Motivated,
    Focused,
    NeutralFocused,
    Fatigued,
    Stressed,
}

impl ProductivityState {
    pub fn from_emotion(emotion: Emotion) -> Self {
        match emotion {
            Emotion::Happy => ProductivityState::Motivated,
            Emotion::Focused => ProductivityState::Focused,
            Emotion::Neutral => ProductivityState::NeutralFocused,
            Emotion::Tired => ProductivityState::Fatigued,
            Emotion::Stressed => ProductivityState::Stressed,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ProductivityState::Motivated => "happy/focused/motivated",
            ProductivityState::Focused => "focused",
            ProductivityState::NeutralFocused => "neutral/focused",
            ProductivityState::Fatigued => "fatigued",
            ProductivityState::Stressed => "stressed",
        }
    }
}

/// Scores for an entry: its confidence on its own label, zero elsewhere.
pub fn scores_from_entry(entry: &MoodEntry) -> EmotionScores {
    Emotion::ALL
        .iter()
        .map(|&e| {
            let score = if e == entry.emotion() {
                entry.confidence()
            } else {
                0.0
            };
            (e, score)
        })
        .collect()
}

/// Mean score per emotion; labels missing from a record count as zero.
pub fn average_scores(records: &[EmotionScores]) -> EmotionScores {
    if records.is_empty() {
        return EmotionScores::new();
    }
    let n = records.len() as f64;
    Emotion::ALL
        .iter()
        .map(|&e| {
            let sum: f64 = records.iter().map(|r| r.get(&e).copied().unwrap_or(0.0)).sum();
            (e, sum / n)
        })
        .collect()
}

/// Highest-scoring emotion with the neutral override applied.
///
/// Ties resolve in [`Emotion::ALL`] order. Returns neutral for empty scores.
pub fn dominant_with_override(averages: &EmotionScores, threshold: f64) -> Emotion {
    let mut dominant: Option<(Emotion, f64)> = None;
    for &e in Emotion::ALL.iter() {
        if let Some(&score) = averages.get(&e) {
            match dominant {
                Some((_, best)) if score <= best => {}
                _ => dominant = Some((e, score)),
            }
        }
    }

    let dominant = dominant.map(|(e, _)| e).unwrap_or_default();
    if dominant != Emotion::Neutral {
        return dominant;
    }

    Emotion::ALL
        .iter()
        .copied()
        .filter(|e| *e != Emotion::Neutral)
        .find(|e| averages.get(e).copied().unwrap_or(0.0) > threshold)
        .unwrap_or(Emotion::Neutral)
}

/// Share of focused labels; 0 for an empty list.
pub fn focus_score(emotions: &[Emotion]) -> f64 {
    let focused = emotions.iter().filter(|e| **e == Emotion::Focused).count();
    focused as f64 / emotions.len().max(1) as f64
}

/// What gets written to a session's `summary.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_minutes: f64,
    pub entry_count: usize,
    pub average_emotions: EmotionScores,
    pub dominant_emotion: Emotion,
    pub productivity_state: ProductivityState,
    pub focus_score: f64,
}

impl SessionSummary {
    /// Summarize a session. Returns `None` when nothing was recorded.
    pub fn build(
        session_name: &str,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        entries: &[MoodEntry],
        override_threshold: f64,
    ) -> Option<Self> {
        if entries.is_empty() {
            tracing::warn!(session = session_name, "No emotion data collected this session");
            return None;
        }

        let records: Vec<EmotionScores> = entries.iter().map(scores_from_entry).collect();
        let average_emotions = average_scores(&records);
        let dominant_emotion = dominant_with_override(&average_emotions, override_threshold);
        let labels: Vec<Emotion> = entries.iter().map(|e| e.emotion()).collect();
        let duration_minutes = (end_time - start_time).num_milliseconds() as f64 / 60_000.0;

        Some(Self {
            session_name: session_name.to_string(),
            start_time,
            end_time,
            duration_minutes,
            entry_count: entries.len(),
            average_emotions,
            dominant_emotion,
            productivity_state: ProductivityState::from_emotion(dominant_emotion),
            focus_score: focus_score(&labels),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn scores(pairs: &[(Emotion, f64)]) -> EmotionScores {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_average_scores_fill_missing_labels() {
        let records = vec![
            scores(&[(Emotion::Happy, 0.6), (Emotion::Neutral, 0.4)]),
            scores(&[(Emotion::Happy, 0.2)]),
        ];
        let avg = average_scores(&records);
        assert!((avg[&Emotion::Happy] - 0.4).abs() < 1e-9);
        assert!((avg[&Emotion::Neutral] - 0.2).abs() < 1e-9);
        assert_eq!(avg[&Emotion::Tired], 0.0);
    }

    #[test]
    fn test_neutral_overridden_above_threshold() {
        let avg = scores(&[
            (Emotion::Neutral, 0.6),
            (Emotion::Tired, 0.15),
            (Emotion::Stressed, 0.2),
        ]);
        // Tired precedes stressed in canonical order
        assert_eq!(dominant_with_override(&avg, 0.1), Emotion::Tired);
    }

    #[test]
    fn test_neutral_kept_below_threshold() {
        let avg = scores(&[(Emotion::Neutral, 0.9), (Emotion::Happy, 0.05)]);
        assert_eq!(dominant_with_override(&avg, 0.1), Emotion::Neutral);
        assert_eq!(dominant_with_override(&EmotionScores::new(), 0.1), Emotion::Neutral);
    }

    #[test]
    fn test_focus_score() {
        assert_eq!(focus_score(&[]), 0.0);
        let labels = [Emotion::Focused, Emotion::Happy, Emotion::Focused, Emotion::Tired];
        assert!((focus_score(&labels) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_build_summary() {
        let start = Utc::now();
        let end = start + Duration::minutes(3);
        let entries = vec![
            MoodEntry::new(start.timestamp_millis(), Emotion::Focused, 0.9),
            MoodEntry::new(start.timestamp_millis() + 3_000, Emotion::Focused, 0.8),
            MoodEntry::new(start.timestamp_millis() + 6_000, Emotion::Happy, 0.95),
        ];

        let summary = SessionSummary::build("session_test", start, end, &entries, 0.1).unwrap();
        assert_eq!(summary.entry_count, 3);
        assert_eq!(summary.dominant_emotion, Emotion::Focused);
        assert_eq!(summary.productivity_state, ProductivityState::Focused);
        assert!((summary.duration_minutes - 3.0).abs() < 1e-9);
        assert!((summary.focus_score - 2.0 / 3.0).abs() < 1e-9);

        assert!(SessionSummary::build("empty", start, end, &[], 0.1).is_none());
    }
}
