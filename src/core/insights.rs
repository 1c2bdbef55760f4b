//! Headline insights derived from a mood history.

use crate::core::analytics::{bucket_summaries, percentage_of, BucketSummary};
use crate::core::history::MoodEntry;
use crate::detector::types::Emotion;
use chrono::TimeZone;
use serde::{Deserialize, Serialize};

/// Focused share above which concentration counts as excellent.
pub const FOCUS_THRESHOLD_PCT: f64 = 40.0;

/// Happy share above which mood counts as upbeat.
pub const WELLBEING_THRESHOLD_PCT: f64 = 30.0;

/// Stressed share above which stress counts as elevated.
pub const STRESS_THRESHOLD_PCT: f64 = 30.0;

/// A percentage score with its threshold verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    /// 0-100
    pub percentage: f64,
    pub above_threshold: bool,
}

impl Score {
    fn new(percentage: f64, threshold: f64) -> Self {
        Self {
            percentage,
            above_threshold: percentage > threshold,
        }
    }
}

/// Productivity, wellbeing and stress scores plus daily patterns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insights {
    /// Share of focused entries
    pub productivity: Score,
    /// Share of happy entries
    pub wellbeing: Score,
    /// Share of stressed entries
    pub stress: Score,
    /// Dominant emotion per part of the day
    pub time_patterns: Vec<BucketSummary>,
}

impl Insights {
    pub fn from_entries<Tz: TimeZone>(entries: &[MoodEntry], tz: &Tz) -> Self {
        Self {
            productivity: Score::new(
                percentage_of(entries, Emotion::Focused),
                FOCUS_THRESHOLD_PCT,
            ),
            wellbeing: Score::new(
                percentage_of(entries, Emotion::Happy),
                WELLBEING_THRESHOLD_PCT,
            ),
            stress: Score::new(
                percentage_of(entries, Emotion::Stressed),
                STRESS_THRESHOLD_PCT,
            ),
            time_patterns: bucket_summaries(entries, tz),
        }
    }

    pub fn excellent_focus(&self) -> bool {
        self.productivity.above_threshold
    }

    pub fn upbeat(&self) -> bool {
        self.wellbeing.above_threshold
    }

    pub fn elevated_stress(&self) -> bool {
        self.stress.above_threshold
    }

    /// Multi-line report for terminal output.
    pub fn report(&self) -> String {
        let mut lines = vec![
            format!(
                "Productivity score: {:.0}% focused ({})",
                self.productivity.percentage,
                if self.excellent_focus() {
                    "excellent concentration"
                } else {
                    "room for improvement"
                }
            ),
            format!(
                "Wellbeing index:    {:.0}% positive ({})",
                self.wellbeing.percentage,
                if self.upbeat() {
                    "generally upbeat"
                } else {
                    "consider more breaks"
                }
            ),
            format!(
                "Stress indicator:   {:.0}% stressed ({})",
                self.stress.percentage,
                if self.elevated_stress() {
                    "consider stress management"
                } else {
                    "well managed"
                }
            ),
            String::new(),
        ];

        for pattern in &self.time_patterns {
            lines.push(format!(
                "{:<10} {:<9} ({} entries)",
                pattern.bucket, pattern.dominant, pattern.count
            ));
        }

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::analytics::HourBucket;
    use chrono::Utc;

    const DAY_START_MS: i64 = 1_705_881_600_000;
    const HOUR_MS: i64 = 3_600_000;

    fn entry(hour: i64, emotion: Emotion) -> MoodEntry {
        MoodEntry::new(DAY_START_MS + hour * HOUR_MS, emotion, 0.9)
    }

    #[test]
    fn test_empty_history_scores_zero() {
        let insights = Insights::from_entries(&[], &Utc);
        assert_eq!(insights.productivity.percentage, 0.0);
        assert!(!insights.excellent_focus());
        assert!(!insights.upbeat());
        assert!(!insights.elevated_stress());
        assert_eq!(insights.time_patterns.len(), 3);
    }

    #[test]
    fn test_thresholds() {
        let entries = vec![
            entry(7, Emotion::Focused),
            entry(8, Emotion::Focused),
            entry(13, Emotion::Focused),
            entry(19, Emotion::Stressed),
            entry(20, Emotion::Stressed),
        ];
        let insights = Insights::from_entries(&entries, &Utc);

        assert!((insights.productivity.percentage - 60.0).abs() < 1e-9);
        assert!(insights.excellent_focus());
        assert!(!insights.upbeat());
        // 40% stressed is above 30%
        assert!(insights.elevated_stress());

        let evening = insights
            .time_patterns
            .iter()
            .find(|p| p.bucket == HourBucket::Evening)
            .unwrap();
        assert_eq!(evening.dominant, Emotion::Stressed);
    }

    #[test]
    fn test_report_mentions_patterns() {
        let insights = Insights::from_entries(&[entry(9, Emotion::Happy)], &Utc);
        let report = insights.report();
        assert!(report.contains("Wellbeing index"));
        assert!(report.contains("morning"));
        assert!(report.contains("happy"));
    }
}
