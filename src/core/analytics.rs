//! Mood analytics over a history of entries.
//!
//! Everything here is a pure function of its input (plus the time zone used
//! for hour-of-day extraction). Empty inputs produce zero or neutral values,
//! never NaN and never a panic.

use crate::core::history::MoodEntry;
use crate::detector::types::Emotion;
use chrono::{Local, TimeZone};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::BTreeMap;

/// Coarse partition of the day used for pattern summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HourBucket {
    /// [06:00, 12:00)
    Morning,
    /// [12:00, 18:00)
    Afternoon,
    /// [18:00, 24:00) and [00:00, 06:00)
    Evening,
}

impl HourBucket {
    pub const ALL: [HourBucket; 3] = [
        HourBucket::Morning,
        HourBucket::Afternoon,
        HourBucket::Evening,
    ];

    /// Bucket for an hour of day (0-23).
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            6..=11 => HourBucket::Morning,
            12..=17 => HourBucket::Afternoon,
            _ => HourBucket::Evening,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HourBucket::Morning => "morning",
            HourBucket::Afternoon => "afternoon",
            HourBucket::Evening => "evening",
        }
    }
}

impl std::fmt::Display for HourBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Count and share of one emotion within a history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionStat {
    pub emotion: Emotion,
    pub count: usize,
    /// Share of all entries, 0-100
    pub percentage: f64,
}

/// Entry count and dominant emotion for one part of the day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketSummary {
    pub bucket: HourBucket,
    pub count: usize,
    pub dominant: Emotion,
}

/// Per-emotion counts for one hour of the day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyCounts {
    /// Hour of day, 0-23
    pub hour: u32,
    pub counts: BTreeMap<Emotion, usize>,
}

/// Everything derived from a history in one pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsResult {
    pub total_entries: usize,
    /// One stat per label, in [`Emotion::ALL`] order
    pub stats: Vec<EmotionStat>,
    /// `None` for an empty history
    pub most_common: Option<Emotion>,
    pub average_confidence: f64,
    pub confidence_std_dev: f64,
    /// Morning, afternoon and evening, in that order
    pub buckets: Vec<BucketSummary>,
    /// Hours that have entries, ascending
    pub timeline: Vec<HourlyCounts>,
}

impl AnalyticsResult {
    /// Stat for a single emotion.
    pub fn stat(&self, emotion: Emotion) -> Option<&EmotionStat> {
        self.stats.iter().find(|s| s.emotion == emotion)
    }

    pub fn bucket(&self, bucket: HourBucket) -> Option<&BucketSummary> {
        self.buckets.iter().find(|b| b.bucket == bucket)
    }
}

/// Count entries per label, indexed by [`Emotion::index`].
pub fn count_by_emotion(entries: &[MoodEntry]) -> [usize; 5] {
    let mut counts = [0usize; 5];
    for entry in entries {
        counts[entry.emotion().index()] += 1;
    }
    counts
}

/// Fraction of entries carrying `emotion`; 0 for an empty history.
pub fn frequency_of(entries: &[MoodEntry], emotion: Emotion) -> f64 {
    if entries.is_empty() {
        return 0.0;
    }
    let count = entries.iter().filter(|e| e.emotion() == emotion).count();
    count as f64 / entries.len() as f64
}

/// [`frequency_of`] scaled to 0-100.
pub fn percentage_of(entries: &[MoodEntry], emotion: Emotion) -> f64 {
    frequency_of(entries, emotion) * 100.0
}

/// Count and percentage for every label.
pub fn emotion_stats(entries: &[MoodEntry]) -> Vec<EmotionStat> {
    let counts = count_by_emotion(entries);
    let total = entries.len();

    Emotion::ALL
        .iter()
        .map(|&emotion| {
            let count = counts[emotion.index()];
            let percentage = if total == 0 {
                0.0
            } else {
                count as f64 / total as f64 * 100.0
            };
            EmotionStat {
                emotion,
                count,
                percentage,
            }
        })
        .collect()
}

/// Most frequent emotion in `subset`.
///
/// Ties go to the emotion that appeared first. An empty subset yields
/// [`Emotion::Neutral`].
pub fn dominant_emotion<'a, I>(subset: I) -> Emotion
where
    I: IntoIterator<Item = &'a MoodEntry>,
{
    let mut counts = [0usize; 5];
    let mut first_seen = [usize::MAX; 5];

    for (position, entry) in subset.into_iter().enumerate() {
        let idx = entry.emotion().index();
        counts[idx] += 1;
        if first_seen[idx] == usize::MAX {
            first_seen[idx] = position;
        }
    }

    Emotion::ALL
        .iter()
        .copied()
        .filter(|e| counts[e.index()] > 0)
        .max_by(|a, b| {
            counts[a.index()]
                .cmp(&counts[b.index()])
                .then(first_seen[b.index()].cmp(&first_seen[a.index()]))
        })
        .unwrap_or_default()
}

/// Most frequent emotion, or `None` when there are no entries.
pub fn most_common(entries: &[MoodEntry]) -> Option<Emotion> {
    if entries.is_empty() {
        None
    } else {
        Some(dominant_emotion(entries))
    }
}

/// Part of the day an entry falls into, using `tz` for the hour.
///
/// Timestamps outside chrono's range are treated as midnight.
pub fn hour_bucket<Tz: TimeZone>(entry: &MoodEntry, tz: &Tz) -> HourBucket {
    HourBucket::from_hour(entry.hour_in(tz).unwrap_or(0))
}

/// Mean confidence; 0 for an empty history.
pub fn average_confidence(entries: &[MoodEntry]) -> f64 {
    if entries.is_empty() {
        return 0.0;
    }
    let values: Vec<f64> = entries.iter().map(|e| e.confidence()).collect();
    values.iter().mean()
}

/// Sample standard deviation of confidence; 0 with fewer than two entries.
pub fn confidence_std_dev(entries: &[MoodEntry]) -> f64 {
    if entries.len() < 2 {
        return 0.0;
    }
    let values: Vec<f64> = entries.iter().map(|e| e.confidence()).collect();
    values.iter().std_dev()
}

/// Trailing moving average of confidence.
///
/// Element `i` is the mean over the last `window` entries ending at `i`
/// (fewer at the start). A window of 0 is treated as 1.
pub fn rolling_confidence(entries: &[MoodEntry], window: usize) -> Vec<f64> {
    let window = window.max(1);
    let mut averages = Vec::with_capacity(entries.len());
    let mut sum = 0.0;

    for (i, entry) in entries.iter().enumerate() {
        sum += entry.confidence();
        if i >= window {
            sum -= entries[i - window].confidence();
        }
        let n = (i + 1).min(window);
        averages.push(sum / n as f64);
    }

    averages
}

/// Entries that fall into `bucket`, in input order.
pub fn entries_in_bucket<'a, Tz: TimeZone>(
    entries: &'a [MoodEntry],
    tz: &Tz,
    bucket: HourBucket,
) -> Vec<&'a MoodEntry> {
    entries
        .iter()
        .filter(|e| hour_bucket(e, tz) == bucket)
        .collect()
}

/// Per-bucket count and dominant emotion.
pub fn bucket_summaries<Tz: TimeZone>(entries: &[MoodEntry], tz: &Tz) -> Vec<BucketSummary> {
    HourBucket::ALL
        .iter()
        .map(|&bucket| {
            let subset = entries_in_bucket(entries, tz, bucket);
            BucketSummary {
                bucket,
                count: subset.len(),
                dominant: dominant_emotion(subset),
            }
        })
        .collect()
}

/// Per-hour emotion counts for hours that have entries.
pub fn hourly_timeline<Tz: TimeZone>(entries: &[MoodEntry], tz: &Tz) -> Vec<HourlyCounts> {
    let mut hours: BTreeMap<u32, BTreeMap<Emotion, usize>> = BTreeMap::new();

    for entry in entries {
        let hour = entry.hour_in(tz).unwrap_or(0);
        let counts = hours
            .entry(hour)
            .or_insert_with(|| Emotion::ALL.iter().map(|e| (*e, 0)).collect());
        *counts.entry(entry.emotion()).or_insert(0) += 1;
    }

    hours
        .into_iter()
        .map(|(hour, counts)| HourlyCounts { hour, counts })
        .collect()
}

/// Aggregate a history using the local time zone.
pub fn aggregate(entries: &[MoodEntry]) -> AnalyticsResult {
    aggregate_in(entries, &Local)
}

/// Aggregate a history using `tz` for hour-of-day extraction.
pub fn aggregate_in<Tz: TimeZone>(entries: &[MoodEntry], tz: &Tz) -> AnalyticsResult {
    AnalyticsResult {
        total_entries: entries.len(),
        stats: emotion_stats(entries),
        most_common: most_common(entries),
        average_confidence: average_confidence(entries),
        confidence_std_dev: confidence_std_dev(entries),
        buckets: bucket_summaries(entries, tz),
        timeline: hourly_timeline(entries, tz),
    }
}
