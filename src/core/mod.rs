//! Core functionality for the mood tracker.
//!
//! This module contains:
//! - The append-only mood history
//! - Analytics computed from a history (frequencies, buckets, confidence)
//! - Headline insights and end-of-session summaries
//! - Mock seed data

pub mod analytics;
pub mod history;
pub mod insights;
pub mod seed;
pub mod summary;

// Re-export commonly used types
pub use analytics::{
    aggregate, aggregate_in, average_confidence, dominant_emotion, frequency_of, hour_bucket,
    percentage_of, rolling_confidence, AnalyticsResult, BucketSummary, EmotionStat, HourBucket,
    HourlyCounts,
};
pub use history::{MoodEntry, MoodHistory};
pub use insights::Insights;
pub use seed::{generate_history, SEED_HOURS};
pub use summary::{ProductivityState, SessionSummary, DEFAULT_OVERRIDE_THRESHOLD};
