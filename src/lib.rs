//! Mood Tracker Agent - periodic emotion tracking with local mood analytics.
//!
//! This library emits `(emotion, confidence)` detections on a fixed timer and
//! turns the resulting history into frequencies, time-of-day patterns and
//! confidence trends.
//!
//! # Detection Disclaimer
//!
//! - **Mock detection**: emotions are drawn at random, not inferred from video
//! - **No frame inspection**: a camera feed, when available, is only held for display
//! - **Local only**: histories, sessions and statistics stay on this machine
//! - **Transparency**: every run's output is counted and auditable
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Mood Tracker Agent                      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐        │
//! │  │  Detector   │──▶│   Tracker   │──▶│   History   │        │
//! │  │   (mock)    │   │  (3s timer) │   │ (append)    │        │
//! │  └─────────────┘   └─────────────┘   └─────────────┘        │
//! │                           │                 │               │
//! │                           ▼                 ▼               │
//! │                    ┌─────────────┐   ┌─────────────┐        │
//! │                    │   Session   │   │  Analytics  │        │
//! │                    │  Recorder   │   │  Insights   │        │
//! │                    └─────────────┘   └─────────────┘        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use mood_tracker_agent::{core, tracker};
//! use std::sync::{Arc, Mutex};
//!
//! let history = Arc::new(Mutex::new(core::MoodHistory::new()));
//! let sink = Arc::clone(&history);
//!
//! let mut tracker = tracker::EmotionTracker::new(tracker::TrackerConfig::default());
//! tracker
//!     .start(move |detection| {
//!         if let Ok(mut h) = sink.lock() {
//!             h.record(&detection);
//!         }
//!     })
//!     .expect("tracker already running");
//!
//! std::thread::sleep(std::time::Duration::from_secs(10));
//! tracker.stop();
//!
//! let history = history.lock().unwrap();
//! let result = core::aggregate(history.entries());
//! println!("Most common: {:?}", result.most_common);
//! ```

pub mod config;
pub mod core;
pub mod detector;
pub mod session;
pub mod store;
pub mod tracker;
pub mod transparency;

#[cfg(feature = "server")]
pub mod server;

// Re-export key types at crate root for convenience
pub use config::{Config, ConfigError};
pub use core::{aggregate, AnalyticsResult, HourBucket, Insights, MoodEntry, MoodHistory, SessionSummary};
pub use detector::{Detection, Emotion, EmotionDetector, MockDetector};
pub use session::{SessionError, SessionRecorder};
pub use store::{MoodStore, StoreError};
pub use tracker::{EmotionTracker, TrackerConfig, TrackerError, TrackingHandle};
pub use transparency::{TrackingEvent, TransparencyLog, TransparencyStats};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Disclaimer that can be displayed to users.
pub const DETECTION_DISCLAIMER: &str = r#"
╔══════════════════════════════════════════════════════════════════╗
║             MOOD TRACKER AGENT - DETECTION DISCLAIMER            ║
╠══════════════════════════════════════════════════════════════════╣
║                                                                  ║
║  Emotions shown by this agent are SIMULATED.                     ║
║                                                                  ║
║  ✓ WHAT IT DOES:                                                 ║
║    • Emits one random emotion every few seconds                  ║
║    • Stores emotion labels with a confidence and timestamp       ║
║    • Summarizes your history by frequency and time of day        ║
║                                                                  ║
║  ✗ WHAT IT NEVER DOES:                                           ║
║    • Inspect or analyze camera frames                            ║
║    • Record or store any video                                   ║
║    • Send data off this machine                                  ║
║                                                                  ║
║  Results are for demonstration only and say nothing about        ║
║  how you actually feel.                                          ║
║                                                                  ║
║  You can view tracking statistics anytime with:                  ║
║    mood-tracker status                                           ║
║                                                                  ║
╚══════════════════════════════════════════════════════════════════╝
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disclaimer_contents() {
        assert!(DETECTION_DISCLAIMER.contains("DISCLAIMER"));
        assert!(DETECTION_DISCLAIMER.contains("SIMULATED"));
        assert!(DETECTION_DISCLAIMER.contains("camera frames"));
    }
}
