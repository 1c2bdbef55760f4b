//! Emotion detection for the mood tracker.
//!
//! Detection sits behind the [`EmotionDetector`] trait so the pseudo-random
//! [`MockDetector`] can be replaced by a real classifier without touching the
//! tracker or any consumer of its `(emotion, confidence)` events.

pub mod capture;
pub mod mock;
pub mod types;

// Re-export commonly used types
pub use capture::{open_default_feed, CaptureError, FeedStatus, VideoFeed};
pub use mock::{MockDetector, DEFAULT_CONFIDENCE_FLOOR};
pub use types::{Detection, Emotion, UnknownEmotion};

/// A source of emotion detections.
pub trait EmotionDetector: Send {
    /// Produce the next detection.
    fn detect(&mut self) -> Detection;

    /// Short identifier used in logs.
    fn name(&self) -> &str;
}

impl<D: EmotionDetector + ?Sized> EmotionDetector for Box<D> {
    fn detect(&mut self) -> Detection {
        (**self).detect()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
