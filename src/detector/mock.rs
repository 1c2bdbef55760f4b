//! Pseudo-random emotion detector.
//!
//! Stands in for a real facial-expression classifier. Frames are never
//! looked at: each call draws a label uniformly from [`Emotion::ALL`] and a
//! confidence uniformly from `[confidence_floor, 1.0)`.

use crate::detector::types::{Detection, Emotion};
use crate::detector::EmotionDetector;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Default lower bound for mock confidence values.
pub const DEFAULT_CONFIDENCE_FLOOR: f64 = 0.75;

/// A detector that draws detections from a random number generator.
pub struct MockDetector<R: Rng = StdRng> {
    rng: R,
    confidence_floor: f64,
}

impl MockDetector<StdRng> {
    /// Create a detector seeded from system entropy.
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Create a deterministic detector from a seed.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }
}

impl Default for MockDetector<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> MockDetector<R> {
    /// Create a detector backed by the given generator.
    pub fn with_rng(rng: R) -> Self {
        Self {
            rng,
            confidence_floor: DEFAULT_CONFIDENCE_FLOOR,
        }
    }

    /// Set the lower bound of the confidence range (clamped to [0, 1]).
    pub fn with_confidence_floor(mut self, floor: f64) -> Self {
        self.confidence_floor = if floor.is_nan() {
            DEFAULT_CONFIDENCE_FLOOR
        } else {
            floor.clamp(0.0, 1.0)
        };
        self
    }

    pub fn confidence_floor(&self) -> f64 {
        self.confidence_floor
    }

    fn draw_confidence(&mut self) -> f64 {
        if self.confidence_floor >= 1.0 {
            return 1.0;
        }
        self.rng.gen_range(self.confidence_floor..1.0)
    }
}

impl<R: Rng + Send> EmotionDetector for MockDetector<R> {
    fn detect(&mut self) -> Detection {
        let emotion = Emotion::ALL[self.rng.gen_range(0..Emotion::ALL.len())];
        let confidence = self.draw_confidence();
        Detection::new(emotion, confidence)
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_within_default_range() {
        let mut detector = MockDetector::seeded(7);
        for _ in 0..500 {
            let detection = detector.detect();
            assert!(detection.confidence >= 0.75);
            assert!(detection.confidence < 1.0);
        }
    }

    #[test]
    fn test_every_label_is_drawn() {
        let mut detector = MockDetector::seeded(42);
        let mut seen = [false; 5];
        for _ in 0..500 {
            seen[detector.detect().emotion.index()] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn test_seeded_detectors_agree() {
        let mut a = MockDetector::seeded(99);
        let mut b = MockDetector::seeded(99);
        for _ in 0..20 {
            let (x, y) = (a.detect(), b.detect());
            assert_eq!(x.emotion, y.emotion);
            assert_eq!(x.confidence, y.confidence);
        }
    }

    #[test]
    fn test_confidence_floor_is_clamped() {
        let mut detector = MockDetector::seeded(1).with_confidence_floor(3.0);
        assert_eq!(detector.confidence_floor(), 1.0);
        assert_eq!(detector.detect().confidence, 1.0);

        let detector = MockDetector::seeded(1).with_confidence_floor(f64::NAN);
        assert_eq!(detector.confidence_floor(), DEFAULT_CONFIDENCE_FLOOR);
    }
}
