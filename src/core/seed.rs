//! Mock historical data for demos and first runs.

use crate::core::history::{MoodEntry, MoodHistory};
use crate::detector::types::Emotion;
use rand::Rng;

/// Default number of hours of seed history.
pub const SEED_HOURS: usize = 48;

/// Lower bound of seeded confidence values.
pub const SEED_CONFIDENCE_FLOOR: f64 = 0.7;

const HOUR_MS: i64 = 3_600_000;

/// Generate one random entry per hour for the `hours` hours before `now_ms`.
///
/// The oldest entry is `hours` hours before `now_ms`, the newest one hour
/// before it.
pub fn generate_history<R: Rng>(rng: &mut R, now_ms: i64, hours: usize) -> MoodHistory {
    (0..hours)
        .map(|i| {
            let timestamp = now_ms - (hours - i) as i64 * HOUR_MS;
            let emotion = Emotion::ALL[rng.gen_range(0..Emotion::ALL.len())];
            let confidence = rng.gen_range(SEED_CONFIDENCE_FLOOR..1.0);
            MoodEntry::new(timestamp, emotion, confidence)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_seed_shape() {
        let now = 1_705_908_600_000;
        let history = generate_history(&mut StdRng::seed_from_u64(11), now, SEED_HOURS);

        assert_eq!(history.len(), SEED_HOURS);
        assert_eq!(history.out_of_order_count(), 0);
        assert_eq!(history.entries()[0].timestamp(), now - 48 * HOUR_MS);
        assert_eq!(history.latest().unwrap().timestamp(), now - HOUR_MS);
        assert!(history
            .iter()
            .all(|e| e.confidence() >= 0.7 && e.confidence() < 1.0));
    }

    #[test]
    fn test_zero_hours_is_empty() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(generate_history(&mut rng, 0, 0).is_empty());
    }
}
