//! Emotion labels and detection events.
//!
//! A detection carries only a label and a self-reported confidence. No frame
//! data, landmarks or images ever travel through these types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of detectable emotions.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Focused,
    Happy,
    Tired,
    Stressed,
    /// Fallback label for empty inputs
    #[default]
    Neutral,
}

impl Emotion {
    /// All labels in canonical order.
    ///
    /// This order is used wherever a deterministic iteration or tie-break is
    /// needed.
    pub const ALL: [Emotion; 5] = [
        Emotion::Focused,
        Emotion::Happy,
        Emotion::Tired,
        Emotion::Stressed,
        Emotion::Neutral,
    ];

    /// Lowercase label as used on the wire and in files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Focused => "focused",
            Emotion::Happy => "happy",
            Emotion::Tired => "tired",
            Emotion::Stressed => "stressed",
            Emotion::Neutral => "neutral",
        }
    }

    /// Position of this label in [`Emotion::ALL`].
    pub fn index(&self) -> usize {
        match self {
            Emotion::Focused => 0,
            Emotion::Happy => 1,
            Emotion::Tired => 2,
            Emotion::Stressed => 3,
            Emotion::Neutral => 4,
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Error returned when parsing an unknown emotion label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEmotion(pub String);

impl fmt::Display for UnknownEmotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown emotion label: {}", self.0)
    }
}

impl std::error::Error for UnknownEmotion {}

impl FromStr for Emotion {
    type Err = UnknownEmotion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "focused" => Ok(Emotion::Focused),
            "happy" => Ok(Emotion::Happy),
            "tired" => Ok(Emotion::Tired),
            "stressed" => Ok(Emotion::Stressed),
            "neutral" => Ok(Emotion::Neutral),
            other => Err(UnknownEmotion(other.to_string())),
        }
    }
}

/// A single detector output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    /// Detected label
    pub emotion: Emotion,
    /// Self-reported certainty in [0, 1]
    pub confidence: f64,
    /// When the detection was produced
    pub detected_at: DateTime<Utc>,
}

impl Detection {
    pub fn new(emotion: Emotion, confidence: f64) -> Self {
        Self {
            emotion,
            confidence,
            detected_at: Utc::now(),
        }
    }
}
