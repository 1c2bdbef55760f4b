//! Transparency module for the mood tracker.
//!
//! Keeps running counts of what the tracker produced so users can audit a
//! run. Detections themselves never pass through here.

pub mod log;

pub use log::{TrackingEvent, TransparencyLog, TransparencyStats};
