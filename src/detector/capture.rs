//! Opaque video capture handles.
//!
//! A capture feed is only held for display pass-through while tracking runs.
//! Detectors never read frames from it.

/// A live video source owned by a tracking session.
pub trait VideoFeed: Send {
    /// Human readable description (device name, resolution).
    fn describe(&self) -> String;

    /// Release the underlying device. Called once when tracking stops.
    fn release(&mut self) {}
}

/// Whether a tracking session is showing a live feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedStatus {
    /// A feed was acquired
    Live(String),
    /// Acquisition failed; tracking continues without video
    DisplayLess,
}

impl FeedStatus {
    pub fn is_live(&self) -> bool {
        matches!(self, FeedStatus::Live(_))
    }
}

/// Errors from acquiring a capture device.
#[derive(Debug)]
pub enum CaptureError {
    /// No capture backend exists in this build
    NoBackend,
    /// The user or OS refused camera access
    PermissionDenied,
    /// The device exists but could not be opened
    Unavailable(String),
}

impl std::fmt::Display for CaptureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureError::NoBackend => write!(f, "No capture backend available"),
            CaptureError::PermissionDenied => write!(f, "Camera permission denied"),
            CaptureError::Unavailable(e) => write!(f, "Camera unavailable: {e}"),
        }
    }
}

impl std::error::Error for CaptureError {}

/// Try to open the default camera.
///
/// This build ships without a camera backend, so callers always end up in
/// display-less mode.
pub fn open_default_feed() -> Result<Box<dyn VideoFeed>, CaptureError> {
    Err(CaptureError::NoBackend)
}
