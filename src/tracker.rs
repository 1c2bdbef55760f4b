//! Periodic emotion tracking.
//!
//! A [`TrackingHandle`] owns one background timer that asks an
//! [`EmotionDetector`] for a detection every interval and hands it to a
//! caller-supplied callback. Stopping is immediate: once [`TrackingHandle::stop`]
//! returns, the callback is never invoked again.
//!
//! [`EmotionTracker`] wraps a handle with the "running or not" state so a
//! second `start` without a `stop` is rejected instead of spawning a second
//! timer.

use crate::detector::{
    CaptureError, Detection, EmotionDetector, FeedStatus, MockDetector, VideoFeed,
    DEFAULT_CONFIDENCE_FLOOR,
};
use crossbeam_channel::{bounded, select, tick, Sender};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;

/// Default emission period.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(3000);

/// Shortest period the timer accepts.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

type SharedDetector = Arc<Mutex<Box<dyn EmotionDetector>>>;

/// Tracker configuration.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Time between emissions
    pub interval: Duration,
    /// Lower bound for mock confidence values
    pub confidence_floor: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            confidence_floor: DEFAULT_CONFIDENCE_FLOOR,
        }
    }
}

/// Errors that can occur when starting a tracker.
#[derive(Debug)]
pub enum TrackerError {
    AlreadyRunning,
    SpawnFailed(String),
}

impl std::fmt::Display for TrackerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackerError::AlreadyRunning => write!(f, "Tracker is already running"),
            TrackerError::SpawnFailed(e) => write!(f, "Failed to spawn tracking thread: {e}"),
        }
    }
}

impl std::error::Error for TrackerError {}

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// An owned, explicitly stopped emission timer.
pub struct TrackingHandle {
    active: Arc<AtomicBool>,
    // Held by the worker for the whole detect + callback step.
    detector: SharedDetector,
    emitted: Arc<AtomicU64>,
    stop_tx: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
    worker_id: ThreadId,
    feed: Option<Box<dyn VideoFeed>>,
    feed_status: FeedStatus,
}

impl TrackingHandle {
    /// Spawn a timer that emits one detection per `interval`.
    ///
    /// The first emission happens one full interval after this call.
    pub fn spawn<F>(
        detector: Box<dyn EmotionDetector>,
        interval: Duration,
        on_emotion: F,
    ) -> Result<Self, TrackerError>
    where
        F: FnMut(Detection) + Send + 'static,
    {
        Self::spawn_shared(Arc::new(Mutex::new(detector)), interval, on_emotion)
    }

    fn spawn_shared<F>(
        detector: SharedDetector,
        interval: Duration,
        mut on_emotion: F,
    ) -> Result<Self, TrackerError>
    where
        F: FnMut(Detection) + Send + 'static,
    {
        let interval = interval.max(MIN_INTERVAL);
        let active = Arc::new(AtomicBool::new(true));
        let emitted = Arc::new(AtomicU64::new(0));
        let (stop_tx, stop_rx) = bounded::<()>(1);

        let worker_active = Arc::clone(&active);
        let worker_detector = Arc::clone(&detector);
        let worker_emitted = Arc::clone(&emitted);

        let worker = thread::Builder::new()
            .name("mood-tracker".into())
            .spawn(move || {
                let ticker = tick(interval);
                loop {
                    select! {
                        recv(stop_rx) -> _ => break,
                        recv(ticker) -> _ => {
                            let mut detector = lock(&worker_detector);
                            if !worker_active.load(Ordering::SeqCst) {
                                break;
                            }
                            let detection = detector.detect();
                            tracing::debug!(
                                detector = detector.name(),
                                emotion = %detection.emotion,
                                confidence = detection.confidence,
                                "Emotion detected"
                            );
                            worker_emitted.fetch_add(1, Ordering::Relaxed);
                            on_emotion(detection);
                        }
                    }
                }
                tracing::debug!("Tracking timer exited");
            })
            .map_err(|e| TrackerError::SpawnFailed(e.to_string()))?;

        let worker_id = worker.thread().id();

        Ok(Self {
            active,
            detector,
            emitted,
            stop_tx: Some(stop_tx),
            worker: Some(worker),
            worker_id,
            feed: None,
            feed_status: FeedStatus::DisplayLess,
        })
    }

    fn attach_feed(&mut self, feed: Option<Box<dyn VideoFeed>>) {
        self.feed_status = match &feed {
            Some(f) => FeedStatus::Live(f.describe()),
            None => FeedStatus::DisplayLess,
        };
        self.feed = feed;
    }

    /// Stop emitting. Safe to call repeatedly, including from the callback.
    pub fn stop(&mut self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }

        let on_worker = thread::current().id() == self.worker_id;
        if !on_worker {
            // Wait out an emission that is already in flight.
            drop(lock(&self.detector));
        }

        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.try_send(());
        }

        if let Some(worker) = self.worker.take() {
            if !on_worker && worker.join().is_err() {
                tracing::error!("Tracking thread panicked");
            }
        }

        if let Some(mut feed) = self.feed.take() {
            feed.release();
        }

        tracing::info!(
            emitted = self.emitted.load(Ordering::Relaxed),
            "Tracking stopped"
        );
    }

    /// Check whether the timer may still emit.
    pub fn is_running(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Number of detections delivered so far.
    pub fn emitted(&self) -> u64 {
        self.emitted.load(Ordering::Relaxed)
    }

    pub fn feed_status(&self) -> &FeedStatus {
        &self.feed_status
    }
}

impl Drop for TrackingHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Start/stop wrapper holding at most one running timer.
pub struct EmotionTracker {
    config: TrackerConfig,
    detector: SharedDetector,
    handle: Option<TrackingHandle>,
}

impl EmotionTracker {
    /// Create a tracker backed by the random [`MockDetector`].
    pub fn new(config: TrackerConfig) -> Self {
        let detector = MockDetector::new().with_confidence_floor(config.confidence_floor);
        Self::with_detector(config, detector)
    }

    /// Create a tracker backed by any detector.
    pub fn with_detector<D: EmotionDetector + 'static>(config: TrackerConfig, detector: D) -> Self {
        Self {
            config,
            detector: Arc::new(Mutex::new(Box::new(detector))),
            handle: None,
        }
    }

    /// Begin emitting detections to `on_emotion`.
    ///
    /// Returns [`TrackerError::AlreadyRunning`] if a timer is live.
    pub fn start<F>(&mut self, on_emotion: F) -> Result<(), TrackerError>
    where
        F: FnMut(Detection) + Send + 'static,
    {
        self.start_inner(None, on_emotion)
    }

    /// Begin emitting, holding a capture feed for display.
    ///
    /// A failed acquisition is logged and tracking continues without video.
    pub fn start_with_capture<F>(
        &mut self,
        capture: Result<Box<dyn VideoFeed>, CaptureError>,
        on_emotion: F,
    ) -> Result<FeedStatus, TrackerError>
    where
        F: FnMut(Detection) + Send + 'static,
    {
        if self.is_running() {
            return Err(TrackerError::AlreadyRunning);
        }

        let feed = match capture {
            Ok(feed) => Some(feed),
            Err(e) => {
                tracing::warn!("Camera unavailable, tracking without video: {}", e);
                None
            }
        };

        self.start_inner(feed, on_emotion)?;
        Ok(self
            .handle
            .as_ref()
            .map(|h| h.feed_status().clone())
            .unwrap_or(FeedStatus::DisplayLess))
    }

    fn start_inner<F>(
        &mut self,
        feed: Option<Box<dyn VideoFeed>>,
        on_emotion: F,
    ) -> Result<(), TrackerError>
    where
        F: FnMut(Detection) + Send + 'static,
    {
        if self.is_running() {
            return Err(TrackerError::AlreadyRunning);
        }
        // A handle stopped from inside its own callback is still parked here.
        self.handle = None;

        let mut handle =
            TrackingHandle::spawn_shared(Arc::clone(&self.detector), self.config.interval, on_emotion)?;
        handle.attach_feed(feed);

        tracing::info!(
            interval_ms = self.config.interval.as_millis() as u64,
            feed = ?handle.feed_status(),
            "Tracking started"
        );
        self.handle = Some(handle);
        Ok(())
    }

    /// Stop the running timer. A no-op when nothing is running.
    pub fn stop(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.stop();
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| h.is_running())
    }

    /// Detections delivered by the current (or last) timer.
    pub fn emitted(&self) -> u64 {
        self.handle.as_ref().map_or(0, |h| h.emitted())
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn fast_config(ms: u64) -> TrackerConfig {
        TrackerConfig {
            interval: Duration::from_millis(ms),
            ..TrackerConfig::default()
        }
    }

    fn counting_callback() -> (Arc<AtomicUsize>, impl FnMut(Detection) + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        (count, move |_d: Detection| {
            c.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_immediate_stop_emits_nothing() {
        let mut tracker = EmotionTracker::with_detector(fast_config(200), MockDetector::seeded(1));
        let (count, callback) = counting_callback();

        tracker.start(callback).unwrap();
        tracker.stop();

        thread::sleep(Duration::from_millis(300));
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(!tracker.is_running());
    }

    #[test]
    fn test_emits_until_stopped() {
        let mut tracker = EmotionTracker::with_detector(fast_config(10), MockDetector::seeded(2));
        let (count, callback) = counting_callback();

        tracker.start(callback).unwrap();
        thread::sleep(Duration::from_millis(150));
        tracker.stop();

        let after_stop = count.load(Ordering::SeqCst);
        assert!(after_stop >= 2, "expected several emissions, got {after_stop}");

        thread::sleep(Duration::from_millis(100));
        assert_eq!(count.load(Ordering::SeqCst), after_stop);
    }

    #[test]
    fn test_second_start_is_rejected() {
        let mut tracker = EmotionTracker::with_detector(fast_config(20), MockDetector::seeded(3));
        let (count, first) = counting_callback();
        let (second_count, second) = counting_callback();

        tracker.start(first).unwrap();
        let result = tracker.start(second);
        assert!(matches!(result, Err(TrackerError::AlreadyRunning)));

        thread::sleep(Duration::from_millis(100));
        tracker.stop();

        assert_eq!(second_count.load(Ordering::SeqCst), 0);
        assert!(count.load(Ordering::SeqCst) > 0);
    }

    #[test]
    fn test_restart_after_stop() {
        let mut tracker = EmotionTracker::with_detector(fast_config(10), MockDetector::seeded(4));
        let (_, first) = counting_callback();
        tracker.start(first).unwrap();
        tracker.stop();

        let (count, second) = counting_callback();
        tracker.start(second).unwrap();
        thread::sleep(Duration::from_millis(80));
        tracker.stop();
        assert!(count.load(Ordering::SeqCst) > 0);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mut tracker = EmotionTracker::new(TrackerConfig::default());
        tracker.stop();
        tracker.stop();
        assert!(!tracker.is_running());
        assert_eq!(tracker.emitted(), 0);
    }

    #[test]
    fn test_stop_from_callback() {
        let slot: Arc<Mutex<Option<TrackingHandle>>> = Arc::new(Mutex::new(None));
        let count = Arc::new(AtomicUsize::new(0));

        let cb_slot = Arc::clone(&slot);
        let cb_count = Arc::clone(&count);
        let handle = TrackingHandle::spawn(
            Box::new(MockDetector::seeded(5)),
            Duration::from_millis(10),
            move |_d| {
                cb_count.fetch_add(1, Ordering::SeqCst);
                if let Some(mut h) = lock(&cb_slot).take() {
                    h.stop();
                }
            },
        )
        .unwrap();
        *lock(&slot) = Some(handle);

        thread::sleep(Duration::from_millis(150));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_emissions_respect_confidence_range() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut tracker = EmotionTracker::with_detector(fast_config(5), MockDetector::seeded(6));

        tracker
            .start(move |d| lock(&sink).push(d.confidence))
            .unwrap();
        thread::sleep(Duration::from_millis(80));
        tracker.stop();

        let seen = lock(&seen);
        assert!(!seen.is_empty());
        assert!(seen.iter().all(|c| (0.75..1.0).contains(c)));
    }

    struct FakeFeed {
        released: Arc<AtomicBool>,
    }

    impl VideoFeed for FakeFeed {
        fn describe(&self) -> String {
            "fake camera 640x480".to_string()
        }

        fn release(&mut self) {
            self.released.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_capture_failure_degrades_to_display_less() {
        let mut tracker = EmotionTracker::with_detector(fast_config(50), MockDetector::seeded(7));
        let (_, callback) = counting_callback();

        let status = tracker
            .start_with_capture(Err(CaptureError::PermissionDenied), callback)
            .unwrap();
        assert_eq!(status, FeedStatus::DisplayLess);
        assert!(tracker.is_running());
        tracker.stop();
    }

    #[test]
    fn test_live_feed_released_on_stop() {
        let released = Arc::new(AtomicBool::new(false));
        let feed = FakeFeed {
            released: Arc::clone(&released),
        };
        let mut tracker = EmotionTracker::with_detector(fast_config(50), MockDetector::seeded(8));
        let (_, callback) = counting_callback();

        let status = tracker.start_with_capture(Ok(Box::new(feed)), callback).unwrap();
        assert!(status.is_live());
        assert!(!released.load(Ordering::SeqCst));

        tracker.stop();
        assert!(released.load(Ordering::SeqCst));
    }
}
