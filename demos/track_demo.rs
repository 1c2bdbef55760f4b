//! Demonstration of the Mood Tracker Agent tracking loop.
//!
//! This example shows how to:
//! 1. Start a tracker with a short emission interval
//! 2. Collect detections into a mood history
//! 3. Stop the tracker and aggregate the history
//! 4. Print insights for the run
//!
//! Run with: cargo run --example track_demo

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Local;
use mood_tracker_agent::{
    core::{aggregate, Insights, MoodHistory},
    detector::open_default_feed,
    tracker::{EmotionTracker, TrackerConfig},
    transparency::{TrackingEvent, TransparencyLog},
    DETECTION_DISCLAIMER,
};

fn main() {
    println!("Mood Tracker Agent - Tracking Demo");
    println!("==================================");
    println!();

    println!("{DETECTION_DISCLAIMER}");
    println!();

    let config = TrackerConfig {
        interval: Duration::from_millis(500),
        ..TrackerConfig::default()
    };

    let history = Arc::new(Mutex::new(MoodHistory::new()));
    let transparency_log = Arc::new(TransparencyLog::new());

    let sink = Arc::clone(&history);
    let log = Arc::clone(&transparency_log);
    let mut tracker = EmotionTracker::new(config);

    println!("Tracking for 10 seconds (one detection every 500ms)...");
    println!();

    let status = tracker.start_with_capture(open_default_feed(), move |detection| {
        log.record(TrackingEvent::DetectionEmitted);
        println!(
            "  {} {:<9} {:.0}%",
            detection.detected_at.with_timezone(&Local).format("%H:%M:%S%.3f"),
            detection.emotion,
            detection.confidence * 100.0
        );
        if let Ok(mut h) = sink.lock() {
            h.record(&detection);
            log.record(TrackingEvent::EntryRecorded);
        }
    });

    match status {
        Ok(status) if status.is_live() => println!("  Camera attached"),
        Ok(_) => println!("  No camera, running display-less"),
        Err(e) => {
            eprintln!("Error starting tracker: {e}");
            return;
        }
    }

    // Set up stop flag
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    // Set up Ctrl+C handler
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .expect("Error setting Ctrl+C handler");

    let start = std::time::Instant::now();
    while running.load(Ordering::SeqCst) && start.elapsed() < Duration::from_secs(10) {
        std::thread::sleep(Duration::from_millis(100));
    }

    println!();
    println!("Stopping tracker...");
    tracker.stop();
    println!("  Emitted {} detections", tracker.emitted());

    let history = history.lock().expect("history lock poisoned");
    let result = aggregate(history.entries());

    println!();
    println!("=== Mood Analytics ===");
    println!("  Entries: {}", result.total_entries);
    if let Some(emotion) = result.most_common {
        println!("  Most common: {emotion}");
    }
    println!(
        "  Average confidence: {:.1}%",
        result.average_confidence * 100.0
    );
    for stat in &result.stats {
        println!("    {:<9} {:>3} ({:.1}%)", stat.emotion, stat.count, stat.percentage);
    }

    println!();
    println!("=== Insights ===");
    let insights = Insights::from_entries(history.entries(), &Local);
    for line in insights.report().lines() {
        println!("  {line}");
    }

    println!();
    println!("{}", transparency_log.summary());
}
