//! Mood Tracker Agent CLI
//!
//! Periodic emotion tracking with local mood analytics.

use chrono::{Local, Utc};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use mood_tracker_agent::{
    config::Config,
    core::{
        aggregate_in, rolling_confidence, seed as seed_data, AnalyticsResult, Insights, MoodEntry,
    },
    detector::{open_default_feed, Detection, FeedStatus},
    session::{list_sessions, load_history_file, load_summary, SessionRecorder},
    tracker::EmotionTracker,
    transparency::{TrackingEvent, TransparencyLog},
    DETECTION_DISCLAIMER, VERSION,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mood-tracker")]
#[command(version = VERSION)]
#[command(about = "Periodic emotion tracking with local mood analytics", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a tracking session
    Track {
        /// Milliseconds between detections (overrides config)
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Stop automatically after this many seconds
        #[arg(long)]
        duration: Option<u64>,

        /// Do not try to open the camera
        #[arg(long)]
        no_camera: bool,
    },

    /// Show analytics for a session log or seed file
    Analyze {
        /// Path to a session_emotions.jsonl or JSON array file
        file: PathBuf,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show productivity, wellbeing and stress insights
    Insights {
        /// Path to a session_emotions.jsonl or JSON array file
        file: PathBuf,
    },

    /// Generate a mock history for demos
    Seed {
        /// Output file (defaults to the data directory)
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// RNG seed for a reproducible history
        #[arg(long)]
        seed: Option<u64>,

        /// Hours of history, one entry per hour
        #[arg(long, default_value_t = seed_data::SEED_HOURS)]
        hours: usize,
    },

    /// List recorded sessions
    Sessions,

    /// Show agent status and cumulative statistics
    Status,

    /// Show configuration
    Config,

    /// Display detection disclaimer
    Disclaimer,

    /// Run the JSON-RPC session server
    #[cfg(feature = "server")]
    Serve {
        /// Port to listen on
        #[arg(long, default_value_t = 8787)]
        port: u16,

        /// Keep the database in memory instead of the configured file
        #[arg(long)]
        in_memory: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Track {
            interval_ms,
            duration,
            no_camera,
        } => {
            cmd_track(interval_ms, duration, no_camera);
        }
        Commands::Analyze { file, json } => {
            cmd_analyze(&file, json);
        }
        Commands::Insights { file } => {
            cmd_insights(&file);
        }
        Commands::Seed {
            output,
            seed,
            hours,
        } => {
            cmd_seed(output, seed, hours);
        }
        Commands::Sessions => {
            cmd_sessions();
        }
        Commands::Status => {
            cmd_status();
        }
        Commands::Config => {
            cmd_config();
        }
        Commands::Disclaimer => {
            cmd_disclaimer();
        }
        #[cfg(feature = "server")]
        Commands::Serve { port, in_memory } => {
            if let Err(e) = cmd_serve(port, in_memory) {
                eprintln!("Error: {e:#}");
                std::process::exit(1);
            }
        }
    }
}

/// Load configuration, falling back to defaults with a warning.
fn load_config() -> Config {
    match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: Could not load config ({e}), using defaults");
            Config::default()
        }
    }
}

fn analyze(config: &Config, entries: &[MoodEntry]) -> AnalyticsResult {
    match config.timezone().ok().flatten() {
        Some(tz) => aggregate_in(entries, &tz),
        None => aggregate_in(entries, &Local),
    }
}

fn insights(config: &Config, entries: &[MoodEntry]) -> Insights {
    match config.timezone().ok().flatten() {
        Some(tz) => Insights::from_entries(entries, &tz),
        None => Insights::from_entries(entries, &Local),
    }
}

fn cmd_track(interval_ms: Option<u64>, duration: Option<u64>, no_camera: bool) {
    println!("Mood Tracker Agent v{VERSION}");
    println!();

    let config = load_config();
    if let Err(e) = config.ensure_directories() {
        eprintln!("Warning: Could not create directories: {e}");
    }

    let mut tracker_config = config.tracker_config();
    if let Some(ms) = interval_ms {
        if ms == 0 {
            eprintln!("Error: --interval-ms must be positive");
            std::process::exit(1);
        }
        tracker_config.interval = Duration::from_millis(ms);
    }

    let transparency_log = Arc::new(TransparencyLog::open(
        config.data_path.join("transparency.json"),
    ));

    let recorder = match SessionRecorder::start(
        &config.sessions_path,
        Utc::now(),
        config.override_threshold,
    ) {
        Ok(recorder) => recorder,
        Err(e) => {
            eprintln!("Error starting session: {e}");
            std::process::exit(1);
        }
    };

    println!("Starting session {}...", recorder.name());
    println!("  Interval: {}ms", tracker_config.interval.as_millis());
    println!("  Log: {:?}", recorder.emotions_path());

    let recorder = Arc::new(Mutex::new(Some(recorder)));
    let sink = Arc::clone(&recorder);
    let log = Arc::clone(&transparency_log);

    let on_emotion = move |detection: Detection| {
        log.record(TrackingEvent::DetectionEmitted);
        println!(
            "[{}] {:<9} {:>3.0}%",
            detection.detected_at.with_timezone(&Local).format("%H:%M:%S"),
            detection.emotion,
            detection.confidence * 100.0
        );
        if let Ok(mut guard) = sink.lock() {
            if let Some(recorder) = guard.as_mut() {
                match recorder.record(&detection) {
                    Ok(()) => log.record(TrackingEvent::EntryRecorded),
                    Err(e) => eprintln!("Warning: Could not log emotion: {e}"),
                }
            }
        }
    };

    let mut tracker = EmotionTracker::new(tracker_config);
    let capture = if no_camera {
        Err(mood_tracker_agent::detector::CaptureError::Unavailable(
            "disabled by --no-camera".to_string(),
        ))
    } else {
        open_default_feed()
    };

    match tracker.start_with_capture(capture, on_emotion) {
        Ok(FeedStatus::Live(name)) => println!("  Camera: {name}"),
        Ok(FeedStatus::DisplayLess) => println!("  Camera: unavailable (display-less mode)"),
        Err(e) => {
            eprintln!("Error starting tracker: {e}");
            std::process::exit(1);
        }
    }

    println!();
    match duration {
        Some(secs) => println!("Tracking for {secs}s, press Ctrl+C to stop early"),
        None => println!("Press Ctrl+C to stop"),
    }
    println!();

    let running = Arc::new(AtomicBool::new(true));
    ctrlc_handler(Arc::clone(&running));

    let started = Instant::now();
    let limit = duration.map(Duration::from_secs);
    while running.load(Ordering::SeqCst) {
        if limit.is_some_and(|limit| started.elapsed() >= limit) {
            break;
        }
        thread::sleep(Duration::from_millis(100));
    }

    println!();
    println!("Stopping tracking...");
    tracker.stop();

    let recorder = recorder.lock().ok().and_then(|mut guard| guard.take());
    if let Some(recorder) = recorder {
        let entries: Vec<MoodEntry> = recorder.history().entries().to_vec();
        match recorder.finish(Utc::now()) {
            Ok(Some(summary)) => {
                transparency_log.record(TrackingEvent::SessionCompleted);
                transparency_log.record(TrackingEvent::SummaryExported);
                println!();
                println!("Session Summary");
                println!("===============");
                println!("  Duration: {:.1} minutes", summary.duration_minutes);
                println!("  Entries: {}", summary.entry_count);
                println!("  Dominant emotion: {}", summary.dominant_emotion);
                println!(
                    "  Productivity state: {}",
                    summary.productivity_state.description()
                );
                println!("  Focus score: {:.0}%", summary.focus_score * 100.0);
                println!();
                print_analytics(&analyze(&config, &entries), &entries, config.rolling_window);
            }
            Ok(None) => {
                transparency_log.record(TrackingEvent::SessionCompleted);
                println!("No emotion data collected this session.");
            }
            Err(e) => eprintln!("Error writing session summary: {e}"),
        }
    }

    if let Err(e) = transparency_log.save() {
        eprintln!("Warning: Could not save transparency log: {e}");
    }

    println!();
    println!("{}", transparency_log.summary());
}

fn print_analytics(result: &AnalyticsResult, entries: &[MoodEntry], window: usize) {
    println!("Mood Analytics");
    println!("==============");
    println!("  Total entries: {}", result.total_entries);
    match result.most_common {
        Some(emotion) => println!("  Most common: {emotion}"),
        None => println!("  Most common: -"),
    }
    println!(
        "  Average confidence: {:.0}% (std dev {:.1}%)",
        result.average_confidence * 100.0,
        result.confidence_std_dev * 100.0
    );
    println!();

    println!("Emotion Frequency:");
    for stat in &result.stats {
        println!(
            "  {:<9} {:>4} ({:>5.1}%)",
            stat.emotion, stat.count, stat.percentage
        );
    }
    println!();

    println!("Time Patterns:");
    for bucket in &result.buckets {
        println!(
            "  {:<10} {:<9} ({} entries)",
            bucket.bucket, bucket.dominant, bucket.count
        );
    }

    let trend = rolling_confidence(entries, window);
    if let (Some(first), Some(last)) = (trend.first(), trend.last()) {
        println!();
        println!(
            "Confidence Trend ({window}-entry average): {:.0}% -> {:.0}%",
            first * 100.0,
            last * 100.0
        );
    }
}

fn cmd_analyze(file: &Path, json: bool) {
    let config = load_config();
    let history = match load_history_file(file) {
        Ok(history) => history,
        Err(e) => {
            eprintln!("Error reading {file:?}: {e}");
            std::process::exit(1);
        }
    };

    if history.out_of_order_count() > 0 {
        eprintln!(
            "Warning: {} entries are older than the entry before them",
            history.out_of_order_count()
        );
    }

    let result = analyze(&config, history.entries());
    if json {
        match serde_json::to_string_pretty(&result) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error serializing: {e}");
                std::process::exit(1);
            }
        }
    } else {
        print_analytics(&result, history.entries(), config.rolling_window);
    }
}

fn cmd_insights(file: &Path) {
    let config = load_config();
    let history = match load_history_file(file) {
        Ok(history) => history,
        Err(e) => {
            eprintln!("Error reading {file:?}: {e}");
            std::process::exit(1);
        }
    };

    println!("Mood Insights");
    println!("=============");
    println!();
    println!("{}", insights(&config, history.entries()).report());
}

fn cmd_seed(output: Option<PathBuf>, rng_seed: Option<u64>, hours: usize) {
    let config = load_config();
    let now_ms = Utc::now().timestamp_millis();

    let mut rng = match rng_seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };
    let history = seed_data::generate_history(&mut rng, now_ms, hours);

    let output_path = output.unwrap_or_else(|| config.data_path.join("seed_history.json"));
    if let Some(parent) = output_path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            eprintln!("Warning: Could not create {parent:?}: {e}");
        }
    }

    let json = match serde_json::to_string_pretty(history.entries()) {
        Ok(json) => json,
        Err(e) => {
            eprintln!("Error serializing: {e}");
            std::process::exit(1);
        }
    };

    match std::fs::write(&output_path, json) {
        Ok(()) => println!("Wrote {} entries to {output_path:?}", history.len()),
        Err(e) => {
            eprintln!("Error writing {output_path:?}: {e}");
            std::process::exit(1);
        }
    }
}

fn cmd_sessions() {
    let config = load_config();
    let sessions = match list_sessions(&config.sessions_path) {
        Ok(sessions) => sessions,
        Err(e) => {
            eprintln!("Error listing sessions: {e}");
            std::process::exit(1);
        }
    };

    if sessions.is_empty() {
        println!("No sessions found in {:?}", config.sessions_path);
        println!("Run 'mood-tracker track' to record one.");
        return;
    }

    println!("Found {} session(s):", sessions.len());
    for dir in &sessions {
        let name = dir
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        match load_summary(dir) {
            Ok(Some(summary)) => println!(
                "  {name}  {:>6.1} min  {:>4} entries  {:<9} {}",
                summary.duration_minutes,
                summary.entry_count,
                summary.dominant_emotion,
                summary.productivity_state.description()
            ),
            Ok(None) => println!("  {name}  (no summary)"),
            Err(e) => println!("  {name}  (unreadable summary: {e})"),
        }
    }
}

fn cmd_status() {
    let config = load_config();

    println!("Mood Tracker Agent Status");
    println!("=========================");
    println!();

    let camera = match open_default_feed() {
        Ok(mut feed) => {
            let name = feed.describe();
            feed.release();
            format!("Available ({name})")
        }
        Err(e) => format!("Unavailable ({e}), tracking runs display-less"),
    };
    println!("Camera: {camera}");
    println!();

    println!("Configuration:");
    println!(
        "  Emission interval: {}ms",
        config.emission_interval.as_millis()
    );
    println!("  Confidence floor: {}", config.confidence_floor);
    println!(
        "  Time zone: {}",
        config.timezone.as_deref().unwrap_or("local")
    );
    println!("  Sessions: {:?}", config.sessions_path);
    println!();

    match TransparencyLog::read_totals(&config.data_path.join("transparency.json")) {
        Ok(Some(totals)) => {
            println!("Cumulative Statistics:");
            println!("  Detections emitted: {}", totals.detections_emitted);
            println!("  Entries recorded: {}", totals.entries_recorded);
            println!("  Sessions completed: {}", totals.sessions_completed);
            println!("  Summaries exported: {}", totals.summaries_exported);
        }
        Ok(None) => println!("No previous session data found."),
        Err(e) => eprintln!("Warning: Could not read transparency stats: {e}"),
    }
}

fn cmd_config() {
    let config = load_config();

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&config).unwrap_or_else(|_| "Error".to_string())
    );
}

fn cmd_disclaimer() {
    println!("{DETECTION_DISCLAIMER}");
}

#[cfg(feature = "server")]
fn cmd_serve(port: u16, in_memory: bool) -> anyhow::Result<()> {
    use mood_tracker_agent::server::{run, ServerConfig};

    let config = load_config();
    let database_path = if in_memory {
        None
    } else {
        Some(config.database_path.clone())
    };
    let server_config =
        ServerConfig::new(port, database_path).with_timezone(config.timezone()?);

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let (addr, shutdown) = run(server_config).await?;
        println!("Mood Tracker Agent v{VERSION}");
        println!("Listening on http://{addr} (POST /mcp, GET /health)");
        println!("Press Ctrl+C to stop");

        tokio::signal::ctrl_c().await?;
        println!();
        println!("Shutting down...");
        let _ = shutdown.send(());
        tokio::time::sleep(Duration::from_millis(100)).await;
        Ok::<(), anyhow::Error>(())
    })
}

/// Set up Ctrl+C handler.
fn ctrlc_handler(running: Arc<AtomicBool>) {
    if let Err(e) = ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    }) {
        eprintln!("Warning: Could not set Ctrl+C handler: {e}");
    }
}
