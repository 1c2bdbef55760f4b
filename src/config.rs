//! Configuration for the mood tracker.

use crate::core::summary::DEFAULT_OVERRIDE_THRESHOLD;
use crate::detector::DEFAULT_CONFIDENCE_FLOOR;
use crate::tracker::{TrackerConfig, DEFAULT_INTERVAL};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration for the mood tracker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Time between mock detections
    #[serde(with = "duration_ms_serde")]
    pub emission_interval: Duration,

    /// Lower bound for mock confidence values
    pub confidence_floor: f64,

    /// Average a non-neutral emotion must exceed to override a neutral
    /// session summary
    pub override_threshold: f64,

    /// Number of entries in the rolling confidence average
    pub rolling_window: usize,

    /// IANA time zone for hour-of-day analytics (local time when unset)
    pub timezone: Option<String>,

    /// Path for storing state and transparency logs
    pub data_path: PathBuf,

    /// Directory holding one subdirectory per recorded session
    pub sessions_path: PathBuf,

    /// SQLite database used by the session server
    pub database_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mood-tracker-agent");

        Self {
            emission_interval: DEFAULT_INTERVAL,
            confidence_floor: DEFAULT_CONFIDENCE_FLOOR,
            override_threshold: DEFAULT_OVERRIDE_THRESHOLD,
            rolling_window: 5,
            timezone: None,
            sessions_path: data_dir.join("sessions"),
            database_path: data_dir.join("tracker.db"),
            data_path: data_dir,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from a specific file, falling back to defaults if
    /// it does not exist.
    pub fn load_from(config_path: &std::path::Path) -> Result<Self, ConfigError> {
        if config_path.exists() {
            let content = std::fs::read_to_string(config_path)
                .map_err(|e| ConfigError::IoError(e.to_string()))?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, config_path: &std::path::Path) -> Result<(), ConfigError> {
        // Ensure parent directory exists
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(config_path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mood-tracker-agent")
            .join("config.json")
    }

    /// Ensure all required directories exist.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.sessions_path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        std::fs::create_dir_all(&self.data_path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Ok(())
    }

    /// Check value ranges and the time zone name.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.confidence_floor) {
            return Err(ConfigError::InvalidValue(format!(
                "confidence_floor must be within [0, 1], got {}",
                self.confidence_floor
            )));
        }
        if self.emission_interval.is_zero() {
            return Err(ConfigError::InvalidValue(
                "emission_interval must be positive".to_string(),
            ));
        }
        self.timezone()?;
        Ok(())
    }

    /// The configured analytics time zone, if any.
    pub fn timezone(&self) -> Result<Option<chrono_tz::Tz>, ConfigError> {
        match &self.timezone {
            Some(name) => name
                .parse::<chrono_tz::Tz>()
                .map(Some)
                .map_err(|_| ConfigError::InvalidTimezone(name.clone())),
            None => Ok(None),
        }
    }

    /// Tracker settings derived from this configuration.
    pub fn tracker_config(&self) -> TrackerConfig {
        TrackerConfig {
            interval: self.emission_interval,
            confidence_floor: self.confidence_floor,
        }
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
    InvalidValue(String),
    InvalidTimezone(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
            ConfigError::InvalidValue(e) => write!(f, "Invalid value: {e}"),
            ConfigError::InvalidTimezone(name) => write!(f, "Unknown time zone: {name}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Serde support for Duration as whole milliseconds.
mod duration_ms_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.emission_interval, Duration::from_millis(3000));
        assert_eq!(config.confidence_floor, 0.75);
        assert_eq!(config.override_threshold, 0.1);
        assert!(config.timezone.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_interval_serialized_as_millis() {
        let config = Config::default();
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["emission_interval"], 3000);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"emission_interval": 500, "timezone": "Europe/Berlin"}"#)
                .unwrap();
        assert_eq!(config.emission_interval, Duration::from_millis(500));
        assert_eq!(config.confidence_floor, 0.75);
        assert_eq!(config.timezone().unwrap(), Some(chrono_tz::Europe::Berlin));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let config = Config {
            timezone: Some("Mars/Olympus".to_string()),
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidTimezone(_))));

        let config = Config {
            confidence_floor: 1.5,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let config = Config {
            rolling_window: 9,
            ..Config::default()
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.rolling_window, 9);
        assert_eq!(loaded.tracker_config().interval, config.emission_interval);
    }
}
