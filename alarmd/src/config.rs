//! alarmd configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::handoff::DEFAULT_CAPACITY;

/// Main alarmd configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level", skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Hand-off queue sizing
    pub queue: QueueConfig,

    /// Display worker timing
    pub display: DisplayConfig,

    /// Request parsing limits
    pub request: RequestConfig,

    /// Event output
    pub events: EventsConfig,
}

impl Config {
    /// Validate configuration before use
    pub fn validate(&self) -> Result<()> {
        if self.queue.capacity == 0 {
            return Err(eyre::eyre!("queue.capacity must be at least 1"));
        }
        if self.display.poll_interval_secs == 0 {
            return Err(eyre::eyre!("display.poll-interval-secs must be at least 1"));
        }
        if self.request.max_message_len == 0 {
            return Err(eyre::eyre!("request.max-message-len must be at least 1"));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        for candidate in Self::candidate_paths() {
            if candidate.exists() {
                match Self::load_from_file(&candidate) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", candidate.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is set up
    ///
    /// Errors are swallowed; [`Config::load`] reports them once logging works.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let candidates = match config_path {
            Some(path) => vec![path.clone()],
            None => Self::candidate_paths(),
        };
        candidates
            .into_iter()
            .find(|p| p.exists())
            .and_then(|p| Self::load_from_file(p).ok())
            .and_then(|c| c.log_level)
    }

    /// `./.alarmd.yml`, then `~/.config/alarmd/alarmd.yml`
    fn candidate_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(".alarmd.yml")];
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("alarmd").join("alarmd.yml"));
        }
        paths
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Hand-off queue configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Slots in the ring buffer
    pub capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
        }
    }
}

/// Display worker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Longest gap between display passes of a worker
    #[serde(rename = "poll-interval-secs")]
    pub poll_interval_secs: u64,
}

impl DisplayConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { poll_interval_secs: 60 }
    }
}

/// Request parsing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestConfig {
    /// Messages longer than this many bytes are truncated
    #[serde(rename = "max-message-len")]
    pub max_message_len: usize,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self { max_message_len: 128 }
    }
}

/// Event output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Print events to stdout
    pub console: bool,

    /// Append events as JSON lines to this file
    #[serde(rename = "log-path", skip_serializing_if = "Option::is_none")]
    pub log_path: Option<PathBuf>,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            console: true,
            log_path: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.queue.capacity, 4);
        assert_eq!(config.display.poll_interval_secs, 60);
        assert_eq!(config.request.max_message_len, 128);
        assert!(config.events.console);
        assert!(config.events.log_path.is_none());
        assert!(config.log_level.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_config() {
        let yaml = r#"
log-level: debug

queue:
  capacity: 8

display:
  poll-interval-secs: 5

request:
  max-message-len: 64

events:
  console: false
  log-path: /tmp/alarmd-events.jsonl
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert_eq!(config.queue.capacity, 8);
        assert_eq!(config.display.poll_interval(), Duration::from_secs(5));
        assert_eq!(config.request.max_message_len, 64);
        assert!(!config.events.console);
        assert_eq!(config.events.log_path, Some(PathBuf::from("/tmp/alarmd-events.jsonl")));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let yaml = r#"
queue:
  capacity: 2
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.queue.capacity, 2);
        assert_eq!(config.display.poll_interval_secs, 60);
        assert!(config.events.console);
    }

    #[test]
    fn test_validate_rejects_zero() {
        let mut config = Config::default();
        config.queue.capacity = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.display.poll_interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("alarmd.yml");
        fs::write(&path, "log-level: warn\nqueue:\n  capacity: 6\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.queue.capacity, 6);
        assert_eq!(Config::load_log_level(Some(&path)).as_deref(), Some("warn"));
    }

    #[test]
    fn test_load_explicit_missing_path_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.yml");
        assert!(Config::load(Some(&path)).is_err());
        assert!(Config::load_log_level(Some(&path)).is_none());
    }
}
