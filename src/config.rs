//! Configuration for the varbit recorder.

use crate::recorder::CommitPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default collector endpoint.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:3001/updateMany";

/// Main configuration for the recorder.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Collector URL batches are POSTed to
    pub endpoint: String,

    /// Timeout for a single POST
    #[serde(with = "duration_serde")]
    pub request_timeout: Duration,

    /// When the shadow snapshot catches up with the host
    pub commit_policy: CommitPolicy,

    /// Fixed session id to use instead of a random one
    pub manual_session_id: Option<String>,

    /// Path for storing stats
    pub data_path: PathBuf,

    /// Tick cadence of the simulated host (in milliseconds)
    pub tick_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("varbit-recorder");

        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            request_timeout: Duration::from_secs(10),
            commit_policy: CommitPolicy::default(),
            manual_session_id: None,
            data_path: data_dir,
            tick_interval_ms: 600,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`, falling back to defaults when absent.
    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| ConfigError::Parse(e.to_string()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;

        std::fs::write(path, content)?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("varbit-recorder")
            .join("config.json")
    }

    /// Path of the persisted stats file.
    pub fn stats_path(&self) -> PathBuf {
        self.data_path.join("stats.json")
    }

    /// Ensure all required directories exist.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.data_path)?;
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Serialize error: {0}")]
    Serialize(String),
}

/// Serde support for Duration.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.commit_policy, CommitPolicy::PerTick);
        assert!(config.manual_session_id.is_none());
        assert_eq!(config.tick_interval(), Duration::from_millis(600));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"endpoint":"http://collector/x","request_timeout":3}"#)
                .unwrap();
        assert_eq!(config.endpoint, "http://collector/x");
        assert_eq!(config.request_timeout, Duration::from_secs(3));
        assert_eq!(config.tick_interval_ms, 600);
    }

    #[test]
    fn test_save_and_load() {
        let dir = std::env::temp_dir().join(format!("varbit-recorder-config-{}", uuid::Uuid::new_v4()));
        let path = dir.join("config.json");

        let mut config = Config::default();
        config.manual_session_id = Some("run-7".to_string());
        config.commit_policy = CommitPolicy::Eager;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.manual_session_id.as_deref(), Some("run-7"));
        assert_eq!(loaded.commit_policy, CommitPolicy::Eager);

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let path = std::env::temp_dir().join("varbit-recorder-does-not-exist.json");
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
    }
}
