//! Configuration for the Zone Key agent.

use crate::collector::ListenerConfig;
use crate::context::{default_rules, CategoryRule};
use crate::pvt::PvtConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Main configuration for the agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Seconds between aggregation-and-persist cycles
    pub aggregate_period_secs: u64,

    /// Seconds between active-window polls
    pub context_poll_secs: u64,

    /// Capacity of the keystroke ring buffer
    pub key_buffer_capacity: usize,

    /// Which input sources to capture
    pub sources: ListenerConfig,

    /// Reaction-test timing and scoring
    pub pvt: PvtConfig,

    /// Window classification rules, ordered by priority
    pub categories: Vec<CategoryRule>,

    /// Screen geometry for stimulus placement
    pub screen: ScreenConfig,

    /// Path for storing the database and transparency logs
    pub data_path: PathBuf,

    /// Path for exported CSV datasets
    pub export_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("zonekey");

        Self {
            aggregate_period_secs: 60,
            context_poll_secs: 5,
            key_buffer_capacity: 1000,
            sources: ListenerConfig::default(),
            pvt: PvtConfig::default(),
            categories: default_rules(),
            screen: ScreenConfig::default(),
            export_path: data_dir.join("exports"),
            data_path: data_dir,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        let config_path = Self::config_path();

        // Ensure parent directory exists
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("zonekey")
            .join("config.json")
    }

    /// Ensure all required directories exist.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.data_path)?;
        std::fs::create_dir_all(&self.export_path)?;
        Ok(())
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_path.join("zonekey.db")
    }

    pub fn transparency_path(&self) -> PathBuf {
        self.data_path.join("transparency.json")
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.aggregate_period_secs == 0 {
            return Err(ConfigError::Invalid(
                "aggregate_period_secs must be positive".to_string(),
            ));
        }
        if self.context_poll_secs == 0 {
            return Err(ConfigError::Invalid(
                "context_poll_secs must be positive".to_string(),
            ));
        }
        if self.key_buffer_capacity == 0 {
            return Err(ConfigError::Invalid(
                "key_buffer_capacity must be positive".to_string(),
            ));
        }
        self.pvt
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(())
    }
}

/// Screen geometry used to place the visual stimulus.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScreenConfig {
    pub width: u32,
    pub height: u32,
    pub stimulus_size: u32,
    pub margin: u32,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            stimulus_size: 50,
            margin: 50,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.aggregate_period_secs, 60);
        assert!(config.sources.capture_keyboard);
        assert!(!config.categories.is_empty());
    }

    #[test]
    fn test_validate_rejects_zero_periods() {
        let mut config = Config::default();
        config.aggregate_period_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_round_trips_through_json() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        parsed.validate().unwrap();
        assert_eq!(parsed.screen.width, config.screen.width);
    }
}
