//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/habiscope/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/habiscope/` (~/.config/habiscope/)
//! - State/Logs: `$XDG_STATE_HOME/habiscope/` (~/.local/state/habiscope/)
//!
//! Only thresholds the analytics engines leave open are configurable here.
//! Fixed compatibility constants (anomaly deviation bounds, forecast decay,
//! correlation classification bands) live next to the code that uses them.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Analytics configuration
    #[serde(default)]
    pub analytics: AnalyticsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Analytics tuning knobs
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyticsConfig {
    /// Minimum attempts an hour bucket needs to join a timing window
    #[serde(default = "default_timing_sample_floor")]
    pub timing_sample_floor: u32,

    /// Widest contiguous hour window considered by timing analysis
    #[serde(default = "default_max_window_hours")]
    pub max_window_hours: u32,

    /// Daily group completion rate a day must exceed to extend a group streak
    #[serde(default = "default_group_rate_floor")]
    pub group_rate_floor: f64,

    /// Exponential decay constant (days) for momentum recency weighting
    #[serde(default = "default_momentum_decay_days")]
    pub momentum_decay_days: f64,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            timing_sample_floor: default_timing_sample_floor(),
            max_window_hours: default_max_window_hours(),
            group_rate_floor: default_group_rate_floor(),
            momentum_decay_days: default_momentum_decay_days(),
        }
    }
}

fn default_timing_sample_floor() -> u32 {
    3
}

fn default_max_window_hours() -> u32 {
    4
}

fn default_group_rate_floor() -> f64 {
    0.5
}

fn default_momentum_decay_days() -> f64 {
    7.0
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate loaded values, returning an error message if out of range
    pub fn validate(&self) -> Result<()> {
        let analytics = &self.analytics;
        if analytics.max_window_hours == 0 || analytics.max_window_hours > 24 {
            return Err(Error::Config(
                "analytics.max_window_hours must be between 1 and 24".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&analytics.group_rate_floor) {
            return Err(Error::Config(
                "analytics.group_rate_floor must be between 0.0 and 1.0".to_string(),
            ));
        }
        if analytics.momentum_decay_days <= 0.0 {
            return Err(Error::Config(
                "analytics.momentum_decay_days must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/habiscope/config.toml` (~/.config/habiscope/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("habiscope").join("config.toml")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/habiscope/` (~/.local/state/habiscope/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("habiscope")
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/habiscope/habiscope.log` (~/.local/state/habiscope/habiscope.log)
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("habiscope.log")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.analytics.timing_sample_floor, 3);
        assert_eq!(config.analytics.max_window_hours, 4);
        assert_eq!(config.analytics.group_rate_floor, 0.5);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[analytics]
timing_sample_floor = 5
group_rate_floor = 0.6

[logging]
level = "debug"
"#;
        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(config.analytics.timing_sample_floor, 5);
        assert_eq!(config.analytics.group_rate_floor, 0.6);
        // Unspecified keys fall back to defaults
        assert_eq!(config.analytics.max_window_hours, 4);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[analytics]\nmomentum_decay_days = 10.0").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.analytics.momentum_decay_days, 10.0);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config: Config = toml::from_str("[analytics]\nmax_window_hours = 0").unwrap();
        assert!(config.validate().is_err());

        let config: Config = toml::from_str("[analytics]\ngroup_rate_floor = 1.5").unwrap();
        assert!(config.validate().is_err());

        let config: Config = toml::from_str("[analytics]\nmomentum_decay_days = -1.0").unwrap();
        assert!(config.validate().is_err());
    }
}
