//! Configuration loading and validation.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::agents::backend::AiBackendConfig;
use crate::agents::RetryPolicy;
use crate::calculate::PointsPolicy;
use crate::parse_duration;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// AI backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// Backend type: "ollama" or "offline"
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Base URL for the AI service
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model to use
    #[serde(default = "default_model")]
    pub model: String,

    /// Timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Max retries
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before the first retry, doubled after each
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

fn default_backend() -> String {
    "ollama".to_string()
}

fn default_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "llama3.2".to_string()
}

fn default_timeout() -> u64 {
    120
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            base_url: default_base_url(),
            model: default_model(),
            timeout_seconds: default_timeout(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            temperature: None,
        }
    }
}

impl AiConfig {
    pub fn backend_config(&self) -> Result<AiBackendConfig, ConfigError> {
        match self.backend.as_str() {
            "ollama" => Ok(AiBackendConfig::Ollama {
                base_url: self.base_url.clone(),
                model: self.model.clone(),
                timeout_seconds: self.timeout_seconds,
                temperature: self.temperature,
            }),
            "offline" => Ok(AiBackendConfig::Offline),
            other => Err(ConfigError::ValidationError(format!(
                "Unknown AI backend '{}'",
                other
            ))),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            initial_delay_ms: self.retry_delay_ms,
            ..RetryPolicy::default()
        }
    }
}

/// Cached response lifetimes, as duration strings ("30s", "5m", "1h").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_leaderboard_ttl")]
    pub leaderboard_ttl: String,

    #[serde(default = "default_stats_ttl")]
    pub stats_ttl: String,
}

fn default_leaderboard_ttl() -> String {
    "1m".to_string()
}

fn default_stats_ttl() -> String {
    "5m".to_string()
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            leaderboard_ttl: default_leaderboard_ttl(),
            stats_ttl: default_stats_ttl(),
        }
    }
}

impl CacheConfig {
    pub fn leaderboard_ttl(&self) -> Duration {
        parse_duration(&self.leaderboard_ttl).unwrap_or(Duration::from_secs(60))
    }

    pub fn stats_ttl(&self) -> Duration {
        parse_duration(&self.stats_ttl).unwrap_or(Duration::from_secs(300))
    }
}

/// Leaderboard service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardConfig {
    /// Attempts per aggregate write before giving up on version conflicts
    #[serde(default = "default_max_write_attempts")]
    pub max_write_attempts: u32,

    /// Players shown either side of a player in the nearby view
    #[serde(default = "default_nearby_window")]
    pub nearby_window: usize,

    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_max_write_attempts() -> u32 {
    3
}

fn default_nearby_window() -> usize {
    5
}

fn default_page_size() -> u32 {
    20
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        Self {
            max_write_attempts: default_max_write_attempts(),
            nearby_window: default_nearby_window(),
            page_size: default_page_size(),
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub ai: AiConfig,

    #[serde(default)]
    pub points: PointsPolicy,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub leaderboard: LeaderboardConfig,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            ai: AiConfig::default(),
            points: PointsPolicy::default(),
            cache: CacheConfig::default(),
            leaderboard: LeaderboardConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &PathBuf) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ai.timeout_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "AI timeout must be greater than 0".to_string(),
            ));
        }

        self.ai.backend_config()?;

        for (name, value) in [
            ("cache.leaderboard_ttl", &self.cache.leaderboard_ttl),
            ("cache.stats_ttl", &self.cache.stats_ttl),
        ] {
            if parse_duration(value).is_none() {
                return Err(ConfigError::ValidationError(format!(
                    "{} is not a duration: '{}'",
                    name, value
                )));
            }
        }

        if self.leaderboard.max_write_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "leaderboard.max_write_attempts must be at least 1".to_string(),
            ));
        }

        if !(1..=100).contains(&self.leaderboard.page_size) {
            return Err(ConfigError::ValidationError(
                "leaderboard.page_size must be between 1 and 100".to_string(),
            ));
        }

        let mut milestones: Vec<u32> = self.points.streak_bonuses.iter().map(|b| b.days).collect();
        milestones.sort_unstable();
        milestones.dedup();
        if milestones.len() != self.points.streak_bonuses.len() || milestones.contains(&0) {
            return Err(ConfigError::ValidationError(
                "points.streak_bonuses needs distinct, non-zero day counts".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();

        assert_eq!(config.data_dir, PathBuf::from("./data"));
        assert_eq!(config.log_level, "info");
        assert_eq!(config.ai.backend, "ollama");
        assert_eq!(config.leaderboard.max_write_attempts, 3);
        assert_eq!(config.points.base_points, 10);
    }

    #[test]
    fn test_ai_config_default() {
        let ai = AiConfig::default();

        assert_eq!(ai.backend, "ollama");
        assert_eq!(ai.base_url, "http://localhost:11434");
        assert_eq!(ai.model, "llama3.2");
        assert_eq!(ai.timeout_seconds, 120);
        assert_eq!(ai.retry_policy().max_retries, 3);
    }

    #[test]
    fn test_config_validation_ok() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_bad_timeout() {
        let mut config = AppConfig::default();
        config.ai.timeout_seconds = 0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_unknown_backend() {
        let mut config = AppConfig::default();
        config.ai.backend = "carrier-pigeon".to_string();

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_bad_ttl() {
        let mut config = AppConfig::default();
        config.cache.stats_ttl = "soon".to_string();

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_zero_write_attempts() {
        let mut config = AppConfig::default();
        config.leaderboard.max_write_attempts = 0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_cache_ttls() {
        let cache = CacheConfig {
            leaderboard_ttl: "30s".to_string(),
            stats_ttl: "2m".to_string(),
        };
        assert_eq!(cache.leaderboard_ttl(), Duration::from_secs(30));
        assert_eq!(cache.stats_ttl(), Duration::from_secs(120));
    }

    #[test]
    fn test_partial_toml() {
        let config: AppConfig = toml::from_str(
            r#"
            data_dir = "/var/lib/court-coach"

            [ai]
            backend = "offline"

            [points]
            base_points = 20

            [leaderboard]
            nearby_window = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/var/lib/court-coach"));
        assert_eq!(config.ai.backend_config().unwrap(), AiBackendConfig::Offline);
        assert_eq!(config.points.base_points, 20);
        assert_eq!(config.points.max_accuracy_bonus, 10);
        assert_eq!(config.leaderboard.nearby_window, 2);
        assert_eq!(config.leaderboard.page_size, 20);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string(&config).unwrap();

        // Should be parseable
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.data_dir, parsed.data_dir);
        assert_eq!(parsed.points, config.points);
    }
}
