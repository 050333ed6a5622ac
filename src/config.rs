//! Configuration loaded from `stagegate.toml`.
//!
//! Every field has a default, so a missing file or a partial one is fine.
//! `STAGEGATE_STORE` takes precedence over the file for the store path.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{Result, StagegateError};
use crate::pipeline::{RiskClassification, Strategy};

pub const CONFIG_FILE: &str = "stagegate.toml";
pub const STORE_ENV: &str = "STAGEGATE_STORE";

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StagegateConfig {
    /// JSON file holding jobs and gate records.
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,

    /// Strategy for new jobs when none is given.
    #[serde(default)]
    pub default_strategy: Strategy,

    /// Risk classification for new jobs when none is given.
    #[serde(default)]
    pub default_risk: RiskClassification,

    /// Attempts after a lost commit race before giving up.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay in milliseconds for exponential backoff between attempts.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

fn default_store_path() -> PathBuf {
    PathBuf::from(".stagegate/jobs.json")
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    200
}

impl Default for StagegateConfig {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            default_strategy: Strategy::default(),
            default_risk: RiskClassification::default(),
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

impl StagegateConfig {
    /// Load `stagegate.toml` from the current directory.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    /// Load from `path`, falling back to defaults if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<StagegateConfig>(&contents)?
        } else {
            Self::default()
        };

        if let Ok(store) = std::env::var(STORE_ENV)
            && !store.is_empty()
        {
            config.store_path = PathBuf::from(store);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.max_retries,
            base_delay_ms: self.base_delay_ms,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.store_path.as_os_str().is_empty() {
            return Err(StagegateError::Config(
                "store_path must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// How a caller retries after `ConcurrentModification`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
}

impl RetryConfig {
    /// delay = base_delay_ms * 2^(attempt - 1)
    pub fn delay_for_attempt(&self, attempt: u32) -> u64 {
        self.base_delay_ms
            .saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = StagegateConfig::default();
        assert_eq!(config.store_path, PathBuf::from(".stagegate/jobs.json"));
        assert_eq!(config.default_strategy, Strategy::Standard);
        assert_eq!(config.default_risk, RiskClassification::Low);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.base_delay_ms, 200);
    }

    #[test]
    fn deserialize_partial_toml() {
        let toml_str = r#"
            default_strategy = "FAST_TRACK"
            default_risk = "HIGH"
            max_retries = 5
        "#;
        let config: StagegateConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.default_strategy, Strategy::FastTrack);
        assert_eq!(config.default_risk, RiskClassification::High);
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.base_delay_ms, 200);
    }

    #[test]
    fn unknown_strategy_is_a_toml_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "default_strategy = \"RECKLESS\"\n").unwrap();

        assert!(matches!(
            StagegateConfig::load_from(&path),
            Err(StagegateError::Toml(_))
        ));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "base_delay_ms = 50\n").unwrap();

        let config = StagegateConfig::load_from(&path).unwrap();
        assert_eq!(config.base_delay_ms, 50);
        assert_eq!(config.max_retries, 3);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = StagegateConfig::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.max_retries, 3);
    }

    #[test]
    fn retry_backoff_is_exponential() {
        let retry = RetryConfig {
            max_retries: 5,
            base_delay_ms: 100,
        };
        assert_eq!(retry.delay_for_attempt(1), 100);
        assert_eq!(retry.delay_for_attempt(2), 200);
        assert_eq!(retry.delay_for_attempt(3), 400);
        assert_eq!(retry.delay_for_attempt(4), 800);
    }
}
