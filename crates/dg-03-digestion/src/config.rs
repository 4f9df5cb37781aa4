//! Digestion configuration with validation.
//!
//! Every field can be overridden from a `DG_`-prefixed environment
//! variable; unparsable values are ignored with a warning.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use shared_types::Height;
use tracing::warn;

/// Coordinator and session tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DigestConfig {
    /// Attempts per height before the worker gives up (default: 15)
    pub retry_attempts: u32,
    /// Pause between attempts in milliseconds (default: 1000)
    pub retry_delay_ms: u64,
    /// Documents per bulk insert (default: 500)
    pub bulk_write_limit: usize,
    /// First height catch-up starts from when nothing was digested yet
    pub genesis_height: u64,
    /// Buffered error reports before new ones are dropped (default: 100)
    pub error_channel_capacity: usize,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            retry_attempts: 15,
            retry_delay_ms: 1_000,
            bulk_write_limit: 500,
            genesis_height: 0,
            error_channel_capacity: 100,
        }
    }
}

impl DigestConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        override_from_env("DG_RETRY_ATTEMPTS", &mut config.retry_attempts);
        override_from_env("DG_RETRY_DELAY_MS", &mut config.retry_delay_ms);
        override_from_env("DG_BULK_WRITE_LIMIT", &mut config.bulk_write_limit);
        override_from_env("DG_GENESIS_HEIGHT", &mut config.genesis_height);
        override_from_env("DG_ERROR_CHANNEL_CAPACITY", &mut config.error_channel_capacity);
        config
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry_attempts == 0 {
            return Err(ConfigError::InvalidLimit(
                "retry_attempts cannot be 0".into(),
            ));
        }
        if self.bulk_write_limit == 0 {
            return Err(ConfigError::InvalidLimit(
                "bulk_write_limit cannot be 0".into(),
            ));
        }
        if self.error_channel_capacity == 0 {
            return Err(ConfigError::InvalidLimit(
                "error_channel_capacity cannot be 0".into(),
            ));
        }
        Ok(())
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn genesis(&self) -> Height {
        Height(self.genesis_height)
    }
}

/// Where blocks are read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Directory of `{height}.json` block files
    pub blocks_dir: PathBuf,
    /// Network identifier every block must carry
    pub network_id: String,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            blocks_dir: PathBuf::from("./blocks"),
            network_id: "mitum".to_string(),
        }
    }
}

impl ReaderConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        override_from_env("DG_BLOCKS_DIR", &mut config.blocks_dir);
        override_from_env("DG_NETWORK_ID", &mut config.network_id);
        config
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.network_id.is_empty() {
            return Err(ConfigError::Invalid("network_id cannot be empty".into()));
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid limit: {0}")]
    InvalidLimit(String),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Replace `target` with the parsed value of `var` when it is set.
pub fn override_from_env<T: FromStr>(var: &str, target: &mut T) {
    let Ok(raw) = std::env::var(var) else {
        return;
    };
    match raw.parse() {
        Ok(value) => *target = value,
        Err(_) => warn!("{var}={raw:?} is not valid, keeping default"),
    }
}
