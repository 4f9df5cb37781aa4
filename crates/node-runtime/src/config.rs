//! # Node Configuration
//!
//! One struct per pipeline stage, all overridable from `DG_` environment
//! variables. Validation runs once at startup.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use dg_03_digestion::config::override_from_env;
use dg_03_digestion::{DigestConfig, ReaderConfig};
use dg_04_query_api::ApiConfig;
use digest_telemetry::TelemetryConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Complete node configuration.
#[derive(Debug, Clone, Default)]
pub struct NodeConfig {
    pub digest: DigestConfig,
    pub reader: ReaderConfig,
    pub api: ApiConfig,
    pub store: StoreConfig,
    pub follow: FollowConfig,
    pub telemetry: TelemetryConfig,
}

impl NodeConfig {
    pub fn from_env() -> Self {
        Self {
            digest: DigestConfig::from_env(),
            reader: ReaderConfig::from_env(),
            api: ApiConfig::from_env(),
            store: StoreConfig::from_env(),
            follow: FollowConfig::from_env(),
            telemetry: TelemetryConfig::from_env(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.digest
            .validate()
            .map_err(|e| ConfigError::Digest(e.to_string()))?;
        self.reader
            .validate()
            .map_err(|e| ConfigError::Digest(e.to_string()))?;
        self.api
            .validate()
            .map_err(|e| ConfigError::Api(e.to_string()))?;
        self.follow.validate()?;
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("digest: {0}")]
    Digest(String),
    #[error("api: {0}")]
    Api(String),
    #[error("unknown store backend {0:?}, expected memory or rocksdb")]
    UnknownBackend(String),
    #[error("follow: {0}")]
    Follow(String),
}

/// Document store backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    RocksDb,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "rocksdb" => Ok(StoreBackend::RocksDb),
            _ => Err(ConfigError::UnknownBackend(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// `memory` or `rocksdb` (default: memory)
    pub backend: StoreBackend,
    /// RocksDB data directory
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            path: PathBuf::from("./data/digest"),
        }
    }
}

impl StoreConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        override_from_env("DG_STORE_BACKEND", &mut config.backend);
        override_from_env("DG_STORE_PATH", &mut config.path);
        config
    }
}

/// How the node tracks the block export directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FollowConfig {
    /// Directory scan period in milliseconds (default: 1000)
    pub poll_interval_ms: u64,
    /// Stop startup catch-up here instead of at the last exported block
    pub target_height: Option<u64>,
}

impl Default for FollowConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1_000,
            target_height: None,
        }
    }
}

impl FollowConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        override_from_env("DG_POLL_INTERVAL_MS", &mut config.poll_interval_ms);
        if let Ok(raw) = std::env::var("DG_TARGET_HEIGHT") {
            match raw.trim().parse() {
                Ok(height) => config.target_height = Some(height),
                Err(_) => warn!("DG_TARGET_HEIGHT={raw:?} is not a height, ignoring"),
            }
        }
        config
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Follow("poll_interval_ms cannot be 0".into()));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
