//! Query API configuration with validation.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::page::MAX_PAGE_LIMIT;

/// HTTP server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Bind address (default: 0.0.0.0)
    pub host: IpAddr,
    /// Port (default: 54320)
    pub port: u16,
    /// Per-request timeout in milliseconds (default: 10000)
    pub request_timeout_ms: u64,
    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,
    /// Largest page a list query may return (default and ceiling: 50)
    pub max_page_limit: i64,
    /// How often expired cache entries are purged, in milliseconds
    pub cache_cleanup_interval_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 54320,
            request_timeout_ms: 10_000,
            cors_origins: vec!["*".to_string()],
            max_page_limit: MAX_PAGE_LIMIT,
            cache_cleanup_interval_ms: 10_000,
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        override_from_env("DG_API_HOST", &mut config.host);
        override_from_env("DG_API_PORT", &mut config.port);
        override_from_env("DG_API_TIMEOUT_MS", &mut config.request_timeout_ms);
        override_from_env("DG_API_MAX_PAGE_LIMIT", &mut config.max_page_limit);
        if let Ok(origins) = std::env::var("DG_API_CORS_ORIGINS") {
            config.cors_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect();
        }
        config
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout(
                "request timeout cannot be 0".into(),
            ));
        }
        if self.max_page_limit <= 0 || self.max_page_limit > MAX_PAGE_LIMIT {
            return Err(ConfigError::InvalidLimit(format!(
                "max_page_limit must be within 1..={MAX_PAGE_LIMIT}"
            )));
        }
        if self.cache_cleanup_interval_ms == 0 {
            return Err(ConfigError::InvalidLimit(
                "cache_cleanup_interval_ms cannot be 0".into(),
            ));
        }
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn cache_cleanup_interval(&self) -> Duration {
        Duration::from_millis(self.cache_cleanup_interval_ms)
    }
}

/// Configuration errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    #[error("invalid limit: {0}")]
    InvalidLimit(String),
}

fn override_from_env<T: std::str::FromStr>(var: &str, target: &mut T) {
    let Ok(raw) = std::env::var(var) else {
        return;
    };
    match raw.parse() {
        Ok(value) => *target = value,
        Err(_) => warn!("{var}={raw:?} is not valid, keeping default"),
    }
}
