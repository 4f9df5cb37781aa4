//! # Digest Telemetry
//!
//! Structured logging for the digest node.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use digest_telemetry::{init_tracing, TelemetryConfig};
//!
//! init_tracing(&TelemetryConfig::from_env())?;
//! tracing::info!(height = 42, "[dg-03] block digested");
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `DG_SERVICE_NAME` | `chain-digest` | Service name in the startup line |
//! | `DG_LOG_LEVEL` / `RUST_LOG` | `info` | Log filter directives |
//! | `DG_JSON_LOGS` | `false` (`true` in containers) | JSON instead of pretty output |

mod config;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use tracing_setup::init_tracing;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid log filter {directives:?}: {reason}")]
    Filter { directives: String, reason: String },

    #[error("Failed to install tracing subscriber: {0}")]
    Install(String),
}
