//! # Error Types
//!
//! Errors raised while constructing shared entities.

use thiserror::Error;

/// Errors from validating entity values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntityError {
    /// Amount string is not a non-negative decimal integer.
    #[error("invalid amount {0:?}: expected decimal digits")]
    InvalidAmount(String),

    /// Inclusion-proof node key too short to carry an exclusion marker.
    #[error("operation tree node {index} has an empty key")]
    EmptyTreeKey { index: u64 },
}
