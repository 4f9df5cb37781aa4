//! # Store Errors

use thiserror::Error;

/// Result alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors surfaced by [`crate::DocumentStore`] implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A bulk insert acknowledged zero documents although some were sent.
    #[error("no documents inserted into {collection} ({expected} sent)")]
    NothingInserted { collection: String, expected: usize },

    /// Backend-level failure (I/O, connectivity, timeout).
    #[error("store backend failure on {collection}: {message}")]
    Backend { collection: String, message: String },

    /// A stored document could not be encoded or decoded.
    #[error("document encoding failed in {collection}: {source}")]
    Serialization {
        collection: String,
        #[source]
        source: serde_json::Error,
    },

    /// The store cannot be opened or is held by another process.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn backend(collection: &str, message: impl Into<String>) -> Self {
        Self::Backend {
            collection: collection.to_string(),
            message: message.into(),
        }
    }

    pub fn serialization(collection: &str, source: serde_json::Error) -> Self {
        Self::Serialization {
            collection: collection.to_string(),
            source,
        }
    }
}
