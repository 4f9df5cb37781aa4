//! Driven Ports (SPI - Outbound Dependencies)
//!
//! The coordinator only sees heights; materializing a block is the
//! reader's job.

use async_trait::async_trait;
use shared_types::{BlockData, Height};
use thiserror::Error;

pub type ReaderResult<T> = Result<T, ReaderError>;

/// Errors from materializing a block.
#[derive(Debug, Error)]
pub enum ReaderError {
    /// No block has been written at this height yet.
    #[error("no block at height {height}")]
    NotFound { height: Height },

    /// The block exists but does not belong to this network, or does not
    /// describe the requested height.
    #[error("invalid block at height {height}: {reason}")]
    Invalid { height: Height, reason: String },

    #[error("cannot read block at height {height}: {source}")]
    Io {
        height: Height,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot decode block at height {height}: {source}")]
    Decode {
        height: Height,
        #[source]
        source: serde_json::Error,
    },
}

/// Source of finalized blocks.
#[async_trait]
pub trait BlockReader: Send + Sync {
    async fn read_block_at(&self, height: Height) -> ReaderResult<BlockData>;
}
