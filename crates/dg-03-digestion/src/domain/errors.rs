//! Error types for the digestion pipeline.

use dg_01_document_store::StoreError;
use dg_02_record_projection::ProjectionError;
use shared_types::{EntityError, Hash, Height};
use thiserror::Error;

use crate::ports::outbound::ReaderError;

/// Failures of one batch session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// An operation's fact hash is absent from the block's inclusion proof.
    #[error("operation {fact_hash} of height {height} not found in operations tree")]
    OperationNotInProof { height: Height, fact_hash: Hash },

    #[error("malformed inclusion proof at height {height}: {source}")]
    InvalidProof {
        height: Height,
        #[source]
        source: EntityError,
    },

    #[error("projection failed at height {height}: {source}")]
    Projection {
        height: Height,
        #[source]
        source: ProjectionError,
    },

    /// Encoding or writing one collection failed.
    #[error("commit of height {height} failed on {collection}: {source}")]
    Store {
        height: Height,
        collection: &'static str,
        #[source]
        source: StoreError,
    },

    /// The session could not obtain its private store handle.
    #[error("no store handle for height {height}: {source}")]
    Handle {
        height: Height,
        #[source]
        source: StoreError,
    },

    #[error("commit of height {height} attempted before prepare")]
    NotPrepared { height: Height },

    #[error("session for height {height} is closed")]
    Closed { height: Height },
}

/// Failures of one digestion attempt as seen by the coordinator.
#[derive(Debug, Error)]
pub enum DigestError {
    #[error(transparent)]
    Reader(#[from] ReaderError),

    #[error(transparent)]
    Session(#[from] SessionError),

    /// Pre-check or watermark access failed.
    #[error("store: {0}")]
    Store(#[from] StoreError),

    #[error("digestion cancelled")]
    Cancelled,

    /// The worker is gone; nothing more can be enqueued.
    #[error("digestion worker stopped")]
    Stopped,
}

impl DigestError {
    /// Cancellation is never retried.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DigestError::Cancelled)
    }
}

/// One height the worker gave up on, as sent on the error-report channel.
#[derive(Debug)]
pub struct DigestFailure {
    pub height: Height,
    pub error: DigestError,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_shutdown_counts_as_cancellation() {
        assert!(DigestError::Cancelled.is_cancelled());
        assert!(!DigestError::from(SessionError::Closed { height: Height(3) }).is_cancelled());
        assert!(!DigestError::from(ReaderError::NotFound { height: Height(3) }).is_cancelled());
        assert!(!DigestError::Store(StoreError::Unavailable("down".into())).is_cancelled());
    }

    #[test]
    fn test_messages_carry_height_and_collection() {
        let err = SessionError::Store {
            height: Height(9),
            collection: "digest_nft",
            source: StoreError::NothingInserted {
                collection: "digest_nft".into(),
                expected: 2,
            },
        };
        let msg = err.to_string();
        assert!(msg.contains("height 9"));
        assert!(msg.contains("digest_nft"));
    }
}
