//! # Projection Errors
//!
//! Every variant is fatal to the batch that produced it: a block whose
//! mutations cannot all be projected is not committed at all.

use thiserror::Error;

use super::key::{DomainModule, RecordKind};

#[derive(Debug, Error)]
pub enum ProjectionError {
    /// The key's segment count does not match its record kind.
    #[error("malformed state key {key:?}: {kind} expects {expected} segments, found {actual}")]
    MalformedKey {
        key: String,
        kind: RecordKind,
        expected: usize,
        actual: usize,
    },

    /// A positional identifier is empty or not of the expected form.
    #[error("malformed state key {key:?}: segment {position} {reason}")]
    InvalidIdentifier {
        key: String,
        position: usize,
        reason: &'static str,
    },

    /// The mutation value does not decode into the kind's payload type.
    #[error("cannot decode {kind} payload of {key:?}: {source}")]
    DecodeError {
        key: String,
        kind: RecordKind,
        #[source]
        source: serde_json::Error,
    },

    /// A kind was routed to a projector of another module.
    #[error("{module:?} projector cannot project {kind}")]
    ForeignKind {
        module: DomainModule,
        kind: RecordKind,
    },
}

impl ProjectionError {
    /// True for the key-shape failures.
    pub fn is_malformed_key(&self) -> bool {
        matches!(
            self,
            Self::MalformedKey { .. } | Self::InvalidIdentifier { .. }
        )
    }
}
