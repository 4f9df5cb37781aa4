//! # Core Domain Entities
//!
//! What a finalized block looks like once the Block Reader has materialized
//! it.
//!
//! ## Clusters
//!
//! - **Chain**: `Height`, `BlockManifest`, `BlockHandle`, `BlockData`
//! - **Execution**: `Operation`, `StateMutation`
//! - **Inclusion**: `InclusionProof`, `OperationTreeNode`
//! - **Values**: `Big`

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::EntityError;

// =============================================================================
// CLUSTER A: THE CHAIN
// =============================================================================

/// Hashes travel as their canonical (base58) string form.
pub type Hash = String;

/// Position of a finalized block in the chain.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Height(pub u64);

impl Height {
    /// Height of the genesis block.
    pub const GENESIS: Height = Height(0);

    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn value(self) -> u64 {
        self.0
    }

    /// The following height. Saturates at `u64::MAX`.
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl From<u64> for Height {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for Height {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Block manifest as signed by the suffrage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockManifest {
    pub height: Height,
    pub hash: Hash,
    #[serde(default)]
    pub previous: Option<Hash>,
    pub proposal: Hash,
    #[serde(default)]
    pub operations_tree: Option<Hash>,
    #[serde(default)]
    pub states_tree: Option<Hash>,
    #[serde(default)]
    pub suffrage: Option<Hash>,
    pub proposed_at: DateTime<Utc>,
    pub signed_at: DateTime<Utc>,
}

/// Lightweight reference to a confirmed block.
///
/// This is what the consensus layer pushes; the operation list and state
/// mutations are materialized later through the Block Reader.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockHandle {
    pub height: Height,
    pub manifest_hash: Hash,
}

impl BlockHandle {
    pub fn new(height: impl Into<Height>, manifest_hash: impl Into<Hash>) -> Self {
        Self {
            height: height.into(),
            manifest_hash: manifest_hash.into(),
        }
    }
}

/// A fully materialized block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockData {
    /// Self-describing network identifier, checked by the reader.
    pub network_id: String,
    pub manifest: BlockManifest,
    #[serde(default)]
    pub operations: Vec<Operation>,
    #[serde(default)]
    pub state_mutations: Vec<StateMutation>,
    #[serde(default)]
    pub inclusion_proof: InclusionProof,
}

impl BlockData {
    pub fn height(&self) -> Height {
        self.manifest.height
    }

    pub fn handle(&self) -> BlockHandle {
        BlockHandle::new(self.manifest.height, self.manifest.hash.clone())
    }
}

// =============================================================================
// CLUSTER B: EXECUTION
// =============================================================================

/// An operation included in a block proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub fact_hash: Hash,
    pub hash: Hash,
    pub operation_type: String,
    /// Raw operation body, stored verbatim.
    #[serde(default)]
    pub body: serde_json::Value,
}

/// Key/value effect of executing one operation at one height.
///
/// Keys are `:`-delimited: module prefix, qualifying identifiers, kind
/// suffix. The value is decoded by the record projector of the matching
/// module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateMutation {
    pub key: String,
    pub value: serde_json::Value,
    pub height: Height,
    /// Fact hashes of the operations that produced this mutation.
    #[serde(default)]
    pub operations: Vec<Hash>,
}

impl StateMutation {
    pub fn new(key: impl Into<String>, value: serde_json::Value, height: impl Into<Height>) -> Self {
        Self {
            key: key.into(),
            value,
            height: height.into(),
            operations: Vec::new(),
        }
    }
}

// =============================================================================
// CLUSTER C: INCLUSION
// =============================================================================

/// Suffix appended to the key of a node whose operation was not applied.
pub const EXCLUDED_KEY_MARKER: char = '-';

/// One leaf of the fixed-depth operations tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationTreeNode {
    pub index: u64,
    /// Fact hash, followed by [`EXCLUDED_KEY_MARKER`] when `in_state` is false.
    pub key: String,
    pub in_state: bool,
    /// Failure reason for excluded operations.
    #[serde(default)]
    pub reason: Option<String>,
}

impl OperationTreeNode {
    /// Fact hash this node attests, with the exclusion marker stripped.
    pub fn fact_hash(&self) -> Result<&str, EntityError> {
        if self.in_state {
            return Ok(&self.key);
        }

        let mut chars = self.key.char_indices();
        match chars.next_back() {
            Some((last, _)) => Ok(&self.key[..last]),
            None => Err(EntityError::EmptyTreeKey { index: self.index }),
        }
    }
}

/// Inclusion proof for the operations of a block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InclusionProof {
    #[serde(default)]
    pub nodes: Vec<OperationTreeNode>,
}

impl InclusionProof {
    /// Visit nodes in tree order until the visitor returns `false`.
    pub fn traverse<E>(
        &self,
        mut visit: impl FnMut(&OperationTreeNode) -> Result<bool, E>,
    ) -> Result<(), E> {
        for node in &self.nodes {
            if !visit(node)? {
                break;
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

// =============================================================================
// CLUSTER D: VALUES
// =============================================================================

/// Arbitrary-precision non-negative amount, carried as decimal digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Big(String);

impl Big {
    pub fn zero() -> Self {
        Self("0".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Big {
    type Error = EntityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
            return Err(EntityError::InvalidAmount(value));
        }
        Ok(Self(value))
    }
}

impl TryFrom<&str> for Big {
    type Error = EntityError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::try_from(value.to_string())
    }
}

impl From<Big> for String {
    fn from(value: Big) -> Self {
        value.0
    }
}

impl fmt::Display for Big {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(key: &str, in_state: bool) -> OperationTreeNode {
        OperationTreeNode {
            index: 0,
            key: key.to_string(),
            in_state,
            reason: None,
        }
    }

    #[test]
    fn test_height_ordering_and_next() {
        assert!(Height(9) < Height(10));
        assert_eq!(Height(9).next(), Height(10));
        assert_eq!(Height(u64::MAX).next(), Height(u64::MAX));
        assert_eq!(Height::from(42).to_string(), "42");
    }

    #[test]
    fn test_fact_hash_strips_exclusion_marker() {
        assert_eq!(node("FACT1", true).fact_hash().unwrap(), "FACT1");
        assert_eq!(node("FACT1-", false).fact_hash().unwrap(), "FACT1");
    }

    #[test]
    fn test_fact_hash_empty_key_rejected() {
        assert_eq!(
            node("", false).fact_hash(),
            Err(EntityError::EmptyTreeKey { index: 0 })
        );
    }

    #[test]
    fn test_traverse_stops_when_visitor_declines() {
        let proof = InclusionProof {
            nodes: vec![node("A", true), node("B", true), node("C", true)],
        };
        let mut seen = Vec::new();
        proof
            .traverse::<()>(|n| {
                seen.push(n.key.clone());
                Ok(n.key != "B")
            })
            .unwrap();
        assert_eq!(seen, vec!["A", "B"]);
    }

    #[test]
    fn test_big_accepts_digits_only() {
        assert!(Big::try_from("0").is_ok());
        assert!(Big::try_from("123456789012345678901234567890").is_ok());
        assert!(Big::try_from("").is_err());
        assert!(Big::try_from("-1").is_err());
        assert!(Big::try_from("1.5").is_err());
    }

    #[test]
    fn test_big_serde_rejects_garbage() {
        let ok: Big = serde_json::from_value(serde_json::json!("100")).unwrap();
        assert_eq!(ok.as_str(), "100");
        assert!(serde_json::from_value::<Big>(serde_json::json!("abc")).is_err());
    }

    #[test]
    fn test_block_data_deserializes_with_defaults() {
        let block: BlockData = serde_json::from_value(serde_json::json!({
            "network_id": "mitum",
            "manifest": {
                "height": 3,
                "hash": "H3",
                "proposal": "P3",
                "proposed_at": "2024-01-01T00:00:00Z",
                "signed_at": "2024-01-01T00:00:01Z"
            }
        }))
        .unwrap();
        assert_eq!(block.height(), Height(3));
        assert!(block.operations.is_empty());
        assert!(block.inclusion_proof.is_empty());
        assert_eq!(block.handle(), BlockHandle::new(3, "H3"));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn excluded_keys_lose_exactly_one_char(fact in "[A-Za-z0-9]{1,44}") {
                let marked = format!("{fact}{EXCLUDED_KEY_MARKER}");
                let n = node(&marked, false);
                prop_assert_eq!(n.fact_hash().unwrap(), fact.as_str());
            }
        }
    }
}
