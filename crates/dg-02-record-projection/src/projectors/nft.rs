//! NFT module: collection designs, NFT instances, operator books.
//!
//! NFT instances are a pre-delete kind: the collection's membership, not
//! just its values, changes per height.

use serde::{Deserialize, Serialize};
use shared_types::{Height, StateMutation};

use super::{decode_value, AddressList, DomainProjector};
use crate::domain::errors::ProjectionError;
use crate::domain::key::{DomainModule, ParsedKey, RecordKind};
use crate::domain::record::DigestedRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NftSigner {
    pub account: String,
    pub share: u32,
    #[serde(default)]
    pub signed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NftCollectionRecord {
    pub contract: String,
    pub height: Height,
    pub name: String,
    pub creator: String,
    pub royalty: u32,
    pub uri: String,
    pub whitelist: Vec<String>,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NftRecord {
    pub contract: String,
    pub nft_id: u64,
    pub height: Height,
    pub owner: String,
    pub hash: String,
    pub uri: String,
    pub approved: Option<String>,
    pub creators: Vec<NftSigner>,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NftOperatorsRecord {
    pub contract: String,
    pub address: String,
    pub height: Height,
    pub operators: Vec<String>,
}

#[derive(Deserialize)]
struct CollectionDesignValue {
    name: String,
    creator: String,
    #[serde(default)]
    royalty: u32,
    #[serde(default)]
    uri: String,
    #[serde(default)]
    whitelist: Vec<String>,
    #[serde(default = "active_by_default")]
    active: bool,
}

#[derive(Deserialize)]
struct NftValue {
    owner: String,
    #[serde(default)]
    hash: String,
    #[serde(default)]
    uri: String,
    #[serde(default)]
    approved: Option<String>,
    #[serde(default)]
    creators: Vec<NftSigner>,
    #[serde(default = "active_by_default")]
    active: bool,
}

fn active_by_default() -> bool {
    true
}

pub struct NftProjector;

impl DomainProjector for NftProjector {
    fn module(&self) -> DomainModule {
        DomainModule::Nft
    }

    fn project(
        &self,
        key: ParsedKey<'_>,
        mutation: &StateMutation,
    ) -> Result<DigestedRecord, ProjectionError> {
        let height = mutation.height;

        let record: DigestedRecord = match key.kind() {
            RecordKind::NftCollection => {
                let value: CollectionDesignValue = decode_value(&key, mutation)?;
                NftCollectionRecord {
                    contract: key.identifier(1)?,
                    height,
                    name: value.name,
                    creator: value.creator,
                    royalty: value.royalty,
                    uri: value.uri,
                    whitelist: value.whitelist,
                    active: value.active,
                }
                .into()
            }
            RecordKind::Nft => {
                let value: NftValue = decode_value(&key, mutation)?;
                NftRecord {
                    contract: key.identifier(1)?,
                    nft_id: key.numeric(2)?,
                    height,
                    owner: value.owner,
                    hash: value.hash,
                    uri: value.uri,
                    approved: value.approved,
                    creators: value.creators,
                    active: value.active,
                }
                .into()
            }
            RecordKind::NftOperators => {
                let value: AddressList = decode_value(&key, mutation)?;
                NftOperatorsRecord {
                    contract: key.identifier(1)?,
                    address: key.identifier(2)?,
                    height,
                    operators: value.items,
                }
                .into()
            }
            kind => {
                return Err(ProjectionError::ForeignKind {
                    module: self.module(),
                    kind,
                })
            }
        };

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProjectorRegistry;
    use serde_json::json;

    fn project(key: &str, value: serde_json::Value) -> Result<Option<DigestedRecord>, ProjectionError> {
        ProjectorRegistry::standard().project(&StateMutation::new(key, value, Height(11)))
    }

    #[test]
    fn test_nft_instance() {
        let record = project(
            "nft:CA1:42:nft",
            json!({"owner": "ADDR1", "hash": "h", "uri": "ipfs://x",
                   "creators": [{"account": "ADDR9", "share": 10}]}),
        )
        .unwrap()
        .unwrap();

        match record {
            DigestedRecord::Nft(nft) => {
                assert_eq!(nft.contract, "CA1");
                assert_eq!(nft.nft_id, 42);
                assert_eq!(nft.owner, "ADDR1");
                assert!(nft.active);
                assert_eq!(nft.creators.len(), 1);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_non_numeric_nft_id_is_malformed() {
        let err = project("nft:CA1:abc:nft", json!({"owner": "A"})).unwrap_err();
        assert!(err.is_malformed_key());
    }

    #[test]
    fn test_collection_and_operators() {
        let design = project(
            "nft:CA1:collection",
            json!({"name": "Apes", "creator": "ADDR1", "royalty": 5}),
        )
        .unwrap()
        .unwrap();
        assert_eq!(design.kind(), RecordKind::NftCollection);

        let ops = project(
            "nft:CA1:ADDR1:operators",
            json!({"operators": ["ADDR2", "ADDR3"]}),
        )
        .unwrap()
        .unwrap();
        match ops {
            DigestedRecord::NftOperators(o) => assert_eq!(o.operators, vec!["ADDR2", "ADDR3"]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_missing_owner_is_decode_error() {
        let err = project("nft:CA1:1:nft", json!({"uri": "x"})).unwrap_err();
        assert!(matches!(err, ProjectionError::DecodeError { .. }));
    }
}
