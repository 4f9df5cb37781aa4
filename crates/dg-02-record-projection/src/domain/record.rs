//! # Digest Records
//!
//! Records are append-only facts stamped with the height that produced
//! them. The "current value" of an entry is the record with the greatest
//! height among those sharing its identity fields.

use chrono::{DateTime, Utc};
use dg_01_document_store::domain::document::encode;
use dg_01_document_store::{collections, Document, StoreResult};
use serde::{Deserialize, Serialize};
use shared_types::{BlockManifest, Hash, Height, Operation};

use super::key::RecordKind;
use crate::projectors::credential::{
    CredentialRecord, CredentialServiceRecord, CredentialTemplateRecord, HolderDidRecord,
};
use crate::projectors::currency::{
    AccountRecord, BalanceRecord, ContractAccountRecord, CurrencyDesignRecord,
};
use crate::projectors::dao::{
    DaoDelegatorsRecord, DaoDesignRecord, DaoProposalRecord, DaoVotersRecord,
    DaoVotingPowerBoxRecord,
};
use crate::projectors::nft::{NftCollectionRecord, NftOperatorsRecord, NftRecord};
use crate::projectors::point::{PointBalanceRecord, PointDesignRecord};
use crate::projectors::sto::{
    StoDesignRecord, StoHolderPartitionBalanceRecord, StoHolderPartitionOperatorsRecord,
    StoHolderPartitionsRecord, StoOperatorHoldersRecord, StoPartitionBalanceRecord,
};
use crate::projectors::timestamp::{TimestampItemRecord, TimestampServiceRecord};
use crate::projectors::token::{TokenBalanceRecord, TokenDesignRecord};

/// One digested block manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockRecord {
    pub height: Height,
    pub hash: Hash,
    pub previous: Option<Hash>,
    pub proposal: Hash,
    pub operations_tree: Option<Hash>,
    pub states_tree: Option<Hash>,
    pub suffrage: Option<Hash>,
    pub proposed_at: DateTime<Utc>,
    pub signed_at: DateTime<Utc>,
    /// Number of operations in the block.
    pub operations: u64,
}

impl BlockRecord {
    pub fn from_manifest(manifest: &BlockManifest, operations: usize) -> Self {
        Self {
            height: manifest.height,
            hash: manifest.hash.clone(),
            previous: manifest.previous.clone(),
            proposal: manifest.proposal.clone(),
            operations_tree: manifest.operations_tree.clone(),
            states_tree: manifest.states_tree.clone(),
            suffrage: manifest.suffrage.clone(),
            proposed_at: manifest.proposed_at,
            signed_at: manifest.signed_at,
            operations: operations as u64,
        }
    }

    pub fn to_document(&self) -> StoreResult<Document> {
        encode(collections::BLOCK, self)
    }
}

/// One operation of a digested block, with its inclusion outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationRecord {
    pub fact_hash: Hash,
    pub hash: Hash,
    pub operation_type: String,
    pub height: Height,
    /// Position of the operation within the block.
    pub index: u64,
    pub in_state: bool,
    pub reason: Option<String>,
    pub body: serde_json::Value,
    pub confirmed_at: DateTime<Utc>,
}

impl OperationRecord {
    pub fn new(
        operation: &Operation,
        height: Height,
        index: u64,
        in_state: bool,
        reason: Option<String>,
        confirmed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            fact_hash: operation.fact_hash.clone(),
            hash: operation.hash.clone(),
            operation_type: operation.operation_type.clone(),
            height,
            index,
            in_state,
            reason,
            body: operation.body.clone(),
            confirmed_at,
        }
    }

    pub fn to_document(&self) -> StoreResult<Document> {
        encode(collections::OPERATION, self)
    }
}

// Variant names match `RecordKind` one to one.
macro_rules! digested_records {
    ($($variant:ident($record:ty)),+ $(,)?) => {
        /// Output of projecting one state mutation.
        #[derive(Debug, Clone, PartialEq, Serialize)]
        #[serde(untagged)]
        pub enum DigestedRecord {
            $($variant($record)),+
        }

        impl DigestedRecord {
            pub fn kind(&self) -> RecordKind {
                match self {
                    $(Self::$variant(_) => RecordKind::$variant),+
                }
            }

            pub fn height(&self) -> Height {
                match self {
                    $(Self::$variant(r) => r.height),+
                }
            }
        }

        $(
            impl From<$record> for DigestedRecord {
                fn from(record: $record) -> Self {
                    Self::$variant(record)
                }
            }
        )+
    };
}

digested_records! {
    Account(AccountRecord),
    ContractAccount(ContractAccountRecord),
    Balance(BalanceRecord),
    CurrencyDesign(CurrencyDesignRecord),
    NftCollection(NftCollectionRecord),
    Nft(NftRecord),
    NftOperators(NftOperatorsRecord),
    CredentialService(CredentialServiceRecord),
    CredentialTemplate(CredentialTemplateRecord),
    Credential(CredentialRecord),
    HolderDid(HolderDidRecord),
    TimestampService(TimestampServiceRecord),
    TimestampItem(TimestampItemRecord),
    TokenDesign(TokenDesignRecord),
    TokenBalance(TokenBalanceRecord),
    PointDesign(PointDesignRecord),
    PointBalance(PointBalanceRecord),
    DaoDesign(DaoDesignRecord),
    DaoProposal(DaoProposalRecord),
    DaoDelegators(DaoDelegatorsRecord),
    DaoVoters(DaoVotersRecord),
    DaoVotingPowerBox(DaoVotingPowerBoxRecord),
    StoDesign(StoDesignRecord),
    StoHolderPartitions(StoHolderPartitionsRecord),
    StoHolderPartitionBalance(StoHolderPartitionBalanceRecord),
    StoHolderPartitionOperators(StoHolderPartitionOperatorsRecord),
    StoPartitionBalance(StoPartitionBalanceRecord),
    StoOperatorHolders(StoOperatorHoldersRecord),
}

impl DigestedRecord {
    pub fn collection(&self) -> &'static str {
        self.kind().collection()
    }

    /// Flat document: identity fields, `height`, payload fields.
    pub fn to_document(&self) -> StoreResult<Document> {
        encode(self.collection(), self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shared_types::Big;

    fn manifest() -> BlockManifest {
        BlockManifest {
            height: Height(12),
            hash: "H12".into(),
            previous: Some("H11".into()),
            proposal: "P12".into(),
            operations_tree: None,
            states_tree: None,
            suffrage: None,
            proposed_at: "2024-05-01T00:00:00Z".parse().unwrap(),
            signed_at: "2024-05-01T00:00:02Z".parse().unwrap(),
        }
    }

    #[test]
    fn test_block_record_document() {
        let doc = BlockRecord::from_manifest(&manifest(), 3).to_document().unwrap();
        assert_eq!(doc["height"], json!(12));
        assert_eq!(doc["hash"], json!("H12"));
        assert_eq!(doc["operations"], json!(3));
    }

    #[test]
    fn test_digested_record_flattens_into_document() {
        let record: DigestedRecord = TokenBalanceRecord {
            contract: "CA1".into(),
            address: "ADDR".into(),
            height: Height(4),
            amount: Big::try_from("250").unwrap(),
        }
        .into();

        assert_eq!(record.kind(), RecordKind::TokenBalance);
        assert_eq!(record.height(), Height(4));
        assert_eq!(record.collection(), collections::TOKEN_BALANCE);

        let doc = record.to_document().unwrap();
        assert_eq!(doc["contract"], json!("CA1"));
        assert_eq!(doc["address"], json!("ADDR"));
        assert_eq!(doc["height"], json!(4));
        assert_eq!(doc["amount"], json!("250"));
    }
}
