//! Fungible token module.

use serde::{Deserialize, Serialize};
use shared_types::{Big, Height, StateMutation};

use super::{decode_value, AmountValue, DomainProjector};
use crate::domain::errors::ProjectionError;
use crate::domain::key::{DomainModule, ParsedKey, RecordKind};
use crate::domain::record::DigestedRecord;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenDesignRecord {
    pub contract: String,
    pub height: Height,
    pub symbol: String,
    pub name: String,
    pub total_supply: Big,
    pub policy: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenBalanceRecord {
    pub contract: String,
    pub address: String,
    pub height: Height,
    pub amount: Big,
}

/// Design payload shared by token and point contracts.
#[derive(Deserialize)]
pub(crate) struct FungibleDesignValue {
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "Big::zero")]
    pub total_supply: Big,
    #[serde(default)]
    pub policy: serde_json::Value,
}

pub struct TokenProjector;

impl DomainProjector for TokenProjector {
    fn module(&self) -> DomainModule {
        DomainModule::Token
    }

    fn project(
        &self,
        key: ParsedKey<'_>,
        mutation: &StateMutation,
    ) -> Result<DigestedRecord, ProjectionError> {
        let record: DigestedRecord = match key.kind() {
            RecordKind::TokenDesign => {
                let value: FungibleDesignValue = decode_value(&key, mutation)?;
                TokenDesignRecord {
                    contract: key.identifier(1)?,
                    height: mutation.height,
                    symbol: value.symbol,
                    name: value.name,
                    total_supply: value.total_supply,
                    policy: value.policy,
                }
                .into()
            }
            RecordKind::TokenBalance => {
                let value: AmountValue = decode_value(&key, mutation)?;
                TokenBalanceRecord {
                    contract: key.identifier(1)?,
                    address: key.identifier(2)?,
                    height: mutation.height,
                    amount: value.amount,
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
