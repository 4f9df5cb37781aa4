//! Point module. Same shapes as the token module under its own prefix.

use serde::{Deserialize, Serialize};
use shared_types::{Big, Height, StateMutation};

use super::token::FungibleDesignValue;
use super::{decode_value, AmountValue, DomainProjector};
use crate::domain::errors::ProjectionError;
use crate::domain::key::{DomainModule, ParsedKey, RecordKind};
use crate::domain::record::DigestedRecord;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointDesignRecord {
    pub contract: String,
    pub height: Height,
    pub symbol: String,
    pub name: String,
    pub total_supply: Big,
    pub policy: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointBalanceRecord {
    pub contract: String,
    pub address: String,
    pub height: Height,
    pub amount: Big,
}

pub struct PointProjector;

impl DomainProjector for PointProjector {
    fn module(&self) -> DomainModule {
        DomainModule::Point
    }

    fn project(
        &self,
        key: ParsedKey<'_>,
        mutation: &StateMutation,
    ) -> Result<DigestedRecord, ProjectionError> {
        let record: DigestedRecord = match key.kind() {
            RecordKind::PointDesign => {
                let value: FungibleDesignValue = decode_value(&key, mutation)?;
                PointDesignRecord {
                    contract: key.identifier(1)?,
                    height: mutation.height,
                    symbol: value.symbol,
                    name: value.name,
                    total_supply: value.total_supply,
                    policy: value.policy,
                }
                .into()
            }
            RecordKind::PointBalance => {
                let value: AmountValue = decode_value(&key, mutation)?;
                PointBalanceRecord {
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
