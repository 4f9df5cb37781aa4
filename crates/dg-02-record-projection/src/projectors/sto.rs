//! Security token (STO) module: partitioned balances and operator books.

use serde::{Deserialize, Serialize};
use shared_types::{Big, Height, StateMutation};

use super::{decode_value, AddressList, AmountValue, DomainProjector};
use crate::domain::errors::ProjectionError;
use crate::domain::key::{DomainModule, ParsedKey, RecordKind};
use crate::domain::record::DigestedRecord;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoDesignRecord {
    pub contract: String,
    pub height: Height,
    pub granularity: u64,
    pub policy: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoHolderPartitionsRecord {
    pub contract: String,
    pub holder: String,
    pub height: Height,
    pub partitions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoHolderPartitionBalanceRecord {
    pub contract: String,
    pub holder: String,
    pub partition: String,
    pub height: Height,
    pub amount: Big,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoHolderPartitionOperatorsRecord {
    pub contract: String,
    pub holder: String,
    pub partition: String,
    pub height: Height,
    pub operators: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoPartitionBalanceRecord {
    pub contract: String,
    pub partition: String,
    pub height: Height,
    pub amount: Big,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoOperatorHoldersRecord {
    pub contract: String,
    pub operator: String,
    pub height: Height,
    pub holders: Vec<String>,
}

#[derive(Deserialize)]
struct DesignValue {
    granularity: u64,
    #[serde(default)]
    policy: serde_json::Value,
}

pub struct StoProjector;

impl DomainProjector for StoProjector {
    fn module(&self) -> DomainModule {
        DomainModule::Sto
    }

    fn project(
        &self,
        key: ParsedKey<'_>,
        mutation: &StateMutation,
    ) -> Result<DigestedRecord, ProjectionError> {
        let height = mutation.height;
        let contract = key.identifier(1)?;

        let record: DigestedRecord = match key.kind() {
            RecordKind::StoDesign => {
                let value: DesignValue = decode_value(&key, mutation)?;
                StoDesignRecord {
                    contract,
                    height,
                    granularity: value.granularity,
                    policy: value.policy,
                }
                .into()
            }
            RecordKind::StoHolderPartitions => {
                let value: AddressList = decode_value(&key, mutation)?;
                StoHolderPartitionsRecord {
                    contract,
                    holder: key.identifier(2)?,
                    height,
                    partitions: value.items,
                }
                .into()
            }
            RecordKind::StoHolderPartitionBalance => {
                let value: AmountValue = decode_value(&key, mutation)?;
                StoHolderPartitionBalanceRecord {
                    contract,
                    holder: key.identifier(2)?,
                    partition: key.identifier(3)?,
                    height,
                    amount: value.amount,
                }
                .into()
            }
            RecordKind::StoHolderPartitionOperators => {
                let value: AddressList = decode_value(&key, mutation)?;
                StoHolderPartitionOperatorsRecord {
                    contract,
                    holder: key.identifier(2)?,
                    partition: key.identifier(3)?,
                    height,
                    operators: value.items,
                }
                .into()
            }
            RecordKind::StoPartitionBalance => {
                let value: AmountValue = decode_value(&key, mutation)?;
                StoPartitionBalanceRecord {
                    contract,
                    partition: key.identifier(2)?,
                    height,
                    amount: value.amount,
                }
                .into()
            }
            RecordKind::StoOperatorHolders => {
                let value: AddressList = decode_value(&key, mutation)?;
                StoOperatorHoldersRecord {
                    contract,
                    operator: key.identifier(2)?,
                    height,
                    holders: value.items,
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
