//! Currency module: accounts, contract-account flags, balances, currency
//! designs.

use serde::{Deserialize, Serialize};
use shared_types::{Big, Height, StateMutation};

use super::{decode_value, AmountValue, DomainProjector};
use crate::domain::errors::ProjectionError;
use crate::domain::key::{DomainModule, ParsedKey, RecordKind};
use crate::domain::record::DigestedRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountKey {
    pub key: String,
    pub weight: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub address: String,
    pub height: Height,
    pub keys: Vec<AccountKey>,
    pub threshold: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractAccountRecord {
    pub address: String,
    pub height: Height,
    pub owner: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceRecord {
    pub address: String,
    pub currency: String,
    pub height: Height,
    pub amount: Big,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyDesignRecord {
    pub currency: String,
    pub height: Height,
    pub genesis_account: Option<String>,
    pub total_supply: Big,
    pub policy: serde_json::Value,
}

#[derive(Deserialize)]
struct AccountValue {
    #[serde(default)]
    keys: Vec<AccountKey>,
    #[serde(default)]
    threshold: u32,
}

#[derive(Deserialize)]
struct ContractAccountValue {
    owner: String,
    #[serde(default)]
    is_active: bool,
}

#[derive(Deserialize)]
struct CurrencyDesignValue {
    #[serde(default)]
    genesis_account: Option<String>,
    total_supply: Big,
    #[serde(default)]
    policy: serde_json::Value,
}

pub struct CurrencyProjector;

impl DomainProjector for CurrencyProjector {
    fn module(&self) -> DomainModule {
        DomainModule::Currency
    }

    fn project(
        &self,
        key: ParsedKey<'_>,
        mutation: &StateMutation,
    ) -> Result<DigestedRecord, ProjectionError> {
        let height = mutation.height;

        let record: DigestedRecord = match key.kind() {
            RecordKind::Account => {
                let value: AccountValue = decode_value(&key, mutation)?;
                AccountRecord {
                    address: key.identifier(1)?,
                    height,
                    keys: value.keys,
                    threshold: value.threshold,
                }
                .into()
            }
            RecordKind::ContractAccount => {
                let value: ContractAccountValue = decode_value(&key, mutation)?;
                ContractAccountRecord {
                    address: key.identifier(1)?,
                    height,
                    owner: value.owner,
                    is_active: value.is_active,
                }
                .into()
            }
            RecordKind::Balance => {
                let value: AmountValue = decode_value(&key, mutation)?;
                BalanceRecord {
                    address: key.identifier(1)?,
                    currency: key.identifier(2)?,
                    height,
                    amount: value.amount,
                }
                .into()
            }
            RecordKind::CurrencyDesign => {
                let value: CurrencyDesignValue = decode_value(&key, mutation)?;
                CurrencyDesignRecord {
                    currency: key.identifier(1)?,
                    height,
                    genesis_account: value.genesis_account,
                    total_supply: value.total_supply,
                    policy: value.policy,
                }
                .into()
            }
            kind => return Err(ProjectionError::ForeignKind {
                module: self.module(),
                kind,
            }),
        };

        Ok(record)
    }
}
