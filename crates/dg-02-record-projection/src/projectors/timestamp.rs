//! Timestamp module.
//!
//! Service designs and timestamp items share one collection; `is_item`
//! tells them apart.

use serde::{Deserialize, Serialize};
use shared_types::{Height, StateMutation};

use super::{decode_value, DomainProjector};
use crate::domain::errors::ProjectionError;
use crate::domain::key::{DomainModule, ParsedKey, RecordKind};
use crate::domain::record::DigestedRecord;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimestampServiceRecord {
    pub contract: String,
    pub height: Height,
    pub projects: Vec<String>,
    pub is_item: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimestampItemRecord {
    pub contract: String,
    pub project: String,
    pub timestamp_idx: u64,
    pub height: Height,
    pub request_timestamp: u64,
    pub response_timestamp: u64,
    pub data: String,
    pub is_item: bool,
}

#[derive(Deserialize)]
struct ServiceDesignValue {
    #[serde(default)]
    projects: Vec<String>,
}

#[derive(Deserialize)]
struct ItemValue {
    request_timestamp: u64,
    response_timestamp: u64,
    #[serde(default)]
    data: String,
}

pub struct TimestampProjector;

impl DomainProjector for TimestampProjector {
    fn module(&self) -> DomainModule {
        DomainModule::Timestamp
    }

    fn project(
        &self,
        key: ParsedKey<'_>,
        mutation: &StateMutation,
    ) -> Result<DigestedRecord, ProjectionError> {
        let record: DigestedRecord = match key.kind() {
            RecordKind::TimestampService => {
                let value: ServiceDesignValue = decode_value(&key, mutation)?;
                TimestampServiceRecord {
                    contract: key.identifier(1)?,
                    height: mutation.height,
                    projects: value.projects,
                    is_item: false,
                }
                .into()
            }
            RecordKind::TimestampItem => {
                let value: ItemValue = decode_value(&key, mutation)?;
                TimestampItemRecord {
                    contract: key.identifier(1)?,
                    project: key.identifier(2)?,
                    timestamp_idx: key.numeric(3)?,
                    height: mutation.height,
                    request_timestamp: value.request_timestamp,
                    response_timestamp: value.response_timestamp,
                    data: value.data,
                    is_item: true,
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
