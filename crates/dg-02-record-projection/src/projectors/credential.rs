//! Credential (DID) module: service designs, templates, credentials and
//! holder DID bindings.
//!
//! Credentials are a pre-delete kind, like NFT instances.

use serde::{Deserialize, Serialize};
use shared_types::{Height, StateMutation};

use super::{decode_value, DomainProjector};
use crate::domain::errors::ProjectionError;
use crate::domain::key::{DomainModule, ParsedKey, RecordKind};
use crate::domain::record::DigestedRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialHolder {
    pub address: String,
    #[serde(default)]
    pub credential_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialServiceRecord {
    pub contract: String,
    pub height: Height,
    pub templates: Vec<String>,
    pub holders: Vec<CredentialHolder>,
    pub credential_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialTemplateRecord {
    pub contract: String,
    pub template: String,
    pub height: Height,
    pub template_name: String,
    pub service_date: String,
    pub expiration_date: String,
    pub template_share: bool,
    pub multi_audit: bool,
    pub display_name: String,
    pub subject_key: String,
    pub description: String,
    pub creator: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub contract: String,
    pub template: String,
    pub credential_id: String,
    pub height: Height,
    pub holder: String,
    pub value: String,
    pub valid_from: u64,
    pub valid_until: u64,
    pub did: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HolderDidRecord {
    pub contract: String,
    pub holder: String,
    pub height: Height,
    pub did: String,
}

#[derive(Deserialize)]
struct ServiceDesignValue {
    #[serde(default)]
    templates: Vec<String>,
    #[serde(default)]
    holders: Vec<CredentialHolder>,
    #[serde(default)]
    credential_count: u64,
}

#[derive(Deserialize)]
struct TemplateValue {
    template_name: String,
    #[serde(default)]
    service_date: String,
    #[serde(default)]
    expiration_date: String,
    #[serde(default)]
    template_share: bool,
    #[serde(default)]
    multi_audit: bool,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    subject_key: String,
    #[serde(default)]
    description: String,
    creator: String,
}

#[derive(Deserialize)]
struct CredentialValue {
    holder: String,
    #[serde(default)]
    value: String,
    valid_from: u64,
    valid_until: u64,
    #[serde(default)]
    did: String,
    is_active: bool,
}

#[derive(Deserialize)]
struct HolderDidValue {
    did: String,
}

pub struct CredentialProjector;

impl DomainProjector for CredentialProjector {
    fn module(&self) -> DomainModule {
        DomainModule::Credential
    }

    fn project(
        &self,
        key: ParsedKey<'_>,
        mutation: &StateMutation,
    ) -> Result<DigestedRecord, ProjectionError> {
        let height = mutation.height;
        let contract = key.identifier(1)?;

        let record: DigestedRecord = match key.kind() {
            RecordKind::CredentialService => {
                let value: ServiceDesignValue = decode_value(&key, mutation)?;
                CredentialServiceRecord {
                    contract,
                    height,
                    templates: value.templates,
                    holders: value.holders,
                    credential_count: value.credential_count,
                }
                .into()
            }
            RecordKind::CredentialTemplate => {
                let value: TemplateValue = decode_value(&key, mutation)?;
                CredentialTemplateRecord {
                    contract,
                    template: key.identifier(2)?,
                    height,
                    template_name: value.template_name,
                    service_date: value.service_date,
                    expiration_date: value.expiration_date,
                    template_share: value.template_share,
                    multi_audit: value.multi_audit,
                    display_name: value.display_name,
                    subject_key: value.subject_key,
                    description: value.description,
                    creator: value.creator,
                }
                .into()
            }
            RecordKind::Credential => {
                let value: CredentialValue = decode_value(&key, mutation)?;
                CredentialRecord {
                    contract,
                    template: key.identifier(2)?,
                    credential_id: key.identifier(3)?,
                    height,
                    holder: value.holder,
                    value: value.value,
                    valid_from: value.valid_from,
                    valid_until: value.valid_until,
                    did: value.did,
                    is_active: value.is_active,
                }
                .into()
            }
            RecordKind::HolderDid => {
                let value: HolderDidValue = decode_value(&key, mutation)?;
                HolderDidRecord {
                    contract,
                    holder: key.identifier(2)?,
                    height,
                    did: value.did,
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
