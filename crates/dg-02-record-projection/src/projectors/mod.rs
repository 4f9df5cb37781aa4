//! # Domain Projectors
//!
//! One projector per domain module, registered in an explicit ordered list.

pub mod credential;
pub mod currency;
pub mod dao;
pub mod nft;
pub mod point;
pub mod sto;
pub mod timestamp;
pub mod token;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use shared_types::{Big, StateMutation};

use crate::domain::errors::ProjectionError;
use crate::domain::key::{DomainModule, ParsedKey, RecordKind, StateKey};
use crate::domain::record::DigestedRecord;

/// Projector for the keys of one domain module.
pub trait DomainProjector: Send + Sync {
    fn module(&self) -> DomainModule;

    /// First key segment this projector claims.
    fn prefix(&self) -> &'static str {
        self.module().prefix()
    }

    /// Record kind for a key with this module's prefix, `None` for suffixes
    /// the module does not digest.
    fn classify(&self, key: &StateKey<'_>) -> Option<RecordKind> {
        RecordKind::from_suffix(self.module(), key.suffix())
    }

    fn project(
        &self,
        key: ParsedKey<'_>,
        mutation: &StateMutation,
    ) -> Result<DigestedRecord, ProjectionError>;
}

/// Ordered registration list of domain projectors.
pub struct ProjectorRegistry {
    projectors: Vec<Box<dyn DomainProjector>>,
}

impl ProjectorRegistry {
    pub fn empty() -> Self {
        Self {
            projectors: Vec::new(),
        }
    }

    /// Every module this service digests, in the documented order.
    pub fn standard() -> Self {
        Self::empty()
            .register(currency::CurrencyProjector)
            .register(nft::NftProjector)
            .register(credential::CredentialProjector)
            .register(timestamp::TimestampProjector)
            .register(token::TokenProjector)
            .register(point::PointProjector)
            .register(dao::DaoProjector)
            .register(sto::StoProjector)
    }

    pub fn register(mut self, projector: impl DomainProjector + 'static) -> Self {
        self.projectors.push(Box::new(projector));
        self
    }

    pub fn modules(&self) -> Vec<DomainModule> {
        self.projectors.iter().map(|p| p.module()).collect()
    }

    /// Project one mutation. `Ok(None)` when no module claims its key.
    pub fn project(
        &self,
        mutation: &StateMutation,
    ) -> Result<Option<DigestedRecord>, ProjectionError> {
        let key = StateKey::parse(&mutation.key);

        for projector in &self.projectors {
            if key.prefix() != projector.prefix() {
                continue;
            }
            let Some(kind) = projector.classify(&key) else {
                continue;
            };
            let parsed = ParsedKey::new(key, kind)?;
            return projector.project(parsed, mutation).map(Some);
        }

        Ok(None)
    }
}

impl Default for ProjectorRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

/// Decode a mutation value into the payload type of `key`'s kind.
pub(crate) fn decode_value<T: DeserializeOwned>(
    key: &ParsedKey<'_>,
    mutation: &StateMutation,
) -> Result<T, ProjectionError> {
    T::deserialize(&mutation.value).map_err(|source| ProjectionError::DecodeError {
        key: key.raw().to_string(),
        kind: key.kind(),
        source,
    })
}

/// `{ "amount": "<digits>" }`, shared by every balance-like payload.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AmountValue {
    pub amount: Big,
}

/// `{ "<field>": ["addr", ...] }` payloads.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AddressList {
    #[serde(alias = "operators", alias = "holders", alias = "partitions")]
    pub items: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shared_types::Height;

    fn mutation(key: &str, value: serde_json::Value) -> StateMutation {
        StateMutation::new(key, value, Height(10))
    }

    #[test]
    fn test_standard_registry_order() {
        assert_eq!(ProjectorRegistry::standard().modules(), DomainModule::ALL.to_vec());
    }

    #[test]
    fn test_unknown_prefix_and_suffix_are_skipped() {
        let registry = ProjectorRegistry::standard();
        assert!(registry
            .project(&mutation("unknownmodule:x:y", json!({})))
            .unwrap()
            .is_none());
        // Known module, suffix it does not digest.
        assert!(registry
            .project(&mutation("nft:CA1:lastidx", json!({})))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_wrong_arity_is_malformed() {
        let registry = ProjectorRegistry::standard();
        let err = registry
            .project(&mutation("credential:CA1:credential", json!({})))
            .unwrap_err();
        assert!(matches!(
            err,
            ProjectionError::MalformedKey {
                kind: RecordKind::Credential,
                expected: 5,
                actual: 3,
                ..
            }
        ));
    }

    #[test]
    fn test_bad_payload_is_decode_error() {
        let registry = ProjectorRegistry::standard();
        let err = registry
            .project(&mutation(
                "token:CA1:ADDR:tokenbalance",
                json!({"amount": "not-a-number"}),
            ))
            .unwrap_err();
        assert!(matches!(
            err,
            ProjectionError::DecodeError {
                kind: RecordKind::TokenBalance,
                ..
            }
        ));
    }

    #[test]
    fn test_empty_registry_projects_nothing() {
        let registry = ProjectorRegistry::empty();
        assert!(registry
            .project(&mutation("token:CA1:design", json!({})))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_projection_is_deterministic() {
        let registry = ProjectorRegistry::standard();
        let m = mutation("point:CA1:ADDR:pointbalance", json!({"amount": "9"}));
        let a = registry.project(&m).unwrap();
        let b = registry.project(&m).unwrap();
        assert_eq!(a, b);
    }
}
