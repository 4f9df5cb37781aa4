//! # State Keys and Record Kinds
//!
//! A state key is `prefix:identifier...:suffix`. The prefix names the domain
//! module, the suffix names the record kind within it, and the identifiers in
//! between are positional. [`RecordKind`] is the closed set of kinds this
//! service digests; everything about a kind (arity, collection, identity
//! fields) is looked up from it.

use std::fmt;

use dg_01_document_store::collections;

use super::errors::ProjectionError;

/// Key delimiter.
pub const DELIMITER: char = ':';

/// Domain modules, in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DomainModule {
    Currency,
    Nft,
    Credential,
    Timestamp,
    Token,
    Point,
    Dao,
    Sto,
}

impl DomainModule {
    pub const ALL: [DomainModule; 8] = [
        DomainModule::Currency,
        DomainModule::Nft,
        DomainModule::Credential,
        DomainModule::Timestamp,
        DomainModule::Token,
        DomainModule::Point,
        DomainModule::Dao,
        DomainModule::Sto,
    ];

    /// First key segment claimed by this module.
    pub const fn prefix(self) -> &'static str {
        match self {
            DomainModule::Currency => "currency",
            DomainModule::Nft => "nft",
            DomainModule::Credential => "credential",
            DomainModule::Timestamp => "timestamp",
            DomainModule::Token => "token",
            DomainModule::Point => "point",
            DomainModule::Dao => "dao",
            DomainModule::Sto => "sto",
        }
    }
}

/// Every record shape the projector can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordKind {
    Account,
    ContractAccount,
    Balance,
    CurrencyDesign,
    NftCollection,
    Nft,
    NftOperators,
    CredentialService,
    CredentialTemplate,
    Credential,
    HolderDid,
    TimestampService,
    TimestampItem,
    TokenDesign,
    TokenBalance,
    PointDesign,
    PointBalance,
    DaoDesign,
    DaoProposal,
    DaoDelegators,
    DaoVoters,
    DaoVotingPowerBox,
    StoDesign,
    StoHolderPartitions,
    StoHolderPartitionBalance,
    StoHolderPartitionOperators,
    StoPartitionBalance,
    StoOperatorHolders,
}

/// Static facts about a record kind.
#[derive(Debug, Clone, Copy)]
pub struct KindSpec {
    pub module: DomainModule,
    pub suffix: &'static str,
    /// Segment count including prefix and suffix.
    pub arity: usize,
    pub collection: &'static str,
    /// Document fields that identify one logical entry, height excluded.
    pub identity: &'static [&'static str],
    /// Superseded entries are deleted at commit instead of kept by height.
    pub pre_delete: bool,
}

const fn spec(
    module: DomainModule,
    suffix: &'static str,
    arity: usize,
    collection: &'static str,
    identity: &'static [&'static str],
) -> KindSpec {
    KindSpec {
        module,
        suffix,
        arity,
        collection,
        identity,
        pre_delete: false,
    }
}

impl RecordKind {
    pub const ALL: [RecordKind; 28] = [
        RecordKind::Account,
        RecordKind::ContractAccount,
        RecordKind::Balance,
        RecordKind::CurrencyDesign,
        RecordKind::NftCollection,
        RecordKind::Nft,
        RecordKind::NftOperators,
        RecordKind::CredentialService,
        RecordKind::CredentialTemplate,
        RecordKind::Credential,
        RecordKind::HolderDid,
        RecordKind::TimestampService,
        RecordKind::TimestampItem,
        RecordKind::TokenDesign,
        RecordKind::TokenBalance,
        RecordKind::PointDesign,
        RecordKind::PointBalance,
        RecordKind::DaoDesign,
        RecordKind::DaoProposal,
        RecordKind::DaoDelegators,
        RecordKind::DaoVoters,
        RecordKind::DaoVotingPowerBox,
        RecordKind::StoDesign,
        RecordKind::StoHolderPartitions,
        RecordKind::StoHolderPartitionBalance,
        RecordKind::StoHolderPartitionOperators,
        RecordKind::StoPartitionBalance,
        RecordKind::StoOperatorHolders,
    ];

    pub const fn spec(self) -> KindSpec {
        use DomainModule::*;

        match self {
            RecordKind::Account => spec(Currency, "account", 3, collections::ACCOUNT, &["address"]),
            RecordKind::ContractAccount => spec(
                Currency,
                "contractaccount",
                3,
                collections::CONTRACT_ACCOUNT,
                &["address"],
            ),
            RecordKind::Balance => spec(
                Currency,
                "balance",
                4,
                collections::BALANCE,
                &["address", "currency"],
            ),
            RecordKind::CurrencyDesign => {
                spec(Currency, "design", 3, collections::CURRENCY, &["currency"])
            }
            RecordKind::NftCollection => {
                spec(Nft, "collection", 3, collections::NFT_COLLECTION, &["contract"])
            }
            RecordKind::Nft => KindSpec {
                pre_delete: true,
                ..spec(Nft, "nft", 4, collections::NFT, &["contract", "nft_id"])
            },
            RecordKind::NftOperators => spec(
                Nft,
                "operators",
                4,
                collections::NFT_OPERATOR,
                &["contract", "address"],
            ),
            RecordKind::CredentialService => {
                spec(Credential, "design", 3, collections::DID_ISSUER, &["contract"])
            }
            RecordKind::CredentialTemplate => spec(
                Credential,
                "template",
                4,
                collections::DID_TEMPLATE,
                &["contract", "template"],
            ),
            RecordKind::Credential => KindSpec {
                pre_delete: true,
                ..spec(
                    Credential,
                    "credential",
                    5,
                    collections::DID_CREDENTIAL,
                    &["contract", "template", "credential_id"],
                )
            },
            RecordKind::HolderDid => spec(
                Credential,
                "holderdid",
                4,
                collections::DID_HOLDER_DID,
                &["contract", "holder"],
            ),
            RecordKind::TimestampService => spec(
                Timestamp,
                "design",
                3,
                collections::TIMESTAMP,
                &["contract", "is_item"],
            ),
            RecordKind::TimestampItem => spec(
                Timestamp,
                "timestampitem",
                5,
                collections::TIMESTAMP,
                &["contract", "project", "timestamp_idx"],
            ),
            RecordKind::TokenDesign => spec(Token, "design", 3, collections::TOKEN, &["contract"]),
            RecordKind::TokenBalance => spec(
                Token,
                "tokenbalance",
                4,
                collections::TOKEN_BALANCE,
                &["contract", "address"],
            ),
            RecordKind::PointDesign => spec(Point, "design", 3, collections::POINT, &["contract"]),
            RecordKind::PointBalance => spec(
                Point,
                "pointbalance",
                4,
                collections::POINT_BALANCE,
                &["contract", "address"],
            ),
            RecordKind::DaoDesign => spec(Dao, "design", 3, collections::DAO, &["contract"]),
            RecordKind::DaoProposal => spec(
                Dao,
                "proposal",
                4,
                collections::DAO_PROPOSAL,
                &["contract", "proposal_id"],
            ),
            RecordKind::DaoDelegators => spec(
                Dao,
                "delegators",
                4,
                collections::DAO_DELEGATORS,
                &["contract", "proposal_id"],
            ),
            RecordKind::DaoVoters => spec(
                Dao,
                "voters",
                4,
                collections::DAO_VOTERS,
                &["contract", "proposal_id"],
            ),
            RecordKind::DaoVotingPowerBox => spec(
                Dao,
                "votingpowerbox",
                4,
                collections::DAO_VOTING_POWER_BOX,
                &["contract", "proposal_id"],
            ),
            RecordKind::StoDesign => spec(Sto, "design", 3, collections::STO, &["contract"]),
            RecordKind::StoHolderPartitions => spec(
                Sto,
                "tokenholderpartitions",
                4,
                collections::STO_HOLDER_PARTITIONS,
                &["contract", "holder"],
            ),
            RecordKind::StoHolderPartitionBalance => spec(
                Sto,
                "tokenholderpartitionbalance",
                5,
                collections::STO_HOLDER_PARTITION_BALANCE,
                &["contract", "holder", "partition"],
            ),
            RecordKind::StoHolderPartitionOperators => spec(
                Sto,
                "tokenholderpartitionoperators",
                5,
                collections::STO_HOLDER_PARTITION_OPERATORS,
                &["contract", "holder", "partition"],
            ),
            RecordKind::StoPartitionBalance => spec(
                Sto,
                "partitionbalance",
                4,
                collections::STO_PARTITION_BALANCE,
                &["contract", "partition"],
            ),
            RecordKind::StoOperatorHolders => spec(
                Sto,
                "operatortokenholders",
                4,
                collections::STO_OPERATOR_HOLDERS,
                &["contract", "operator"],
            ),
        }
    }

    pub const fn module(self) -> DomainModule {
        self.spec().module
    }

    pub const fn suffix(self) -> &'static str {
        self.spec().suffix
    }

    pub const fn arity(self) -> usize {
        self.spec().arity
    }

    pub const fn collection(self) -> &'static str {
        self.spec().collection
    }

    pub const fn identity_fields(self) -> &'static [&'static str] {
        self.spec().identity
    }

    pub const fn is_pre_delete(self) -> bool {
        self.spec().pre_delete
    }

    /// Kind claimed by `module` for `suffix`.
    pub fn from_suffix(module: DomainModule, suffix: &str) -> Option<RecordKind> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.module() == module && kind.suffix() == suffix)
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A key split into segments once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateKey<'a> {
    raw: &'a str,
    segments: Vec<&'a str>,
}

impl<'a> StateKey<'a> {
    pub fn parse(raw: &'a str) -> Self {
        Self {
            raw,
            segments: raw.split(DELIMITER).collect(),
        }
    }

    pub fn raw(&self) -> &'a str {
        self.raw
    }

    pub fn prefix(&self) -> &'a str {
        self.segments.first().copied().unwrap_or_default()
    }

    pub fn suffix(&self) -> &'a str {
        self.segments.last().copied().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }
}

/// A key whose segment count matched its kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedKey<'a> {
    raw: &'a str,
    kind: RecordKind,
    segments: Vec<&'a str>,
}

impl<'a> ParsedKey<'a> {
    pub fn new(key: StateKey<'a>, kind: RecordKind) -> Result<Self, ProjectionError> {
        let expected = kind.arity();
        if key.segments.len() != expected {
            return Err(ProjectionError::MalformedKey {
                key: key.raw.to_string(),
                kind,
                expected,
                actual: key.segments.len(),
            });
        }

        Ok(Self {
            raw: key.raw,
            kind,
            segments: key.segments,
        })
    }

    pub fn raw(&self) -> &'a str {
        self.raw
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    /// Non-empty identifier at `position` (0 is the prefix).
    pub fn identifier(&self, position: usize) -> Result<String, ProjectionError> {
        match self.segments.get(position) {
            Some(s) if !s.is_empty() => Ok((*s).to_string()),
            _ => Err(ProjectionError::InvalidIdentifier {
                key: self.raw.to_string(),
                position,
                reason: "is empty",
            }),
        }
    }

    /// Decimal identifier at `position`.
    pub fn numeric(&self, position: usize) -> Result<u64, ProjectionError> {
        let s = self.identifier(position)?;
        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ProjectionError::InvalidIdentifier {
                key: self.raw.to_string(),
                position,
                reason: "is not a decimal number",
            });
        }
        s.parse().map_err(|_| ProjectionError::InvalidIdentifier {
            key: self.raw.to_string(),
            position,
            reason: "overflows u64",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_state_key_prefix_and_suffix() {
        let key = StateKey::parse("token:CA1:ADDR:tokenbalance");
        assert_eq!(key.prefix(), "token");
        assert_eq!(key.suffix(), "tokenbalance");
        assert_eq!(key.len(), 4);
    }

    #[test]
    fn test_parsed_key_checks_arity() {
        let ok = ParsedKey::new(StateKey::parse("nft:CA1:7:nft"), RecordKind::Nft).unwrap();
        assert_eq!(ok.identifier(1).unwrap(), "CA1");
        assert_eq!(ok.numeric(2).unwrap(), 7);

        let err = ParsedKey::new(StateKey::parse("nft:7:nft"), RecordKind::Nft).unwrap_err();
        match err {
            ProjectionError::MalformedKey {
                expected, actual, ..
            } => {
                assert_eq!(expected, 4);
                assert_eq!(actual, 3);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_identifier_rejects_empty_and_non_numeric() {
        let key = ParsedKey::new(StateKey::parse("nft::x:nft"), RecordKind::Nft).unwrap();
        assert!(key.identifier(1).unwrap_err().is_malformed_key());
        assert!(key.numeric(2).unwrap_err().is_malformed_key());
    }

    #[test]
    fn test_suffixes_unique_within_module() {
        let mut seen = HashSet::new();
        for kind in RecordKind::ALL {
            assert!(
                seen.insert((kind.module(), kind.suffix())),
                "duplicate suffix {} in {:?}",
                kind.suffix(),
                kind.module()
            );
            assert_eq!(RecordKind::from_suffix(kind.module(), kind.suffix()), Some(kind));
        }
    }

    #[test]
    fn test_prefixes_disjoint() {
        let prefixes: HashSet<_> = DomainModule::ALL.iter().map(|m| m.prefix()).collect();
        assert_eq!(prefixes.len(), DomainModule::ALL.len());
    }

    #[test]
    fn test_only_nft_and_credential_pre_delete() {
        let pre_delete: Vec<_> = RecordKind::ALL
            .into_iter()
            .filter(|k| k.is_pre_delete())
            .collect();
        assert_eq!(pre_delete, vec![RecordKind::Nft, RecordKind::Credential]);
    }

    #[test]
    fn test_identity_fields_fit_in_key() {
        for kind in RecordKind::ALL {
            // Identifiers sit between prefix and suffix; the timestamp
            // service adds a flag that is not part of its key.
            let slots = kind.arity() - 2;
            let identity = kind
                .identity_fields()
                .iter()
                .filter(|f| **f != "is_item")
                .count();
            assert_eq!(identity, slots, "{kind}");
        }
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn arity_mismatch_is_always_malformed(
                kind_idx in 0usize..RecordKind::ALL.len(),
                extra in 1usize..4,
                shorter in any::<bool>(),
            ) {
                let kind = RecordKind::ALL[kind_idx];
                let count = if shorter {
                    kind.arity().saturating_sub(extra).max(1)
                } else {
                    kind.arity() + extra
                };
                prop_assume!(count != kind.arity());

                let mut segments = vec![kind.module().prefix().to_string()];
                segments.extend((1..count.saturating_sub(1)).map(|i| format!("id{i}")));
                if count > 1 {
                    segments.push(kind.suffix().to_string());
                }
                let raw = segments.join(":");

                let result = ParsedKey::new(StateKey::parse(&raw), kind);
                let is_malformed = matches!(result, Err(ProjectionError::MalformedKey { .. }));
                prop_assert!(is_malformed);
            }
        }
    }
}
