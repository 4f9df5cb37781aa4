//! # Record Projection (dg-02)
//!
//! Pure mapping from one state mutation to zero or one typed digest record.
//!
//! ## Dispatch
//!
//! ```text
//! "token:CA1:ADDR:tokenbalance"
//!     │  StateKey::parse (one split)
//!     ↓
//!  prefix "token" ──→ TokenProjector::classify(suffix) ──→ RecordKind::TokenBalance
//!     │  ParsedKey::new (arity check: 4)
//!     ↓
//!  TokenProjector::project ──→ DigestedRecord::TokenBalance(TokenBalanceRecord)
//! ```
//!
//! Modules are tried in registration order ([`ProjectorRegistry::standard`]).
//! Prefixes are disjoint, so at most one module claims a key. Keys nobody
//! claims are skipped.
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement |
//! |-----------|-------------|
//! | Exact arity | `ParsedKey::new` rejects a key whose segment count differs from `RecordKind::arity` with `MalformedKey` |
//! | Typed payloads | Values are decoded into the module's payload type or fail with `DecodeError` |
//! | Height stamping | Every record carries the mutation's height |
//! | Purity | Projectors hold no state and perform no I/O |
//!
//! ## Modules
//!
//! | Prefix | Record kinds |
//! |--------|--------------|
//! | `currency` | Account, ContractAccount, Balance, CurrencyDesign |
//! | `nft` | NftCollection, Nft, NftOperators |
//! | `credential` | CredentialService, CredentialTemplate, Credential, HolderDid |
//! | `timestamp` | TimestampService, TimestampItem |
//! | `token` | TokenDesign, TokenBalance |
//! | `point` | PointDesign, PointBalance |
//! | `dao` | DaoDesign, DaoProposal, DaoDelegators, DaoVoters, DaoVotingPowerBox |
//! | `sto` | StoDesign, StoHolderPartitions, StoHolderPartitionBalance, StoHolderPartitionOperators, StoPartitionBalance, StoOperatorHolders |

pub mod domain;
pub mod projectors;

pub use domain::errors::ProjectionError;
pub use domain::key::{DomainModule, ParsedKey, RecordKind, StateKey};
pub use domain::record::{BlockRecord, DigestedRecord, OperationRecord};
pub use projectors::{DomainProjector, ProjectorRegistry};

pub use projectors::credential::{
    CredentialRecord, CredentialServiceRecord, CredentialTemplateRecord, HolderDidRecord,
};
pub use projectors::currency::{
    AccountRecord, BalanceRecord, ContractAccountRecord, CurrencyDesignRecord,
};
pub use projectors::dao::{
    DaoDelegatorsRecord, DaoDesignRecord, DaoProposalRecord, DaoVotersRecord,
    DaoVotingPowerBoxRecord,
};
pub use projectors::nft::{NftCollectionRecord, NftOperatorsRecord, NftRecord};
pub use projectors::point::{PointBalanceRecord, PointDesignRecord};
pub use projectors::sto::{
    StoDesignRecord, StoHolderPartitionBalanceRecord, StoHolderPartitionOperatorsRecord,
    StoHolderPartitionsRecord, StoOperatorHoldersRecord, StoPartitionBalanceRecord,
};
pub use projectors::timestamp::{TimestampItemRecord, TimestampServiceRecord};
pub use projectors::token::{TokenBalanceRecord, TokenDesignRecord};
