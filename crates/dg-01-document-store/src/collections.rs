//! Collection names.
//!
//! These are persisted and shared with any deployment reading the same
//! store, so they never change.

pub const BLOCK: &str = "digest_bm";
pub const OPERATION: &str = "digest_op";
pub const CURRENCY: &str = "digest_cr";
pub const ACCOUNT: &str = "digest_ac";
pub const CONTRACT_ACCOUNT: &str = "digest_ca";
pub const BALANCE: &str = "digest_bl";

pub const NFT_COLLECTION: &str = "digest_nftcollection";
pub const NFT: &str = "digest_nft";
pub const NFT_OPERATOR: &str = "digest_nftoperator";

pub const DID_ISSUER: &str = "digest_did_issuer";
pub const DID_CREDENTIAL: &str = "digest_did_credential";
pub const DID_HOLDER_DID: &str = "digest_did_holder_did";
pub const DID_TEMPLATE: &str = "digest_did_template";

pub const TIMESTAMP: &str = "digest_ts";

pub const TOKEN: &str = "digest_token";
pub const TOKEN_BALANCE: &str = "digest_token_bl";
pub const POINT: &str = "digest_point";
pub const POINT_BALANCE: &str = "digest_point_bl";

pub const DAO: &str = "digest_dao";
pub const DAO_PROPOSAL: &str = "digest_dao_proposal";
pub const DAO_DELEGATORS: &str = "digest_dao_delegators";
pub const DAO_VOTERS: &str = "digest_dao_voters";
pub const DAO_VOTING_POWER_BOX: &str = "digest_dao_voting_power_box";

pub const STO: &str = "digest_sto";
pub const STO_HOLDER_PARTITIONS: &str = "digest_sto_holder_partitions";
pub const STO_HOLDER_PARTITION_BALANCE: &str = "digest_sto_holder_partition_balance";
pub const STO_HOLDER_PARTITION_OPERATORS: &str = "digest_sto_holder_partition_operators";
pub const STO_PARTITION_BALANCE: &str = "digest_sto_partition_balance";
pub const STO_OPERATOR_HOLDERS: &str = "digest_sto_operator_holders";

/// Service-internal bookkeeping (the digestion watermark).
pub const INTERNAL: &str = "digest_internal";
