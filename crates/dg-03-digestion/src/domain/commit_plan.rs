//! # Commit Plan
//!
//! The order in which a batch session writes its collections. The store
//! enforces no references between collections; the order is a fixed wire
//! contract that readers of a live store observe while a height commits.

use dg_01_document_store::collections;
use dg_02_record_projection::RecordKind;

/// Where the documents of a commit step come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepSource {
    Block,
    Operations,
    /// Buckets of these kinds, concatenated in this order.
    Records(&'static [RecordKind]),
}

/// One collection write of a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitStep {
    pub collection: &'static str,
    pub source: StepSource,
}

impl CommitStep {
    const fn block() -> Self {
        Self {
            collection: collections::BLOCK,
            source: StepSource::Block,
        }
    }

    const fn operations() -> Self {
        Self {
            collection: collections::OPERATION,
            source: StepSource::Operations,
        }
    }

    const fn records(kinds: &'static [RecordKind]) -> Self {
        Self {
            collection: kinds[0].collection(),
            source: StepSource::Records(kinds),
        }
    }

    /// Kinds this step writes. Empty for the block and operation steps.
    pub fn kinds(&self) -> &'static [RecordKind] {
        match self.source {
            StepSource::Records(kinds) => kinds,
            _ => &[],
        }
    }

    /// Superseded entries are deleted before the step inserts.
    pub fn is_pre_delete(&self) -> bool {
        self.kinds().iter().any(|k| k.is_pre_delete())
    }
}

use RecordKind::*;

/// Collection write order of every commit.
pub const COMMIT_PLAN: &[CommitStep] = &[
    CommitStep::block(),
    CommitStep::operations(),
    CommitStep::records(&[CurrencyDesign]),
    CommitStep::records(&[Account]),
    CommitStep::records(&[ContractAccount]),
    CommitStep::records(&[NftCollection]),
    CommitStep::records(&[Nft]),
    CommitStep::records(&[NftOperators]),
    CommitStep::records(&[Balance]),
    CommitStep::records(&[CredentialService]),
    CommitStep::records(&[Credential]),
    CommitStep::records(&[HolderDid]),
    CommitStep::records(&[CredentialTemplate]),
    CommitStep::records(&[TimestampService, TimestampItem]),
    CommitStep::records(&[TokenDesign]),
    CommitStep::records(&[TokenBalance]),
    CommitStep::records(&[PointDesign]),
    CommitStep::records(&[PointBalance]),
    CommitStep::records(&[DaoDesign]),
    CommitStep::records(&[DaoProposal]),
    CommitStep::records(&[DaoDelegators]),
    CommitStep::records(&[DaoVoters]),
    CommitStep::records(&[DaoVotingPowerBox]),
    CommitStep::records(&[StoDesign]),
    CommitStep::records(&[StoHolderPartitions]),
    CommitStep::records(&[StoHolderPartitionBalance]),
    CommitStep::records(&[StoHolderPartitionOperators]),
    CommitStep::records(&[StoPartitionBalance]),
    CommitStep::records(&[StoOperatorHolders]),
];

/// Collection names in commit order.
pub fn commit_order() -> Vec<&'static str> {
    COMMIT_PLAN.iter().map(|step| step.collection).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_every_kind_committed_exactly_once() {
        let planned: Vec<RecordKind> = COMMIT_PLAN
            .iter()
            .flat_map(|step| step.kinds().iter().copied())
            .collect();
        assert_eq!(planned.len(), RecordKind::ALL.len());

        let unique: HashSet<_> = planned.iter().collect();
        assert_eq!(unique.len(), RecordKind::ALL.len());
    }

    #[test]
    fn test_step_kinds_share_collection() {
        for step in COMMIT_PLAN {
            for kind in step.kinds() {
                assert_eq!(kind.collection(), step.collection, "{kind}");
            }
        }
    }

    #[test]
    fn test_block_then_operations_first() {
        let order = commit_order();
        assert_eq!(order[0], collections::BLOCK);
        assert_eq!(order[1], collections::OPERATION);
    }

    #[test]
    fn test_collections_not_repeated() {
        let order = commit_order();
        let unique: HashSet<_> = order.iter().collect();
        assert_eq!(unique.len(), order.len());
    }

    #[test]
    fn test_pre_delete_steps() {
        let pre: Vec<_> = COMMIT_PLAN
            .iter()
            .filter(|s| s.is_pre_delete())
            .map(|s| s.collection)
            .collect();
        assert_eq!(pre, vec![collections::NFT, collections::DID_CREDENTIAL]);
    }
}
