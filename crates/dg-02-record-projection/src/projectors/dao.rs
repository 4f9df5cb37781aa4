//! DAO module: designs, proposals and per-proposal voting state.

use serde::{Deserialize, Serialize};
use shared_types::{Big, Height, StateMutation};

use super::{decode_value, DomainProjector};
use crate::domain::errors::ProjectionError;
use crate::domain::key::{DomainModule, ParsedKey, RecordKind};
use crate::domain::record::DigestedRecord;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaoDesignRecord {
    pub contract: String,
    pub height: Height,
    pub option: String,
    pub policy: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaoProposalRecord {
    pub contract: String,
    pub proposal_id: String,
    pub height: Height,
    pub status: u8,
    pub proposal: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegation {
    pub account: String,
    pub delegatee: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaoDelegatorsRecord {
    pub contract: String,
    pub proposal_id: String,
    pub height: Height,
    pub delegators: Vec<Delegation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voter {
    pub account: String,
    #[serde(default)]
    pub delegators: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaoVotersRecord {
    pub contract: String,
    pub proposal_id: String,
    pub height: Height,
    pub voters: Vec<Voter>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingPower {
    pub account: String,
    #[serde(default)]
    pub voted: bool,
    #[serde(default)]
    pub vote_option: u8,
    pub amount: Big,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaoVotingPowerBoxRecord {
    pub contract: String,
    pub proposal_id: String,
    pub height: Height,
    pub total: Big,
    pub voting_powers: Vec<VotingPower>,
    /// Tally per vote option, keyed by the option number.
    pub result: serde_json::Map<String, serde_json::Value>,
}

#[derive(Deserialize)]
struct DesignValue {
    #[serde(default)]
    option: String,
    #[serde(default)]
    policy: serde_json::Value,
}

#[derive(Deserialize)]
struct ProposalValue {
    status: u8,
    proposal: serde_json::Value,
}

#[derive(Deserialize)]
struct DelegatorsValue {
    #[serde(default)]
    delegators: Vec<Delegation>,
}

#[derive(Deserialize)]
struct VotersValue {
    #[serde(default)]
    voters: Vec<Voter>,
}

#[derive(Deserialize)]
struct VotingPowerBoxValue {
    #[serde(default = "Big::zero")]
    total: Big,
    #[serde(default)]
    voting_powers: Vec<VotingPower>,
    #[serde(default)]
    result: serde_json::Map<String, serde_json::Value>,
}

pub struct DaoProjector;

impl DomainProjector for DaoProjector {
    fn module(&self) -> DomainModule {
        DomainModule::Dao
    }

    fn project(
        &self,
        key: ParsedKey<'_>,
        mutation: &StateMutation,
    ) -> Result<DigestedRecord, ProjectionError> {
        let height = mutation.height;
        let contract = key.identifier(1)?;

        if key.kind() == RecordKind::DaoDesign {
            let value: DesignValue = decode_value(&key, mutation)?;
            return Ok(DaoDesignRecord {
                contract,
                height,
                option: value.option,
                policy: value.policy,
            }
            .into());
        }

        // Everything else is keyed by proposal.
        let proposal_id = key.identifier(2)?;

        let record: DigestedRecord = match key.kind() {
            RecordKind::DaoProposal => {
                let value: ProposalValue = decode_value(&key, mutation)?;
                DaoProposalRecord {
                    contract,
                    proposal_id,
                    height,
                    status: value.status,
                    proposal: value.proposal,
                }
                .into()
            }
            RecordKind::DaoDelegators => {
                let value: DelegatorsValue = decode_value(&key, mutation)?;
                DaoDelegatorsRecord {
                    contract,
                    proposal_id,
                    height,
                    delegators: value.delegators,
                }
                .into()
            }
            RecordKind::DaoVoters => {
                let value: VotersValue = decode_value(&key, mutation)?;
                DaoVotersRecord {
                    contract,
                    proposal_id,
                    height,
                    voters: value.voters,
                }
                .into()
            }
            RecordKind::DaoVotingPowerBox => {
                let value: VotingPowerBoxValue = decode_value(&key, mutation)?;
                DaoVotingPowerBoxRecord {
                    contract,
                    proposal_id,
                    height,
                    total: value.total,
                    voting_powers: value.voting_powers,
                    result: value.result,
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProjectorRegistry;
    use serde_json::json;

    fn project(key: &str, value: serde_json::Value) -> DigestedRecord {
        ProjectorRegistry::standard()
            .project(&StateMutation::new(key, value, Height(21)))
            .unwrap()
            .unwrap()
    }

    #[test]
    fn test_proposal_family_shares_identity() {
        let kinds = [
            ("dao:CA1:P1:proposal", json!({"status": 1, "proposal": {"title": "t"}})),
            ("dao:CA1:P1:delegators", json!({"delegators": [{"account": "A", "delegatee": "B"}]})),
            ("dao:CA1:P1:voters", json!({"voters": [{"account": "B", "delegators": ["A"]}]})),
            (
                "dao:CA1:P1:votingpowerbox",
                json!({"total": "30", "voting_powers": [{"account": "B", "amount": "30"}],
                       "result": {"1": "30"}}),
            ),
        ];

        for (key, value) in kinds {
            let doc = project(key, value).to_document().unwrap();
            assert_eq!(doc["contract"], json!("CA1"), "{key}");
            assert_eq!(doc["proposal_id"], json!("P1"), "{key}");
            assert_eq!(doc["height"], json!(21), "{key}");
        }
    }

    #[test]
    fn test_voting_power_box_fields() {
        match project(
            "dao:CA1:P2:votingpowerbox",
            json!({"total": "10", "voting_powers": [{"account": "X", "voted": true, "vote_option": 2, "amount": "10"}]}),
        ) {
            DigestedRecord::DaoVotingPowerBox(b) => {
                assert_eq!(b.total.as_str(), "10");
                assert!(b.voting_powers[0].voted);
                assert!(b.result.is_empty());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_design() {
        let design = project("dao:CA1:design", json!({"option": "crypto", "policy": {}}));
        assert_eq!(design.kind(), RecordKind::DaoDesign);
    }
}
