use crate::settings::SettingChange;
use crate::{GovernanceError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use vaultdao_ledger::types::weight_format;
use vaultdao_ledger::{TokenAmount, VoteWeight};
use vaultdao_types::{Address, BlockHeight, LifecycleState};

/// Governance proposal, addressed by its index in the proposal list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    pub status: ProposalStatus,
    #[serde(flatten)]
    pub kind: ProposalKind,
    pub note: String,
    #[serde(with = "weight_format")]
    pub yays: VoteWeight,
    #[serde(with = "weight_format")]
    pub nays: VoteWeight,
    pub voted: Vec<Address>,
    pub start: BlockHeight,
    /// Lock weight of every vault when the proposal was created.
    #[serde(with = "weight_format")]
    pub total_weight: VoteWeight,
}

impl Proposal {
    pub fn new(kind: ProposalKind, note: String, start: BlockHeight, total_weight: VoteWeight) -> Self {
        Self {
            status: ProposalStatus::Active,
            kind,
            note,
            yays: 0,
            nays: 0,
            voted: Vec::new(),
            start,
            total_weight,
        }
    }

    pub fn has_voted(&self, voter: &Address) -> bool {
        self.voted.contains(voter)
    }

    /// First height at which no more votes are accepted.
    pub fn closes_at(&self, vote_length: u64) -> BlockHeight {
        self.start.saturating_add(vote_length)
    }
}

/// Type-specific payload of a proposal, tagged by `type` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ProposalKind {
    Mint {
        recipient: Address,
        qty: TokenAmount,
    },
    MintLocked {
        recipient: Address,
        qty: TokenAmount,
        #[serde(rename = "lockLength")]
        lock_length: u64,
    },
    BurnVault {
        target: Address,
    },
    Set(SettingChange),
    Indicative,
}

impl ProposalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mint { .. } => "mint",
            Self::MintLocked { .. } => "mintLocked",
            Self::BurnVault { .. } => "burnVault",
            Self::Set(_) => "set",
            Self::Indicative => "indicative",
        }
    }

    /// Amount a passing proposal would add to the supply.
    pub fn minted(&self) -> Option<TokenAmount> {
        match self {
            Self::Mint { qty, .. } | Self::MintLocked { qty, .. } => Some(*qty),
            _ => None,
        }
    }
}

/// Proposal lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProposalStatus {
    /// Accepting votes, or waiting to be finalized
    Active,
    /// Participation below the quorum share of total weight
    QuorumFailed,
    /// Support met and effect applied
    Passed,
    /// Support not met, or the effect had nothing to act on
    Failed,
}

impl ProposalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::QuorumFailed => "quorumFailed",
            Self::Passed => "passed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl LifecycleState for ProposalStatus {
    fn is_terminal(&self) -> bool {
        !matches!(self, Self::Active)
    }

    fn can_transition_to(&self, next: &Self) -> bool {
        use ProposalStatus::*;
        match (self, next) {
            (Active, QuorumFailed) | (Active, Passed) | (Active, Failed) => true,
            // A passed burnVault whose target vanished is downgraded.
            (Passed, Failed) => true,
            _ => false,
        }
    }
}

/// Vote direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ballot {
    Yay,
    Nay,
}

impl Ballot {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Yay => "yay",
            Self::Nay => "nay",
        }
    }
}

impl FromStr for Ballot {
    type Err = GovernanceError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "yay" => Ok(Self::Yay),
            "nay" => Ok(Self::Nay),
            other => Err(GovernanceError::InvalidCast(other.to_string())),
        }
    }
}

/// Payload returned by read-only calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryResult {
    Balance { target: Address, balance: TokenAmount },
    Role { target: Address, role: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_proposal_terminal_states() {
        assert!(!ProposalStatus::Active.is_terminal());
        assert!(ProposalStatus::QuorumFailed.is_terminal());
        assert!(ProposalStatus::Passed.is_terminal());
        assert!(ProposalStatus::Failed.is_terminal());
    }

    #[test]
    fn test_proposal_transitions() {
        use ProposalStatus::*;
        assert!(Active.can_transition_to(&Passed));
        assert!(Active.can_transition_to(&QuorumFailed));
        assert!(Passed.can_transition_to(&Failed));
        assert!(!Failed.can_transition_to(&Active));
        assert!(!QuorumFailed.can_transition_to(&Passed));
    }

    #[test]
    fn test_ballot_parsing() {
        assert_eq!("yay".parse::<Ballot>().unwrap(), Ballot::Yay);
        assert_eq!("nay".parse::<Ballot>().unwrap(), Ballot::Nay);
        assert!(matches!(
            "maybe".parse::<Ballot>(),
            Err(GovernanceError::InvalidCast(_))
        ));
    }

    #[test]
    fn test_proposal_wire_shape() {
        let proposal = Proposal::new(
            ProposalKind::MintLocked {
                recipient: Address::new("user"),
                qty: TokenAmount::from_units(100),
                lock_length: 5,
            },
            "Mint 100".into(),
            3,
            500,
        );

        let value = serde_json::to_value(&proposal).unwrap();
        assert_eq!(
            value,
            json!({
                "status": "active",
                "type": "mintLocked",
                "recipient": "user",
                "qty": 100,
                "lockLength": 5,
                "note": "Mint 100",
                "yays": 0,
                "nays": 0,
                "voted": [],
                "start": 3,
                "totalWeight": 500
            })
        );

        let back: Proposal = serde_json::from_value(value).unwrap();
        assert_eq!(back, proposal);
    }

    #[test]
    fn test_set_proposal_wire_shape() {
        let kind = ProposalKind::Set(SettingChange {
            key: "role".into(),
            value: json!("MAIN"),
            recipient: Some(Address::new("admin")),
        });
        let value = serde_json::to_value(&kind).unwrap();
        assert_eq!(
            value,
            json!({"type": "set", "key": "role", "value": "MAIN", "recipient": "admin"})
        );
    }

    #[test]
    fn test_query_result_shape() {
        let result = QueryResult::Balance {
            target: Address::new("admin"),
            balance: TokenAmount::from_units(7),
        };
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({"target": "admin", "balance": 7})
        );
    }
}
