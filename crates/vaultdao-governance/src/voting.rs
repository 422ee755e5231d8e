use crate::settings::Settings;
use crate::types::{Proposal, ProposalStatus};
use tracing::debug;
use vaultdao_ledger::{Vaults, VoteWeight};
use vaultdao_types::{Address, BlockHeight};

/// Decides proposals from lock-weighted tallies.
///
/// Thresholds are compared in binary64 floating point: weights are converted
/// to `f64`, quorum is one multiplication and support one division, each
/// compared with a strict `>`. Every executor reproduces the same bits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VotingEngine {
    quorum: f64,
    support: f64,
}

impl VotingEngine {
    pub fn new(quorum: f64, support: f64) -> Self {
        Self { quorum, support }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.quorum, settings.support)
    }

    /// Weight `voter` may cast on a proposal starting at `proposal_start`.
    pub fn voting_weight(vaults: &Vaults, voter: &Address, proposal_start: BlockHeight) -> VoteWeight {
        vaults.voting_weight(voter, proposal_start)
    }

    /// Participation must reach `quorum × totalWeight`.
    pub fn meets_quorum(&self, total_weight: VoteWeight, yays: VoteWeight, nays: VoteWeight) -> bool {
        let required = total_weight as f64 * self.quorum;
        let participation = yays as f64 + nays as f64;
        !(required > participation)
    }

    /// Yays must exist and either be unopposed or beat `support × nays`.
    pub fn meets_support(&self, yays: VoteWeight, nays: VoteWeight) -> bool {
        yays != 0 && (nays == 0 || (yays as f64 / nays as f64) > self.support)
    }

    /// Outcome of a closed proposal, before its effect is applied.
    pub fn determine_result(&self, proposal: &Proposal) -> ProposalStatus {
        let status = if !self.meets_quorum(proposal.total_weight, proposal.yays, proposal.nays) {
            ProposalStatus::QuorumFailed
        } else if self.meets_support(proposal.yays, proposal.nays) {
            ProposalStatus::Passed
        } else {
            ProposalStatus::Failed
        };

        debug!(
            yays = %proposal.yays,
            nays = %proposal.nays,
            total_weight = %proposal.total_weight,
            quorum = self.quorum,
            support = self.support,
            status = %status,
            "Proposal tally decided"
        );
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProposalKind;

    fn tallied(total_weight: VoteWeight, yays: VoteWeight, nays: VoteWeight) -> Proposal {
        let mut proposal = Proposal::new(ProposalKind::Indicative, String::new(), 0, total_weight);
        proposal.yays = yays;
        proposal.nays = nays;
        proposal
    }

    #[test]
    fn test_quorum_boundary() {
        let engine = VotingEngine::new(0.5, 0.5);
        assert_eq!(
            engine.determine_result(&tallied(1000, 499, 0)),
            ProposalStatus::QuorumFailed
        );
        assert_eq!(
            engine.determine_result(&tallied(1000, 500, 0)),
            ProposalStatus::Passed
        );
    }

    #[test]
    fn test_support_boundary() {
        let engine = VotingEngine::new(0.01, 0.5);
        assert!(engine.meets_support(100, 0));
        assert!(engine.meets_support(100, 100));
        assert!(!engine.meets_support(50, 100));
        assert!(!engine.meets_support(0, 0));
        assert!(!engine.meets_support(0, 100));

        assert_eq!(
            engine.determine_result(&tallied(200, 50, 100)),
            ProposalStatus::Failed
        );
    }

    #[test]
    fn test_no_votes_with_zero_weight_fails_support() {
        // 0 × quorum is not greater than 0, so quorum holds; nobody voted yay.
        let engine = VotingEngine::new(0.5, 0.5);
        assert_eq!(engine.determine_result(&tallied(0, 0, 0)), ProposalStatus::Failed);
    }
}
