//! Proposal lifecycle: creation, voting and finalization.
//!
//! Each function validates completely before its first write to `state`, so
//! an `Err` always means the state was not touched.

use crate::call::{as_integer, is_truthy, ProposalInput};
use crate::metrics;
use crate::settings::coerce_number;
use crate::state::DaoState;
use crate::types::{Ballot, Proposal, ProposalKind, ProposalStatus};
use crate::voting::VotingEngine;
use crate::{ErrorKind, GovernanceError, Result};
use serde_json::Value;
use tracing::{debug, info};
use vaultdao_ledger::{LedgerError, TokenAmount, VaultEntry};
use vaultdao_types::{Address, BlockHeight, LifecycleState, MAX_SAFE_INTEGER};

/// Create a proposal. Returns its id.
pub fn propose(
    state: &mut DaoState,
    caller: &Address,
    input: &ProposalInput,
    height: BlockHeight,
) -> Result<u64> {
    let note = match &input.note {
        Some(Value::String(note)) => note.clone(),
        _ => return Err(GovernanceError::InvalidNote),
    };

    if !state.vault.has_vault(caller) {
        return Err(GovernanceError::NotEligible(caller.clone()));
    }
    if !state.vault.has_locked_balance(caller) {
        return Err(GovernanceError::NoLockedBalance(caller.clone()));
    }

    let total_weight = state.vault.total_weight();
    let kind = validate_kind(state, input)?;

    let proposal = Proposal::new(kind, note, height, total_weight);
    let type_name = proposal.kind.as_str();
    state.votes.push(proposal);
    let id = (state.votes.len() - 1) as u64;

    metrics::PROPOSALS_CREATED.with_label_values(&[type_name]).inc();
    info!(
        id,
        proposer = caller.short(),
        proposal_type = type_name,
        start = height,
        total_weight = %total_weight,
        "📜 Proposal created"
    );
    Ok(id)
}

fn validate_kind(state: &DaoState, input: &ProposalInput) -> Result<ProposalKind> {
    let proposal_type = match &input.proposal_type {
        Some(Value::String(t)) => t.as_str(),
        Some(other) => return Err(GovernanceError::UnknownVoteType(other.to_string())),
        None => return Err(GovernanceError::UnknownVoteType("undefined".to_string())),
    };

    match proposal_type {
        "mint" | "mintLocked" => {
            let recipient = recipient(input.recipient.as_ref())?
                .ok_or(GovernanceError::MissingRecipient)?;
            let qty = mint_quantity(state, input.qty.as_ref())?;
            let lock_length = mint_lock_length(state, input.lock_length.as_ref())?;

            Ok(if proposal_type == "mint" {
                ProposalKind::Mint { recipient, qty }
            } else {
                ProposalKind::MintLocked {
                    recipient,
                    qty,
                    lock_length,
                }
            })
        }
        "burnVault" => match &input.target {
            Some(Value::String(t)) if !t.is_empty() => Ok(ProposalKind::BurnVault {
                target: Address::new(t.as_str()),
            }),
            _ => Err(LedgerError::InvalidTarget("target is required".to_string()).into()),
        },
        "set" => {
            let key = match &input.key {
                Some(Value::String(key)) => key.as_str(),
                other => {
                    return Err(GovernanceError::InvalidSetting {
                        key: other.as_ref().map(Value::to_string).unwrap_or_default(),
                        reason: "data type of key not supported".to_string(),
                    })
                }
            };
            // Only role assignments read the recipient.
            let recipient = if key == "role" {
                recipient(input.recipient.as_ref())?
            } else {
                None
            };
            let change =
                state
                    .settings
                    .validate_change(key, input.value.as_ref(), recipient.as_ref())?;
            Ok(ProposalKind::Set(change))
        }
        "indicative" => Ok(ProposalKind::Indicative),
        other => Err(GovernanceError::UnknownVoteType(other.to_string())),
    }
}

/// Falsy recipients are absent; present ones must be addresses.
fn recipient(value: Option<&Value>) -> Result<Option<Address>> {
    match value {
        Some(v) if !is_truthy(v) => Ok(None),
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(Address::new(s.as_str()))),
        Some(other) => Err(GovernanceError::invalid_field(
            "recipient",
            other,
            ErrorKind::InvalidInput,
        )),
    }
}

fn mint_quantity(state: &DaoState, value: Option<&Value>) -> Result<TokenAmount> {
    let raw = value.cloned().unwrap_or(Value::Null);
    // An absent quantity is not a number; an explicit null coerces to zero.
    let qty = value.and_then(coerce_number).unwrap_or(f64::NAN);

    if !(qty.is_finite() && qty.fract() == 0.0 && qty > 0.0) {
        return Err(GovernanceError::invalid_field("qty", &raw, ErrorKind::InvalidAmount));
    }

    let supply = state.total_supply()?;
    if qty > MAX_SAFE_INTEGER as f64 {
        return Err(LedgerError::QuantityTooLarge {
            supply: supply.units(),
            qty: qty as u64,
            max: MAX_SAFE_INTEGER,
        }
        .into());
    }

    let amount = TokenAmount::from_units(qty as u64);
    state.supply_metrics()?.ensure_mintable(amount)?;
    Ok(amount)
}

/// A given lock length must be an in-range integer; none means the minimum.
fn mint_lock_length(state: &DaoState, value: Option<&Value>) -> Result<u64> {
    let bounds = state.settings.lock_bounds();
    match value {
        Some(v) if is_truthy(v) => {
            let length = as_integer(v).ok_or_else(|| {
                GovernanceError::invalid_field("lockLength", v, ErrorKind::LockLengthOutOfRange)
            })?;
            Ok(bounds.check(length)?)
        }
        _ => Ok(bounds.min),
    }
}

/// Cast the caller's lock weight on a proposal.
pub fn vote(
    state: &mut DaoState,
    caller: &Address,
    id: u64,
    cast: &str,
    height: BlockHeight,
) -> Result<Ballot> {
    let vote_length = state.settings.vote_length;
    let proposal = state.proposal(id)?;

    let weight = VotingEngine::voting_weight(&state.vault, caller, proposal.start);
    if weight == 0 {
        return Err(GovernanceError::NoVotingWeight {
            id,
            voter: caller.clone(),
        });
    }

    if proposal.has_voted(caller) {
        return Err(GovernanceError::AlreadyVoted(caller.clone()));
    }

    let closed_at = proposal.closes_at(vote_length);
    if height >= closed_at || proposal.status.is_terminal() {
        return Err(GovernanceError::VotingClosed { id, closed_at });
    }

    let ballot: Ballot = cast.parse()?;

    let proposal = state.proposal_mut(id)?;
    match ballot {
        Ballot::Yay => proposal.yays = proposal.yays.saturating_add(weight),
        Ballot::Nay => proposal.nays = proposal.nays.saturating_add(weight),
    }
    proposal.voted.push(caller.clone());

    metrics::VOTES_CAST.with_label_values(&[ballot.as_str()]).inc();
    info!(
        id,
        voter = caller.short(),
        ballot = ballot.as_str(),
        weight = %weight,
        "🗳️ Vote cast"
    );
    Ok(ballot)
}

/// Close a proposal whose voting window has ended and apply its effect.
pub fn finalize(state: &mut DaoState, id: u64, height: BlockHeight) -> Result<ProposalStatus> {
    let proposal = state.proposal(id)?;

    let closes_at = proposal.closes_at(state.settings.vote_length);
    if height < closes_at {
        return Err(GovernanceError::VotingStillOpen { id, closes_at });
    }
    if proposal.status != ProposalStatus::Active {
        return Err(GovernanceError::AlreadyFinalized(id));
    }

    let decided = VotingEngine::from_settings(&state.settings).determine_result(proposal);
    let kind = proposal.kind.clone();

    let status = if decided == ProposalStatus::Passed {
        apply_effect(state, &kind, height)?
    } else {
        decided
    };

    let proposal = state.proposal_mut(id)?;
    debug_assert!(proposal.status.can_transition_to(&status));
    proposal.status = status;

    metrics::PROPOSALS_FINALIZED
        .with_label_values(&[status.as_str()])
        .inc();
    info!(
        id,
        proposal_type = kind.as_str(),
        status = %status,
        height,
        "🏁 Proposal finalized"
    );
    Ok(status)
}

/// Apply a passed proposal. Returns the status to record, which is `failed`
/// when a burn finds no vault.
fn apply_effect(state: &mut DaoState, kind: &ProposalKind, height: BlockHeight) -> Result<ProposalStatus> {
    if let Some(qty) = kind.minted() {
        state.supply_metrics()?.ensure_mintable(qty)?;
    }

    match kind {
        ProposalKind::Mint { recipient, qty } => {
            state.balances.credit(recipient, *qty)?;
        }
        ProposalKind::MintLocked {
            recipient,
            qty,
            lock_length,
        } => {
            state
                .vault
                .grant(recipient, VaultEntry::new(*qty, height, *lock_length));
        }
        ProposalKind::BurnVault { target } => {
            if state.vault.revoke(target).is_none() {
                debug!(target = target.short(), "Burn target has no vault");
                return Ok(ProposalStatus::Failed);
            }
        }
        ProposalKind::Set(change) if change.is_role() => {
            let (Some(recipient), Value::String(role)) = (&change.recipient, &change.value) else {
                return Err(GovernanceError::InvalidSetting {
                    key: change.key.clone(),
                    reason: "role proposal needs a recipient and a string value".to_string(),
                });
            };
            state.roles.insert(recipient.clone(), role.clone());
            info!(recipient = recipient.short(), role = %role, "👤 Role assigned");
        }
        ProposalKind::Set(change) => {
            state.settings.apply(change)?;
        }
        ProposalKind::Indicative => {}
    }

    Ok(ProposalStatus::Passed)
}
