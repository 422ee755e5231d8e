use crate::balance::Balances;
use crate::types::{LockBounds, TokenAmount, VaultEntry, VoteWeight};
use crate::{LedgerError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};
use vaultdao_types::{Address, BlockHeight};

/// Time-locked balances: each address owns an ordered list of entries whose
/// index is the entry's external id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Vaults(BTreeMap<Address, Vec<VaultEntry>>);

impl Vaults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self, owner: &Address) -> Option<&[VaultEntry]> {
        self.0.get(owner).map(Vec::as_slice)
    }

    /// True once an address has ever locked, even if every entry has since
    /// been withdrawn.
    pub fn has_vault(&self, owner: &Address) -> bool {
        self.0.contains_key(owner)
    }

    pub fn has_locked_balance(&self, owner: &Address) -> bool {
        self.0
            .get(owner)
            .is_some_and(|entries| entries.iter().any(|e| !e.balance.is_zero()))
    }

    /// Lock `qty` of the caller's ledger balance for `lock_length` blocks.
    ///
    /// Returns the new entry's id.
    pub fn lock(
        &mut self,
        balances: &mut Balances,
        caller: &Address,
        qty: i64,
        lock_length: i64,
        bounds: LockBounds,
        height: BlockHeight,
    ) -> Result<usize> {
        let amount = TokenAmount::positive(qty)?;
        let lock_length = bounds.check(lock_length)?;

        let available = balances.balance_of(caller);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                needed: amount,
                available,
            });
        }

        balances.debit(caller, amount)?;
        let entry = VaultEntry::new(amount, height, lock_length);
        let entries = self.0.entry(caller.clone()).or_default();
        entries.push(entry);

        info!(
            owner = caller.short(),
            amount = amount.units(),
            start = entry.start,
            end = entry.end,
            "🔒 Balance locked"
        );
        Ok(entries.len() - 1)
    }

    /// Replace the end of a running entry with `height + lock_length`.
    pub fn increase(
        &mut self,
        caller: &Address,
        id: u64,
        lock_length: i64,
        bounds: LockBounds,
        height: BlockHeight,
    ) -> Result<BlockHeight> {
        let lock_length = bounds.check(lock_length)?;

        let entries = self
            .0
            .get_mut(caller)
            .ok_or_else(|| LedgerError::NoVault(caller.clone()))?;

        let entry = usize::try_from(id)
            .ok()
            .and_then(|idx| entries.get_mut(idx))
            .ok_or(LedgerError::InvalidVaultId(id))?;

        if entry.is_matured(height) {
            return Err(LedgerError::VaultMatured { id, end: entry.end });
        }

        let previous_end = entry.end;
        entry.end = height.saturating_add(lock_length);

        info!(
            owner = caller.short(),
            id,
            previous_end,
            end = entry.end,
            "⏳ Vault extended"
        );
        Ok(entry.end)
    }

    /// Withdraw every matured entry back to the ledger. Returns the amount
    /// released, zero when nothing has matured.
    ///
    /// Only a ledger already past the supply ceiling can fail the credit; in
    /// that case the error is `SupplyOverflow` and neither side is touched.
    pub fn unlock(
        &mut self,
        balances: &mut Balances,
        caller: &Address,
        height: BlockHeight,
    ) -> Result<TokenAmount> {
        let Some(entries) = self.0.get_mut(caller) else {
            return Ok(TokenAmount::ZERO);
        };

        let (released, matured) = entries
            .iter()
            .filter(|e| e.is_matured(height))
            .try_fold((TokenAmount::ZERO, 0usize), |(sum, count), e| {
                sum.checked_add(e.balance).map(|sum| (sum, count + 1))
            })
            .ok_or(LedgerError::SupplyOverflow)?;

        if matured == 0 {
            debug!(owner = caller.short(), height, "Nothing to unlock");
            return Ok(TokenAmount::ZERO);
        }

        balances
            .balance_of(caller)
            .checked_add(released)
            .ok_or(LedgerError::SupplyOverflow)?;

        // Walk from the back so removal never shifts an unvisited index.
        let mut idx = entries.len();
        while idx > 0 {
            idx -= 1;
            if entries[idx].is_matured(height) {
                entries.remove(idx);
            }
        }
        balances.credit(caller, released)?;

        info!(
            owner = caller.short(),
            entries = matured,
            amount = released.units(),
            "🔓 Vault entries unlocked"
        );
        Ok(released)
    }

    /// Sum of entries still locked at `height` (`end > height`).
    pub fn vault_balance(&self, target: &Address, height: BlockHeight) -> TokenAmount {
        self.0
            .get(target)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|e| !e.is_matured(height))
                    .fold(TokenAmount::ZERO, |acc, e| acc.saturating_add(e.balance))
            })
            .unwrap_or(TokenAmount::ZERO)
    }

    /// Sum of every entry owned by `target`, matured or not.
    pub fn locked_total(&self, target: &Address) -> TokenAmount {
        self.0
            .get(target)
            .map(|entries| {
                entries
                    .iter()
                    .fold(TokenAmount::ZERO, |acc, e| acc.saturating_add(e.balance))
            })
            .unwrap_or(TokenAmount::ZERO)
    }

    /// Sum of every entry across all owners.
    pub fn total(&self) -> Result<TokenAmount> {
        self.0
            .values()
            .flatten()
            .try_fold(TokenAmount::ZERO, |acc, e| {
                acc.checked_add(e.balance).ok_or(LedgerError::SupplyOverflow)
            })
    }

    /// Duration-weighted size of every vault: the quorum denominator.
    pub fn total_weight(&self) -> VoteWeight {
        self.0
            .values()
            .flatten()
            .fold(0, |acc: VoteWeight, e| acc.saturating_add(e.weight()))
    }

    /// Weight `voter` may cast on a proposal created at `proposal_start`.
    ///
    /// Only entries committed strictly before the proposal and still running
    /// at its start count.
    pub fn voting_weight(&self, voter: &Address, proposal_start: BlockHeight) -> VoteWeight {
        self.0
            .get(voter)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|e| e.was_active_at(proposal_start))
                    .fold(0, |acc: VoteWeight, e| acc.saturating_add(e.weight()))
            })
            .unwrap_or(0)
    }

    /// Append an entry without touching the ledger (mint into lock).
    pub fn grant(&mut self, recipient: &Address, entry: VaultEntry) {
        self.0.entry(recipient.clone()).or_default().push(entry);
        info!(
            owner = recipient.short(),
            amount = entry.balance.units(),
            start = entry.start,
            end = entry.end,
            "🔒 Locked balance granted"
        );
    }

    /// Remove an address's whole vault, returning what it held.
    pub fn revoke(&mut self, target: &Address) -> Option<Vec<VaultEntry>> {
        let removed = self.0.remove(target)?;
        info!(
            owner = target.short(),
            entries = removed.len(),
            "🔥 Vault revoked"
        );
        Some(removed)
    }
}

impl FromIterator<(Address, Vec<VaultEntry>)> for Vaults {
    fn from_iter<I: IntoIterator<Item = (Address, Vec<VaultEntry>)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
