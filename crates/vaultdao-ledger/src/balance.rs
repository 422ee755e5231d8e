use crate::types::TokenAmount;
use crate::{LedgerError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};
use vaultdao_types::Address;

/// Available (unlocked) balances keyed by address.
///
/// An address with an entry of zero is still "known": `unlockedBalance` and
/// `transfer` distinguish it from an address that never held tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Balances(BTreeMap<Address, TokenAmount>);

impl Balances {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, address: &Address) -> Option<TokenAmount> {
        self.0.get(address).copied()
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.0.contains_key(address)
    }

    /// Ledger balance, zero for unknown addresses.
    pub fn balance_of(&self, address: &Address) -> TokenAmount {
        self.get(address).unwrap_or(TokenAmount::ZERO)
    }

    /// `unlockedBalance` query: fails for addresses with no ledger entry.
    pub fn unlocked_balance(&self, target: &Address) -> Result<TokenAmount> {
        self.get(target)
            .ok_or_else(|| LedgerError::UnknownTarget(target.clone()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sum of all ledger balances.
    pub fn total(&self) -> Result<TokenAmount> {
        self.0.values().try_fold(TokenAmount::ZERO, |acc, amount| {
            acc.checked_add(*amount).ok_or(LedgerError::SupplyOverflow)
        })
    }

    /// Add to an address, creating its entry when absent.
    pub fn credit(&mut self, address: &Address, amount: TokenAmount) -> Result<()> {
        let current = self.balance_of(address);
        let new_balance = current
            .checked_add(amount)
            .ok_or(LedgerError::SupplyOverflow)?;

        self.0.insert(address.clone(), new_balance);

        debug!(
            address = address.short(),
            amount = amount.units(),
            balance_after = new_balance.units(),
            "💰 Balance credited"
        );
        Ok(())
    }

    /// Remove from an address. Absent addresses have nothing to debit.
    pub fn debit(&mut self, address: &Address, amount: TokenAmount) -> Result<()> {
        let current = self.balance_of(address);
        let new_balance = current
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientBalance {
                needed: amount,
                available: current,
            })?;

        if let Some(entry) = self.0.get_mut(address) {
            *entry = new_balance;
        }

        debug!(
            address = address.short(),
            amount = amount.units(),
            balance_after = new_balance.units(),
            "💸 Balance debited"
        );
        Ok(())
    }

    /// Move `qty` from `caller` to `target`, conserving the ledger total.
    pub fn transfer(&mut self, caller: &Address, target: Option<&Address>, qty: i64) -> Result<()> {
        let amount = TokenAmount::positive(qty)?;

        let target = match target {
            Some(target) if !target.is_empty() => target,
            _ => return Err(LedgerError::InvalidTarget("no target specified".to_string())),
        };

        if target == caller {
            return Err(LedgerError::InvalidTarget(
                "cannot transfer to the calling address".to_string(),
            ));
        }

        let available = self
            .get(caller)
            .ok_or_else(|| LedgerError::UnknownCaller(caller.clone()))?;

        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                needed: amount,
                available,
            });
        }

        // The target can only overflow if the supply invariant is already broken.
        let target_after = self
            .balance_of(target)
            .checked_add(amount)
            .ok_or(LedgerError::SupplyOverflow)?;

        self.0.insert(caller.clone(), TokenAmount::from_units(available.units() - amount.units()));
        self.0.insert(target.clone(), target_after);

        info!(
            from = caller.short(),
            to = target.short(),
            amount = amount.units(),
            "📝 Transfer applied"
        );
        Ok(())
    }
}

impl FromIterator<(Address, TokenAmount)> for Balances {
    fn from_iter<I: IntoIterator<Item = (Address, TokenAmount)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
