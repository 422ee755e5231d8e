use crate::balance::Balances;
use crate::types::TokenAmount;
use crate::vault::Vaults;
use crate::{LedgerError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Snapshot of where the supply currently sits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplyMetrics {
    pub ledger_total: TokenAmount,
    pub locked_total: TokenAmount,
    pub total_supply: TokenAmount,
}

impl SupplyMetrics {
    pub fn measure(balances: &Balances, vaults: &Vaults) -> Result<Self> {
        let ledger_total = balances.total()?;
        let locked_total = vaults.total()?;
        let total_supply = ledger_total
            .checked_add(locked_total)
            .ok_or(LedgerError::SupplyOverflow)?;

        Ok(Self {
            ledger_total,
            locked_total,
            total_supply,
        })
    }

    pub fn can_mint(&self, amount: TokenAmount) -> bool {
        self.total_supply <= TokenAmount::MAX_SUPPLY && amount <= self.remaining_mintable()
    }

    /// Headroom left under the ceiling.
    pub fn remaining_mintable(&self) -> TokenAmount {
        TokenAmount::from_units(
            TokenAmount::MAX_SUPPLY
                .units()
                .saturating_sub(self.total_supply.units()),
        )
    }

    /// Reject a mint that would push the supply past the safe-integer ceiling.
    pub fn ensure_mintable(&self, amount: TokenAmount) -> Result<()> {
        if !self.can_mint(amount) {
            debug!(
                supply = self.total_supply.units(),
                qty = amount.units(),
                remaining = self.remaining_mintable().units(),
                "Mint would exceed supply ceiling"
            );
            return Err(LedgerError::QuantityTooLarge {
                supply: self.total_supply.units(),
                qty: amount.units(),
                max: TokenAmount::MAX_SUPPLY.units(),
            });
        }
        Ok(())
    }
}

/// Ledger plus every vault entry.
pub fn total_supply(balances: &Balances, vaults: &Vaults) -> Result<TokenAmount> {
    SupplyMetrics::measure(balances, vaults).map(|m| m.total_supply)
}
