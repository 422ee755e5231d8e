use crate::settings::Settings;
use crate::types::Proposal;
use crate::{GovernanceError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{info, warn};
use vaultdao_ledger::{Balances, LedgerError, SupplyMetrics, TokenAmount, Vaults};
use vaultdao_types::{canonical_hash, canonical_hash_hex, Address, CanonicalJsonError};

/// Complete contract state, handed into every call and returned from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaoState {
    pub name: String,
    pub ticker: String,
    pub balances: Balances,
    pub vault: Vaults,
    #[serde(default)]
    pub votes: Vec<Proposal>,
    #[serde(default)]
    pub roles: BTreeMap<Address, String>,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub extensions: Vec<Value>,
}

impl DaoState {
    pub fn new(name: impl Into<String>, ticker: impl Into<String>, settings: Settings) -> Self {
        Self {
            name: name.into(),
            ticker: ticker.into(),
            balances: Balances::new(),
            vault: Vaults::new(),
            votes: Vec::new(),
            roles: BTreeMap::new(),
            settings,
            extensions: Vec::new(),
        }
    }

    /// Build a starting state with an initial ledger allocation.
    pub fn genesis<I>(
        name: impl Into<String>,
        ticker: impl Into<String>,
        settings: Settings,
        allocations: I,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = (Address, TokenAmount)>,
    {
        settings.validate()?;
        let mut state = Self::new(name, ticker, settings);

        for (address, amount) in allocations {
            state.supply_metrics()?.ensure_mintable(amount)?;
            state.balances.credit(&address, amount)?;
        }
        if state.balances.is_empty() {
            warn!("Genesis ledger is empty");
        }

        info!(
            name = %state.name,
            ticker = %state.ticker,
            holders = state.balances.len(),
            supply = state.total_supply()?.units(),
            "🌱 Genesis state created"
        );
        Ok(state)
    }

    pub fn supply_metrics(&self) -> Result<SupplyMetrics> {
        Ok(SupplyMetrics::measure(&self.balances, &self.vault)?)
    }

    /// Ledger balances plus every vault entry.
    pub fn total_supply(&self) -> Result<TokenAmount> {
        Ok(self.supply_metrics()?.total_supply)
    }

    pub fn proposal(&self, id: u64) -> Result<&Proposal> {
        usize::try_from(id)
            .ok()
            .and_then(|idx| self.votes.get(idx))
            .ok_or(GovernanceError::UnknownProposal(id))
    }

    pub(crate) fn proposal_mut(&mut self, id: u64) -> Result<&mut Proposal> {
        usize::try_from(id)
            .ok()
            .and_then(|idx| self.votes.get_mut(idx))
            .ok_or(GovernanceError::UnknownProposal(id))
    }

    pub fn role(&self, target: &Address) -> Option<&str> {
        self.roles.get(target).map(String::as_str)
    }

    /// Ledger plus all vault entries of `target`, matured or not.
    pub fn balance(&self, target: &Address) -> TokenAmount {
        self.balances
            .balance_of(target)
            .saturating_add(self.vault.locked_total(target))
    }

    /// BLAKE3 over the canonical JSON encoding of the whole state.
    pub fn digest(&self) -> std::result::Result<[u8; 32], CanonicalJsonError> {
        canonical_hash(self)
    }

    pub fn digest_hex(&self) -> std::result::Result<String, CanonicalJsonError> {
        canonical_hash_hex(self)
    }

    /// Check the supply invariant a handed-in state must satisfy.
    pub fn check_invariants(&self) -> Result<()> {
        let supply = self.total_supply()?;
        if supply > TokenAmount::MAX_SUPPLY {
            return Err(LedgerError::QuantityTooLarge {
                supply: supply.units(),
                qty: 0,
                max: TokenAmount::MAX_SUPPLY.units(),
            }
            .into());
        }
        Ok(())
    }
}
