pub mod balance;
pub mod error;
pub mod supply;
pub mod types;
pub mod vault;

pub use balance::Balances;
pub use error::{LedgerError, Result};
pub use supply::{total_supply, SupplyMetrics};
pub use types::{LockBounds, TokenAmount, VaultEntry, VoteWeight};
pub use vault::Vaults;
