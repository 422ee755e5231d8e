use crate::types::TokenAmount;
use thiserror::Error;
use vaultdao_types::{Address, BlockHeight};

/// Ledger operation result type
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Ledger and vault errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("Invalid value for qty: {0}. Must be a positive integer")]
    InvalidAmount(i64),

    #[error("Invalid transfer target: {0}")]
    InvalidTarget(String),

    #[error("Insufficient balance: needed {needed}, available {available}")]
    InsufficientBalance {
        needed: TokenAmount,
        available: TokenAmount,
    },

    #[error("Caller does not own any balance: {0}")]
    UnknownCaller(Address),

    #[error("Target does not exist: {0}")]
    UnknownTarget(Address),

    #[error("lockLength {length} is out of range, must be between {min} - {max}")]
    LockLengthOutOfRange { length: i64, min: u64, max: u64 },

    #[error("Caller does not have a vault: {0}")]
    NoVault(Address),

    #[error("Invalid vault ID: {0}")]
    InvalidVaultId(u64),

    #[error("Vault {id} has ended at height {end}")]
    VaultMatured { id: u64, end: BlockHeight },

    #[error("Quantity too large: supply {supply} + {qty} exceeds {max}")]
    QuantityTooLarge { supply: u64, qty: u64, max: u64 },

    #[error("Supply accounting overflow")]
    SupplyOverflow,
}
