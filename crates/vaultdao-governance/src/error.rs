use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use vaultdao_ledger::LedgerError;
use vaultdao_types::{Address, BlockHeight};

/// Governance operation result type
pub type Result<T> = std::result::Result<T, GovernanceError>;

/// Errors raised while handling a call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GovernanceError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Invalid value for {field}: {value}")]
    InvalidField {
        field: &'static str,
        value: String,
        kind: ErrorKind,
    },

    #[error("Note format not recognized")]
    InvalidNote,

    #[error("Caller needs to have locked balances: {0}")]
    NotEligible(Address),

    #[error("Caller doesn't have any locked balance: {0}")]
    NoLockedBalance(Address),

    #[error("Invalid vote type: {0}")]
    UnknownVoteType(String),

    #[error("No recipient specified")]
    MissingRecipient,

    #[error("Invalid setting {key}: {reason}")]
    InvalidSetting { key: String, reason: String },

    #[error("Proposal not found: {0}")]
    UnknownProposal(u64),

    #[error("Caller {voter} does not have locked balances for proposal {id}")]
    NoVotingWeight { id: u64, voter: Address },

    #[error("Caller has already voted: {0}")]
    AlreadyVoted(Address),

    #[error("Voting on proposal {id} concluded at height {closed_at}")]
    VotingClosed { id: u64, closed_at: BlockHeight },

    #[error("Vote cast type unrecognised: {0}")]
    InvalidCast(String),

    #[error("Voting on proposal {id} is open until height {closes_at}")]
    VotingStillOpen { id: u64, closes_at: BlockHeight },

    #[error("Proposal {0} is not active")]
    AlreadyFinalized(u64),

    #[error("Target doesn't have a role specified: {0}")]
    NoRole(Address),

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl GovernanceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Ledger(e) => ErrorKind::from(e),
            Self::InvalidField { kind, .. } => *kind,
            Self::InvalidNote => ErrorKind::InvalidNote,
            Self::NotEligible(_) => ErrorKind::NotEligible,
            Self::NoLockedBalance(_) => ErrorKind::NoLockedBalance,
            Self::UnknownVoteType(_) => ErrorKind::UnknownVoteType,
            Self::MissingRecipient => ErrorKind::MissingRecipient,
            Self::InvalidSetting { .. } => ErrorKind::InvalidSetting,
            Self::UnknownProposal(_) => ErrorKind::UnknownProposal,
            Self::NoVotingWeight { .. } => ErrorKind::NoVotingWeight,
            Self::AlreadyVoted(_) => ErrorKind::AlreadyVoted,
            Self::VotingClosed { .. } => ErrorKind::VotingClosed,
            Self::InvalidCast(_) => ErrorKind::InvalidCast,
            Self::VotingStillOpen { .. } => ErrorKind::VotingStillOpen,
            Self::AlreadyFinalized(_) => ErrorKind::AlreadyFinalized,
            Self::NoRole(_) => ErrorKind::NoRole,
            Self::UnknownFunction(_) => ErrorKind::UnknownFunction,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
        }
    }

    pub(crate) fn invalid_field(
        field: &'static str,
        value: &serde_json::Value,
        kind: ErrorKind,
    ) -> Self {
        Self::InvalidField {
            field,
            value: value.to_string(),
            kind,
        }
    }
}

/// Stable, serializable classification of every rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    InvalidAmount,
    InvalidTarget,
    InsufficientBalance,
    UnknownCaller,
    UnknownTarget,
    LockLengthOutOfRange,
    NoVault,
    InvalidVaultId,
    VaultMatured,
    NotEligible,
    NoLockedBalance,
    UnknownVoteType,
    UnknownProposal,
    NoVotingWeight,
    AlreadyVoted,
    VotingClosed,
    InvalidCast,
    VotingStillOpen,
    AlreadyFinalized,
    QuantityTooLarge,
    NoRole,
    InvalidNote,
    MissingRecipient,
    InvalidSetting,
    UnknownFunction,
    InvalidInput,
    SupplyOverflow,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidAmount => "InvalidAmount",
            Self::InvalidTarget => "InvalidTarget",
            Self::InsufficientBalance => "InsufficientBalance",
            Self::UnknownCaller => "UnknownCaller",
            Self::UnknownTarget => "UnknownTarget",
            Self::LockLengthOutOfRange => "LockLengthOutOfRange",
            Self::NoVault => "NoVault",
            Self::InvalidVaultId => "InvalidVaultId",
            Self::VaultMatured => "VaultMatured",
            Self::NotEligible => "NotEligible",
            Self::NoLockedBalance => "NoLockedBalance",
            Self::UnknownVoteType => "UnknownVoteType",
            Self::UnknownProposal => "UnknownProposal",
            Self::NoVotingWeight => "NoVotingWeight",
            Self::AlreadyVoted => "AlreadyVoted",
            Self::VotingClosed => "VotingClosed",
            Self::InvalidCast => "InvalidCast",
            Self::VotingStillOpen => "VotingStillOpen",
            Self::AlreadyFinalized => "AlreadyFinalized",
            Self::QuantityTooLarge => "QuantityTooLarge",
            Self::NoRole => "NoRole",
            Self::InvalidNote => "InvalidNote",
            Self::MissingRecipient => "MissingRecipient",
            Self::InvalidSetting => "InvalidSetting",
            Self::UnknownFunction => "UnknownFunction",
            Self::InvalidInput => "InvalidInput",
            Self::SupplyOverflow => "SupplyOverflow",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&LedgerError> for ErrorKind {
    fn from(e: &LedgerError) -> Self {
        match e {
            LedgerError::InvalidAmount(_) => Self::InvalidAmount,
            LedgerError::InvalidTarget(_) => Self::InvalidTarget,
            LedgerError::InsufficientBalance { .. } => Self::InsufficientBalance,
            LedgerError::UnknownCaller(_) => Self::UnknownCaller,
            LedgerError::UnknownTarget(_) => Self::UnknownTarget,
            LedgerError::LockLengthOutOfRange { .. } => Self::LockLengthOutOfRange,
            LedgerError::NoVault(_) => Self::NoVault,
            LedgerError::InvalidVaultId(_) => Self::InvalidVaultId,
            LedgerError::VaultMatured { .. } => Self::VaultMatured,
            LedgerError::QuantityTooLarge { .. } => Self::QuantityTooLarge,
            LedgerError::SupplyOverflow => Self::SupplyOverflow,
        }
    }
}
