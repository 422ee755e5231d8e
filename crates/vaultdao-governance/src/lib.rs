//! Lock-weighted governance over a vault ledger.
//!
//! Every operation is a pure function of the state handed in, the caller,
//! the call payload and the block height; identical inputs give
//! byte-identical states on any executor.

pub mod call;
pub mod contract;
pub mod error;
pub mod lifecycle;
pub mod metrics;
pub mod settings;
pub mod state;
pub mod types;
pub mod voting;

pub use call::{Call, CallInput, ProposalInput};
pub use contract::{handle, handle_input, Action, Outcome, Rejection};
pub use error::{ErrorKind, GovernanceError, Result};
pub use settings::{SettingChange, Settings};
pub use state::DaoState;
pub use types::{Ballot, Proposal, ProposalKind, ProposalStatus, QueryResult};
pub use voting::VotingEngine;
