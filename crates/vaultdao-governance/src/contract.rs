//! Call dispatcher.
//!
//! `handle` takes the state by value and always gives one back: the updated
//! state on success, or the untouched state inside a [`Rejection`].

use crate::call::{Call, CallInput};
use crate::lifecycle;
use crate::metrics;
use crate::state::DaoState;
use crate::types::QueryResult;
use crate::{GovernanceError, Result};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};
use vaultdao_types::{Address, BlockClock, BlockHeight};

/// A call together with the identity making it.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub caller: Address,
    pub call: Call,
}

impl Action {
    pub fn new(caller: impl Into<Address>, call: Call) -> Self {
        Self {
            caller: caller.into(),
            call,
        }
    }
}

/// Successful result of a call.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// A mutating call; carries the new state.
    State(DaoState),
    /// A read-only call; the state is returned unchanged.
    Query { state: DaoState, result: QueryResult },
}

impl Outcome {
    pub fn state(&self) -> &DaoState {
        match self {
            Self::State(state) | Self::Query { state, .. } => state,
        }
    }

    pub fn into_state(self) -> DaoState {
        match self {
            Self::State(state) | Self::Query { state, .. } => state,
        }
    }

    pub fn result(&self) -> Option<&QueryResult> {
        match self {
            Self::State(_) => None,
            Self::Query { result, .. } => Some(result),
        }
    }

    /// Wire response: the state itself, or `{"result": {...}}` for queries.
    pub fn to_response(&self) -> serde_json::Result<Value> {
        match self {
            Self::State(state) => serde_json::to_value(state),
            Self::Query { result, .. } => Ok(json!({ "result": result })),
        }
    }
}

/// A failed call. The state is exactly what was handed in.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct Rejection {
    pub state: DaoState,
    pub error: GovernanceError,
}

/// Decode a wire call and handle it.
pub fn handle_input<C: BlockClock>(
    state: DaoState,
    caller: impl Into<Address>,
    input: CallInput,
    clock: &C,
) -> std::result::Result<Outcome, Rejection> {
    let caller = caller.into();
    let function = input.function.clone();
    match Call::try_from(input) {
        Ok(call) => handle(state, Action { caller, call }, clock),
        Err(error) => Err(reject(state, &caller, &function, error)),
    }
}

/// Run one call against `state` at the clock's current height.
pub fn handle<C: BlockClock>(
    mut state: DaoState,
    action: Action,
    clock: &C,
) -> std::result::Result<Outcome, Rejection> {
    let height = clock.current_height();
    let Action { caller, call } = action;
    let function = call.function();

    match apply(&mut state, &caller, call, height) {
        Ok(result) => {
            metrics::CALLS_HANDLED.with_label_values(&[function]).inc();
            debug!(function, caller = caller.short(), height, "Call handled");
            Ok(match result {
                Some(result) => Outcome::Query { state, result },
                None => Outcome::State(state),
            })
        }
        Err(error) => Err(reject(state, &caller, function, error)),
    }
}

fn reject(state: DaoState, caller: &Address, function: &str, error: GovernanceError) -> Rejection {
    let kind = error.kind();
    metrics::CALLS_REJECTED.with_label_values(&[kind.as_str()]).inc();
    warn!(
        function,
        caller = caller.short(),
        kind = %kind,
        error = %error,
        "❌ Call rejected"
    );
    Rejection { state, error }
}

fn apply(
    state: &mut DaoState,
    caller: &Address,
    call: Call,
    height: BlockHeight,
) -> Result<Option<QueryResult>> {
    let target_or_caller = |target: Option<Address>| target.unwrap_or_else(|| caller.clone());

    match call {
        Call::Transfer { target, qty } => {
            state.balances.transfer(caller, target.as_ref(), qty)?;
        }
        Call::Balance { target } => {
            let target = target_or_caller(target);
            let balance = state.balance(&target);
            return Ok(Some(QueryResult::Balance { target, balance }));
        }
        Call::UnlockedBalance { target } => {
            let target = target_or_caller(target);
            let balance = state.balances.unlocked_balance(&target)?;
            return Ok(Some(QueryResult::Balance { target, balance }));
        }
        Call::VaultBalance { target } => {
            let target = target_or_caller(target);
            let balance = state.vault.vault_balance(&target, height);
            return Ok(Some(QueryResult::Balance { target, balance }));
        }
        Call::Lock { qty, lock_length } => {
            let bounds = state.settings.lock_bounds();
            state
                .vault
                .lock(&mut state.balances, caller, qty, lock_length, bounds, height)?;
        }
        Call::IncreaseVault { id, lock_length } => {
            let bounds = state.settings.lock_bounds();
            state.vault.increase(caller, id, lock_length, bounds, height)?;
        }
        Call::Unlock => {
            state.vault.unlock(&mut state.balances, caller, height)?;
        }
        Call::Propose(input) => {
            lifecycle::propose(state, caller, &input, height)?;
        }
        Call::Vote { id, cast } => {
            lifecycle::vote(state, caller, id, &cast, height)?;
        }
        Call::Finalize { id } => {
            lifecycle::finalize(state, id, height)?;
        }
        Call::Role { target } => {
            let target = target_or_caller(target);
            let role = match state.role(&target) {
                Some(role) if !role.trim().is_empty() => role.to_string(),
                _ => return Err(GovernanceError::NoRole(target)),
            };
            return Ok(Some(QueryResult::Role { target, role }));
        }
        Call::Extend { extension } => {
            let extension = extension
                .ok_or_else(|| GovernanceError::InvalidInput("extension is required".to_string()))?;
            state.extensions.push(extension);
            debug!(count = state.extensions.len(), "Extension registered");
        }
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use crate::ErrorKind;
    use serde_json::json;
    use vaultdao_ledger::TokenAmount;
    use vaultdao_types::LocalClock;

    fn genesis() -> DaoState {
        DaoState::genesis(
            "Mydao",
            "MDAO",
            Settings::default(),
            [(Address::new("admin"), TokenAmount::from_units(10_000_000))],
        )
        .unwrap()
    }

    fn wire(value: Value) -> CallInput {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_query_returns_result_and_same_state() {
        let state = genesis();
        let before = state.clone();

        let outcome = handle_input(state, "admin", wire(json!({"function": "balance"})), &0u64).unwrap();

        assert_eq!(outcome.state(), &before);
        assert_eq!(
            outcome.to_response().unwrap(),
            json!({"result": {"target": "admin", "balance": 10_000_000}})
        );
    }

    #[test]
    fn test_rejection_hands_back_state() {
        let state = genesis();
        let digest = state.digest().unwrap();

        let rejection = handle_input(
            state,
            "admin",
            wire(json!({"function": "transfer", "target": "admin", "qty": 10})),
            &0u64,
        )
        .unwrap_err();

        assert_eq!(rejection.error.kind(), ErrorKind::InvalidTarget);
        assert_eq!(rejection.state.digest().unwrap(), digest);
    }

    #[test]
    fn test_unknown_function_rejected() {
        let rejection =
            handle_input(genesis(), "admin", wire(json!({"function": "selfDestruct"})), &0u64)
                .unwrap_err();
        assert_eq!(rejection.error.kind(), ErrorKind::UnknownFunction);
    }

    #[test]
    fn test_lock_uses_clock_height() {
        let clock = LocalClock::new(42);
        let outcome = handle(
            genesis(),
            Action::new("admin", Call::Lock { qty: 100, lock_length: 5 }),
            &clock,
        )
        .unwrap();

        let entries = outcome.state().vault.entries(&Address::new("admin")).unwrap();
        assert_eq!(entries[0].start, 42);
        assert_eq!(entries[0].end, 47);
    }

    #[test]
    fn test_role_query() {
        let mut state = genesis();
        state.roles.insert(Address::new("admin"), "  ".to_string());

        let rejection = handle(state, Action::new("admin", Call::Role { target: None }), &0u64)
            .unwrap_err();
        assert_eq!(rejection.error.kind(), ErrorKind::NoRole);

        let mut state = rejection.state;
        state.roles.insert(Address::new("admin"), "MAIN".to_string());
        let outcome = handle(state, Action::new("user", Call::Role {
            target: Some(Address::new("admin")),
        }), &0u64)
        .unwrap();
        assert_eq!(
            outcome.result(),
            Some(&QueryResult::Role {
                target: Address::new("admin"),
                role: "MAIN".to_string()
            })
        );
    }

    #[test]
    fn test_extend_appends_descriptor() {
        let outcome = handle(
            genesis(),
            Action::new("admin", Call::Extend {
                extension: Some(json!({"id": "profit-sharing", "priorityWeight": 1})),
            }),
            &0u64,
        )
        .unwrap();
        assert_eq!(outcome.state().extensions.len(), 1);

        let rejection = handle(
            outcome.into_state(),
            Action::new("admin", Call::Extend { extension: None }),
            &0u64,
        )
        .unwrap_err();
        assert_eq!(rejection.error.kind(), ErrorKind::InvalidInput);
        assert_eq!(rejection.state.extensions.len(), 1);
    }
}
