//! Prometheus metrics for the call dispatcher and proposal lifecycle.
//!
//! Counters are observational only; nothing reads them back into state.

use once_cell::sync::Lazy;
use prometheus::{register_int_counter_vec, IntCounterVec};

/// Calls handled, by function name
pub static CALLS_HANDLED: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "vaultdao_calls_handled_total",
        "Total calls handled",
        &["function"]
    )
    .expect("calls_handled metric registers once")
});

/// Calls rejected, by error kind
pub static CALLS_REJECTED: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "vaultdao_calls_rejected_total",
        "Total calls rejected",
        &["kind"]
    )
    .expect("calls_rejected metric registers once")
});

/// Proposals created, by type
pub static PROPOSALS_CREATED: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "vaultdao_proposals_created_total",
        "Total proposals created",
        &["type"]
    )
    .expect("proposals_created metric registers once")
});

/// Votes cast, by ballot
pub static VOTES_CAST: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "vaultdao_votes_cast_total",
        "Total votes cast",
        &["ballot"]
    )
    .expect("votes_cast metric registers once")
});

/// Proposals finalized, by resulting status
pub static PROPOSALS_FINALIZED: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "vaultdao_proposals_finalized_total",
        "Total proposals finalized",
        &["status"]
    )
    .expect("proposals_finalized metric registers once")
});
