pub mod address;
pub mod canonical_json;
pub mod clock;
pub mod lifecycle;

pub use address::Address;
pub use canonical_json::{canonical_hash, canonical_hash_hex, to_canonical_json, CanonicalJsonError};
pub use clock::{BlockClock, BlockHeight, LocalClock};
pub use lifecycle::LifecycleState;

/// Largest integer every executor can represent exactly (2^53 - 1).
///
/// Total token supply is capped here so that balances survive a round trip
/// through any IEEE-754 double based tooling without rounding.
pub const MAX_SAFE_INTEGER: u64 = 9_007_199_254_740_991;
