use crate::{LedgerError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use vaultdao_types::{BlockHeight, MAX_SAFE_INTEGER};

/// Whole-token quantity. Always non-negative and never above [`TokenAmount::MAX_SUPPLY`]
/// once it is part of the supply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenAmount(u64);

impl TokenAmount {
    pub const ZERO: Self = Self(0);
    pub const MAX_SUPPLY: Self = Self(MAX_SAFE_INTEGER);

    pub fn from_units(units: u64) -> Self {
        Self(units)
    }

    /// Validate a caller-supplied quantity: must be a positive integer.
    pub fn positive(qty: i64) -> Result<Self> {
        if qty <= 0 {
            return Err(LedgerError::InvalidAmount(qty));
        }
        Ok(Self(qty as u64))
    }

    pub fn units(&self) -> u64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(&self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(&self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn saturating_add(&self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Duration-weighted balance: `balance × (end − start)`.
///
/// Kept in `u128` so a full-supply lock over any realistic length cannot wrap.
pub type VoteWeight = u128;

/// Serde format for [`VoteWeight`].
///
/// Weights that fit in `u64` are plain JSON integers. Larger ones (a vault
/// re-extended many times keeps its original `start`) are written as an exact
/// decimal string, which JSON numbers cannot carry without rounding.
pub mod weight_format {
    use super::VoteWeight;
    use serde::{de, Deserializer, Serializer};
    use std::fmt;

    pub fn serialize<S: Serializer>(weight: &VoteWeight, serializer: S) -> Result<S::Ok, S::Error> {
        match u64::try_from(*weight) {
            Ok(weight) => serializer.serialize_u64(weight),
            Err(_) => serializer.collect_str(weight),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<VoteWeight, D::Error> {
        deserializer.deserialize_any(WeightVisitor)
    }

    struct WeightVisitor;

    impl<'de> de::Visitor<'de> for WeightVisitor {
        type Value = VoteWeight;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a non-negative integer or a decimal string")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<VoteWeight, E> {
            Ok(VoteWeight::from(v))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<VoteWeight, E> {
            VoteWeight::try_from(v).map_err(|_| E::invalid_value(de::Unexpected::Signed(v), &self))
        }

        fn visit_u128<E: de::Error>(self, v: u128) -> Result<VoteWeight, E> {
            Ok(v)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<VoteWeight, E> {
            if v.is_empty() || !v.bytes().all(|b| b.is_ascii_digit()) {
                return Err(E::invalid_value(de::Unexpected::Str(v), &self));
            }
            v.parse()
                .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
        }
    }
}

/// One time-locked balance segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultEntry {
    pub balance: TokenAmount,
    pub start: BlockHeight,
    pub end: BlockHeight,
}

impl VaultEntry {
    pub fn new(balance: TokenAmount, start: BlockHeight, lock_length: u64) -> Self {
        Self {
            balance,
            start,
            end: start.saturating_add(lock_length),
        }
    }

    pub fn weight(&self) -> VoteWeight {
        self.balance.units() as u128 * self.end.saturating_sub(self.start) as u128
    }

    /// Matured entries may be withdrawn and can no longer be extended.
    pub fn is_matured(&self, height: BlockHeight) -> bool {
        self.end <= height
    }

    /// Committed strictly before `height` and still running at `height`.
    pub fn was_active_at(&self, height: BlockHeight) -> bool {
        self.start < height && self.end >= height
    }
}

/// Inclusive bounds on a lock length, taken from the current settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockBounds {
    pub min: u64,
    pub max: u64,
}

impl LockBounds {
    pub fn new(min: u64, max: u64) -> Self {
        Self { min, max }
    }

    pub fn check(&self, lock_length: i64) -> Result<u64> {
        if lock_length < 0 || (lock_length as u64) < self.min || (lock_length as u64) > self.max {
            return Err(LedgerError::LockLengthOutOfRange {
                length: lock_length,
                min: self.min,
                max: self.max,
            });
        }
        Ok(lock_length as u64)
    }
}
