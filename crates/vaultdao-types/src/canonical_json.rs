//! Canonical JSON Serialization
//!
//! Deterministic JSON encoding of contract state so that independent
//! executors replaying the same call log can compare results by hash.
//!
//! # Canonical Format
//!
//! 1. **Key Ordering**: Object keys sorted lexicographically (UTF-8 byte order)
//! 2. **No Whitespace**: Compact representation
//! 3. **Integers**: Emitted exactly as stored, never routed through `f64`
//! 4. **Floats**: Integral floats below 2^53 collapse to integers (`1.0` -> `1`)
//! 5. **No Null Values**: Fields with null values are omitted
//!
//! # Example
//!
//! ```
//! use vaultdao_types::canonical_json::{to_canonical_json, canonical_hash};
//!
//! let value = serde_json::json!({"ticker": "VLT", "balances": {"bob": 5, "alice": 10}});
//! let json = to_canonical_json(&value).unwrap();
//! assert_eq!(json, r#"{"balances":{"alice":10,"bob":5},"ticker":"VLT"}"#);
//!
//! let hash = canonical_hash(&value).unwrap();
//! assert_eq!(hash.len(), 32);
//! ```

use serde::Serialize;
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CanonicalJsonError {
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Invalid JSON structure: {0}")]
    InvalidStructure(String),
}

pub type Result<T> = std::result::Result<T, CanonicalJsonError>;

/// Serialize value to canonical JSON string
pub fn to_canonical_json<T: Serialize>(value: &T) -> Result<String> {
    let json_value = serde_json::to_value(value)?;
    let canonical = canonicalize_value(json_value)?;
    Ok(serde_json::to_string(&canonical)?)
}

/// BLAKE3 hash of the canonical JSON representation
pub fn canonical_hash<T: Serialize>(value: &T) -> Result<[u8; 32]> {
    let canonical_json = to_canonical_json(value)?;
    let hash = blake3::hash(canonical_json.as_bytes());
    Ok(*hash.as_bytes())
}

/// Hex form of [`canonical_hash`], for logs and CLI output.
pub fn canonical_hash_hex<T: Serialize>(value: &T) -> Result<String> {
    Ok(hex::encode(canonical_hash(value)?))
}

fn canonicalize_value(value: Value) -> Result<Value> {
    Ok(match value {
        Value::Object(map) => {
            let mut sorted: BTreeMap<String, Value> = BTreeMap::new();
            for (k, v) in map {
                if !v.is_null() {
                    sorted.insert(k, canonicalize_value(v)?);
                }
            }

            let mut canonical_map = Map::new();
            for (k, v) in sorted {
                canonical_map.insert(k, v);
            }
            Value::Object(canonical_map)
        }
        Value::Array(arr) => Value::Array(
            arr.into_iter()
                .map(canonicalize_value)
                .collect::<Result<Vec<_>>>()?,
        ),
        Value::Number(n) => Value::Number(canonicalize_number(n)?),
        other => other,
    })
}

fn canonicalize_number(n: Number) -> Result<Number> {
    if n.is_u64() || n.is_i64() {
        return Ok(n);
    }

    let f = n
        .as_f64()
        .ok_or_else(|| CanonicalJsonError::InvalidStructure(format!("unrepresentable number {n}")))?;

    if f.fract() == 0.0 && f.abs() < (1u64 << 53) as f64 {
        Ok(Number::from(f as i64))
    } else {
        Number::from_f64(f)
            .ok_or_else(|| CanonicalJsonError::InvalidStructure(format!("non-finite number {f}")))
    }
}
