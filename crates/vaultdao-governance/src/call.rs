//! Inbound calls.
//!
//! [`CallInput`] is the loose `{function, ...fields}` object callers submit.
//! It is decoded once into the closed [`Call`] enum; handlers only ever see
//! typed calls. Proposal fields stay loosely typed in [`ProposalInput`]
//! because their rules depend on the proposal type and on state.

use crate::{ErrorKind, GovernanceError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use vaultdao_types::Address;

/// Wire form of a call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallInput {
    pub function: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qty: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock_length: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cast: Option<Value>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub proposal_type: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<Value>,
}

/// Every operation the contract understands.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Transfer { target: Option<Address>, qty: i64 },
    Balance { target: Option<Address> },
    UnlockedBalance { target: Option<Address> },
    VaultBalance { target: Option<Address> },
    Lock { qty: i64, lock_length: i64 },
    IncreaseVault { id: u64, lock_length: i64 },
    Unlock,
    Propose(ProposalInput),
    Vote { id: u64, cast: String },
    Finalize { id: u64 },
    Role { target: Option<Address> },
    Extend { extension: Option<Value> },
}

impl Call {
    pub fn function(&self) -> &'static str {
        match self {
            Self::Transfer { .. } => "transfer",
            Self::Balance { .. } => "balance",
            Self::UnlockedBalance { .. } => "unlockedBalance",
            Self::VaultBalance { .. } => "vaultBalance",
            Self::Lock { .. } => "lock",
            Self::IncreaseVault { .. } => "increaseVault",
            Self::Unlock => "unlock",
            Self::Propose(_) => "propose",
            Self::Vote { .. } => "vote",
            Self::Finalize { .. } => "finalize",
            Self::Role { .. } => "role",
            Self::Extend { .. } => "extend",
        }
    }

    pub fn is_query(&self) -> bool {
        matches!(
            self,
            Self::Balance { .. }
                | Self::UnlockedBalance { .. }
                | Self::VaultBalance { .. }
                | Self::Role { .. }
        )
    }
}

impl TryFrom<CallInput> for Call {
    type Error = GovernanceError;

    fn try_from(input: CallInput) -> Result<Self> {
        let call = match input.function.as_str() {
            "transfer" => Self::Transfer {
                qty: integer("qty", input.qty.as_ref(), ErrorKind::InvalidAmount)?,
                target: optional_address("target", input.target.as_ref())?,
            },
            "balance" => Self::Balance {
                target: optional_address("target", input.target.as_ref())?,
            },
            "unlockedBalance" => Self::UnlockedBalance {
                target: optional_address("target", input.target.as_ref())?,
            },
            "vaultBalance" => Self::VaultBalance {
                target: optional_address("target", input.target.as_ref())?,
            },
            "lock" => Self::Lock {
                qty: integer("qty", input.qty.as_ref(), ErrorKind::InvalidAmount)?,
                lock_length: integer(
                    "lockLength",
                    input.lock_length.as_ref(),
                    ErrorKind::LockLengthOutOfRange,
                )?,
            },
            "increaseVault" => Self::IncreaseVault {
                lock_length: integer(
                    "lockLength",
                    input.lock_length.as_ref(),
                    ErrorKind::LockLengthOutOfRange,
                )?,
                id: index("id", input.id.as_ref(), ErrorKind::InvalidVaultId)?,
            },
            "unlock" => Self::Unlock,
            "propose" => Self::Propose(ProposalInput {
                proposal_type: input.proposal_type,
                note: input.note,
                recipient: input.recipient,
                qty: input.qty,
                lock_length: input.lock_length,
                target: input.target,
                key: input.key,
                value: input.value,
            }),
            "vote" => Self::Vote {
                id: index("id", input.id.as_ref(), ErrorKind::InvalidInput)?,
                cast: match input.cast {
                    Some(Value::String(s)) => s,
                    Some(other) => other.to_string(),
                    None => String::new(),
                },
            },
            "finalize" => Self::Finalize {
                id: index("id", input.id.as_ref(), ErrorKind::InvalidInput)?,
            },
            "role" => Self::Role {
                target: optional_address("target", input.target.as_ref())?,
            },
            "extend" => Self::Extend {
                extension: input.extension.filter(|v| !v.is_null()),
            },
            other => return Err(GovernanceError::UnknownFunction(other.to_string())),
        };
        Ok(call)
    }
}

/// Proposal fields as submitted. Validated by the proposal engine against
/// the current state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProposalInput {
    pub proposal_type: Option<Value>,
    pub note: Option<Value>,
    pub recipient: Option<Value>,
    pub qty: Option<Value>,
    pub lock_length: Option<Value>,
    pub target: Option<Value>,
    pub key: Option<Value>,
    pub value: Option<Value>,
}

impl ProposalInput {
    fn with_type(proposal_type: &str, note: &str) -> Self {
        Self {
            proposal_type: Some(Value::from(proposal_type)),
            note: Some(Value::from(note)),
            ..Self::default()
        }
    }

    pub fn mint(note: &str, recipient: &Address, qty: u64) -> Self {
        Self {
            recipient: Some(Value::from(recipient.as_str())),
            qty: Some(Value::from(qty)),
            ..Self::with_type("mint", note)
        }
    }

    pub fn mint_locked(note: &str, recipient: &Address, qty: u64, lock_length: Option<u64>) -> Self {
        Self {
            recipient: Some(Value::from(recipient.as_str())),
            qty: Some(Value::from(qty)),
            lock_length: lock_length.map(Value::from),
            ..Self::with_type("mintLocked", note)
        }
    }

    pub fn burn_vault(note: &str, target: &Address) -> Self {
        Self {
            target: Some(Value::from(target.as_str())),
            ..Self::with_type("burnVault", note)
        }
    }

    pub fn set(note: &str, key: &str, value: Value) -> Self {
        Self {
            key: Some(Value::from(key)),
            value: Some(value),
            ..Self::with_type("set", note)
        }
    }

    pub fn set_role(note: &str, recipient: &Address, role: &str) -> Self {
        Self {
            recipient: Some(Value::from(recipient.as_str())),
            ..Self::set(note, "role", Value::from(role))
        }
    }

    pub fn indicative(note: &str) -> Self {
        Self::with_type("indicative", note)
    }
}

/// Falsy values mean "not given".
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Integer-valued JSON number, saturating at the `i64` range.
pub(crate) fn as_integer(value: &Value) -> Option<i64> {
    if let Some(v) = value.as_i64() {
        return Some(v);
    }
    if value.as_u64().is_some() {
        return Some(i64::MAX);
    }
    value
        .as_f64()
        .filter(|f| f.is_finite() && f.fract() == 0.0)
        .map(|f| f as i64)
}

fn integer(field: &'static str, value: Option<&Value>, kind: ErrorKind) -> Result<i64> {
    let value = value.unwrap_or(&Value::Null);
    as_integer(value).ok_or_else(|| GovernanceError::invalid_field(field, value, kind))
}

fn index(field: &'static str, value: Option<&Value>, kind: ErrorKind) -> Result<u64> {
    let value = value.unwrap_or(&Value::Null);
    value
        .as_u64()
        .or_else(|| {
            value
                .as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0 && *f >= 0.0)
                .map(|f| f as u64)
        })
        .ok_or_else(|| GovernanceError::invalid_field(field, value, kind))
}

/// Falsy targets fall back to the caller; anything else must be a string.
fn optional_address(field: &'static str, value: Option<&Value>) -> Result<Option<Address>> {
    match value {
        None => Ok(None),
        Some(v) if !is_truthy(v) => Ok(None),
        Some(Value::String(s)) => Ok(Some(Address::new(s.as_str()))),
        Some(other) => Err(GovernanceError::invalid_field(
            field,
            other,
            ErrorKind::InvalidTarget,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(value: Value) -> Result<Call> {
        let input: CallInput = serde_json::from_value(value).unwrap();
        Call::try_from(input)
    }

    #[test]
    fn test_decode_transfer() {
        let call = decode(json!({"function": "transfer", "target": "user", "qty": 1000})).unwrap();
        assert_eq!(
            call,
            Call::Transfer {
                target: Some(Address::new("user")),
                qty: 1000
            }
        );
        assert!(!call.is_query());
    }

    #[test]
    fn test_decode_rejects_non_integer_qty() {
        let err = decode(json!({"function": "transfer", "target": "user", "qty": 1.5})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidAmount);

        let err = decode(json!({"function": "lock", "qty": "10", "lockLength": 5})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidAmount);

        let err = decode(json!({"function": "lock", "qty": 10})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LockLengthOutOfRange);
    }

    #[test]
    fn test_integral_floats_are_integers() {
        let call = decode(json!({"function": "lock", "qty": 100.0, "lockLength": 5})).unwrap();
        assert_eq!(call, Call::Lock { qty: 100, lock_length: 5 });
    }

    #[test]
    fn test_query_target_defaults() {
        assert_eq!(
            decode(json!({"function": "balance"})).unwrap(),
            Call::Balance { target: None }
        );
        assert_eq!(
            decode(json!({"function": "vaultBalance", "target": ""})).unwrap(),
            Call::VaultBalance { target: None }
        );
        let err = decode(json!({"function": "balance", "target": 42})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTarget);
    }

    #[test]
    fn test_unknown_function() {
        let err = decode(json!({"function": "mintEverything"})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownFunction);
    }

    #[test]
    fn test_vote_cast_kept_raw() {
        assert_eq!(
            decode(json!({"function": "vote", "id": 0, "cast": "abstain"})).unwrap(),
            Call::Vote {
                id: 0,
                cast: "abstain".into()
            }
        );
        let err = decode(json!({"function": "vote", "id": -1, "cast": "yay"})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_propose_fields_pass_through() {
        let call = decode(json!({
            "function": "propose",
            "type": "set",
            "key": "quorum",
            "value": 0.3,
            "note": "Lower quorum"
        }))
        .unwrap();

        assert_eq!(
            call,
            Call::Propose(ProposalInput::set("Lower quorum", "quorum", json!(0.3)))
        );
    }

    #[test]
    fn test_extend_null_is_missing() {
        assert_eq!(
            decode(json!({"function": "extend", "extension": null})).unwrap(),
            Call::Extend { extension: None }
        );
    }
}
