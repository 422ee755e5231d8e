use crate::{GovernanceError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info};
use vaultdao_ledger::LockBounds;
use vaultdao_types::Address;

pub const DEFAULT_QUORUM: f64 = 0.5;
pub const DEFAULT_SUPPORT: f64 = 0.5;
pub const DEFAULT_VOTE_LENGTH: u64 = 2000;
pub const DEFAULT_LOCK_MIN_LENGTH: u64 = 5;
pub const DEFAULT_LOCK_MAX_LENGTH: u64 = 720;

const THRESHOLD_MIN: f64 = 0.01;
const THRESHOLD_MAX: f64 = 0.99;

/// Governable protocol settings.
///
/// The five typed fields drive ledger and voting behavior. Any other key a
/// passed `set` proposal writes lands in `extra` and is carried verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub quorum: f64,
    pub support: f64,
    pub vote_length: u64,
    pub lock_min_length: u64,
    pub lock_max_length: u64,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            quorum: DEFAULT_QUORUM,
            support: DEFAULT_SUPPORT,
            vote_length: DEFAULT_VOTE_LENGTH,
            lock_min_length: DEFAULT_LOCK_MIN_LENGTH,
            lock_max_length: DEFAULT_LOCK_MAX_LENGTH,
            extra: BTreeMap::new(),
        }
    }
}

impl Settings {
    pub fn lock_bounds(&self) -> LockBounds {
        LockBounds::new(self.lock_min_length, self.lock_max_length)
    }

    /// Look up any setting, typed or custom, as JSON.
    pub fn get(&self, key: &str) -> Option<Value> {
        match key {
            "quorum" => Some(number_value(self.quorum)),
            "support" => Some(number_value(self.support)),
            "voteLength" => Some(Value::from(self.vote_length)),
            "lockMinLength" => Some(Value::from(self.lock_min_length)),
            "lockMaxLength" => Some(Value::from(self.lock_max_length)),
            other => self.extra.get(other).cloned(),
        }
    }

    /// Check that a typed configuration is internally consistent.
    pub fn validate(&self) -> Result<()> {
        check_threshold("quorum", self.quorum)?;
        check_threshold("support", self.support)?;
        if self.vote_length == 0 {
            return Err(invalid("voteLength", "must be a positive integer"));
        }
        if self.lock_min_length < 1 || self.lock_min_length >= self.lock_max_length {
            return Err(invalid(
                "lockMinLength",
                "cannot be less than 1 and cannot be equal or greater than lockMaxLength",
            ));
        }
        for key in self.extra.keys() {
            if is_reserved(key) {
                return Err(invalid(key, "reserved key cannot be a custom setting"));
            }
        }
        Ok(())
    }

    /// Validate a `set` proposal against the settings in force now.
    ///
    /// Returns the value to store on the proposal: numeric keys are coerced.
    pub fn validate_change(
        &self,
        key: &str,
        value: Option<&Value>,
        recipient: Option<&Address>,
    ) -> Result<SettingChange> {
        let raw = value.cloned().unwrap_or(Value::Null);

        let change = match key {
            "quorum" | "support" => {
                let coerced = coerce_number(&raw).unwrap_or(f64::NAN);
                check_threshold(key, coerced)?;
                SettingChange::new(key, number_value(coerced))
            }
            "lockMinLength" => {
                let length = coerce_integer(&raw)
                    .filter(|v| *v >= 1 && *v < self.lock_max_length)
                    .ok_or_else(|| {
                        invalid(
                            key,
                            "cannot be less than 1 and cannot be equal or greater than lockMaxLength",
                        )
                    })?;
                SettingChange::new(key, Value::from(length))
            }
            "lockMaxLength" => {
                let length = coerce_integer(&raw)
                    .filter(|v| *v > self.lock_min_length)
                    .ok_or_else(|| {
                        invalid(key, "cannot be less than or equal to lockMinLength")
                    })?;
                SettingChange::new(key, Value::from(length))
            }
            "voteLength" => {
                let length = coerce_integer(&raw)
                    .filter(|v| *v >= 1)
                    .ok_or_else(|| invalid(key, "must be a positive integer"))?;
                SettingChange::new(key, Value::from(length))
            }
            "role" => {
                let recipient = recipient.ok_or(GovernanceError::MissingRecipient)?;
                if !raw.is_string() {
                    return Err(invalid(key, "role must be a string"));
                }
                SettingChange {
                    key: key.to_string(),
                    value: raw,
                    recipient: Some(recipient.clone()),
                }
            }
            custom => SettingChange::new(custom, raw),
        };

        debug!(key, value = %change.value, "Setting change validated");
        Ok(change)
    }

    /// Write a passed change. Roles are not settings and are handled by the caller.
    pub fn apply(&mut self, change: &SettingChange) -> Result<()> {
        let key = change.key.as_str();
        match key {
            "quorum" => self.quorum = stored_number(key, &change.value)?,
            "support" => self.support = stored_number(key, &change.value)?,
            "voteLength" => self.vote_length = stored_integer(key, &change.value)?,
            "lockMinLength" => self.lock_min_length = stored_integer(key, &change.value)?,
            "lockMaxLength" => self.lock_max_length = stored_integer(key, &change.value)?,
            "role" => return Err(invalid(key, "roles are not stored in settings")),
            custom => {
                self.extra.insert(custom.to_string(), change.value.clone());
            }
        }

        info!(key, value = %change.value, "⚙️ Setting updated");
        Ok(())
    }
}

/// Key/value written by a `set` proposal, with the recipient for roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingChange {
    pub key: String,
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<Address>,
}

impl SettingChange {
    fn new(key: &str, value: Value) -> Self {
        Self {
            key: key.to_string(),
            value,
            recipient: None,
        }
    }

    pub fn is_role(&self) -> bool {
        self.key == "role"
    }
}

/// Numeric coercion for loosely typed input: numbers pass through, numeric
/// strings are parsed (blank strings are zero), booleans and null map to
/// 1/0. Anything else is not a number.
pub fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Some(0.0)
            } else {
                trimmed.parse::<f64>().ok().filter(|v| !v.is_nan())
            }
        }
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Null => Some(0.0),
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// Coerce and require a non-negative integer.
pub fn coerce_integer(value: &Value) -> Option<u64> {
    if let Some(v) = value.as_u64() {
        return Some(v);
    }
    let f = coerce_number(value)?;
    if f.is_finite() && f.fract() == 0.0 && f >= 0.0 && f <= u64::MAX as f64 {
        Some(f as u64)
    } else {
        None
    }
}

fn is_reserved(key: &str) -> bool {
    matches!(
        key,
        "quorum" | "support" | "voteLength" | "lockMinLength" | "lockMaxLength" | "role"
    )
}

fn check_threshold(key: &str, value: f64) -> Result<()> {
    if value.is_nan() || !(THRESHOLD_MIN..=THRESHOLD_MAX).contains(&value) {
        return Err(invalid(key, "must be between 0.01 and 0.99"));
    }
    Ok(())
}

fn number_value(v: f64) -> Value {
    serde_json::Number::from_f64(v)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

fn stored_number(key: &str, value: &Value) -> Result<f64> {
    value
        .as_f64()
        .ok_or_else(|| invalid(key, "stored value is not a number"))
}

fn stored_integer(key: &str, value: &Value) -> Result<u64> {
    value
        .as_u64()
        .ok_or_else(|| invalid(key, "stored value is not an integer"))
}

fn invalid(key: &str, reason: &str) -> GovernanceError {
    GovernanceError::InvalidSetting {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.quorum, 0.5);
        assert_eq!(settings.support, 0.5);
        assert_eq!(settings.vote_length, 2000);
        assert_eq!(settings.lock_bounds(), LockBounds::new(5, 720));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_threshold_coercion() {
        let settings = Settings::default();

        let change = settings
            .validate_change("quorum", Some(&json!("0.3")), None)
            .unwrap();
        assert_eq!(change.value, json!(0.3));

        assert!(settings
            .validate_change("support", Some(&json!(0.01)), None)
            .is_ok());
        assert!(settings
            .validate_change("support", Some(&json!(0.99)), None)
            .is_ok());
        assert!(settings
            .validate_change("quorum", Some(&json!(1.0)), None)
            .is_err());
        assert!(settings
            .validate_change("quorum", Some(&json!("abc")), None)
            .is_err());
        assert!(settings.validate_change("quorum", None, None).is_err());
    }

    #[test]
    fn test_lock_length_rules_use_current_bounds() {
        let settings = Settings::default();

        assert_eq!(
            settings
                .validate_change("lockMinLength", Some(&json!(719)), None)
                .unwrap()
                .value,
            json!(719)
        );
        assert!(settings
            .validate_change("lockMinLength", Some(&json!(720)), None)
            .is_err());
        assert!(settings
            .validate_change("lockMinLength", Some(&json!(0)), None)
            .is_err());
        assert!(settings
            .validate_change("lockMinLength", Some(&json!(2.5)), None)
            .is_err());

        assert!(settings
            .validate_change("lockMaxLength", Some(&json!(6)), None)
            .is_ok());
        assert!(settings
            .validate_change("lockMaxLength", Some(&json!(5)), None)
            .is_err());
    }

    #[test]
    fn test_vote_length_must_be_positive_integer() {
        let settings = Settings::default();
        assert_eq!(
            settings
                .validate_change("voteLength", Some(&json!("10")), None)
                .unwrap()
                .value,
            json!(10)
        );
        assert!(settings
            .validate_change("voteLength", Some(&json!(0)), None)
            .is_err());
    }

    #[test]
    fn test_role_requires_recipient_and_string() {
        let settings = Settings::default();
        let admin = Address::new("admin");

        assert!(matches!(
            settings.validate_change("role", Some(&json!("MAIN")), None),
            Err(GovernanceError::MissingRecipient)
        ));
        assert!(matches!(
            settings.validate_change("role", Some(&json!(5)), Some(&admin)),
            Err(GovernanceError::InvalidSetting { .. })
        ));

        let change = settings
            .validate_change("role", Some(&json!("MAIN")), Some(&admin))
            .unwrap();
        assert!(change.is_role());
        assert_eq!(change.recipient, Some(admin));
    }

    #[test]
    fn test_apply_typed_and_custom() {
        let mut settings = Settings::default();

        let quorum = settings
            .validate_change("quorum", Some(&json!(0.3)), None)
            .unwrap();
        settings.apply(&quorum).unwrap();
        assert_eq!(settings.quorum, 0.3);

        let custom = settings
            .validate_change("customKey", Some(&json!(["custom", "value"])), None)
            .unwrap();
        settings.apply(&custom).unwrap();
        assert_eq!(settings.get("customKey"), Some(json!(["custom", "value"])));
        assert_eq!(settings.get("voteLength"), Some(json!(2000)));
    }

    #[test]
    fn test_serialized_shape() {
        let mut settings = Settings::default();
        settings.extra.insert("communityLogo".into(), json!("logo.png"));

        let value = serde_json::to_value(&settings).unwrap();
        assert_eq!(value["lockMinLength"], json!(5));
        assert_eq!(value["communityLogo"], json!("logo.png"));

        let back: Settings = serde_json::from_value(value).unwrap();
        assert_eq!(back, settings);
    }

    #[test]
    fn test_coerce_number() {
        assert_eq!(coerce_number(&json!(" 0.25 ")), Some(0.25));
        assert_eq!(coerce_number(&json!("")), Some(0.0));
        assert_eq!(coerce_number(&json!(true)), Some(1.0));
        assert_eq!(coerce_number(&json!(null)), Some(0.0));
        assert_eq!(coerce_number(&json!("1x")), None);
        assert_eq!(coerce_number(&json!({"a": 1})), None);
        assert_eq!(coerce_integer(&json!("12")), Some(12));
        assert_eq!(coerce_integer(&json!(-1)), None);
    }
}
