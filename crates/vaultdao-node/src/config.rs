use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};
use vaultdao_governance::{DaoState, Settings};
use vaultdao_ledger::TokenAmount;
use vaultdao_types::Address;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub genesis: GenesisConfig,
    #[serde(default)]
    pub replay: ReplayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    /// `pretty`, `compact` or `json`
    pub format: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_output: Option<PathBuf>,
    #[serde(default)]
    pub module_filters: BTreeMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file_output: None,
            module_filters: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenesisConfig {
    pub name: String,
    pub ticker: String,
    #[serde(default)]
    pub settings: Settings,
    /// Initial ledger balances, address to units.
    #[serde(default)]
    pub allocations: BTreeMap<String, u64>,
}

impl Default for GenesisConfig {
    fn default() -> Self {
        Self {
            name: "Mydao".to_string(),
            ticker: "MDAO".to_string(),
            settings: Settings::default(),
            allocations: BTreeMap::from([("admin".to_string(), 10_000_000)]),
        }
    }
}

impl GenesisConfig {
    pub fn build_state(&self) -> Result<DaoState> {
        let allocations = self
            .allocations
            .iter()
            .map(|(address, units)| (Address::new(address.as_str()), TokenAmount::from_units(*units)));

        DaoState::genesis(&self.name, &self.ticker, self.settings.clone(), allocations)
            .context("Invalid genesis configuration")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplayConfig {
    /// Abort the replay on the first rejected call instead of logging it.
    #[serde(default)]
    pub stop_on_error: bool,
}

impl NodeConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        // Env overrides are applied by the caller so it controls precedence
        Ok(config)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(level) = env::var("VAULTDAO_LOG_LEVEL") {
            if !level.is_empty() {
                self.logging.level = level;
            }
        }
        if let Ok(format) = env::var("VAULTDAO_LOG_FORMAT") {
            if !format.is_empty() {
                self.logging.format = format;
            }
        }
        if let Ok(stop) = env::var("VAULTDAO_STOP_ON_ERROR") {
            self.replay.stop_on_error = matches!(stop.as_str(), "1" | "true" | "yes");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_env_overrides() {
        env::set_var("VAULTDAO_LOG_LEVEL", "debug");
        env::set_var("VAULTDAO_LOG_FORMAT", "json");
        env::set_var("VAULTDAO_STOP_ON_ERROR", "true");

        let mut config = NodeConfig::default();
        config.apply_env_overrides();

        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "json");
        assert!(config.replay.stop_on_error);

        env::remove_var("VAULTDAO_LOG_LEVEL");
        env::remove_var("VAULTDAO_LOG_FORMAT");
        env::remove_var("VAULTDAO_STOP_ON_ERROR");
    }

    #[test]
    fn test_default_genesis_builds() {
        let state = GenesisConfig::default().build_state().unwrap();
        assert_eq!(state.name, "Mydao");
        assert_eq!(state.total_supply().unwrap().units(), 10_000_000);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: NodeConfig = toml::from_str(
            r#"
            [genesis]
            name = "Guild"
            ticker = "GLD"

            [genesis.settings]
            quorum = 0.3
            support = 0.6
            voteLength = 10
            lockMinLength = 1
            lockMaxLength = 100

            [genesis.allocations]
            alice = 500
            "#,
        )
        .unwrap();

        assert_eq!(config.logging.level, "info");
        assert!(!config.replay.stop_on_error);
        assert_eq!(config.genesis.settings.quorum, 0.3);
        assert_eq!(config.genesis.settings.vote_length, 10);
        assert_eq!(config.genesis.allocations.get("alice"), Some(&500));
    }

    #[test]
    fn test_invalid_genesis_settings_rejected() {
        let genesis = GenesisConfig {
            settings: Settings {
                lock_min_length: 50,
                lock_max_length: 10,
                ..Settings::default()
            },
            ..GenesisConfig::default()
        };
        assert!(genesis.build_state().is_err());
    }
}
