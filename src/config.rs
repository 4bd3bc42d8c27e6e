//! Configuration for the transaction backend.
//!
//! Loads tuning knobs from TOML files with environment variable substitution.

use anyhow::{Context, Result};
use ethers::types::U256;
use serde::Deserialize;
use std::env;
use std::path::Path;

/// Tuning knobs for [`TransactionBackend`](crate::TransactionBackend).
///
/// Every field has a default, so an empty TOML table is a valid config.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Percentage added on top of the node's gas price suggestion.
    pub gas_markup_percent: u64,
    /// How long a gas price suggestion is served from cache, in seconds.
    pub gas_price_ttl_secs: u64,
    /// Ceiling for returned gas prices, in gwei. Absent means unbounded.
    pub max_gas_price_gwei: Option<u64>,
    /// Gap between local and server nonce that forces a resync.
    pub max_nonce_drift: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            gas_markup_percent: 10,
            gas_price_ttl_secs: 60,
            max_gas_price_gwei: None,
            max_nonce_drift: 50,
        }
    }
}

impl BackendConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        // Substitute environment variables
        let raw = substitute_env_vars(&raw);

        let config: BackendConfig =
            toml::from_str(&raw).with_context(|| "Failed to parse configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_nonce_drift == 0 {
            anyhow::bail!("max_nonce_drift must be positive");
        }
        if self.gas_markup_percent > 100 {
            anyhow::bail!("gas_markup_percent above 100 is not supported");
        }
        Ok(())
    }

    /// Configured gas price ceiling converted to wei.
    pub fn max_gas_price_wei(&self) -> Option<U256> {
        self.max_gas_price_gwei
            .map(|gwei| U256::from(gwei) * U256::from(1_000_000_000u64))
    }
}

/// Substitute environment variables in the format ${VAR_NAME}
fn substitute_env_vars(input: &str) -> String {
    let mut result = input.to_string();
    let re = regex::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap();

    for cap in re.captures_iter(input) {
        let var_name = &cap[1];
        let var_value = env::var(var_name).unwrap_or_default();
        result = result.replace(&cap[0], &var_value);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = BackendConfig::default();
        assert_eq!(config.gas_markup_percent, 10);
        assert_eq!(config.gas_price_ttl_secs, 60);
        assert_eq!(config.max_nonce_drift, 50);
        assert!(config.max_gas_price_gwei.is_none());
        assert!(config.max_gas_price_wei().is_none());
    }

    #[test]
    fn test_env_var_substitution() {
        env::set_var("TEST_MAX_DRIFT", "25");
        let input = "max_nonce_drift = ${TEST_MAX_DRIFT}";
        let result = substitute_env_vars(input);
        assert_eq!(result, "max_nonce_drift = 25");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "gas_markup_percent = 15").unwrap();
        writeln!(file, "max_gas_price_gwei = 200").unwrap();

        let config = BackendConfig::load(file.path()).unwrap();
        assert_eq!(config.gas_markup_percent, 15);
        assert_eq!(config.max_gas_price_gwei, Some(200));
        // unset fields keep their defaults
        assert_eq!(config.max_nonce_drift, 50);
        assert_eq!(
            config.max_gas_price_wei(),
            Some(U256::from(200_000_000_000u64))
        );
    }

    #[test]
    fn test_validate_rejects_zero_drift() {
        let config = BackendConfig {
            max_nonce_drift: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
