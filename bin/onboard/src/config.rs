use alloy_primitives::Address;
use config::{ChainConfig, Currency, CurrencyTable, CurrencyTableBuilder};
use onboarding::RefetchPolicy;
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Address overrides for one currency.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractOverride {
    pub token: Option<Address>,
    pub whitelist: Option<Address>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyOverrides {
    #[serde(default)]
    pub usdt: ContractOverride,
    #[serde(default)]
    pub epound: ContractOverride,
}

/// Top-level onboard configuration.
///
/// Every field has a default, an empty file is a valid config for BSC mainnet.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// BSC RPC endpoint url
    pub rpc_url: String,

    pub log_format: LogFormat,

    /// Serve Prometheus metrics on this port when set
    pub metrics_port: Option<u16>,

    /// Blocks to wait for after a transaction is included
    pub confirmations: u64,

    /// Wait before re-reading state after a confirmed transaction
    pub refetch_delay_ms: u64,

    /// Re-reads before giving up on seeing the new state
    pub refetch_attempts: usize,

    /// Currency used when none is given on the command line
    pub default_currency: Option<Currency>,

    /// Contract address overrides
    pub currencies: CurrencyOverrides,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc_url: ChainConfig::bsc().rpc_url,
            log_format: LogFormat::Text,
            metrics_port: None,
            confirmations: 1,
            refetch_delay_ms: 2_000,
            refetch_attempts: 5,
            default_currency: None,
            currencies: CurrencyOverrides::default(),
        }
    }
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config = Self::from_toml(&contents)?;
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;

        Ok(config)
    }

    /// Load `path` if given, else `config.toml` if present, else defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default_path = Path::new("config.toml");
                if default_path.exists() {
                    Self::from_file(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.rpc_url.trim().is_empty() {
            return Err(ConfigError::Invalid("rpc_url must not be empty".to_string()));
        }

        if self.confirmations == 0 {
            return Err(ConfigError::Invalid(
                "confirmations must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    pub fn chain(&self) -> ChainConfig {
        ChainConfig::bsc().with_rpc_url(self.rpc_url.clone())
    }

    /// Built-in currency table with the configured overrides applied.
    pub fn currency_table(&self) -> CurrencyTable {
        let overrides = [
            (Currency::Usdt, self.currencies.usdt),
            (Currency::Epound, self.currencies.epound),
        ];

        overrides
            .into_iter()
            .fold(CurrencyTableBuilder::new(), |builder, (currency, o)| {
                let builder = match o.token {
                    Some(token) => builder.token(currency, token),
                    None => builder,
                };
                match o.whitelist {
                    Some(whitelist) => builder.whitelist(currency, whitelist),
                    None => builder,
                }
            })
            .build()
    }

    pub fn refetch_policy(&self) -> RefetchPolicy {
        RefetchPolicy {
            delay: Duration::from_millis(self.refetch_delay_ms),
            retries: self.refetch_attempts,
            ..RefetchPolicy::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.rpc_url, "https://bsc-dataseed1.binance.org/");
        assert_eq!(config.log_format, LogFormat::Text);
        assert_eq!(config.confirmations, 1);
        assert_eq!(config.currency_table(), CurrencyTable::default());
        assert_eq!(config.refetch_policy().delay, Duration::from_secs(2));
    }

    #[test]
    fn test_currency_overrides() {
        let config = Config::from_toml(
            r#"
            default_currency = "EPOUND"

            [currencies.epound]
            token = "0x00000000000000000000000000000000000000e1"
            "#,
        )
        .unwrap();

        let table = config.currency_table();
        let epound = table.get(Currency::Epound);
        assert_eq!(config.default_currency, Some(Currency::Epound));
        assert_eq!(epound.token, address!("00000000000000000000000000000000000000e1"));
        assert_eq!(epound.whitelist, CurrencyTable::default().get(Currency::Epound).whitelist);
        assert!(epound.is_configured());
        assert_eq!(table.get(Currency::Usdt), CurrencyTable::default().get(Currency::Usdt));
    }

    #[test]
    fn test_rejects_zero_confirmations() {
        let err = Config::from_toml("confirmations = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_unknown_currency() {
        assert!(matches!(
            Config::from_toml("default_currency = \"DAI\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_refetch_policy() {
        let config = Config::from_toml(
            r#"
            refetch_delay_ms = 0
            refetch_attempts = 1
            log_format = "json"
            "#,
        )
        .unwrap();

        let policy = config.refetch_policy();
        assert!(policy.delay.is_zero());
        assert_eq!(policy.retries, 1);
        assert_eq!(config.log_format, LogFormat::Json);
    }
}
