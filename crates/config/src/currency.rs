//! Supported currencies and their contract pairs.
//!
//! Every currency is a (token, whitelist) pair on BSC: the user approves the
//! whitelist contract on the token, then registers with the whitelist.

use alloy_primitives::{address, Address};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// A currency the user can onboard with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usdt,
    Epound,
}

impl Currency {
    /// All supported currencies, in display order.
    pub const ALL: [Self; 2] = [Self::Usdt, Self::Epound];

    /// Ticker symbol.
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::Usdt => "USDT",
            Self::Epound => "EPOUND",
        }
    }

    /// Name used in user-facing messages.
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::Usdt => "USDT",
            Self::Epound => "ePound",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported currency `{0}` (expected USDT or EPOUND)")]
pub struct ParseCurrencyError(String);

impl FromStr for Currency {
    type Err = ParseCurrencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "usdt" => Ok(Self::Usdt),
            "epound" | "e-pound" => Ok(Self::Epound),
            other => Err(ParseCurrencyError(other.to_string())),
        }
    }
}

/// Token and whitelist contracts for one currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CurrencyConfig {
    pub currency: Currency,
    /// Token name as listed on the token contract
    pub name: &'static str,
    pub symbol: &'static str,
    /// Token decimals
    pub decimals: u8,
    /// ERC20 token contract
    pub token: Address,
    /// Whitelist contract (also the approved spender)
    pub whitelist: Address,
}

impl CurrencyConfig {
    /// Binance-Peg BSC-USD.
    pub const fn usdt() -> Self {
        Self {
            currency: Currency::Usdt,
            name: "Tether USD",
            symbol: "USDT",
            decimals: 18,
            // https://bscscan.com/address/0x55d398326f99059ff775485246999027b3197955
            token: address!("0x55d398326f99059ff775485246999027b3197955"),
            whitelist: address!("0xe2ba9bcac21eb68f86938d166802283ac57c7530"),
        }
    }

    /// ePound. The token is not deployed yet, so its address is zero until
    /// overridden.
    pub const fn epound() -> Self {
        Self {
            currency: Currency::Epound,
            name: "E-Pound",
            symbol: "EPOUND",
            decimals: 18,
            token: Address::ZERO,
            whitelist: address!("0x114874b13f6172fcd7b0c3b308c3a006876e8333"),
        }
    }

    /// Whether both contract addresses are set.
    pub fn is_configured(&self) -> bool {
        self.token != Address::ZERO && self.whitelist != Address::ZERO
    }
}

/// Result of checking one currency's addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AddressCheck {
    pub currency: Currency,
    pub token_ok: bool,
    pub whitelist_ok: bool,
}

/// The table of supported currencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CurrencyTable {
    usdt: CurrencyConfig,
    epound: CurrencyConfig,
}

impl CurrencyTable {
    /// Table with the deployed defaults.
    pub const fn new() -> Self {
        Self {
            usdt: CurrencyConfig::usdt(),
            epound: CurrencyConfig::epound(),
        }
    }

    /// Contracts for `currency`.
    pub const fn get(&self, currency: Currency) -> &CurrencyConfig {
        match currency {
            Currency::Usdt => &self.usdt,
            Currency::Epound => &self.epound,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &CurrencyConfig> {
        [&self.usdt, &self.epound].into_iter()
    }

    /// Check every currency for zero addresses.
    pub fn validate(&self) -> Vec<AddressCheck> {
        self.iter()
            .map(|c| AddressCheck {
                currency: c.currency,
                token_ok: c.token != Address::ZERO,
                whitelist_ok: c.whitelist != Address::ZERO,
            })
            .collect()
    }

    /// Currencies that cannot be used until an address is configured.
    pub fn unconfigured(&self) -> Vec<Currency> {
        self.iter()
            .filter(|c| !c.is_configured())
            .map(|c| c.currency)
            .collect()
    }
}

impl Default for CurrencyTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for a currency table with address overrides.
#[derive(Debug, Clone)]
pub struct CurrencyTableBuilder {
    table: CurrencyTable,
}

impl CurrencyTableBuilder {
    /// Start with the deployed defaults.
    pub const fn new() -> Self {
        Self {
            table: CurrencyTable::new(),
        }
    }

    /// Override the token contract of `currency`.
    pub const fn token(mut self, currency: Currency, address: Address) -> Self {
        match currency {
            Currency::Usdt => self.table.usdt.token = address,
            Currency::Epound => self.table.epound.token = address,
        }
        self
    }

    /// Override the whitelist contract of `currency`.
    pub const fn whitelist(mut self, currency: Currency, address: Address) -> Self {
        match currency {
            Currency::Usdt => self.table.usdt.whitelist = address,
            Currency::Epound => self.table.epound.whitelist = address,
        }
        self
    }

    /// Build the currency table.
    pub const fn build(self) -> CurrencyTable {
        self.table
    }
}

impl Default for CurrencyTableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table() {
        let table = CurrencyTable::new();

        let usdt = table.get(Currency::Usdt);
        assert_eq!(usdt.symbol, "USDT");
        assert_eq!(usdt.decimals, 18);
        assert_eq!(
            usdt.whitelist,
            address!("e2ba9bcac21eb68f86938d166802283ac57c7530")
        );
        assert!(usdt.is_configured());

        let epound = table.get(Currency::Epound);
        assert_eq!(epound.name, "E-Pound");
        assert_eq!(epound.token, Address::ZERO);
        assert!(!epound.is_configured());
    }

    #[test]
    fn test_each_currency_has_distinct_whitelist() {
        let table = CurrencyTable::new();
        assert_ne!(
            table.get(Currency::Usdt).whitelist,
            table.get(Currency::Epound).whitelist
        );
    }

    #[test]
    fn test_validate_flags_placeholder_token() {
        let checks = CurrencyTable::new().validate();
        assert_eq!(checks.len(), 2);
        assert!(checks[0].token_ok && checks[0].whitelist_ok);
        assert!(!checks[1].token_ok);
        assert!(checks[1].whitelist_ok);

        assert_eq!(CurrencyTable::new().unconfigured(), vec![Currency::Epound]);
    }

    #[test]
    fn test_builder_overrides() {
        let token = address!("1111111111111111111111111111111111111111");
        let table = CurrencyTableBuilder::new()
            .token(Currency::Epound, token)
            .build();

        assert_eq!(table.get(Currency::Epound).token, token);
        assert!(table.unconfigured().is_empty());
        // untouched entries keep their defaults
        assert_eq!(table.get(Currency::Usdt), &CurrencyConfig::usdt());
    }

    #[test]
    fn test_parse_currency() {
        assert_eq!("USDT".parse::<Currency>(), Ok(Currency::Usdt));
        assert_eq!(" usdt ".parse::<Currency>(), Ok(Currency::Usdt));
        assert_eq!("ePound".parse::<Currency>(), Ok(Currency::Epound));
        assert_eq!("e-pound".parse::<Currency>(), Ok(Currency::Epound));

        let err = "btc".parse::<Currency>().unwrap_err();
        assert!(err.to_string().contains("btc"));
    }

    #[test]
    fn test_currency_serde_uses_symbol() {
        #[derive(Deserialize)]
        struct Wrapper {
            currency: Currency,
        }

        let parsed: Wrapper = toml::from_str(r#"currency = "EPOUND""#).unwrap();
        assert_eq!(parsed.currency, Currency::Epound);
        assert_eq!(Currency::Epound.to_string(), "EPOUND");
        assert_eq!(Currency::Epound.display_name(), "ePound");
    }
}
