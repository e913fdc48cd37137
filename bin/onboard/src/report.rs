//! Command output, as text or JSON.

use alloy_primitives::{Address, TxHash, U256};
use config::{AddressCheck, ChainConfig, Currency, CurrencyConfig};
use onboarding::{
    format::{format_address, format_allowance, format_token_amount},
    state::{TokenInfo, WhitelistInfo},
    Status, Step, TxOutcome,
};
use serde::Serialize;
use std::fmt;

/// Print `report` as pretty JSON or as text.
pub fn emit<T>(report: &T, json: bool) -> eyre::Result<()>
where
    T: Serialize + fmt::Display,
{
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        println!("{report}");
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub account: Option<Address>,
    pub currency: Option<Currency>,
    pub step: Step,
    pub step_number: u8,
    pub progress_percent: u8,
    pub next: &'static str,
    pub allowance: Option<String>,
    pub registered: Option<bool>,
    pub balance: Option<String>,
}

impl StatusReport {
    pub fn new(status: &Status, currency: Option<&CurrencyConfig>) -> Self {
        let step = status.step();
        let decimals = currency.map_or(18, |c| c.decimals);

        Self {
            account: status.account,
            currency: status.currency,
            step,
            step_number: step.number(),
            progress_percent: step.progress_percent(),
            next: step.label(),
            allowance: status.allowance.map(|a| format_allowance(a, decimals)),
            registered: status.registered,
            balance: status.balance.map(|b| format_token_amount(b, decimals)),
        }
    }
}

fn or_unknown<T: fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "unknown".to_string(), |v| v.to_string())
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let account = self
            .account
            .map_or_else(|| "not connected".to_string(), format_address);
        let currency = or_unknown(self.currency);

        writeln!(f, "Account:     {account}")?;
        writeln!(f, "Currency:    {currency}")?;
        writeln!(
            f,
            "Step:        {}/{} {} ({}%)",
            self.step_number.min(onboarding::step::STEP_COUNT),
            onboarding::step::STEP_COUNT,
            self.next,
            self.progress_percent
        )?;
        writeln!(f, "Allowance:   {}", or_unknown(self.allowance.as_deref()))?;
        writeln!(f, "Whitelisted: {}", or_unknown(self.registered))?;
        write!(f, "Balance:     {}", or_unknown(self.balance.as_deref()))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TxReport {
    pub action: &'static str,
    pub tx_hash: Option<TxHash>,
    pub explorer: Option<String>,
    pub block_number: Option<u64>,
    pub gas_used: Option<U256>,
}

impl TxReport {
    /// Report for an action; `None` means nothing had to be sent.
    pub fn new(action: &'static str, outcome: Option<&TxOutcome>, chain: &ChainConfig) -> Self {
        Self {
            action,
            tx_hash: outcome.map(|o| o.tx_hash),
            explorer: outcome.map(|o| chain.tx_url(o.tx_hash)),
            block_number: outcome.and_then(|o| o.block_number),
            gas_used: outcome.and_then(|o| o.gas_used),
        }
    }
}

impl fmt::Display for TxReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.tx_hash, &self.explorer) {
            (Some(tx_hash), Some(explorer)) => {
                writeln!(f, "{}: confirmed", self.action)?;
                writeln!(f, "Transaction: {tx_hash}")?;
                if let Some(block) = self.block_number {
                    writeln!(f, "Block:       {block}")?;
                }
                write!(f, "Explorer:    {explorer}")
            }
            _ => write!(f, "{}: nothing to do", self.action),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InfoReport {
    pub currency: Currency,
    pub token_address: Address,
    pub whitelist_address: Address,
    /// Explorer link of the whitelist contract
    pub explorer: String,
    pub token: Option<TokenInfo>,
    pub whitelist: WhitelistInfo,
}

impl fmt::Display for InfoReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Currency:   {}", self.currency)?;
        match &self.token {
            Some(token) => {
                writeln!(
                    f,
                    "Token:      {} ({}) at {}",
                    token.name, token.symbol, self.token_address
                )?;
                writeln!(f, "Decimals:   {}", token.decimals)?;
                writeln!(
                    f,
                    "Supply:     {}",
                    format_token_amount(token.total_supply, token.decimals)
                )?;
            }
            None => writeln!(f, "Token:      not configured")?,
        }
        writeln!(f, "Whitelist:  {}", self.whitelist_address)?;
        writeln!(f, "Explorer:   {}", self.explorer)?;
        write!(f, "Registered: {}", self.whitelist.total_registered)?;
        for user in &self.whitelist.registered {
            write!(f, "\n  {user}")?;
        }
        if let Some(balance) = self.whitelist.user_balance {
            write!(f, "\nUser balance:   {balance}")?;
        }
        if let Some(allowance) = self.whitelist.user_allowance {
            write!(f, "\nUser allowance: {allowance}")?;
        }
        Ok(())
    }
}

/// One row of the `check` command.
#[derive(Debug, Clone, Serialize)]
pub struct CheckRow {
    #[serde(flatten)]
    pub addresses: AddressCheck,
    pub token_name: Option<String>,
    pub token_symbol: Option<String>,
    pub allowance: Option<String>,
    pub registered: Option<bool>,
    /// Read failure, if any
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub account: Option<Address>,
    pub currencies: Vec<CheckRow>,
}

impl CheckReport {
    pub fn is_healthy(&self) -> bool {
        self.currencies
            .iter()
            .all(|row| row.addresses.token_ok && row.addresses.whitelist_ok && row.error.is_none())
    }
}

impl fmt::Display for CheckReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = |ok: bool| if ok { "ok" } else { "MISSING" };

        for (i, row) in self.currencies.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            writeln!(f, "[{}]", row.addresses.currency)?;
            writeln!(f, "  token:       {}", mark(row.addresses.token_ok))?;
            writeln!(f, "  whitelist:   {}", mark(row.addresses.whitelist_ok))?;
            if let (Some(name), Some(symbol)) = (&row.token_name, &row.token_symbol) {
                writeln!(f, "  token name:  {name} ({symbol})")?;
            }
            if self.account.is_some() {
                writeln!(f, "  allowance:   {}", or_unknown(row.allowance.as_deref()))?;
                writeln!(f, "  whitelisted: {}", or_unknown(row.registered))?;
            }
            if let Some(error) = &row.error {
                writeln!(f, "  error:       {error}")?;
            }
        }
        write!(
            f,
            "Overall: {}",
            if self.is_healthy() { "ok" } else { "issues found" }
        )
    }
}
