pub mod config;
pub mod metrics;
pub mod report;

use alloy_primitives::{Address, U256};
use alloy_provider::Provider;
use ::config::{ChainConfig, CurrencyConfig, CurrencyTable};
use onboarding::{format::parse_token_amount, StateReader};
use report::{CheckReport, CheckRow, InfoReport};
use tracing::warn;

/// Allowance requested on the command line: unlimited unless an amount is
/// given, zero when revoking.
pub fn approval_amount(
    amount: Option<&str>,
    revoke: bool,
    currency: &CurrencyConfig,
) -> eyre::Result<U256> {
    if revoke {
        return Ok(U256::ZERO);
    }

    match amount {
        Some(amount) => Ok(parse_token_amount(amount, currency.decimals)?),
        None => Ok(U256::MAX),
    }
}

/// Token metadata and whitelist statistics for one currency.
pub async fn currency_info<P>(
    reader: &StateReader<P>,
    chain: &ChainConfig,
    currency: &CurrencyConfig,
    user: Option<Address>,
) -> eyre::Result<InfoReport>
where
    P: Provider + Clone,
{
    let token = if currency.token == Address::ZERO {
        warn!(currency = %currency.currency, "Token contract not configured");
        None
    } else {
        Some(reader.token_info(currency).await?)
    };

    let whitelist = reader.whitelist_info(currency, user).await?;

    Ok(InfoReport {
        currency: currency.currency,
        token_address: currency.token,
        whitelist_address: currency.whitelist,
        explorer: chain.address_url(currency.whitelist),
        token,
        whitelist,
    })
}

/// Validate every currency's addresses and read what can be read.
///
/// Read failures are recorded per currency instead of aborting the check.
pub async fn check_currencies<P>(
    reader: &StateReader<P>,
    table: &CurrencyTable,
    account: Option<Address>,
) -> CheckReport
where
    P: Provider + Clone,
{
    let mut rows = Vec::new();

    for (addresses, currency) in table.validate().into_iter().zip(table.iter()) {
        let mut row = CheckRow {
            addresses,
            token_name: None,
            token_symbol: None,
            allowance: None,
            registered: None,
            error: None,
        };

        if let Err(e) = check_currency(reader, currency, account, &mut row).await {
            warn!(currency = %currency.currency, error = %e, "Currency check failed");
            row.error = Some(e.to_string());
        }

        rows.push(row);
    }

    CheckReport {
        account,
        currencies: rows,
    }
}

async fn check_currency<P>(
    reader: &StateReader<P>,
    currency: &CurrencyConfig,
    account: Option<Address>,
    row: &mut CheckRow,
) -> eyre::Result<()>
where
    P: Provider + Clone,
{
    if row.addresses.token_ok {
        let info = reader.token_info(currency).await?;
        row.token_name = Some(info.name);
        row.token_symbol = Some(info.symbol);
    }

    if account.is_some() {
        let status = reader.status(account, Some(currency)).await?;
        row.allowance = status
            .allowance
            .map(|a| onboarding::format::format_allowance(a, currency.decimals));
        row.registered = status.registered;
    }

    Ok(())
}
