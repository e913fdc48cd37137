//! On-chain state reads.
//!
//! Everything the step derivation needs comes from two contracts per
//! currency: the token (`allowance`, `balanceOf`) and the whitelist
//! (`checkIfRegistered`). Reads against an address that is not configured are
//! skipped and reported as unknown.

use crate::step::Step;
use alloy_primitives::{Address, U256};
use alloy_provider::Provider;
use binding::{token::IERC20, whitelist::IWhitelist};
use config::{Currency, CurrencyConfig};
use eyre::Result;
use serde::Serialize;
use std::time::Duration;
use tokio_retry::{strategy::ExponentialBackoff, Retry};
use tracing::{debug, warn};

/// What is known about an account for one currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Status {
    /// Connected (or watched) account
    pub account: Option<Address>,
    pub currency: Option<Currency>,
    /// Allowance granted to the currency's whitelist contract
    pub allowance: Option<U256>,
    /// Registration flag on the currency's whitelist contract
    pub registered: Option<bool>,
    /// Token balance of the account
    pub balance: Option<U256>,
}

impl Status {
    /// Nothing known: no account, no currency.
    pub const fn disconnected() -> Self {
        Self {
            account: None,
            currency: None,
            allowance: None,
            registered: None,
            balance: None,
        }
    }

    pub fn step(&self) -> Step {
        Step::derive(
            self.account.is_some(),
            self.currency,
            self.allowance,
            self.registered,
        )
    }
}

/// Token metadata as reported by the token contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenInfo {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub total_supply: U256,
}

/// Registry statistics of a whitelist contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WhitelistInfo {
    pub total_registered: U256,
    pub registered: Vec<Address>,
    /// `checkbalance(user)`, when a user was given
    pub user_balance: Option<U256>,
    /// `checkAllowance(user)`, when a user was given
    pub user_allowance: Option<U256>,
}

/// How to re-read state after a confirmed transaction.
///
/// Nodes behind a load balancer may serve the confirming block late, so the
/// first re-read waits `delay`, later ones back off exponentially.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefetchPolicy {
    /// Wait before the first re-read
    pub delay: Duration,
    /// Re-reads after the first one
    pub retries: usize,
    /// Backoff unit; the n-th retry waits `2^n * factor` milliseconds
    pub backoff_factor_ms: u64,
    /// Upper bound for a single backoff
    pub max_backoff: Duration,
}

impl RefetchPolicy {
    /// Re-read immediately, once per call. Used when the node is local.
    pub const fn immediate() -> Self {
        Self {
            delay: Duration::ZERO,
            retries: 0,
            backoff_factor_ms: 0,
            max_backoff: Duration::ZERO,
        }
    }

    fn strategy(&self) -> impl Iterator<Item = Duration> {
        ExponentialBackoff::from_millis(2)
            .factor(self.backoff_factor_ms)
            .max_delay(self.max_backoff)
            .take(self.retries)
    }
}

impl Default for RefetchPolicy {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(2),
            retries: 5,
            backoff_factor_ms: 250,
            max_backoff: Duration::from_secs(8),
        }
    }
}

/// Reads onboarding state from the token and whitelist contracts.
#[derive(Debug, Clone)]
pub struct StateReader<P> {
    provider: P,
}

impl<P> StateReader<P>
where
    P: Provider + Clone,
{
    pub const fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Allowance `owner` granted to the currency's whitelist contract.
    pub async fn allowance(&self, currency: &CurrencyConfig, owner: Address) -> Result<U256> {
        ensure_token(currency)?;
        debug!(
            "Querying allowance: token={}, owner={}, spender={}",
            currency.token, owner, currency.whitelist
        );

        let token = IERC20::new(currency.token, &self.provider);
        let allowance = token.allowance(owner, currency.whitelist).call().await?;
        Ok(allowance)
    }

    /// Whether `user` is registered on the currency's whitelist.
    pub async fn is_registered(&self, currency: &CurrencyConfig, user: Address) -> Result<bool> {
        ensure_whitelist(currency)?;
        debug!(
            "Querying registration: whitelist={}, user={}",
            currency.whitelist, user
        );

        let whitelist = IWhitelist::new(currency.whitelist, &self.provider);
        let registered = whitelist.checkIfRegistered(user).call().await?;
        Ok(registered)
    }

    pub async fn token_balance(&self, currency: &CurrencyConfig, holder: Address) -> Result<U256> {
        ensure_token(currency)?;
        debug!("Querying {} balance: holder={}", currency.symbol, holder);

        let token = IERC20::new(currency.token, &self.provider);
        let balance = token.balanceOf(holder).call().await?;
        Ok(balance)
    }

    /// Read everything the step derivation needs.
    ///
    /// Without an account or a currency nothing is read. Values behind an
    /// unconfigured address stay `None`.
    pub async fn status(
        &self,
        account: Option<Address>,
        currency: Option<&CurrencyConfig>,
    ) -> Result<Status> {
        let (Some(account), Some(currency)) = (account, currency) else {
            return Ok(Status {
                account,
                currency: currency.map(|c| c.currency),
                ..Status::disconnected()
            });
        };

        let (allowance, balance) = if currency.token == Address::ZERO {
            warn!(
                currency = %currency.currency,
                "Token contract not configured, allowance unknown"
            );
            (None, None)
        } else {
            let allowance = self.allowance(currency, account).await?;
            let balance = self.token_balance(currency, account).await?;
            (Some(allowance), Some(balance))
        };

        let registered = if currency.whitelist == Address::ZERO {
            None
        } else {
            Some(self.is_registered(currency, account).await?)
        };

        Ok(Status {
            account: Some(account),
            currency: Some(currency.currency),
            allowance,
            registered,
            balance,
        })
    }

    /// Re-read `account`'s status until `done` holds.
    ///
    /// Returns the last status read, and whether `done` held for it.
    pub async fn wait_until<F>(
        &self,
        account: Address,
        currency: &CurrencyConfig,
        policy: RefetchPolicy,
        done: F,
    ) -> Result<(Status, bool)>
    where
        F: Fn(&Status) -> bool,
    {
        if !policy.delay.is_zero() {
            tokio::time::sleep(policy.delay).await;
        }

        let attempt = || async {
            let status = self
                .status(Some(account), Some(currency))
                .await
                .map_err(Refetch::Failed)?;
            if done(&status) {
                Ok(status)
            } else {
                debug!(account = %account, step = ?status.step(), "State not updated yet");
                Err(Refetch::NotYet(status))
            }
        };

        match Retry::spawn(policy.strategy(), attempt).await {
            Ok(status) => Ok((status, true)),
            Err(Refetch::NotYet(status)) => Ok((status, false)),
            Err(Refetch::Failed(err)) => Err(err),
        }
    }

    /// Token metadata.
    pub async fn token_info(&self, currency: &CurrencyConfig) -> Result<TokenInfo> {
        ensure_token(currency)?;
        let token = IERC20::new(currency.token, &self.provider);

        Ok(TokenInfo {
            name: token.name().call().await?,
            symbol: token.symbol().call().await?,
            decimals: token.decimals().call().await?,
            total_supply: token.totalSupply().call().await?,
        })
    }

    /// Registry statistics, plus the whitelist's view of `user` if given.
    pub async fn whitelist_info(
        &self,
        currency: &CurrencyConfig,
        user: Option<Address>,
    ) -> Result<WhitelistInfo> {
        ensure_whitelist(currency)?;
        let whitelist = IWhitelist::new(currency.whitelist, &self.provider);

        let total_registered = whitelist.totalRegistered().call().await?;
        let registered = whitelist.getAllRegistered().call().await?;

        let (user_balance, user_allowance) = match user {
            Some(user) => (
                Some(whitelist.checkbalance(user).call().await?),
                Some(whitelist.checkAllowance(user).call().await?),
            ),
            None => (None, None),
        };

        Ok(WhitelistInfo {
            total_registered,
            registered,
            user_balance,
            user_allowance,
        })
    }
}

/// Why a re-read attempt did not finish the wait.
enum Refetch {
    /// The read worked but the state is not there yet
    NotYet(Status),
    Failed(eyre::Report),
}

fn ensure_token(currency: &CurrencyConfig) -> Result<()> {
    if currency.token == Address::ZERO {
        eyre::bail!("{} token contract is not configured", currency.symbol);
    }
    Ok(())
}

fn ensure_whitelist(currency: &CurrencyConfig) -> Result<()> {
    if currency.whitelist == Address::ZERO {
        eyre::bail!("{} whitelist contract is not configured", currency.symbol);
    }
    Ok(())
}
