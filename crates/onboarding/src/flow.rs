//! The onboarding session.
//!
//! [`Onboarding`] keeps what the user chose (wallet, currency) and turns the
//! current [`Step`] into the transaction that completes it.

use crate::{
    approve::{Approve, ApproveAction},
    notify::{LogNotifier, Notifier},
    register::{Register, WhitelistAction},
    state::{RefetchPolicy, StateReader, Status},
    step::Step,
    Action, TxOutcome,
};
use alloy_primitives::{Address, U256};
use alloy_provider::Provider;
use client::Wallet;
use config::{ChainConfig, Currency, CurrencyConfig, CurrencyTable};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Error for transactions attempted without a wallet or a currency.
pub const NOT_READY: &str = "Please connect wallet and select currency";

pub struct Onboarding<P> {
    provider: P,
    reader: StateReader<P>,
    chain: ChainConfig,
    currencies: CurrencyTable,
    wallet: Option<Wallet>,
    /// Account whose state is tracked: the wallet's, or a watched one
    account: Option<Address>,
    selected: Option<Currency>,
    notifier: Arc<dyn Notifier>,
    refetch: RefetchPolicy,
    confirmations: u64,
}

impl<P> Onboarding<P>
where
    P: Provider + Clone + 'static,
{
    pub fn new(provider: P, chain: ChainConfig, currencies: CurrencyTable) -> Self {
        Self {
            reader: StateReader::new(provider.clone()),
            provider,
            notifier: Arc::new(LogNotifier::new(chain.clone())),
            chain,
            currencies,
            wallet: None,
            account: None,
            selected: None,
            refetch: RefetchPolicy::default(),
            confirmations: 1,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub const fn with_refetch(mut self, refetch: RefetchPolicy) -> Self {
        self.refetch = refetch;
        self
    }

    pub const fn with_confirmations(mut self, confirmations: u64) -> Self {
        self.confirmations = confirmations;
        self
    }

    /// Connect a wallet. Its account becomes the tracked account.
    pub fn connect(&mut self, wallet: Wallet) {
        let account = wallet.address();
        info!(account = %account, wallet = wallet.kind(), "Wallet connected");
        self.account = Some(account);
        self.wallet = Some(wallet);
    }

    /// Track `account` without a wallet. Reads work, transactions don't.
    pub fn watch(&mut self, account: Address) {
        info!(account = %account, "Watching account");
        self.account = Some(account);
        self.wallet = None;
    }

    pub fn disconnect(&mut self) {
        self.account = None;
        self.wallet = None;
    }

    pub fn select_currency(&mut self, currency: Currency) {
        debug!(currency = %currency, "Currency selected");
        self.selected = Some(currency);
    }

    pub const fn account(&self) -> Option<Address> {
        self.account
    }

    pub const fn selected(&self) -> Option<Currency> {
        self.selected
    }

    pub const fn chain(&self) -> &ChainConfig {
        &self.chain
    }

    pub const fn currencies(&self) -> &CurrencyTable {
        &self.currencies
    }

    pub const fn reader(&self) -> &StateReader<P> {
        &self.reader
    }

    /// Configuration of the selected currency.
    pub fn currency(&self) -> Option<&CurrencyConfig> {
        self.selected.map(|c| self.currencies.get(c))
    }

    /// Current on-chain status of the tracked account.
    pub async fn status(&self) -> eyre::Result<Status> {
        self.reader.status(self.account, self.currency()).await
    }

    /// Wallet and currency, or the connect-and-select error.
    fn session(&self) -> eyre::Result<(&Wallet, CurrencyConfig)> {
        match (&self.wallet, self.currency()) {
            (Some(wallet), Some(currency)) => Ok((wallet, *currency)),
            _ => eyre::bail!(NOT_READY),
        }
    }

    /// Approve `amount` of the selected currency to its whitelist contract.
    ///
    /// Returns `None` when the allowance already equals `amount`.
    pub async fn approve(&self, amount: U256) -> eyre::Result<Option<TxOutcome>> {
        let (wallet, currency) = self.session()?;
        if !currency.is_configured() {
            eyre::bail!("{} contracts are not configured", currency.symbol);
        }

        let owner = wallet.address();
        let signer = wallet.signer_fn(self.chain.chain_id, self.provider.clone());
        let mut action = ApproveAction::new(
            self.provider.clone(),
            signer,
            Approve::new(&currency, owner, amount),
        )
        .with_notifier(self.notifier.clone())
        .with_confirmations(self.confirmations);

        if action.is_completed().await? {
            info!(currency = %currency.currency, "Allowance already set");
            return Ok(None);
        }

        info!("{}", action.description());
        let outcome = action.execute().await?;

        let (_, reflected) = self
            .reader
            .wait_until(owner, &currency, self.refetch, |s| {
                s.allowance == Some(amount)
            })
            .await?;
        if !reflected {
            warn!(tx_hash = %outcome.tx_hash, "Approval confirmed but allowance not updated yet");
        }

        Ok(Some(outcome))
    }

    /// Register `user` (the connected account when `None`) on the selected
    /// currency's whitelist.
    ///
    /// Returns `None` when the user is already registered.
    pub async fn whitelist(&self, user: Option<Address>) -> eyre::Result<Option<TxOutcome>> {
        let (wallet, currency) = self.session()?;

        let from = wallet.address();
        let register = Register::new(&currency, from, user);
        let user = register.user;
        let signer = wallet.signer_fn(self.chain.chain_id, self.provider.clone());
        let mut action = WhitelistAction::new(self.provider.clone(), signer, register)
            .with_notifier(self.notifier.clone())
            .with_confirmations(self.confirmations);

        if action.is_completed().await? {
            info!(user = %user, currency = %currency.currency, "Already whitelisted");
            return Ok(None);
        }

        info!("{}", action.description());
        let outcome = action.execute().await?;

        if user == from {
            let (_, reflected) = self
                .reader
                .wait_until(from, &currency, self.refetch, |s| {
                    s.registered == Some(true)
                })
                .await?;
            if !reflected {
                warn!(tx_hash = %outcome.tx_hash, "Whitelist confirmed but registration not visible yet");
            }
        }

        Ok(Some(outcome))
    }

    /// Send the transaction `step` calls for, if it still needs one.
    async fn perform(&self, step: Step) -> eyre::Result<Option<TxOutcome>> {
        match step {
            Step::ConnectWallet | Step::SelectCurrency => eyre::bail!(NOT_READY),
            Step::Approve => self.approve(U256::MAX).await,
            Step::Whitelist => self.whitelist(None).await,
            Step::Complete => Ok(None),
        }
    }

    /// Perform the transaction the current step calls for.
    ///
    /// Returns the step after it.
    pub async fn advance(&self) -> eyre::Result<Step> {
        let step = self.status().await?.step();
        if step.is_complete() {
            return Ok(step);
        }

        self.perform(step).await?;

        let next = self.status().await?.step();
        info!(from = %step, to = %next, "Step advanced");
        Ok(next)
    }

    /// Advance until the account is approved and whitelisted.
    ///
    /// A confirmed transaction completes its step even when the node has not
    /// caught up yet; the returned status is the last one read.
    pub async fn run(&self) -> eyre::Result<Status> {
        let mut status = self.status().await?;
        let mut step = status.step();

        while !step.is_complete() {
            let outcome = self.perform(step).await?;
            status = self.status().await?;
            let next = status.step();

            step = if next > step {
                info!(from = %step, to = %next, "Step advanced");
                next
            } else if let Some(outcome) = outcome {
                warn!(
                    tx_hash = %outcome.tx_hash,
                    step = %step,
                    "Transaction confirmed but state not updated yet, moving on"
                );
                step.next()
            } else {
                eyre::bail!("Onboarding did not progress past {step}");
            };
        }

        info!(
            account = ?status.account,
            currency = ?status.currency,
            "Onboarding complete"
        );
        Ok(status)
    }
}
