use crate::{
    notify::{LogNotifier, Notice, Notifier, TxKind},
    Action, SignerFn, TxOutcome,
};
use alloy_primitives::Address;
use alloy_provider::Provider;
use binding::whitelist::IWhitelist;
use config::{Currency, CurrencyConfig};
use std::sync::Arc;
use tracing::info;

/// Input for a whitelist registration.
#[derive(Debug, Clone)]
pub struct Register {
    /// Whitelist contract of the currency
    pub whitelist: Address,
    /// Address to register
    pub user: Address,
    /// Account sending the transaction
    pub from: Address,
    pub currency: Currency,
}

impl Register {
    /// Register `user`, sent by `from`. Without a user, `from` registers itself.
    pub fn new(currency: &CurrencyConfig, from: Address, user: Option<Address>) -> Self {
        Self {
            whitelist: currency.whitelist,
            user: user.unwrap_or(from),
            from,
            currency: currency.currency,
        }
    }
}

/// Adds an address to a currency's whitelist.
pub struct WhitelistAction<P> {
    provider: P,
    signer: SignerFn,
    register: Register,
    notifier: Arc<dyn Notifier>,
    confirmations: u64,
}

impl<P> WhitelistAction<P>
where
    P: Provider + Clone,
{
    pub fn new(provider: P, signer: SignerFn, register: Register) -> Self {
        Self {
            provider,
            signer,
            register,
            notifier: Arc::new(LogNotifier::default()),
            confirmations: 1,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub const fn with_confirmations(mut self, confirmations: u64) -> Self {
        self.confirmations = confirmations;
        self
    }

    fn validate_register(&self) -> eyre::Result<()> {
        if self.register.whitelist == Address::ZERO {
            eyre::bail!("Whitelist must not be zero");
        }

        if self.register.user == Address::ZERO {
            eyre::bail!("User must not be zero");
        }

        if self.register.from == Address::ZERO {
            eyre::bail!("Sender must not be zero");
        }

        Ok(())
    }
}

impl<P> Action for WhitelistAction<P>
where
    P: Provider + Clone,
{
    async fn is_ready(&self) -> eyre::Result<bool> {
        Ok(self.validate_register().is_ok())
    }

    async fn is_completed(&self) -> eyre::Result<bool> {
        let whitelist = IWhitelist::new(self.register.whitelist, &self.provider);
        let registered = whitelist
            .checkIfRegistered(self.register.user)
            .call()
            .await?;
        Ok(registered)
    }

    async fn execute(&mut self) -> eyre::Result<TxOutcome> {
        self.validate_register()?;

        if self.is_completed().await? {
            eyre::bail!("{} is already whitelisted", self.register.user);
        }

        info!(
            whitelist = %self.register.whitelist,
            user = %self.register.user,
            from = %self.register.from,
            "Registering on whitelist"
        );

        let whitelist = IWhitelist::new(self.register.whitelist, &self.provider);
        let call = whitelist.whitlistAddress(self.register.user);
        let tx_request = call.into_transaction_request().from(self.register.from);

        crate::submit(
            &self.provider,
            &self.signer,
            tx_request,
            Notice::new(TxKind::Whitelist, self.register.currency),
            self.notifier.as_ref(),
            self.confirmations,
        )
        .await
    }

    fn description(&self) -> String {
        format!(
            "Add {} to the {} whitelist {}",
            self.register.user, self.register.currency, self.register.whitelist
        )
    }
}
