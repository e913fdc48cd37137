use crate::{
    notify::{LogNotifier, Notice, Notifier, TxKind},
    Action, SignerFn, TxOutcome,
};
use alloy_primitives::{Address, U256};
use alloy_provider::Provider;
use binding::token::IERC20;
use config::{Currency, CurrencyConfig};
use std::sync::Arc;
use tracing::info;

/// Input for an approve action.
#[derive(Debug, Clone)]
pub struct Approve {
    /// Token contract
    pub token: Address,
    /// Spender, the currency's whitelist contract
    pub spender: Address,
    /// Owner of the tokens, must match the account signing the transaction
    pub owner: Address,
    /// Allowance to set. `U256::MAX` approves without limit, zero revokes.
    pub amount: U256,
    pub currency: Currency,
}

impl Approve {
    /// Approve `amount` of `currency` to its whitelist contract.
    pub const fn new(currency: &CurrencyConfig, owner: Address, amount: U256) -> Self {
        Self {
            token: currency.token,
            spender: currency.whitelist,
            owner,
            amount,
            currency: currency.currency,
        }
    }
}

/// Sets the allowance of the whitelist contract on the token.
pub struct ApproveAction<P> {
    provider: P,
    signer: SignerFn,
    approve: Approve,
    notifier: Arc<dyn Notifier>,
    confirmations: u64,
}

impl<P> ApproveAction<P>
where
    P: Provider + Clone,
{
    pub fn new(provider: P, signer: SignerFn, approve: Approve) -> Self {
        Self {
            provider,
            signer,
            approve,
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

    fn validate_approve(&self) -> eyre::Result<()> {
        if self.approve.token == Address::ZERO {
            eyre::bail!("Token must not be zero");
        }

        if self.approve.spender == Address::ZERO {
            eyre::bail!("Spender must not be zero");
        }

        if self.approve.owner == Address::ZERO {
            eyre::bail!("Owner must not be zero");
        }

        Ok(())
    }

    /// Query the current allowance of the spender.
    pub async fn get_allowance(&self) -> eyre::Result<U256> {
        let token = IERC20::new(self.approve.token, &self.provider);
        let allowance = token
            .allowance(self.approve.owner, self.approve.spender)
            .call()
            .await?;
        Ok(allowance)
    }
}

impl<P> Action for ApproveAction<P>
where
    P: Provider + Clone,
{
    async fn is_ready(&self) -> eyre::Result<bool> {
        Ok(self.validate_approve().is_ok())
    }

    async fn is_completed(&self) -> eyre::Result<bool> {
        let allowance = self.get_allowance().await?;
        Ok(allowance == self.approve.amount)
    }

    async fn execute(&mut self) -> eyre::Result<TxOutcome> {
        self.validate_approve()?;

        if self.is_completed().await? {
            eyre::bail!(
                "Allowance of {} is already {}",
                self.approve.spender,
                self.approve.amount
            );
        }

        info!(
            token = %self.approve.token,
            spender = %self.approve.spender,
            owner = %self.approve.owner,
            amount = %self.approve.amount,
            "Approving whitelist contract"
        );

        let token = IERC20::new(self.approve.token, &self.provider);
        let call = token.approve(self.approve.spender, self.approve.amount);
        let tx_request = call.into_transaction_request().from(self.approve.owner);

        crate::submit(
            &self.provider,
            &self.signer,
            tx_request,
            Notice::new(TxKind::Approval, self.approve.currency),
            self.notifier.as_ref(),
            self.confirmations,
        )
        .await
    }

    fn description(&self) -> String {
        let amount = if self.approve.amount == U256::MAX {
            "unlimited".to_string()
        } else {
            self.approve.amount.to_string()
        };
        format!(
            "Approve {} to spend {} {} of {}",
            self.approve.spender, amount, self.approve.currency, self.approve.owner
        )
    }
}
