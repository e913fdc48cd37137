//! Whitelist onboarding.
//!
//! A user joins a currency's whitelist in four steps: connect a wallet, select
//! a currency, approve the whitelist contract on the currency's token, and
//! register with the whitelist contract. This crate derives the current step
//! from on-chain state and executes the two transactions that move it forward.

pub mod approve;
pub mod flow;
pub mod format;
pub mod notify;
pub mod register;
pub mod state;
pub mod step;

use alloy_primitives::{TxHash, U256};
use alloy_provider::Provider;
use alloy_rpc_types::{TransactionReceipt, TransactionRequest};
pub use client::SignerFn;
use notify::{Notice, Notifier, TxPhase};
use serde::Serialize;
use std::{future::Future, time::Duration};
use tokio_retry::{strategy::FixedInterval, RetryIf};
use tracing::{debug, info, warn};

pub use flow::Onboarding;
pub use state::{RefetchPolicy, StateReader, Status};
pub use step::Step;

/// Trait for executable onchain actions.
pub trait Action: Send + Sync {
    /// Check to see if the action can be executed.
    ///
    /// Returns true if all preconditions are met.
    fn is_ready(&self) -> impl Future<Output = eyre::Result<bool>> + Send;

    /// Check if the on-chain state already reflects the action.
    fn is_completed(&self) -> impl Future<Output = eyre::Result<bool>> + Send;

    /// Execute the action.
    ///
    /// Returns the outcome of the confirmed transaction.
    fn execute(&mut self) -> impl Future<Output = eyre::Result<TxOutcome>> + Send;

    /// Get a human-readable description of this action.
    fn description(&self) -> String;
}

/// Outcome of a confirmed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TxOutcome {
    /// Transaction hash
    pub tx_hash: TxHash,
    /// Block number where transaction was included
    pub block_number: Option<u64>,
    /// Gas used
    pub gas_used: Option<U256>,
}

/// Sign, broadcast and confirm `tx`, reporting every phase to `notifier`.
pub(crate) async fn submit<P>(
    provider: &P,
    signer: &SignerFn,
    tx: TransactionRequest,
    notice: Notice,
    notifier: &dyn Notifier,
    confirmations: u64,
) -> eyre::Result<TxOutcome>
where
    P: Provider,
{
    let fail = |reason: String| {
        notifier.notify(&notice.with_phase(TxPhase::Failed {
            reason: reason.clone(),
        }));
        eyre::eyre!(reason)
    };

    notifier.notify(&notice.with_phase(TxPhase::Submitting));

    let signed_tx = (signer)(tx)
        .await
        .map_err(|e| fail(format!("signing rejected: {e}")))?;

    let pending = provider
        .send_raw_transaction(&signed_tx)
        .await
        .map_err(|e| fail(format!("broadcast failed: {e}")))?;

    let tx_hash = *pending.tx_hash();
    notifier.notify(&notice.with_phase(TxPhase::Confirming { tx_hash }));

    let receipt = wait_for_receipt(provider, tx_hash, confirmations)
        .await
        .map_err(|e| fail(format!("confirmation failed: {e}")))?;

    if !receipt.status() {
        warn!(tx_hash = %tx_hash, kind = ?notice.kind, "Transaction reverted");
        return Err(fail(format!("transaction {tx_hash} reverted")));
    }

    info!(
        tx_hash = %receipt.transaction_hash,
        block_number = receipt.block_number,
        gas_used = receipt.gas_used,
        kind = ?notice.kind,
        "Transaction confirmed"
    );
    notifier.notify(&notice.with_phase(TxPhase::Confirmed { tx_hash }));

    Ok(TxOutcome {
        tx_hash: receipt.transaction_hash,
        block_number: receipt.block_number,
        gas_used: Some(U256::from(receipt.gas_used)),
    })
}

/// Interval between receipt polls. BSC produces a block every three seconds.
const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(1);
const RECEIPT_POLL_ATTEMPTS: usize = 180;

enum Pending {
    NotYet,
    Failed(eyre::Report),
}

impl Pending {
    fn into_report(self, waiting_for: impl std::fmt::Display) -> eyre::Report {
        match self {
            Self::NotYet => eyre::eyre!("timed out waiting for {waiting_for}"),
            Self::Failed(err) => err,
        }
    }
}

/// Poll until `tx_hash` is mined and `confirmations` blocks deep.
async fn wait_for_receipt<P>(
    provider: &P,
    tx_hash: TxHash,
    confirmations: u64,
) -> eyre::Result<TransactionReceipt>
where
    P: Provider,
{
    let strategy = || FixedInterval::new(RECEIPT_POLL_INTERVAL).take(RECEIPT_POLL_ATTEMPTS);
    let retryable = |p: &Pending| matches!(p, Pending::NotYet);

    let receipt = RetryIf::spawn(
        strategy(),
        || async {
            match provider.get_transaction_receipt(tx_hash).await {
                Ok(Some(receipt)) => Ok(receipt),
                Ok(None) => {
                    debug!(tx_hash = %tx_hash, "Receipt not available yet");
                    Err(Pending::NotYet)
                }
                Err(e) => Err(Pending::Failed(e.into())),
            }
        },
        retryable,
    )
    .await
    .map_err(|p| p.into_report(format_args!("receipt of {tx_hash}")))?;

    if confirmations > 1 {
        let mined = receipt
            .block_number
            .ok_or_else(|| eyre::eyre!("receipt of {tx_hash} has no block number"))?;
        let target = mined + confirmations - 1;

        RetryIf::spawn(
            strategy(),
            || async {
                match provider.get_block_number().await {
                    Ok(head) if head >= target => Ok(()),
                    Ok(_) => Err(Pending::NotYet),
                    Err(e) => Err(Pending::Failed(e.into())),
                }
            },
            retryable,
        )
        .await
        .map_err(|p| p.into_report(format_args!("block {target}")))?;
    }

    Ok(receipt)
}

#[cfg(test)]
pub(crate) mod test_utils {
    use super::SignerFn;
    use crate::notify::{Notice, Notifier};
    use alloy_primitives::{Address, Bytes, TxHash, B256};
    use alloy_provider::{network::Ethereum, Provider, ProviderBuilder, RootProvider};
    use alloy_transport::mock::Asserter;
    use std::sync::{Arc, Mutex};

    /// Mock provider for unit tests.
    #[derive(Clone)]
    pub struct MockProvider;

    impl Provider for MockProvider {
        fn root(&self) -> &RootProvider<Ethereum> {
            todo!()
        }
    }

    /// Provider answering from a queue of canned responses.
    pub fn mocked_provider() -> (impl Provider + Clone, Asserter) {
        let asserter = Asserter::new();
        let provider = ProviderBuilder::new().connect_mocked_client(asserter.clone());
        (provider, asserter)
    }

    /// Create a mock signer for testing that panics if called.
    /// Used for tests that don't actually execute transactions.
    pub fn mock_signer() -> SignerFn {
        Arc::new(|_tx| Box::pin(async { panic!("mock signer should not be called") }))
    }

    /// Signer that refuses every request, like a user rejecting the prompt.
    pub fn rejecting_signer() -> SignerFn {
        Arc::new(|_tx| Box::pin(async { Err(eyre::eyre!("user rejected the request")) }))
    }

    /// Signer that returns the same opaque payload for every request.
    pub fn signing_stub() -> SignerFn {
        Arc::new(|_tx| Box::pin(async { Ok(Bytes::from_static(&[0x02, 0x01])) }))
    }

    /// Receipt of `tx_hash` mined in `block`, as a node would return it.
    pub fn receipt(tx_hash: TxHash, success: bool, block: u64) -> serde_json::Value {
        serde_json::json!({
            "transactionHash": tx_hash,
            "transactionIndex": "0x0",
            "blockHash": B256::repeat_byte(0x11),
            "blockNumber": format!("{block:#x}"),
            "from": Address::repeat_byte(0x01),
            "to": Address::repeat_byte(0x02),
            "cumulativeGasUsed": "0xb3b0",
            "gasUsed": "0xb3b0",
            "contractAddress": null,
            "logs": [],
            "logsBloom": format!("0x{}", "0".repeat(512)),
            "type": "0x2",
            "effectiveGasPrice": "0x3b9aca00",
            "status": if success { "0x1" } else { "0x0" },
        })
    }

    /// Queue what a local signer reads to fill a transaction: nonce, fee
    /// history and gas estimate.
    pub fn push_fill_responses(asserter: &Asserter) {
        asserter.push_success(&"0x0");
        asserter.push_success(&serde_json::json!({
            "oldestBlock": "0xf",
            "baseFeePerGas": ["0x3b9aca00", "0x3b9aca00"],
            "gasUsedRatio": [0.5],
            "reward": [["0x3b9aca00"]],
        }));
        asserter.push_success(&"0xb3b0");
    }

    /// Notifier that keeps every notice.
    #[derive(Default)]
    pub struct RecordingNotifier {
        notices: Mutex<Vec<Notice>>,
    }

    impl RecordingNotifier {
        pub fn notices(&self) -> Vec<Notice> {
            self.notices.lock().unwrap().clone()
        }
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, notice: &Notice) {
            self.notices.lock().unwrap().push(notice.clone());
        }
    }
}
