mod wallet;

use alloy_consensus::TxEnvelope;
use alloy_network::{eip2718::Encodable2718, EthereumWallet, TransactionBuilder};
use alloy_primitives::{Address, Bytes};
use alloy_provider::{Provider, ProviderBuilder};
use alloy_rpc_types::TransactionRequest;
use alloy_signer_local::PrivateKeySigner;
use std::{future::Future, pin::Pin, sync::Arc};
use thiserror::Error;
use tracing::debug;
pub use wallet::ExternalWallet;

/// A function that signs a transaction request and returns signed bytes.
///
/// Both a local key and an external wallet are exposed through this type, so
/// callers broadcast the result with `send_raw_transaction` regardless of
/// where the key lives.
pub type SignerFn = Arc<
    dyn Fn(TransactionRequest) -> Pin<Box<dyn Future<Output = eyre::Result<Bytes>> + Send>>
        + Send
        + Sync,
>;

#[derive(Error, Debug)]
pub enum ClientError {
    /// Error parsing or validating URLs
    #[error("Invalid RPC URL: {0}")]
    InvalidUrl(String),

    /// Error connecting to the RPC endpoint or wallet
    #[error("Connection error: {0}")]
    Connection(String),

    /// Error with private key
    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    /// The wallet exposed no account to connect with
    #[error("Wallet exposed no accounts")]
    NoAccounts,

    /// Endpoint is on another chain than the one supported
    #[error("Wrong network: expected chain {expected}, got {actual}")]
    WrongChain { expected: u64, actual: u64 },

    /// General error with context
    #[error("Client error: {0}")]
    Other(String),
}

/// Convenience function to create an ethereum rpc provider from url.
pub fn create_provider(rpc_url: &str) -> Result<impl Provider + Clone, ClientError> {
    let url = rpc_url
        .parse()
        .map_err(|e| ClientError::InvalidUrl(format!("{}", e)))?;
    let provider = ProviderBuilder::new().connect_http(url);

    Ok(provider)
}

/// Create a provider with wallet signing capability from a private key.
pub fn create_wallet_provider(
    rpc_url: &str,
    private_key: &str,
) -> Result<impl Provider + Clone, ClientError> {
    let url = rpc_url
        .parse()
        .map_err(|e| ClientError::InvalidUrl(format!("{}", e)))?;

    let signer = parse_private_key(private_key)?;
    let wallet = EthereumWallet::from(signer);

    let provider = ProviderBuilder::new().wallet(wallet).connect_http(url);

    Ok(provider)
}

/// Parse a hex private key, with or without `0x` prefix.
pub fn parse_private_key(private_key: &str) -> Result<PrivateKeySigner, ClientError> {
    private_key
        .trim()
        .parse()
        .map_err(|e| ClientError::InvalidPrivateKey(format!("{}", e)))
}

/// Fail unless the provider is connected to `expected`.
pub async fn ensure_chain<P>(provider: &P, expected: u64) -> Result<(), ClientError>
where
    P: Provider,
{
    let actual = provider
        .get_chain_id()
        .await
        .map_err(|e| ClientError::Connection(e.to_string()))?;

    if actual != expected {
        return Err(ClientError::WrongChain { expected, actual });
    }

    Ok(())
}

/// A connected wallet.
///
/// A wallet is either a key held by this process or an external wallet that
/// signs on our behalf. Either way it has a single account address.
#[derive(Debug, Clone)]
pub enum Wallet {
    Local(PrivateKeySigner),
    External(ExternalWallet),
}

impl Wallet {
    /// Connect a local key.
    pub fn from_private_key(private_key: &str) -> Result<Self, ClientError> {
        parse_private_key(private_key).map(Self::Local)
    }

    /// Address of the connected account.
    pub fn address(&self) -> Address {
        match self {
            Self::Local(signer) => signer.address(),
            Self::External(wallet) => wallet.address(),
        }
    }

    /// Short label for logs.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Local(_) => "local",
            Self::External(_) => "external",
        }
    }

    /// Build a [`SignerFn`] that fills transactions through `provider`.
    pub fn signer_fn<P>(&self, chain_id: u64, provider: P) -> SignerFn
    where
        P: Provider + Clone + 'static,
    {
        match self {
            Self::Local(signer) => local_signer_fn(signer.clone(), chain_id, provider),
            Self::External(wallet) => external_signer_fn(wallet.clone(), provider),
        }
    }
}

/// Create a SignerFn from an external wallet and provider.
///
/// The provider fills transaction fields (nonce, gas, fees) before the request
/// is handed to the wallet for signing.
pub fn external_signer_fn<P>(wallet: ExternalWallet, provider: P) -> SignerFn
where
    P: Provider + Clone + 'static,
{
    let from_address = wallet.address();
    let chain_id = wallet.chain_id();

    Arc::new(move |tx| {
        let wallet = wallet.clone();
        let provider = provider.clone();
        Box::pin(async move {
            let filled_tx = fill_transaction(tx, &provider, from_address, chain_id).await?;
            wallet.sign_transaction(filled_tx).await
        })
    })
}

/// Create a SignerFn from a local key and provider.
pub fn local_signer_fn<P>(signer: PrivateKeySigner, chain_id: u64, provider: P) -> SignerFn
where
    P: Provider + Clone + 'static,
{
    let from_address = signer.address();
    let wallet = EthereumWallet::from(signer);

    Arc::new(move |tx: TransactionRequest| {
        let wallet = wallet.clone();
        let provider = provider.clone();
        Box::pin(async move {
            let filled_tx = fill_transaction(tx, &provider, from_address, chain_id).await?;

            let tx_envelope: TxEnvelope = filled_tx
                .build(&wallet)
                .await
                .map_err(|e| eyre::eyre!("{}", e))?;

            let mut encoded = Vec::new();
            tx_envelope.encode_2718(&mut encoded);
            Ok(Bytes::from(encoded))
        })
    })
}

/// Fill missing transaction fields using the provider.
pub async fn fill_transaction<P>(
    mut tx: TransactionRequest,
    provider: &P,
    from: Address,
    chain_id: u64,
) -> eyre::Result<TransactionRequest>
where
    P: Provider,
{
    if tx.from.is_none() {
        tx.from = Some(from);
    }

    if tx.chain_id.is_none() {
        tx.chain_id = Some(chain_id);
    }

    if tx.nonce.is_none() {
        let nonce = provider.get_transaction_count(from).await?;
        tx.nonce = Some(nonce);
    }

    // Fees first: gas estimation may need them
    if tx.max_fee_per_gas.is_none() || tx.max_priority_fee_per_gas.is_none() {
        let fee_estimate = provider.estimate_eip1559_fees().await?;
        if tx.max_fee_per_gas.is_none() {
            tx.max_fee_per_gas = Some(fee_estimate.max_fee_per_gas);
        }
        if tx.max_priority_fee_per_gas.is_none() {
            tx.max_priority_fee_per_gas = Some(fee_estimate.max_priority_fee_per_gas);
        }
    }

    if tx.gas.is_none() {
        let gas_estimate = provider.estimate_gas(tx.clone()).await?;
        // 20% headroom
        tx.gas = Some(gas_estimate + gas_estimate / 5);
    }

    debug!(
        from = %from,
        nonce = tx.nonce,
        gas = tx.gas,
        "Filled transaction"
    );

    Ok(tx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, U64};
    use alloy_provider::{network::Ethereum, RootProvider};
    use alloy_transport::mock::Asserter;

    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    /// Provider that must never be reached.
    #[derive(Clone)]
    struct MockProvider;

    impl Provider for MockProvider {
        fn root(&self) -> &RootProvider<Ethereum> {
            todo!()
        }
    }

    #[test]
    fn test_invalid_url() {
        let result = create_provider("not a url");
        assert!(matches!(result, Err(ClientError::InvalidUrl(_))));
    }

    #[test]
    fn test_wallet_provider_checks_inputs() {
        let bad_key = create_wallet_provider("http://localhost:8545", "0x1234");
        assert!(matches!(bad_key, Err(ClientError::InvalidPrivateKey(_))));

        let bad_url = create_wallet_provider("not a url", TEST_KEY);
        assert!(matches!(bad_url, Err(ClientError::InvalidUrl(_))));

        assert!(create_wallet_provider("http://localhost:8545", TEST_KEY).is_ok());
    }

    #[test]
    fn test_invalid_private_key() {
        let err = Wallet::from_private_key("0x1234").unwrap_err();
        assert!(matches!(err, ClientError::InvalidPrivateKey(_)));
    }

    #[test]
    fn test_local_wallet_address() {
        let wallet = Wallet::from_private_key(TEST_KEY).unwrap();
        assert_eq!(
            wallet.address(),
            address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266")
        );
        assert_eq!(wallet.kind(), "local");

        // prefix is optional
        let bare = Wallet::from_private_key(TEST_KEY.trim_start_matches("0x")).unwrap();
        assert_eq!(bare.address(), wallet.address());
    }

    #[tokio::test]
    async fn test_fill_keeps_preset_fields() {
        let from = address!("5CFFA347b0aE99cc01E5c01714cA5658e54a23D1");
        let tx = TransactionRequest::default()
            .nonce(7)
            .gas_limit(60_000)
            .max_fee_per_gas(3_000_000_000)
            .max_priority_fee_per_gas(1_000_000_000);

        let filled = fill_transaction(tx, &MockProvider, from, 56).await.unwrap();

        assert_eq!(filled.from, Some(from));
        assert_eq!(filled.chain_id, Some(56));
        assert_eq!(filled.nonce, Some(7));
        assert_eq!(filled.gas, Some(60_000));
    }

    #[tokio::test]
    async fn test_ensure_chain() {
        let asserter = Asserter::new();
        let provider = ProviderBuilder::new().connect_mocked_client(asserter.clone());

        asserter.push_success(&U64::from(56));
        assert!(ensure_chain(&provider, 56).await.is_ok());

        asserter.push_success(&U64::from(1));
        let err = ensure_chain(&provider, 56).await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::WrongChain {
                expected: 56,
                actual: 1
            }
        ));
    }
}
