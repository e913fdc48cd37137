//! External wallet reached over JSON-RPC.
//!
//! The wallet (a browser bridge, a desktop wallet's local endpoint or a signing
//! service) owns the key. We ask it for its account and chain on connect, and
//! for a signature on every transaction.

use crate::ClientError;
use alloy_primitives::{Address, Bytes, U64};
use alloy_rpc_types::eth::TransactionRequest;
use eyre::{bail, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, info};

const NO_PARAMS: [u8; 0] = [];

/// A wallet that signs through `eth_signTransaction`.
///
/// # Example
///
/// ```ignore
/// let wallet = ExternalWallet::connect("http://localhost:1248", 56).await?;
/// let signed_tx = wallet.sign_transaction(tx_request).await?;
/// provider.send_raw_transaction(&signed_tx).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ExternalWallet {
    client: reqwest::Client,
    url: String,
    address: Address,
    chain_id: u64,
}

impl ExternalWallet {
    /// Connect to the wallet at `url`.
    ///
    /// Uses the first account the wallet exposes and refuses wallets that are
    /// switched to another chain than `expected_chain_id`.
    pub async fn connect(
        url: impl Into<String>,
        expected_chain_id: u64,
    ) -> Result<Self, ClientError> {
        Self::connect_with_client(reqwest::Client::new(), url, expected_chain_id).await
    }

    /// Connect using a custom HTTP client.
    pub async fn connect_with_client(
        client: reqwest::Client,
        url: impl Into<String>,
        expected_chain_id: u64,
    ) -> Result<Self, ClientError> {
        let url = url.into();
        debug!(url = %url, "Connecting external wallet");

        let accounts: Vec<Address> = rpc_call(&client, &url, "eth_accounts", NO_PARAMS)
            .await
            .map_err(|e| ClientError::Connection(e.to_string()))?;
        let address = *accounts.first().ok_or(ClientError::NoAccounts)?;

        let chain_id: U64 = rpc_call(&client, &url, "eth_chainId", NO_PARAMS)
            .await
            .map_err(|e| ClientError::Connection(e.to_string()))?;
        let chain_id = chain_id.to::<u64>();

        if chain_id != expected_chain_id {
            return Err(ClientError::WrongChain {
                expected: expected_chain_id,
                actual: chain_id,
            });
        }

        info!(address = %address, chain_id, "External wallet connected");

        Ok(Self {
            client,
            url,
            address,
            chain_id,
        })
    }

    /// Returns the connected account.
    pub const fn address(&self) -> Address {
        self.address
    }

    /// Returns the chain the wallet is on.
    pub const fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Asks the wallet to sign a filled transaction.
    ///
    /// Returns the signed transaction as raw bytes, ready for
    /// `provider.send_raw_transaction()`.
    pub async fn sign_transaction(&self, tx: TransactionRequest) -> Result<Bytes> {
        let signed: SignedTransaction =
            rpc_call(&self.client, &self.url, "eth_signTransaction", [tx]).await?;
        Ok(signed.into_raw())
    }
}

async fn rpc_call<P, R>(
    client: &reqwest::Client,
    url: &str,
    method: &'static str,
    params: P,
) -> Result<R>
where
    P: Serialize,
    R: DeserializeOwned,
{
    let request = JsonRpcRequest {
        jsonrpc: "2.0",
        method,
        params,
        id: 1,
    };

    let response = client.post(url).json(&request).send().await?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "unknown".to_string());
        bail!("wallet returned {status} for {method}: {body}");
    }

    let rpc_response: JsonRpcResponse<R> = response.json().await?;
    rpc_response.into_result(method)
}

#[derive(Debug, Serialize)]
struct JsonRpcRequest<T> {
    jsonrpc: &'static str,
    method: &'static str,
    params: T,
    id: u32,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

impl<T> JsonRpcResponse<T> {
    fn into_result(self, method: &str) -> Result<T> {
        match (self.result, self.error) {
            (Some(result), _) => Ok(result),
            (None, Some(error)) => {
                bail!("{method} failed with JSON-RPC error {}: {}", error.code, error.message)
            }
            (None, None) => bail!("{method} returned neither result nor error"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// `eth_signTransaction` result.
///
/// Geth-style signers wrap the raw bytes in an object, most wallets return
/// the bytes directly.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignedTransaction {
    Raw(Bytes),
    Wrapped { raw: Bytes },
}

impl SignedTransaction {
    fn into_raw(self) -> Bytes {
        match self {
            Self::Raw(raw) | Self::Wrapped { raw } => raw,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::bytes;

    #[test]
    fn test_signed_transaction_shapes() {
        let plain: SignedTransaction = serde_json::from_str(r#""0x02f8""#).unwrap();
        assert_eq!(plain.into_raw(), bytes!("02f8"));

        let wrapped: SignedTransaction =
            serde_json::from_str(r#"{"raw":"0x02f8","tx":{"nonce":"0x1"}}"#).unwrap();
        assert_eq!(wrapped.into_raw(), bytes!("02f8"));
    }

    #[test]
    fn test_rpc_error_is_reported() {
        let response: JsonRpcResponse<Vec<Address>> = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":4100,"message":"unauthorized"}}"#,
        )
        .unwrap();

        let err = response.into_result("eth_accounts").unwrap_err();
        assert!(err.to_string().contains("4100"));
        assert!(err.to_string().contains("unauthorized"));
    }

    #[test]
    fn test_accounts_result() {
        let response: JsonRpcResponse<Vec<Address>> = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":1,"result":["0x5cffa347b0ae99cc01e5c01714ca5658e54a23d1"]}"#,
        )
        .unwrap();

        let accounts = response.into_result("eth_accounts").unwrap();
        assert_eq!(accounts.len(), 1);
    }

    #[test]
    fn test_request_shape() {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method: "eth_accounts",
            params: NO_PARAMS,
            id: 1,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["method"], "eth_accounts");
        assert_eq!(json["params"], serde_json::json!([]));
    }
}
