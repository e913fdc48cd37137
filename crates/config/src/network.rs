//! Chain configuration.
//!
//! Only BNB Smart Chain mainnet is supported. The RPC endpoint can be
//! overridden at runtime, the chain id cannot.

use alloy_primitives::{Address, TxHash};
use serde::{Deserialize, Serialize};

/// BNB Smart Chain mainnet chain id.
pub const BSC_CHAIN_ID: u64 = 56;

/// Chain parameters used for connection checks and explorer links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Chain ID
    pub chain_id: u64,
    /// Human readable chain name
    pub name: String,
    /// Native currency symbol (gas token)
    pub native_symbol: String,
    /// Default public RPC endpoint
    pub rpc_url: String,
    /// Block explorer base url, without trailing slash
    pub explorer_url: String,
}

impl ChainConfig {
    /// BNB Smart Chain mainnet configuration.
    pub fn bsc() -> Self {
        Self {
            chain_id: BSC_CHAIN_ID,
            name: "BNB Smart Chain".to_string(),
            native_symbol: "BNB".to_string(),
            rpc_url: "https://bsc-dataseed1.binance.org/".to_string(),
            explorer_url: "https://bscscan.com".to_string(),
        }
    }

    /// Replace the RPC endpoint.
    pub fn with_rpc_url(mut self, rpc_url: impl Into<String>) -> Self {
        self.rpc_url = rpc_url.into();
        self
    }

    /// Explorer link for a transaction.
    pub fn tx_url(&self, tx_hash: TxHash) -> String {
        format!("{}/tx/{}", self.explorer_url, tx_hash)
    }

    /// Explorer link for an account or contract.
    pub fn address_url(&self, address: Address) -> String {
        format!("{}/address/{}", self.explorer_url, address)
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self::bsc()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, b256};

    #[test]
    fn test_bsc_config() {
        let chain = ChainConfig::bsc();
        assert_eq!(chain.chain_id, 56);
        assert_eq!(chain.native_symbol, "BNB");
        assert_eq!(chain, ChainConfig::default());
    }

    #[test]
    fn test_rpc_override_keeps_chain() {
        let chain = ChainConfig::bsc().with_rpc_url("http://localhost:8545");
        assert_eq!(chain.rpc_url, "http://localhost:8545");
        assert_eq!(chain.chain_id, BSC_CHAIN_ID);
    }

    #[test]
    fn test_explorer_links() {
        let chain = ChainConfig::bsc();
        let hash = b256!("1111111111111111111111111111111111111111111111111111111111111111");
        assert_eq!(
            chain.tx_url(hash),
            "https://bscscan.com/tx/0x1111111111111111111111111111111111111111111111111111111111111111"
        );

        let addr = address!("e2ba9bcac21eb68f86938d166802283ac57c7530");
        assert!(chain
            .address_url(addr)
            .starts_with("https://bscscan.com/address/0x"));
    }
}
