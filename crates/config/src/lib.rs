//! Configuration types for the whitelist onboarding client.
//!
//! This crate provides:
//! - The single supported chain (BNB Smart Chain)
//! - The currency table mapping each symbol to its token and whitelist contracts
//! - Overrides for addresses that are not fixed yet

pub mod currency;
pub mod network;

pub use currency::{
    AddressCheck, Currency, CurrencyConfig, CurrencyTable, CurrencyTableBuilder,
    ParseCurrencyError,
};
pub use network::{ChainConfig, BSC_CHAIN_ID};
