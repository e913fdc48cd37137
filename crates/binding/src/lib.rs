//! Contract bindings for the onboarding contracts.
//!
//! Two contract kinds are involved for every supported currency:
//! - the ERC20 token the user approves
//! - the whitelist contract that is approved as spender and keeps the registry
//!
//! All bindings are generated using alloy's `sol!` macro.

pub mod token;
pub mod whitelist;
