//! The onboarding steps and how the current one is derived.

use alloy_primitives::U256;
use config::Currency;
use serde::Serialize;
use std::fmt;

/// Number of steps the user has to go through before completion.
pub const STEP_COUNT: u8 = 4;

/// Where the user stands in the onboarding sequence.
///
/// Steps are ordered: approval always comes before registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    ConnectWallet = 1,
    SelectCurrency = 2,
    Approve = 3,
    Whitelist = 4,
    Complete = 5,
}

impl Step {
    /// Derive the current step.
    ///
    /// `allowance` and `registered` are `None` while unknown (not read yet, or
    /// not readable); an unknown value counts as "not done".
    pub fn derive(
        connected: bool,
        currency: Option<Currency>,
        allowance: Option<U256>,
        registered: Option<bool>,
    ) -> Self {
        if !connected {
            return Self::ConnectWallet;
        }
        if currency.is_none() {
            return Self::SelectCurrency;
        }
        if allowance.is_none_or(|a| a.is_zero()) {
            return Self::Approve;
        }
        if registered != Some(true) {
            return Self::Whitelist;
        }
        Self::Complete
    }

    /// 1-based step number.
    pub const fn number(self) -> u8 {
        self as u8
    }

    /// Completed share of the sequence, 0 to 100.
    pub const fn progress_percent(self) -> u8 {
        let done = (self as u16 - 1) * 100 / (STEP_COUNT as u16 - 1);
        if done > 100 {
            100
        } else {
            done as u8
        }
    }

    pub const fn is_complete(self) -> bool {
        matches!(self, Self::Complete)
    }

    /// The step that follows this one once it is done.
    pub const fn next(self) -> Self {
        match self {
            Self::ConnectWallet => Self::SelectCurrency,
            Self::SelectCurrency => Self::Approve,
            Self::Approve => Self::Whitelist,
            Self::Whitelist | Self::Complete => Self::Complete,
        }
    }

    /// What the user has to do next.
    pub const fn label(self) -> &'static str {
        match self {
            Self::ConnectWallet => "Connect your wallet",
            Self::SelectCurrency => "Select a currency",
            Self::Approve => "Approve the whitelist contract to spend your tokens",
            Self::Whitelist => "Join the whitelist",
            Self::Complete => "Approved and whitelisted",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "step {}: {}", self.number(), self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disconnected_always_first_step() {
        let step = Step::derive(false, Some(Currency::Usdt), Some(U256::MAX), Some(true));
        assert_eq!(step, Step::ConnectWallet);
    }

    #[test]
    fn test_currency_required() {
        let step = Step::derive(true, None, Some(U256::MAX), Some(true));
        assert_eq!(step, Step::SelectCurrency);
    }

    #[test]
    fn test_zero_or_unknown_allowance_needs_approval() {
        assert_eq!(
            Step::derive(true, Some(Currency::Usdt), None, None),
            Step::Approve
        );
        assert_eq!(
            Step::derive(true, Some(Currency::Usdt), Some(U256::ZERO), Some(false)),
            Step::Approve
        );
    }

    #[test]
    fn test_approval_precedes_registration() {
        // already registered but allowance revoked: still blocked on approval
        let step = Step::derive(true, Some(Currency::Epound), Some(U256::ZERO), Some(true));
        assert_eq!(step, Step::Approve);
    }

    #[test]
    fn test_any_positive_allowance_moves_to_whitelist() {
        assert_eq!(
            Step::derive(true, Some(Currency::Usdt), Some(U256::from(1)), Some(false)),
            Step::Whitelist
        );
        assert_eq!(
            Step::derive(true, Some(Currency::Usdt), Some(U256::from(1)), None),
            Step::Whitelist
        );
    }

    #[test]
    fn test_complete() {
        let step = Step::derive(true, Some(Currency::Usdt), Some(U256::MAX), Some(true));
        assert_eq!(step, Step::Complete);
        assert!(step.is_complete());
    }

    #[test]
    fn test_progress() {
        assert_eq!(Step::ConnectWallet.progress_percent(), 0);
        assert_eq!(Step::SelectCurrency.progress_percent(), 33);
        assert_eq!(Step::Approve.progress_percent(), 66);
        assert_eq!(Step::Whitelist.progress_percent(), 100);
        assert_eq!(Step::Complete.progress_percent(), 100);
    }

    #[test]
    fn test_next() {
        assert_eq!(Step::Approve.next(), Step::Whitelist);
        assert_eq!(Step::Whitelist.next(), Step::Complete);
        assert_eq!(Step::Complete.next(), Step::Complete);
    }

    #[test]
    fn test_ordering_and_display() {
        assert!(Step::Approve < Step::Whitelist);
        assert_eq!(Step::Whitelist.number(), 4);
        assert_eq!(Step::Approve.to_string(), format!("step 3: {}", Step::Approve.label()));
    }
}
