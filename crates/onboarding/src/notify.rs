//! Transaction notifications.
//!
//! Every transaction goes through `Submitting -> Confirming -> Confirmed` or
//! ends in `Failed`. Each phase is reported as a [`Notice`] keyed by the
//! transaction kind, so a later phase replaces the earlier one for the same
//! kind.

use alloy_primitives::TxHash;
use config::{ChainConfig, Currency};
use serde::Serialize;
use tracing::{error, info};

/// Which of the two onboarding transactions a notice is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TxKind {
    Approval,
    Whitelist,
}

impl TxKind {
    pub const fn id(self) -> &'static str {
        match self {
            Self::Approval => "approval",
            Self::Whitelist => "whitelist",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum TxPhase {
    Idle,
    /// Waiting for the wallet to sign and the node to accept the transaction
    Submitting,
    Confirming { tx_hash: TxHash },
    Confirmed { tx_hash: TxHash },
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: TxKind,
    pub currency: Currency,
    #[serde(flatten)]
    pub phase: TxPhase,
}

impl Notice {
    pub const fn new(kind: TxKind, currency: Currency) -> Self {
        Self {
            kind,
            currency,
            phase: TxPhase::Idle,
        }
    }

    /// Same transaction, another phase.
    pub fn with_phase(&self, phase: TxPhase) -> Self {
        Self {
            kind: self.kind,
            currency: self.currency,
            phase,
        }
    }

    /// Whether the transaction is still in flight.
    pub const fn is_pending(&self) -> bool {
        matches!(
            self.phase,
            TxPhase::Submitting | TxPhase::Confirming { .. }
        )
    }

    /// User-facing message.
    pub fn message(&self) -> String {
        let name = self.currency.display_name();
        match (self.kind, &self.phase) {
            (_, TxPhase::Idle) => String::new(),
            (TxKind::Approval, TxPhase::Submitting) => format!("Approving {name}..."),
            (TxKind::Approval, TxPhase::Confirming { .. }) => "Confirming approval...".to_string(),
            (TxKind::Approval, TxPhase::Confirmed { .. }) => format!("{name} approval successful!"),
            (TxKind::Approval, TxPhase::Failed { .. }) => {
                "Failed to submit approval transaction".to_string()
            }
            (TxKind::Whitelist, TxPhase::Submitting) => "Adding to whitelist...".to_string(),
            (TxKind::Whitelist, TxPhase::Confirming { .. }) => {
                "Confirming whitelist...".to_string()
            }
            (TxKind::Whitelist, TxPhase::Confirmed { .. }) => {
                "Successfully added to whitelist!".to_string()
            }
            (TxKind::Whitelist, TxPhase::Failed { .. }) => {
                "Failed to submit whitelist transaction".to_string()
            }
        }
    }
}

/// Receives transaction notices.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: &Notice);
}

/// Reports notices through `tracing`.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier {
    chain: ChainConfig,
}

impl LogNotifier {
    pub const fn new(chain: ChainConfig) -> Self {
        Self { chain }
    }
}

impl Notifier for LogNotifier {
    fn notify(&self, notice: &Notice) {
        let id = notice.kind.id();
        match &notice.phase {
            TxPhase::Idle => {}
            TxPhase::Submitting => info!(id, "{}", notice.message()),
            TxPhase::Confirming { tx_hash } => {
                info!(id, tx_hash = %tx_hash, "{}", notice.message())
            }
            TxPhase::Confirmed { tx_hash } => info!(
                id,
                tx_hash = %tx_hash,
                explorer = %self.chain.tx_url(*tx_hash),
                "{}",
                notice.message()
            ),
            TxPhase::Failed { reason } => error!(id, reason = %reason, "{}", notice.message()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::B256;

    #[test]
    fn test_messages() {
        let approval = Notice::new(TxKind::Approval, Currency::Epound);
        assert_eq!(
            approval.with_phase(TxPhase::Submitting).message(),
            "Approving ePound..."
        );
        assert_eq!(
            approval
                .with_phase(TxPhase::Confirmed {
                    tx_hash: B256::ZERO
                })
                .message(),
            "ePound approval successful!"
        );

        let whitelist = Notice::new(TxKind::Whitelist, Currency::Usdt);
        assert_eq!(
            whitelist
                .with_phase(TxPhase::Failed {
                    reason: "rejected".to_string()
                })
                .message(),
            "Failed to submit whitelist transaction"
        );
        assert!(whitelist.message().is_empty());
    }

    #[test]
    fn test_pending_phases() {
        let notice = Notice::new(TxKind::Whitelist, Currency::Usdt);
        assert!(!notice.is_pending());
        assert!(notice.with_phase(TxPhase::Submitting).is_pending());
        assert!(notice
            .with_phase(TxPhase::Confirming {
                tx_hash: B256::ZERO
            })
            .is_pending());
        assert!(!notice
            .with_phase(TxPhase::Confirmed {
                tx_hash: B256::ZERO
            })
            .is_pending());
    }

    #[test]
    fn test_with_phase_keeps_identity() {
        let notice = Notice::new(TxKind::Approval, Currency::Usdt).with_phase(TxPhase::Submitting);
        assert_eq!(notice.kind, TxKind::Approval);
        assert_eq!(notice.currency, Currency::Usdt);
        assert_eq!(notice.kind.id(), "approval");
    }
}
