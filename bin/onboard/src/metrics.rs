//! Prometheus metrics for the onboard tool.
//!
//! All metrics are aggregated in the [`Metrics`] struct. Transaction counters
//! are fed by [`MetricsNotifier`], which wraps the log notifier.

use config::{ChainConfig, Currency};
use metrics::{counter, describe_counter, describe_gauge, gauge};
use onboarding::{
    notify::{LogNotifier, Notice, Notifier, TxPhase},
    Step,
};

/// Aggregated metrics for the onboard tool.
///
/// Metrics are registered with the global metrics registry on creation.
#[derive(Debug, Clone)]
pub struct Metrics {
    _private: (),
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    /// Create a new metrics instance and register all metric descriptions.
    pub fn new() -> Self {
        Self::register_descriptions();
        Self { _private: () }
    }

    fn register_descriptions() {
        // Transaction metrics
        describe_counter!(
            "onboard_transactions_submitted_total",
            "Transactions handed to the wallet, by kind"
        );
        describe_counter!(
            "onboard_transactions_confirmed_total",
            "Transactions confirmed on chain, by kind"
        );
        describe_counter!(
            "onboard_transactions_failed_total",
            "Transactions rejected, reverted or dropped, by kind"
        );
        describe_gauge!(
            "onboard_transactions_pending",
            "1 while a transaction of this kind is in flight"
        );

        // Status metrics
        describe_gauge!(
            "onboard_step",
            "Current onboarding step (1-5) by currency"
        );
        describe_gauge!(
            "onboard_progress_percent",
            "Onboarding progress by currency"
        );
        describe_counter!(
            "onboard_status_reads_total",
            "Status reads, by outcome"
        );
    }

    pub fn record_submitted(&self, kind: &'static str) {
        counter!("onboard_transactions_submitted_total", "kind" => kind).increment(1);
    }

    pub fn record_confirmed(&self, kind: &'static str) {
        counter!("onboard_transactions_confirmed_total", "kind" => kind).increment(1);
    }

    pub fn record_failed(&self, kind: &'static str) {
        counter!("onboard_transactions_failed_total", "kind" => kind).increment(1);
    }

    pub fn set_pending(&self, kind: &'static str, pending: bool) {
        gauge!("onboard_transactions_pending", "kind" => kind).set(if pending { 1.0 } else { 0.0 });
    }

    /// Record the step last read for `currency`.
    pub fn set_step(&self, currency: Currency, step: Step) {
        let currency = currency.symbol();
        gauge!("onboard_step", "currency" => currency).set(f64::from(step.number()));
        gauge!("onboard_progress_percent", "currency" => currency)
            .set(f64::from(step.progress_percent()));
    }

    pub fn record_status_read(&self, success: bool) {
        let outcome = if success { "success" } else { "failure" };
        counter!("onboard_status_reads_total", "outcome" => outcome).increment(1);
    }
}

/// Logs every notice and counts transactions per phase.
#[derive(Debug, Clone)]
pub struct MetricsNotifier {
    inner: LogNotifier,
    metrics: Metrics,
}

impl MetricsNotifier {
    pub const fn new(chain: ChainConfig, metrics: Metrics) -> Self {
        Self {
            inner: LogNotifier::new(chain),
            metrics,
        }
    }
}

impl Notifier for MetricsNotifier {
    fn notify(&self, notice: &Notice) {
        self.inner.notify(notice);

        let kind = notice.kind.id();
        self.metrics.set_pending(kind, notice.is_pending());
        match notice.phase {
            TxPhase::Submitting => self.metrics.record_submitted(kind),
            TxPhase::Confirmed { .. } => self.metrics.record_confirmed(kind),
            TxPhase::Failed { .. } => self.metrics.record_failed(kind),
            TxPhase::Idle | TxPhase::Confirming { .. } => {}
        }
    }
}

/// Install the Prometheus metrics exporter and start the HTTP server.
///
/// Returns an error if the server fails to bind to the specified port.
pub fn install_prometheus_exporter(port: u16) -> eyre::Result<()> {
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::net::SocketAddr;

    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| eyre::eyre!("Failed to install Prometheus exporter: {}", e))?;

    Ok(())
}
