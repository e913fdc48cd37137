//! Approve and join a currency whitelist on BNB Smart Chain.
//!
//! - `status`: show the current step for the selected currency
//! - `approve`: approve the whitelist contract on the token
//! - `whitelist`: register an address on the whitelist
//! - `run`: approve and register as needed
//! - `watch`: poll the status and log step changes
//! - `info`: token metadata and whitelist statistics
//! - `check`: validate the configured contracts

use alloy_primitives::Address;
use alloy_provider::Provider;
use clap::{Parser, Subcommand};
use client::{ExternalWallet, Wallet};
use config::Currency;
use eyre::OptionExt;
use onboard::{
    approval_amount, check_currencies,
    config::{Config, LogFormat},
    currency_info,
    metrics::{install_prometheus_exporter, Metrics, MetricsNotifier},
    report::{emit, StatusReport, TxReport},
};
use onboarding::{flow::NOT_READY, Onboarding};
use std::{path::PathBuf, sync::Arc, time::Duration};
use tokio::time;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "onboard")]
#[command(about = "Approve and join a currency whitelist on BNB Smart Chain")]
struct Cli {
    /// Path to the configuration file (default: ./config.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Private key for signing transactions (hex string, with or without 0x prefix)
    #[arg(short = 'k', long, env = "PRIVATE_KEY", hide_env_values = true, global = true)]
    private_key: Option<String>,

    /// JSON-RPC endpoint of an external wallet that signs transactions
    #[arg(long, env = "WALLET_URL", conflicts_with = "private_key", global = true)]
    wallet_url: Option<String>,

    /// BSC RPC endpoint, overrides the config file
    #[arg(long, env = "RPC_URL", global = true)]
    rpc_url: Option<String>,

    /// Currency to onboard with (USDT or EPOUND)
    #[arg(long, global = true)]
    currency: Option<Currency>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Log as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the current onboarding step
    Status {
        /// Read-only address to inspect instead of the wallet account
        #[arg(long)]
        address: Option<Address>,
    },

    /// Approve the whitelist contract to spend your tokens
    Approve {
        /// Amount in token units (default: unlimited)
        #[arg(long, conflicts_with = "revoke")]
        amount: Option<String>,

        /// Set the allowance back to zero
        #[arg(long)]
        revoke: bool,
    },

    /// Add an address to the whitelist (default: your account)
    Whitelist {
        #[arg(long)]
        address: Option<Address>,
    },

    /// Approve and join the whitelist, as needed
    Run,

    /// Poll the status and log step changes
    Watch {
        /// Poll interval in seconds
        #[arg(long, default_value_t = 15)]
        interval: u64,

        #[arg(long)]
        address: Option<Address>,
    },

    /// Token metadata and whitelist statistics
    Info {
        /// Include the whitelist's view of this address
        #[arg(long)]
        address: Option<Address>,
    },

    /// Validate the contract addresses of every currency
    Check {
        #[arg(long)]
        address: Option<Address>,
    },
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(rpc_url) = &cli.rpc_url {
        config.rpc_url = rpc_url.clone();
    }

    init_tracing(cli.log_json || config.log_format == LogFormat::Json);

    // descriptions only reach a recorder installed before them
    if let Some(port) = config.metrics_port {
        install_prometheus_exporter(port)?;
        info!(port, "Prometheus exporter listening");
    }
    let metrics = Metrics::new();

    let chain = config.chain();
    info!(chain = %chain.name, rpc_url = %chain.rpc_url, "Connecting");

    let provider = client::create_provider(&chain.rpc_url)?;
    client::ensure_chain(&provider, chain.chain_id).await?;

    let mut flow = Onboarding::new(provider, chain.clone(), config.currency_table())
        .with_refetch(config.refetch_policy())
        .with_confirmations(config.confirmations)
        .with_notifier(Arc::new(MetricsNotifier::new(chain.clone(), metrics.clone())));

    if let Some(private_key) = &cli.private_key {
        flow.connect(Wallet::from_private_key(private_key)?);
    } else if let Some(url) = &cli.wallet_url {
        let wallet = ExternalWallet::connect(url.as_str(), chain.chain_id).await?;
        flow.connect(Wallet::External(wallet));
    }

    if let Some(currency) = cli.currency.or(config.default_currency) {
        flow.select_currency(currency);
    }

    let unconfigured = flow.currencies().unconfigured();
    if !unconfigured.is_empty() {
        info!(?unconfigured, "Some currencies have no contract configured");
    }

    match cli.command {
        Command::Status { address } => {
            if let Some(address) = address {
                flow.watch(address);
            }
            let status = flow.status().await?;
            metrics.record_status_read(true);
            if let Some(currency) = status.currency {
                metrics.set_step(currency, status.step());
            }
            emit(&StatusReport::new(&status, flow.currency()), cli.json)?;
        }
        Command::Approve { amount, revoke } => {
            let currency = flow.currency().ok_or_eyre(NOT_READY)?;
            let amount = approval_amount(amount.as_deref(), revoke, currency)?;

            let outcome = flow.approve(amount).await?;
            emit(
                &TxReport::new("approve", outcome.as_ref(), flow.chain()),
                cli.json,
            )?;
        }
        Command::Whitelist { address } => {
            let outcome = flow.whitelist(address).await?;
            emit(
                &TxReport::new("whitelist", outcome.as_ref(), flow.chain()),
                cli.json,
            )?;
        }
        Command::Run => {
            let status = flow.run().await?;
            emit(&StatusReport::new(&status, flow.currency()), cli.json)?;
        }
        Command::Watch { interval, address } => {
            if let Some(address) = address {
                flow.watch(address);
            }
            watch(&flow, &metrics, Duration::from_secs(interval.max(1))).await;
        }
        Command::Info { address } => {
            let currency = flow
                .currency()
                .ok_or_eyre("Please select a currency (--currency)")?;
            let user = address.or(flow.account());
            let report = currency_info(flow.reader(), flow.chain(), currency, user).await?;
            emit(&report, cli.json)?;
        }
        Command::Check { address } => {
            let account = address.or(flow.account());
            let report = check_currencies(flow.reader(), flow.currencies(), account).await;
            emit(&report, cli.json)?;
            if !report.is_healthy() {
                eyre::bail!("Currency check found issues");
            }
        }
    }

    Ok(())
}

/// Poll the status until interrupted, logging every step change.
async fn watch<P>(flow: &Onboarding<P>, metrics: &Metrics, period: Duration)
where
    P: Provider + Clone + 'static,
{
    info!(account = ?flow.account(), currency = ?flow.selected(), "Watching onboarding status");

    let mut interval = time::interval(period);
    let mut last_step = None;

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping watch");
                return;
            }
        }

        match flow.status().await {
            Ok(status) => {
                metrics.record_status_read(true);
                let step = status.step();
                if let Some(currency) = status.currency {
                    metrics.set_step(currency, step);
                }

                if last_step != Some(step) {
                    info!(
                        step = step.number(),
                        progress = step.progress_percent(),
                        "{}",
                        step.label()
                    );
                    last_step = Some(step);
                }
            }
            Err(e) => {
                metrics.record_status_read(false);
                error!("Failed to read onboarding status: {}", e);
            }
        }
    }
}
