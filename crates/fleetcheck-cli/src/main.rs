//! fleetcheck — verify a service fleet against its discovery registry.
//!
//! Counts the instances of one service type announced in discovery,
//! probes each instance's health endpoint, and prints a Nagios plugin
//! result. The exit code is the plugin status: 0 OK, 1 WARNING,
//! 2 CRITICAL, 3 UNKNOWN.
//!
//! # Usage
//!
//! ```text
//! fleetcheck -d http://discovery.example:8080 -s foo -c 2 -w 3
//! ```

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use clap::error::ErrorKind;
use fleetcheck_core::{CheckConfig, ConfigError};
use fleetcheck_discovery::DiscoveryClient;
use fleetcheck_health::{AggregateVerdict, ServiceCheck};
use tokio::sync::watch;
use tracing::{info, warn};

mod cli;
mod logging;
mod report;

use cli::Cli;

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) {
                return ExitCode::SUCCESS;
            }
            let rendered = e.to_string();
            let detail = rendered
                .lines()
                .next()
                .unwrap_or_default()
                .trim_start_matches("error: ");
            return finish(&invalid(ConfigError::Arguments(detail.to_string())));
        }
    };

    if let Err(e) = logging::init(cli.verbose, cli.log_format) {
        eprintln!("fleetcheck: failed to initialise logging: {e}");
    }

    let config = match cli.check_config() {
        Ok(config) => config,
        Err(e) => return finish(&invalid(e)),
    };

    let verdict = match run(config) {
        Ok(verdict) => verdict,
        Err(e) => AggregateVerdict::unknown(format!("{e:#}")),
    };
    finish(&verdict)
}

fn invalid(e: ConfigError) -> AggregateVerdict {
    AggregateVerdict::unknown(format!("invalid configuration: {e}"))
}

fn finish(verdict: &AggregateVerdict) -> ExitCode {
    print!("{}", report::render(verdict));
    ExitCode::from(verdict.severity().exit_code())
}

fn run(config: CheckConfig) -> anyhow::Result<AggregateVerdict> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start runtime")?;
    runtime.block_on(run_check(config))
}

async fn run_check(config: CheckConfig) -> anyhow::Result<AggregateVerdict> {
    let discovery = DiscoveryClient::with_default_timeout(config.discovery.clone())
        .context("failed to set up discovery client")?;
    let check = ServiceCheck::from_config(&config).context("failed to set up health prober")?;

    info!(
        service = %config.service,
        discovery = %config.discovery,
        "starting check"
    );

    // ── Cancellation signal ────────────────────────────────────

    let (cancel_tx, cancel_rx) = watch::channel(false);
    let deadline = config.deadline;
    let canceller = tokio::spawn(async move {
        let interrupted = async {
            if tokio::signal::ctrl_c().await.is_err() {
                std::future::pending::<()>().await;
            }
        };
        let expired = async {
            match deadline {
                Some(d) => tokio::time::sleep(d).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::select! {
            _ = interrupted => info!("interrupt received, cancelling run"),
            _ = expired => warn!(?deadline, "deadline reached, cancelling run"),
        }
        let _ = cancel_tx.send(true);
    });

    // ── Run ────────────────────────────────────────────────────

    let handle = tokio::spawn(async move { check.run(&discovery, cancel_rx).await });
    let verdict = handle.await.context("check run aborted");

    canceller.abort();
    verdict
}
