//! Price oracle daemon entrypoint.
//!
//! Multi-source fetch (primary AMM quote, fallback JWT ticker), divergence
//! blocking, bounds checks, and a circuit breaker that pages out over
//! Telegram before pausing writes to Ledger L.

mod alert;
mod config;
mod run;

use bridge_core::{HealthState, SigDown, Telemetry};
use std::process;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let _telemetry = Telemetry::init("bridge-oracle");

    let result = run_oracle().await;
    if let Err(e) = result {
        tracing::error!(error = %e, "bridge-oracle exited with an error");
        process::exit(1);
    }
}

async fn run_oracle() -> Result<(), bridge_core::BridgeError> {
    let oracle_config = config::OracleConfig::load().map_err(|e| bridge_core::BridgeError::Fatal(e.to_string()))?;

    tracing::info!(
        environment = ?oracle_config.common.args.environment,
        l_host = %bridge_core::util::scrub::scrub_url(oracle_config.common.args.l_host.as_str()),
        symbol = %oracle_config.args.symbol,
        "starting bridge-oracle"
    );

    let sig_down = SigDown::try_new().map_err(bridge_core::BridgeError::Signal)?;
    let cancellation_token = sig_down.cancellation_token();
    let health = HealthState::new();

    let health_port = oracle_config.common.args.pre_stop_port;
    let health_for_server = health.clone();
    let health_cancellation = cancellation_token.clone();
    let health_task = tokio::spawn(async move {
        if let Err(e) = bridge_core::health::serve(health_port, health_for_server, health_cancellation).await {
            tracing::error!(error = %e, "health server exited unexpectedly");
        }
    });

    let drain_timeout = std::time::Duration::from_millis(oracle_config.common.args.drain_timeout_ms);
    let loop_task = tokio::spawn(run::run(oracle_config, health, cancellation_token));

    sig_down.recv().await;
    sig_down
        .drain_with_deadline(drain_timeout, async {
            match loop_task.await {
                Ok(Err(e)) => tracing::error!(error = %e, "oracle loop exited with an error"),
                Err(e) => tracing::error!(error = %e, "oracle loop task panicked"),
                Ok(Ok(())) => {}
            }
            health_task.abort();
        })
        .await;

    Ok(())
}
