//! Relay daemon entrypoint.
//!
//! Carries threshold-signed attestation requests from Ledger L onto chain
//! E's attestation-bridge contract: nonce sequencing, chain-id and replay
//! guards, signature-set verification, pre-flight simulation, submission,
//! and L-side archival.

mod assembly;
mod config;
mod run;

use bridge_core::{HealthState, SigDown, Telemetry};
use std::process;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let _telemetry = Telemetry::init("bridge-relay");

    let result = run_relay().await;
    if let Err(e) = result {
        tracing::error!(error = %e, "bridge-relay exited with an error");
        process::exit(1);
    }
}

async fn run_relay() -> Result<(), bridge_core::BridgeError> {
    let relay_config = config::RelayConfig::load().map_err(|e| bridge_core::BridgeError::Fatal(e.to_string()))?;

    tracing::info!(
        environment = ?relay_config.common.args.environment,
        l_host = %bridge_core::util::scrub::scrub_url(relay_config.common.args.l_host.as_str()),
        direction = ?relay_config.direction(),
        "starting bridge-relay"
    );

    let sig_down = SigDown::try_new().map_err(bridge_core::BridgeError::Signal)?;
    let cancellation_token = sig_down.cancellation_token();
    let health = HealthState::new();

    let health_port = relay_config.common.args.pre_stop_port;
    let health_for_server = health.clone();
    let health_cancellation = cancellation_token.clone();
    let health_task = tokio::spawn(async move {
        if let Err(e) = bridge_core::health::serve(health_port, health_for_server, health_cancellation).await {
            tracing::error!(error = %e, "health server exited unexpectedly");
        }
    });

    let drain_timeout = std::time::Duration::from_millis(relay_config.common.args.drain_timeout_ms);
    let loop_task = tokio::spawn(run::run(relay_config, health, cancellation_token));

    sig_down.recv().await;
    sig_down
        .drain_with_deadline(drain_timeout, async {
            match loop_task.await {
                Ok(Err(e)) => tracing::error!(error = %e, "relay loop exited with an error"),
                Err(e) => tracing::error!(error = %e, "relay loop task panicked"),
                Ok(Ok(())) => {}
            }
            health_task.abort();
        })
        .await;

    Ok(())
}
