//! Validator daemon entrypoint.
//!
//! Polls candidate attestations on Ledger L, independently re-verifies each
//! against the authoritative asset API, enforces the signing envelope (rate
//! limit, jump cap), and signs via the configured HSM-backed signer.

mod allowlist;
mod authoritative;
mod config;
mod envelope;
mod run;
mod signing;
mod verify;

use bridge_core::{HealthState, SigDown, Telemetry};
use std::process;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let _telemetry = Telemetry::init("bridge-validator");

    let result = run_validator().await;
    if let Err(e) = result {
        tracing::error!(error = %e, "bridge-validator exited with an error");
        process::exit(1);
    }
}

async fn run_validator() -> Result<(), bridge_core::BridgeError> {
    let validator_config = config::ValidatorConfig::load()
        .map_err(|e| bridge_core::BridgeError::Fatal(e.to_string()))?;

    if validator_config.args.rotate_key {
        return run::rotate_key(&validator_config).await;
    }

    tracing::info!(
        environment = ?validator_config.common.args.environment,
        l_host = %bridge_core::util::scrub::scrub_url(validator_config.common.args.l_host.as_str()),
        "starting bridge-validator"
    );

    let sig_down = SigDown::try_new().map_err(bridge_core::BridgeError::Signal)?;
    let cancellation_token = sig_down.cancellation_token();
    let health = HealthState::new();

    let health_port = validator_config.common.args.pre_stop_port;
    let health_for_server = health.clone();
    let health_cancellation = cancellation_token.clone();
    let health_task = tokio::spawn(async move {
        if let Err(e) = bridge_core::health::serve(health_port, health_for_server, health_cancellation).await {
            tracing::error!(error = %e, "health server exited unexpectedly");
        }
    });

    let drain_timeout = std::time::Duration::from_millis(validator_config.common.args.drain_timeout_ms);
    let loop_task = tokio::spawn(run::run(validator_config, health, cancellation_token));

    sig_down.recv().await;
    sig_down
        .drain_with_deadline(drain_timeout, async {
            match loop_task.await {
                Ok(Err(e)) => tracing::error!(error = %e, "validator loop exited with an error"),
                Err(e) => tracing::error!(error = %e, "validator loop task panicked"),
                Ok(Ok(())) => {}
            }
            health_task.abort();
        })
        .await;

    Ok(())
}
