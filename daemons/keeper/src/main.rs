//! Lending keeper daemon entrypoint.
//!
//! Revalues open loan positions against live oracle prices and liquidates
//! any position whose health factor falls below `criticalHF`.

mod config;
mod run;

use bridge_core::{HealthState, SigDown, Telemetry};
use std::process;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let _telemetry = Telemetry::init("bridge-keeper");

    let result = run_keeper().await;
    if let Err(e) = result {
        tracing::error!(error = %e, "bridge-keeper exited with an error");
        process::exit(1);
    }
}

async fn run_keeper() -> Result<(), bridge_core::BridgeError> {
    let keeper_config = config::KeeperConfig::load().map_err(|e| bridge_core::BridgeError::Fatal(e.to_string()))?;

    tracing::info!(
        environment = ?keeper_config.common.args.environment,
        l_host = %bridge_core::util::scrub::scrub_url(keeper_config.common.args.l_host.as_str()),
        critical_hf = %keeper_config.args.critical_hf,
        "starting bridge-keeper"
    );

    let sig_down = SigDown::try_new().map_err(bridge_core::BridgeError::Signal)?;
    let cancellation_token = sig_down.cancellation_token();
    let health = HealthState::new();

    let health_port = keeper_config.common.args.pre_stop_port;
    let health_for_server = health.clone();
    let health_cancellation = cancellation_token.clone();
    let health_task = tokio::spawn(async move {
        if let Err(e) = bridge_core::health::serve(health_port, health_for_server, health_cancellation).await {
            tracing::error!(error = %e, "health server exited unexpectedly");
        }
    });

    let drain_timeout = std::time::Duration::from_millis(keeper_config.common.args.drain_timeout_ms);
    let loop_task = tokio::spawn(run::run(keeper_config, health, cancellation_token));

    sig_down.recv().await;
    sig_down
        .drain_with_deadline(drain_timeout, async {
            match loop_task.await {
                Ok(Err(e)) => tracing::error!(error = %e, "keeper loop exited with an error"),
                Err(e) => tracing::error!(error = %e, "keeper loop task panicked"),
                Ok(Ok(())) => {}
            }
            health_task.abort();
        })
        .await;

    Ok(())
}
