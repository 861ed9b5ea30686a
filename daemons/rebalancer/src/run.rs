//! The rebalancer's poll loop: re-read each vault's current LTV and
//! exercise `Rebalance` on any vault that has drifted outside
//! `targetLtvBps ± safetyBufferBps`.

use crate::config::RebalancerConfig;
use bridge_core::HealthState;
use bridge_types::TemplateId;
use ledger_client::LedgerClient;
use std::str::FromStr;
use tokio_util::sync::CancellationToken;

pub async fn run(config: RebalancerConfig, health: HealthState, cancellation_token: CancellationToken) -> Result<(), bridge_core::BridgeError> {
    let l_token = bridge_core::config::resolve_secret("L_TOKEN", config.common.args.secrets_dir.as_deref(), "l-token")
        .unwrap_or_else(|| config.common.args.l_token.clone());
    let ledger = LedgerClient::new(
        config.common.args.l_host.clone(),
        l_token,
        config.common.args.l_package_id.clone(),
        config.common.args.l_party.clone(),
    );

    let vault_template = TemplateId::from_str(&config.args.vault_template)
        .map_err(|e| bridge_core::BridgeError::Fatal(format!("invalid VAULT_TEMPLATE: {e}")))?;
    let (lower_bps, upper_bps) = config.bounds();
    let poll_interval = config.poll_interval();

    health.set_ready(true);
    loop {
        tokio::select! {
            _ = cancellation_token.cancelled() => {
                tracing::info!("shutdown signal observed, rebalancer loop exiting");
                break;
            }
            _ = tokio::time::sleep(poll_interval) => {}
        }

        if let Err(e) = poll_cycle(&ledger, &vault_template, lower_bps, upper_bps).await {
            tracing::warn!(error = %e, "rebalancer poll cycle failed");
        }
    }

    health.set_ready(false);
    Ok(())
}

async fn poll_cycle(
    ledger: &LedgerClient,
    vault_template: &TemplateId,
    lower_bps: u32,
    upper_bps: u32,
) -> Result<(), ledger_client::LedgerError> {
    let vaults = ledger.query_active(Some(vault_template.clone()), None).await?;
    for vault in vaults {
        let Some(current_ltv_bps) = vault.payload.get("currentLtvBps").and_then(|v| v.as_u64()) else {
            tracing::warn!(contract_id = %vault.contract_id, "vault position missing currentLtvBps, skipping");
            continue;
        };
        let current_ltv_bps = current_ltv_bps as u32;

        if current_ltv_bps < lower_bps || current_ltv_bps > upper_bps {
            tracing::info!(
                contract_id = %vault.contract_id,
                current_ltv_bps,
                lower_bps,
                upper_bps,
                "vault LTV drifted outside envelope, rebalancing"
            );
            if let Err(e) = ledger.exercise_choice(vault_template, &vault.contract_id, "Rebalance", serde_json::json!({}), &[]).await {
                tracing::warn!(contract_id = %vault.contract_id, error = %e, "rebalance submission failed, will retry next cycle");
            }
        }
    }

    Ok(())
}
