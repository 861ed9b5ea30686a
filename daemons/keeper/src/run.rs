//! The keeper's poll loop: revalue every open loan position against its
//! collateral's current oracle price, and liquidate any position whose
//! health factor has fallen below `criticalHF`.

use crate::config::KeeperConfig;
use bridge_core::HealthState;
use bridge_types::TemplateId;
use ledger_client::{ActiveContract, LedgerClient};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use tokio_util::sync::CancellationToken;

pub async fn run(config: KeeperConfig, health: HealthState, cancellation_token: CancellationToken) -> Result<(), bridge_core::BridgeError> {
    let l_token = bridge_core::config::resolve_secret("L_TOKEN", config.common.args.secrets_dir.as_deref(), "l-token")
        .unwrap_or_else(|| config.common.args.l_token.clone());
    let ledger = LedgerClient::new(
        config.common.args.l_host.clone(),
        l_token,
        config.common.args.l_package_id.clone(),
        config.common.args.l_party.clone(),
    );

    let loan_template = TemplateId::from_str(&config.args.loan_template)
        .map_err(|e| bridge_core::BridgeError::Fatal(format!("invalid LOAN_TEMPLATE: {e}")))?;
    let price_template = TemplateId::from_str(&config.args.price_template)
        .map_err(|e| bridge_core::BridgeError::Fatal(format!("invalid PRICE_TEMPLATE: {e}")))?;

    let poll_interval = config.poll_interval();
    health.set_ready(true);
    loop {
        tokio::select! {
            _ = cancellation_token.cancelled() => {
                tracing::info!("shutdown signal observed, keeper loop exiting");
                break;
            }
            _ = tokio::time::sleep(poll_interval) => {}
        }

        if let Err(e) = poll_cycle(&ledger, &loan_template, &price_template, config.args.critical_hf, config.args.warn_hf).await {
            tracing::warn!(error = %e, "keeper poll cycle failed");
        }
    }

    health.set_ready(false);
    Ok(())
}

fn decimal_field(contract: &ActiveContract, field: &str) -> Option<Decimal> {
    contract.payload.get(field).and_then(|v| v.as_str()).and_then(|s| Decimal::from_str(s).ok())
}

fn string_field(contract: &ActiveContract, field: &str) -> Option<String> {
    contract.payload.get(field).and_then(|v| v.as_str()).map(str::to_string)
}

async fn poll_cycle(
    ledger: &LedgerClient,
    loan_template: &TemplateId,
    price_template: &TemplateId,
    critical_hf: Decimal,
    warn_hf: Decimal,
) -> Result<(), ledger_client::LedgerError> {
    let price_contracts = ledger.query_active(Some(price_template.clone()), None).await?;
    let prices: HashMap<String, Decimal> = price_contracts
        .iter()
        .filter_map(|c| Some((string_field(c, "symbol")?, decimal_field(c, "price")?)))
        .collect();

    let loans = ledger.query_active(Some(loan_template.clone()), None).await?;
    for loan in loans {
        let Some(symbol) = string_field(&loan, "symbol") else {
            tracing::warn!(contract_id = %loan.contract_id, "loan position missing symbol, skipping");
            continue;
        };
        let (Some(collateral_qty), Some(debt_value)) = (decimal_field(&loan, "collateralQty"), decimal_field(&loan, "debtValue")) else {
            tracing::warn!(contract_id = %loan.contract_id, "loan position missing collateralQty/debtValue, skipping");
            continue;
        };
        let Some(&price) = prices.get(&symbol) else {
            tracing::warn!(contract_id = %loan.contract_id, symbol, "no live price for collateral symbol, skipping");
            continue;
        };
        if debt_value.is_zero() {
            continue;
        }

        let collateral_value = collateral_qty * price;
        let health_factor = collateral_value / debt_value;

        if health_factor < critical_hf {
            tracing::warn!(contract_id = %loan.contract_id, %health_factor, %critical_hf, "liquidating undercollateralized loan");
            if let Err(e) = ledger.exercise_choice(loan_template, &loan.contract_id, "Liquidate", serde_json::json!({}), &[]).await {
                tracing::warn!(contract_id = %loan.contract_id, error = %e, "liquidation submission failed, will retry next cycle");
            }
        } else if health_factor < warn_hf {
            tracing::info!(contract_id = %loan.contract_id, %health_factor, %warn_hf, "loan health factor below warning threshold");
        }
    }

    Ok(())
}
