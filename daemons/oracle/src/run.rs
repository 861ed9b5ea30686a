//! The oracle's poll loop: fetch from the primary and fallback price
//! sources via `oracle-core`, and on acceptance push an `UpdatePrice`
//! exercise to the configured price-feed contract on L. Circuit-breaker
//! trips fire a best-effort Telegram alert; `lastAccepted` is only
//! confirmed once that ledger write actually succeeds.

use crate::alert::Alerter;
use crate::config::OracleConfig;
use bridge_core::HealthState;
use bridge_types::TemplateId;
use ledger_client::LedgerClient;
use oracle_core::{AmmQuoteSource, JwtTickerSource, OracleState, PriceSource, fetch_and_publish};
use std::str::FromStr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub async fn run(config: OracleConfig, health: HealthState, cancellation_token: CancellationToken) -> Result<(), bridge_core::BridgeError> {
    let l_token = bridge_core::config::resolve_secret("L_TOKEN", config.common.args.secrets_dir.as_deref(), "l-token")
        .unwrap_or_else(|| config.common.args.l_token.clone());
    let ledger = LedgerClient::new(
        config.common.args.l_host.clone(),
        l_token,
        config.common.args.l_package_id.clone(),
        config.common.args.l_party.clone(),
    );

    let price_template = TemplateId::from_str(&config.args.price_template)
        .map_err(|e| bridge_core::BridgeError::Fatal(format!("invalid PRICE_TEMPLATE: {e}")))?;

    let sources: Vec<Arc<dyn PriceSource>> = vec![
        Arc::new(AmmQuoteSource::new(config.args.amm_quote_url.clone())),
        Arc::new(JwtTickerSource::new(config.args.jwt_ticker_url.clone(), config.args.jwt_ticker_token.clone())),
    ];
    let bounds = config.bounds();
    let mut state = OracleState::new(config.args.symbol.clone(), config.args.max_consecutive_failures);
    let alerter = Alerter::configured(config.args.telegram_bot_token.clone(), config.args.telegram_chat_id.clone());
    let poll_interval = config.poll_interval();
    let mut was_paused = state.is_paused();

    health.set_ready(true);
    loop {
        tokio::select! {
            _ = cancellation_token.cancelled() => {
                tracing::info!("shutdown signal observed, oracle loop exiting");
                break;
            }
            _ = tokio::time::sleep(poll_interval) => {}
        }

        match fetch_and_publish(&mut state, &sources, &bounds).await {
            Ok(outcome) => {
                if let Err(e) = publish(&ledger, &price_template, &outcome).await {
                    tracing::warn!(symbol = %outcome.symbol, error = %e, "price accepted but ledger write failed, baseline not advanced");
                } else {
                    state.confirm_published(outcome.price);
                    tracing::info!(
                        symbol = %outcome.symbol,
                        price = %outcome.price,
                        single_source = outcome.single_source,
                        "price published"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "oracle fetch cycle rejected");
            }
        }

        if state.is_paused() && !was_paused {
            let text = format!("circuit breaker open for {}: too many consecutive source failures", state.symbol());
            alerter.alert(&text).await;
        }
        was_paused = state.is_paused();
    }

    health.set_ready(false);
    Ok(())
}

#[derive(Debug, thiserror::Error)]
enum PublishError {
    #[error(transparent)]
    Ledger(#[from] ledger_client::LedgerError),
    #[error("no active price-feed contract found for {0}")]
    NoFeedContract(String),
}

async fn publish(
    ledger: &LedgerClient,
    price_template: &TemplateId,
    outcome: &oracle_core::PublishOutcome,
) -> Result<(), PublishError> {
    let contracts = ledger.query_active(Some(price_template.clone()), None).await?;
    let feed = contracts
        .into_iter()
        .find(|c| c.payload.get("symbol").and_then(|v| v.as_str()).map(|s| s == outcome.symbol).unwrap_or(false))
        .ok_or_else(|| PublishError::NoFeedContract(outcome.symbol.clone()))?;

    let args = serde_json::json!({
        "newPrice": outcome.price.to_string(),
        "singleSource": outcome.single_source,
    });
    ledger.exercise_choice(price_template, &feed.contract_id, "UpdatePrice", args, &[]).await?;
    Ok(())
}
