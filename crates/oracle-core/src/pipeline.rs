use crate::error::OracleError;
use crate::source::PriceSource;
use crate::state::{OracleState, PriceBounds};
use rust_decimal::Decimal;
use std::sync::Arc;

/// Result of a successful fetch cycle, ready for the caller to push to L.
/// `last_accepted` is deliberately not updated here; the caller must call
/// [`OracleState::confirm_published`] after the push succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOutcome {
    pub symbol: String,
    pub price: Decimal,
    pub single_source: bool,
}

/// Runs one fetch cycle for `state.symbol()` against every configured
/// source, applying divergence blocking, multi-provider averaging, and
/// bounds checks.
///
/// Failure accounting for the circuit breaker happens unconditionally;
/// accounting for a source's *recovery* (clearing its failure streak) is
/// deferred until the cycle is actually accepted, so a divergence or
/// bounds rejection never erases an in-progress failure streak.
pub async fn fetch_and_publish(
    state: &mut OracleState,
    sources: &[Arc<dyn PriceSource>],
    bounds: &PriceBounds,
) -> Result<PublishOutcome, OracleError> {
    if sources.is_empty() {
        return Err(OracleError::NoSourcesConfigured);
    }

    let symbol = state.symbol().to_string();
    let mut successes: Vec<(&str, Decimal)> = Vec::with_capacity(sources.len());
    for source in sources {
        match source.fetch(&symbol).await {
            Ok(price) => successes.push((source.name(), price)),
            Err(e) => {
                tracing::warn!(symbol = %symbol, source = source.name(), error = %e, "price source fetch failed");
                state.record_source_failure(source.name());
            }
        }
    }

    if state.is_paused() {
        return Err(OracleError::CircuitBreakerOpen);
    }

    let candidate = match successes.as_slice() {
        [] => return Err(OracleError::AllSourcesFailed { symbol }),
        [(name, price)] => {
            let name = *name;
            let price = *price;
            (price, true, vec![name])
        }
        [(name_a, price_a), (name_b, price_b), ..] => {
            let avg = (*price_a + *price_b) / Decimal::TWO;
            let divergence_pct = if avg == Decimal::ZERO {
                Decimal::ZERO
            } else {
                ((*price_a - *price_b) / avg).abs() * Decimal::ONE_HUNDRED
            };
            if divergence_pct > bounds.divergence_threshold_pct {
                return Err(OracleError::Divergence {
                    symbol,
                    source_a: name_a.to_string(),
                    price_a: *price_a,
                    source_b: name_b.to_string(),
                    price_b: *price_b,
                    divergence_pct,
                    threshold_pct: bounds.divergence_threshold_pct,
                });
            }
            (avg, false, vec![*name_a, *name_b])
        }
    };
    let (price, single_source, accepted_sources) = candidate;

    if let Err(reason) = state.check_bounds(price, bounds) {
        return Err(OracleError::OutOfBounds { symbol, value: price, reason });
    }

    for name in accepted_sources {
        state.record_source_recovered(name);
    }

    Ok(PublishOutcome { symbol, price, single_source })
}
