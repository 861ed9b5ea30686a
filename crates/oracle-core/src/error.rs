use rust_decimal::Decimal;

#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("source {source} failed: {reason}")]
    SourceFailed { source: String, reason: String },

    #[error("all configured sources failed for {symbol}")]
    AllSourcesFailed { symbol: String },

    #[error(
        "sources diverge for {symbol}: {source_a}={price_a} {source_b}={price_b} ({divergence_pct}% > {threshold_pct}%)"
    )]
    Divergence {
        symbol: String,
        source_a: String,
        price_a: Decimal,
        source_b: String,
        price_b: Decimal,
        divergence_pct: Decimal,
        threshold_pct: Decimal,
    },

    #[error("{symbol} price {value} outside bounds: {reason}")]
    OutOfBounds { symbol: String, value: Decimal, reason: String },

    #[error("circuit breaker is open, writes are paused")]
    CircuitBreakerOpen,

    #[error("no price sources configured")]
    NoSourcesConfigured,
}
