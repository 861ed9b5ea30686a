use rust_decimal::Decimal;
use std::collections::HashMap;

/// Trips once the sum of every source's consecutive-failure count exceeds
/// `max_consecutive_failures`. Recovery is operator-driven only; the loop
/// never clears `paused` on its own.
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    max_consecutive_failures: u32,
    paused: bool,
}

impl CircuitBreaker {
    pub fn new(max_consecutive_failures: u32) -> Self {
        Self { max_consecutive_failures, paused: false }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Re-evaluates the trip condition against the current total failure
    /// count and flips `paused` on first breach. Returns the updated state.
    pub fn evaluate(&mut self, total_failures: u32) -> bool {
        if total_failures > self.max_consecutive_failures {
            self.paused = true;
        }
        self.paused
    }

    /// Operator call: `resetCircuitBreaker()`. Clears `paused` unconditionally;
    /// per-source failure counters are reset separately by the caller before
    /// the next fetch cycle runs.
    pub fn reset(&mut self) {
        self.paused = false;
    }
}

/// Per-symbol oracle bookkeeping.
///
/// `last_accepted` is only ever written by [`OracleState::confirm_published`],
/// never by the fetch pipeline itself — a rejected or not-yet-pushed price
/// must not poison the baseline used for the next bounds check.
#[derive(Debug, Clone)]
pub struct OracleState {
    symbol: String,
    last_accepted: Option<Decimal>,
    consecutive_rejections: u32,
    source_failures: HashMap<String, u32>,
    bounds_violations: u32,
    healthy: bool,
    breaker: CircuitBreaker,
}

impl OracleState {
    pub fn new(symbol: impl Into<String>, max_consecutive_failures: u32) -> Self {
        Self {
            symbol: symbol.into(),
            last_accepted: None,
            consecutive_rejections: 0,
            source_failures: HashMap::new(),
            bounds_violations: 0,
            healthy: true,
            breaker: CircuitBreaker::new(max_consecutive_failures),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn last_accepted(&self) -> Option<Decimal> {
        self.last_accepted
    }

    pub fn is_paused(&self) -> bool {
        self.breaker.is_paused()
    }

    pub fn bounds_violations(&self) -> u32 {
        self.bounds_violations
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy
    }

    pub fn reset_circuit_breaker(&mut self) {
        self.breaker.reset();
        self.source_failures.clear();
        self.healthy = true;
    }

    /// Increments `source`'s consecutive-failure count and re-evaluates the
    /// circuit breaker. Called once per failed fetch, independent of any
    /// later divergence/bounds rejection.
    pub fn record_source_failure(&mut self, source: &str) -> bool {
        let count = self.source_failures.entry(source.to_string()).or_insert(0);
        *count += 1;
        let total = self.source_failures.values().sum();
        let paused = self.breaker.evaluate(total);
        self.healthy = !paused;
        paused
    }

    /// Zeroes `source`'s failure count. Only called once a fetch cycle has
    /// actually been accepted for publication — a divergence rejection
    /// between two successful fetches must *not* clear either source's
    /// failure streak.
    pub fn record_source_recovered(&mut self, source: &str) {
        self.source_failures.insert(source.to_string(), 0);
    }

    /// Bounds check against `last_accepted` only: absolute floor/ceiling,
    /// then per-update relative change cap. On rejection,
    /// bumps `bounds_violations` and the consecutive-rejection counter; once
    /// the rejection streak reaches `max_consecutive_rejections` the
    /// baseline is cleared so the next accepted price re-anchors.
    pub fn check_bounds(&mut self, candidate: Decimal, bounds: &PriceBounds) -> Result<(), String> {
        if candidate < bounds.min_price || candidate > bounds.max_price {
            self.reject(bounds.max_consecutive_rejections);
            return Err(format!("{candidate} outside [{}, {}]", bounds.min_price, bounds.max_price));
        }
        if let Some(last) = self.last_accepted {
            if last != Decimal::ZERO {
                let change_pct = ((candidate - last) / last).abs() * Decimal::ONE_HUNDRED;
                if change_pct > bounds.max_change_per_update_pct {
                    self.reject(bounds.max_consecutive_rejections);
                    return Err(format!("{change_pct}% change exceeds cap of {}%", bounds.max_change_per_update_pct));
                }
            }
        }
        Ok(())
    }

    fn reject(&mut self, max_consecutive_rejections: u32) {
        self.bounds_violations += 1;
        self.consecutive_rejections += 1;
        if self.consecutive_rejections >= max_consecutive_rejections {
            self.last_accepted = None;
            self.consecutive_rejections = 0;
        }
    }

    /// Caller-driven two-phase commit: call only after the price has been
    /// successfully pushed to the ledger.
    pub fn confirm_published(&mut self, price: Decimal) {
        self.last_accepted = Some(price);
        self.consecutive_rejections = 0;
        self.healthy = true;
    }
}

/// Static bounds configuration for a symbol: `minPriceUsd, maxPriceUsd,
/// divergenceThresholdPct, maxChangePerUpdatePct, maxConsecutiveFailures`.
#[derive(Debug, Clone)]
pub struct PriceBounds {
    pub min_price: Decimal,
    pub max_price: Decimal,
    pub divergence_threshold_pct: Decimal,
    pub max_change_per_update_pct: Decimal,
    pub max_consecutive_rejections: u32,
}

impl Default for PriceBounds {
    fn default() -> Self {
        Self {
            min_price: Decimal::ZERO,
            max_price: Decimal::new(i64::MAX, 0),
            divergence_threshold_pct: Decimal::new(5, 0),
            max_change_per_update_pct: Decimal::new(25, 0),
            max_consecutive_rejections: 5,
        }
    }
}
