//! Multi-source price-oracle pipeline shared by `daemons/oracle`: fetch from
//! a primary and fallback [`PriceSource`], block on cross-source divergence,
//! average or single-source-label the accepted price, and enforce bounds and
//! a circuit breaker before the caller pushes anything to the ledger.

mod error;
mod pipeline;
mod source;
mod stable;
mod state;

pub use error::OracleError;
pub use pipeline::{PublishOutcome, fetch_and_publish};
pub use source::{AmmQuoteSource, JwtTickerSource, PriceSource};
pub use stable::StableFeed;
pub use state::{CircuitBreaker, OracleState, PriceBounds};

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FixedSource {
        label: &'static str,
        value: Decimal,
        fails: Arc<AtomicU32>,
    }

    #[async_trait]
    impl PriceSource for FixedSource {
        async fn fetch(&self, _symbol: &str) -> Result<Decimal, OracleError> {
            if self.fails.load(Ordering::SeqCst) > 0 {
                self.fails.fetch_sub(1, Ordering::SeqCst);
                return Err(OracleError::SourceFailed { source: self.label.to_string(), reason: "forced".into() });
            }
            Ok(self.value)
        }

        fn name(&self) -> &str {
            self.label
        }
    }

    fn bounds() -> PriceBounds {
        PriceBounds {
            min_price: Decimal::new(1, 2),
            max_price: Decimal::new(1000, 0),
            divergence_threshold_pct: Decimal::new(5, 0),
            max_change_per_update_pct: Decimal::new(25, 0),
            max_consecutive_rejections: 5,
        }
    }

    #[tokio::test]
    async fn averages_two_agreeing_sources() {
        let sources: Vec<Arc<dyn PriceSource>> = vec![
            Arc::new(FixedSource { label: "a", value: Decimal::new(100, 0), fails: Arc::new(AtomicU32::new(0)) }),
            Arc::new(FixedSource { label: "b", value: Decimal::new(102, 0), fails: Arc::new(AtomicU32::new(0)) }),
        ];
        let mut state = OracleState::new("CTN", 10);
        let outcome = fetch_and_publish(&mut state, &sources, &bounds()).await.unwrap();
        assert_eq!(outcome.price, Decimal::new(101, 0));
        assert!(!outcome.single_source);
    }

    #[tokio::test]
    async fn rejects_divergent_sources_without_touching_baseline() {
        let sources: Vec<Arc<dyn PriceSource>> = vec![
            Arc::new(FixedSource { label: "a", value: Decimal::new(100, 2), fails: Arc::new(AtomicU32::new(0)) }),
            Arc::new(FixedSource { label: "b", value: Decimal::new(108, 2), fails: Arc::new(AtomicU32::new(0)) }),
        ];
        let mut state = OracleState::new("CTN", 10);
        state.confirm_published(Decimal::new(99, 2));
        let err = fetch_and_publish(&mut state, &sources, &bounds()).await.unwrap_err();
        assert!(matches!(err, OracleError::Divergence { .. }));
        assert_eq!(state.last_accepted(), Some(Decimal::new(99, 2)));
    }

    #[tokio::test]
    async fn single_source_publishes_with_label() {
        let sources: Vec<Arc<dyn PriceSource>> = vec![
            Arc::new(FixedSource { label: "a", value: Decimal::new(100, 0), fails: Arc::new(AtomicU32::new(1)) }),
            Arc::new(FixedSource { label: "b", value: Decimal::new(100, 0), fails: Arc::new(AtomicU32::new(0)) }),
        ];
        let mut state = OracleState::new("CTN", 10);
        let outcome = fetch_and_publish(&mut state, &sources, &bounds()).await.unwrap();
        assert!(outcome.single_source);
        assert_eq!(outcome.price, Decimal::new(100, 0));
    }

    #[tokio::test]
    async fn circuit_breaker_trips_after_threshold_failures() {
        let sources: Vec<Arc<dyn PriceSource>> = vec![
            Arc::new(FixedSource { label: "a", value: Decimal::new(100, 0), fails: Arc::new(AtomicU32::new(11)) }),
            Arc::new(FixedSource { label: "b", value: Decimal::new(100, 0), fails: Arc::new(AtomicU32::new(0)) }),
        ];
        let mut state = OracleState::new("CTN", 10);
        let mut last = Ok(PublishOutcome { symbol: "CTN".into(), price: Decimal::ZERO, single_source: false });
        for _ in 0..11 {
            last = fetch_and_publish(&mut state, &sources, &bounds()).await;
            if state.is_paused() {
                break;
            }
        }
        assert!(state.is_paused());
        assert!(matches!(last, Err(OracleError::CircuitBreakerOpen) | Ok(_)));
        state.reset_circuit_breaker();
        assert!(!state.is_paused());
    }

    #[tokio::test]
    async fn bounds_rejection_reanchors_after_consecutive_limit() {
        let sources: Vec<Arc<dyn PriceSource>> = vec![
            Arc::new(FixedSource { label: "a", value: Decimal::new(500, 0), fails: Arc::new(AtomicU32::new(0)) }),
        ];
        let mut b = bounds();
        b.max_consecutive_rejections = 2;
        b.max_change_per_update_pct = Decimal::new(10, 0);
        let mut state = OracleState::new("CTN", 10);
        state.confirm_published(Decimal::new(100, 0));

        assert!(fetch_and_publish(&mut state, &sources, &b).await.is_err());
        assert_eq!(state.last_accepted(), Some(Decimal::new(100, 0)));
        assert!(fetch_and_publish(&mut state, &sources, &b).await.is_err());
        assert_eq!(state.last_accepted(), None);
    }
}
