use crate::error::{LedgerError, classify};
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Base delay before the first retry.
const BASE_DELAY: Duration = Duration::from_millis(200);
/// Ceiling applied after exponential growth, before jitter.
const CAP_DELAY: Duration = Duration::from_secs(10);
/// Jitter band applied multiplicatively to the computed delay: 20% bounded
/// jitter, 0.8-1.2x.
const JITTER_LOW: f64 = 0.8;
const JITTER_HIGH: f64 = 1.2;

/// Maximum attempts for read operations (`getLatestOffset`, `queryActive`).
pub const MAX_ATTEMPTS_READ: u32 = 4;
/// Write commands (`createContract`, `exerciseChoice`) are never retried
/// locally — upstream polling loops already retry, and retrying a pending
/// `submit-and-wait` risks delaying settlement behind a stale commandId.
pub const MAX_ATTEMPTS_WRITE: u32 = 1;

fn delay_for_attempt(attempt: u32, multiplier: u32) -> Duration {
    let exp = 2u64.saturating_pow(attempt);
    let scaled = BASE_DELAY.saturating_mul(multiplier).saturating_mul(exp as u32);
    let capped = scaled.min(CAP_DELAY);
    let jitter = rand::rng().random_range(JITTER_LOW..JITTER_HIGH);
    Duration::from_secs_f64(capped.as_secs_f64() * jitter)
}

/// Runs `op` up to `max_attempts` times, retrying only on [`RetryClass`]es
/// that `classify` marks retryable, with exponential backoff and jitter.
///
/// `op` is re-invoked fresh on every attempt (it's an `FnMut` returning a new
/// future each time) since a `reqwest::Request` can't be replayed once sent.
pub async fn retrying<F, Fut, T>(max_attempts: u32, mut op: F) -> Result<T, LedgerError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LedgerError>>,
{
    let mut attempt = 0u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                let class = classify(&err);
                attempt += 1;
                if !class.is_retryable() || attempt >= max_attempts {
                    if class.is_retryable() {
                        tracing::warn!(attempt, max_attempts, error = %err, "exhausted retries");
                    }
                    return Err(err);
                }
                let delay = delay_for_attempt(attempt, class.backoff_multiplier());
                tracing::debug!(attempt, ?delay, error = %err, "retrying ledger call");
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn retries_transient_errors_until_success() {
        let calls = AtomicU32::new(0);
        let result = retrying(MAX_ATTEMPTS_READ, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(LedgerError::Network {
                        path: "/v2/state/ledger-end".into(),
                        source: reqwest::Client::new()
                            .get("not a valid url")
                            .build()
                            .expect_err("malformed url should fail to build"),
                    })
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_http_413() {
        let calls = AtomicU32::new(0);
        let result: Result<(), LedgerError> = retrying(MAX_ATTEMPTS_READ, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                Err(LedgerError::Http413 {
                    path: "/v2/commands/submit-and-wait".into(),
                })
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
