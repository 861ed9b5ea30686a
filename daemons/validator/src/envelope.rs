//! The validator's safety envelope: a sliding-window sign-rate limiter, a
//! cap on how far `globalAssets` may jump between two attestations the
//! validator signs back to back, and the bounded cache of
//! ids it has already signed.

use bridge_core::util::{FixedPoint18, UnixTimestamp};
use bridge_types::ProcessedIdCache;
use rust_decimal::Decimal;
use std::collections::VecDeque;

#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("sign-rate limit exceeded: {count} signs in the trailing {window_ms}ms window (max {max})")]
    RateLimited { count: usize, window_ms: u64, max: usize },
    #[error("globalAssets jumped {observed_bps} bps from the last signed value, exceeding the {max_bps} bps cap")]
    JumpCapExceeded { observed_bps: u32, max_bps: u32 },
}

/// Tracks the validator's own signing activity, independent of the
/// authoritative-state verification step: even a candidate that passes
/// every other check is refused once the envelope trips.
pub struct SigningEnvelope {
    window: std::time::Duration,
    max_signs_per_window: usize,
    max_jump_bps: u32,
    sign_times: VecDeque<UnixTimestamp>,
    last_signed_assets: Option<FixedPoint18>,
    signed_ids: ProcessedIdCache<String>,
}

impl SigningEnvelope {
    pub fn new(window: std::time::Duration, max_signs_per_window: usize, max_jump_bps: u32) -> Self {
        Self {
            window,
            max_signs_per_window,
            max_jump_bps,
            sign_times: VecDeque::new(),
            last_signed_assets: None,
            signed_ids: ProcessedIdCache::default(),
        }
    }

    pub fn already_signed(&self, canonical_id_hex: &str) -> bool {
        self.signed_ids.contains(&canonical_id_hex.to_string())
    }

    /// Called before handing a digest to the HSM: records the intent to
    /// sign, so a crash between here and the HSM call is recoverable (the
    /// id stays marked signed, re-derivable as already-signed on restart).
    pub fn mark_signed(&mut self, canonical_id_hex: &str) {
        self.signed_ids.insert(canonical_id_hex.to_string());
    }

    /// Undoes `mark_signed` when the HSM call itself failed for a reason
    /// other than "already signed", so a later poll cycle retries the same
    /// attestation.
    pub fn unmark_signed(&mut self, canonical_id_hex: &str) {
        self.signed_ids.remove(&canonical_id_hex.to_string());
    }

    fn prune_window(&mut self, now: UnixTimestamp) {
        let window_secs = self.window.as_secs();
        while let Some(&front) = self.sign_times.front() {
            if now.abs_diff(&front) > window_secs {
                self.sign_times.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn check_rate(&mut self, now: UnixTimestamp) -> Result<(), EnvelopeError> {
        self.prune_window(now);
        if self.sign_times.len() >= self.max_signs_per_window {
            return Err(EnvelopeError::RateLimited {
                count: self.sign_times.len(),
                window_ms: self.window.as_millis() as u64,
                max: self.max_signs_per_window,
            });
        }
        Ok(())
    }

    pub fn check_jump(&self, candidate: &FixedPoint18) -> Result<(), EnvelopeError> {
        let Some(last) = self.last_signed_assets else {
            return Ok(());
        };
        let relative = last.relative_diff(candidate);
        let observed_bps: u32 = (relative * Decimal::from(10_000u32)).round().to_string().parse().unwrap_or(u32::MAX);
        if observed_bps > self.max_jump_bps {
            return Err(EnvelopeError::JumpCapExceeded { observed_bps, max_bps: self.max_jump_bps });
        }
        Ok(())
    }

    /// Records a successful sign: advances both the rate-limit window and
    /// the jump-cap baseline together, so they can never observe different
    /// "last attestation signed" states.
    pub fn record_signed(&mut self, now: UnixTimestamp, global_assets: FixedPoint18) {
        self.sign_times.push_back(now);
        self.last_signed_assets = Some(global_assets);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn rate_limit_trips_after_max_signs_in_window() {
        let mut envelope = SigningEnvelope::new(Duration::from_secs(3600), 2, 2000);
        let t0 = UnixTimestamp(1_000_000);
        envelope.check_rate(t0).unwrap();
        envelope.record_signed(t0, FixedPoint18::parse("100").unwrap());
        envelope.check_rate(t0).unwrap();
        envelope.record_signed(t0, FixedPoint18::parse("100").unwrap());
        assert!(matches!(envelope.check_rate(t0), Err(EnvelopeError::RateLimited { .. })));
    }

    #[test]
    fn old_signs_fall_out_of_the_window() {
        let mut envelope = SigningEnvelope::new(Duration::from_secs(10), 1, 2000);
        let t0 = UnixTimestamp(1_000_000);
        envelope.record_signed(t0, FixedPoint18::parse("100").unwrap());
        assert!(envelope.check_rate(UnixTimestamp(1_000_005)).is_err());
        assert!(envelope.check_rate(UnixTimestamp(1_000_020)).is_ok());
    }

    #[test]
    fn jump_cap_blocks_large_relative_change() {
        let mut envelope = SigningEnvelope::new(Duration::from_secs(3600), 50, 2000);
        let t0 = UnixTimestamp(1_000_000);
        envelope.record_signed(t0, FixedPoint18::parse("1000").unwrap());
        assert!(envelope.check_jump(&FixedPoint18::parse("1100").unwrap()).is_ok());
        assert!(matches!(
            envelope.check_jump(&FixedPoint18::parse("2000").unwrap()),
            Err(EnvelopeError::JumpCapExceeded { .. })
        ));
    }

    #[test]
    fn mark_and_unmark_round_trip() {
        let mut envelope = SigningEnvelope::new(Duration::from_secs(3600), 50, 2000);
        assert!(!envelope.already_signed("0xabc"));
        envelope.mark_signed("0xabc");
        assert!(envelope.already_signed("0xabc"));
        envelope.unmark_signed("0xabc");
        assert!(!envelope.already_signed("0xabc"));
    }

    /// `run::poll_template` calls `mark_signed` before the HSM call and only
    /// `unmark_signed` if the ledger submit fails with something other than
    /// "already signed" — this is the signed-set half of that invariant
    /// (testable property 7): a submit failure must not leave the id stuck
    /// in the local signed-set, or the next poll cycle could never retry it.
    #[test]
    fn signed_set_not_retained_on_non_already_signed_error() {
        let mut envelope = SigningEnvelope::new(Duration::from_secs(3600), 50, 2000);
        let attestation_id = "att-123";

        // Mirrors poll_template's ordering: mark before the (simulated) HSM
        // call succeeds, then unmark because the ledger submit came back
        // with something other than "already signed".
        envelope.mark_signed(attestation_id);
        let hsm_call_succeeded = true;
        let ledger_submit_error: Option<&str> = Some("HTTP 503 Service Unavailable");
        if hsm_call_succeeded {
            let already_signed = matches!(ledger_submit_error, Some(body) if body.contains("already signed"));
            if !already_signed {
                envelope.unmark_signed(attestation_id);
            }
        }

        assert!(
            !envelope.already_signed(attestation_id),
            "a non-'already signed' submit failure must free the id for retry on the next poll cycle"
        );
    }

    /// The mirror case: when the ledger reports the signature was already
    /// applied, the id must stay marked so the same cycle's retry doesn't
    /// attempt a redundant `ProvideSignature` exercise.
    #[test]
    fn signed_set_retained_when_ledger_reports_already_signed() {
        let mut envelope = SigningEnvelope::new(Duration::from_secs(3600), 50, 2000);
        let attestation_id = "att-456";

        envelope.mark_signed(attestation_id);
        let ledger_submit_error: Option<&str> = Some("already signed by this party");
        let already_signed = matches!(ledger_submit_error, Some(body) if body.contains("already signed"));
        if !already_signed {
            envelope.unmark_signed(attestation_id);
        }

        assert!(envelope.already_signed(attestation_id));
    }
}
