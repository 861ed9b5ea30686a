//! Authoritative-state verification: before signing a candidate
//! attestation, the validator re-derives the same facts from the
//! authoritative asset API and refuses to sign on any mismatch.

use crate::authoritative::{AssetSnapshot, AuthoritativeClient, AuthoritativeError};
use bridge_core::util::FixedPoint18;
use bridge_types::AttestationPayload;
use rust_decimal::Decimal;

#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    #[error("authoritative API: {0}")]
    Api(#[from] AuthoritativeError),
    #[error("snapshot assets sum to {sum} but snapshot reports totalValue {total}")]
    SnapshotInternallyInconsistent { sum: FixedPoint18, total: FixedPoint18 },
    #[error(
        "payload globalAssets {payload_value} deviates from snapshot totalValue {snapshot_value} by more than the {tolerance_pct}% tolerance"
    )]
    ValueOutOfTolerance { payload_value: FixedPoint18, snapshot_value: FixedPoint18, tolerance_pct: Decimal },
    #[error("collateral ratio {observed_bps} bps is below the required {required_bps} bps")]
    CollateralRatioBreached { observed_bps: u32, required_bps: u32 },
    #[error("authoritative API rejected stateHash as invalid")]
    StateHashRejectedByApi,
    #[error("payload stateHash does not match the authoritative snapshot's stateHash")]
    StateHashMismatch,
}

/// Collateralization requirement: `snapshot.totalValue * 10_000 / requested_cap >= ratio_bps`.
#[derive(Debug, Clone, Copy)]
pub struct CollateralRequirement {
    pub requested_cap: FixedPoint18,
    pub ratio_bps: u32,
}

/// Maximum relative deviation, as a percentage, allowed between a payload's
/// `globalAssets` and the authoritative snapshot's `totalValue`. Expressed
/// as `min(tolerance_pct_of_snapshot, abs_cap)`.
#[derive(Debug, Clone, Copy)]
pub struct ToleranceConfig {
    pub relative_pct: Decimal,
    pub abs_cap: FixedPoint18,
}

pub async fn verify_authoritative_state(
    client: &AuthoritativeClient,
    payload: &AttestationPayload,
    tolerance: &ToleranceConfig,
    collateral: &CollateralRequirement,
) -> Result<(), VerificationError> {
    let snapshot = client.snapshot().await?;
    check_internal_consistency(&snapshot)?;
    check_value_tolerance(payload, &snapshot, tolerance)?;
    check_collateral_ratio(&snapshot, collateral)?;
    check_state_hash(client, payload, &snapshot).await?;
    Ok(())
}

fn check_internal_consistency(snapshot: &AssetSnapshot) -> Result<(), VerificationError> {
    let mut sum = Decimal::ZERO;
    for asset in &snapshot.assets {
        sum += asset.current_value.inner();
    }
    let sum = FixedPoint18::from_decimal(sum).unwrap_or_else(|_| FixedPoint18::zero());
    if sum != snapshot.total_value {
        return Err(VerificationError::SnapshotInternallyInconsistent { sum, total: snapshot.total_value });
    }
    Ok(())
}

fn check_value_tolerance(
    payload: &AttestationPayload,
    snapshot: &AssetSnapshot,
    tolerance: &ToleranceConfig,
) -> Result<(), VerificationError> {
    let relative_cap_value = snapshot.total_value.inner() * tolerance.relative_pct / Decimal::from(100u32);
    let effective_tolerance = relative_cap_value.min(tolerance.abs_cap.inner());
    let abs_diff = (snapshot.total_value.inner() - payload.global_assets.inner()).abs();

    if abs_diff <= effective_tolerance {
        return Ok(());
    }
    Err(VerificationError::ValueOutOfTolerance {
        payload_value: payload.global_assets,
        snapshot_value: snapshot.total_value,
        tolerance_pct: tolerance.relative_pct,
    })
}

fn check_collateral_ratio(
    snapshot: &AssetSnapshot,
    collateral: &CollateralRequirement,
) -> Result<(), VerificationError> {
    if collateral.requested_cap.is_zero() {
        return Ok(());
    }
    let ratio = snapshot.total_value.inner() * Decimal::from(10_000u32) / collateral.requested_cap.inner();
    let observed_bps: u32 = ratio.trunc().to_string().parse().unwrap_or(0);
    if observed_bps < collateral.ratio_bps {
        return Err(VerificationError::CollateralRatioBreached { observed_bps, required_bps: collateral.ratio_bps });
    }
    Ok(())
}

async fn check_state_hash(
    client: &AuthoritativeClient,
    payload: &AttestationPayload,
    snapshot: &AssetSnapshot,
) -> Result<(), VerificationError> {
    if snapshot.state_hash != payload.state_hash {
        return Err(VerificationError::StateHashMismatch);
    }
    let valid = client.verify_state_hash(snapshot.state_hash).await?;
    if !valid {
        return Err(VerificationError::StateHashRejectedByApi);
    }
    Ok(())
}
