use crate::contract::{Attestation, AttestationBridgeInstance};
use crate::error::EvmError;
use crate::provider::InnerProvider;
use alloy_primitives::{Bytes, TxHash};
use alloy_provider::Provider;
use std::sync::Arc;
use std::time::Duration;

/// Gas headroom applied over `eth_estimateGas` before submission: estimate,
/// then submit with 1.2x headroom.
const GAS_HEADROOM_NUMERATOR: u64 = 12;
const GAS_HEADROOM_DENOMINATOR: u64 = 10;

const CONFIRMATION_POLL_INTERVAL: Duration = Duration::from_secs(3);
const CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(180);

/// Pre-flight `eth_call` simulation of `processAttestation`, used before
/// every submission so a revert is observed without spending gas or
/// consuming the account nonce.
pub async fn simulate_process_attestation(
    contract: &AttestationBridgeInstance<Arc<InnerProvider>>,
    attestation: Attestation,
    sigs: Vec<Bytes>,
) -> Result<(), EvmError> {
    contract
        .processAttestation(attestation, sigs)
        .call()
        .await
        .map(|_| ())
        .map_err(|e| EvmError::SimulationReverted(e.to_string()))
}

/// Submits `processAttestation`, estimating gas first and padding the
/// estimate by the configured headroom.
pub async fn submit_process_attestation(
    contract: &AttestationBridgeInstance<Arc<InnerProvider>>,
    attestation: Attestation,
    sigs: Vec<Bytes>,
) -> Result<TxHash, EvmError> {
    let call = contract.processAttestation(attestation, sigs);
    let estimate = call
        .estimate_gas()
        .await
        .map_err(|e| EvmError::SubmissionFailed(format!("gas estimation failed: {e}")))?;
    let gas_limit = estimate
        .saturating_mul(GAS_HEADROOM_NUMERATOR)
        .saturating_div(GAS_HEADROOM_DENOMINATOR);
    let pending = call
        .gas(gas_limit)
        .send()
        .await
        .map_err(|e| EvmError::SubmissionFailed(e.to_string()))?;
    Ok(*pending.tx_hash())
}

/// Polls for `confirmations` blocks of depth on `tx_hash`, bailing out with
/// `ConfirmationTimeout` if the block doesn't settle within the deadline.
/// A relay restart mid-wait simply resumes polling the same hash; no local
/// state needs to survive the wait itself.
pub async fn wait_for_confirmations(
    provider: &InnerProvider,
    tx_hash: TxHash,
    confirmations: u64,
) -> Result<u64, EvmError> {
    let deadline = tokio::time::Instant::now() + CONFIRMATION_TIMEOUT;
    loop {
        if let Some(receipt) = provider
            .get_transaction_receipt(tx_hash)
            .await
            .map_err(|e| EvmError::Network(e.to_string()))?
        {
            if let Some(receipt_block) = receipt.block_number {
                let head = provider
                    .get_block_number()
                    .await
                    .map_err(|e| EvmError::Network(e.to_string()))?;
                if head.saturating_sub(receipt_block) + 1 >= confirmations {
                    return Ok(receipt_block);
                }
            }
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(EvmError::ConfirmationTimeout { tx_hash: tx_hash.to_string(), confirmations });
        }
        tokio::time::sleep(CONFIRMATION_POLL_INTERVAL).await;
    }
}
