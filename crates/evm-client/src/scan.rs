use crate::contract::AttestationReceived;
use crate::error::EvmError;
use crate::provider::InnerProvider;
use alloy_primitives::B256;
use alloy_provider::Provider;
use alloy_rpc_types_eth::Filter;
use alloy_sol_types::SolEvent;

/// How far back the relay scans `AttestationReceived` logs at boot, to
/// rebuild its processed-id cache after a restart.
pub const SCAN_WINDOW_BLOCKS: u64 = 50_000;

/// Chunk size for the boot-time scan, kept well under typical RPC
/// `eth_getLogs` block-range limits.
pub const SCAN_CHUNK_BLOCKS: u64 = 10_000;

/// Scans the last [`SCAN_WINDOW_BLOCKS`] blocks for `AttestationReceived`
/// events against `contract_address`, in [`SCAN_CHUNK_BLOCKS`]-sized
/// windows, returning every `(attestation id, nonce)` pair observed. The
/// relay seeds its processed-id cache from this list before entering its
/// poll loop, so attestations submitted just before a restart aren't
/// resubmitted.
pub async fn scan_attestation_received(
    provider: &InnerProvider,
    contract_address: alloy_primitives::Address,
) -> Result<Vec<(B256, u64)>, EvmError> {
    let head = provider.get_block_number().await.map_err(|e| EvmError::Network(e.to_string()))?;
    let from = head.saturating_sub(SCAN_WINDOW_BLOCKS);

    let mut found = Vec::new();
    let mut chunk_start = from;
    while chunk_start <= head {
        let chunk_end = (chunk_start + SCAN_CHUNK_BLOCKS - 1).min(head);
        let filter = Filter::new()
            .address(contract_address)
            .event_signature(AttestationReceived::SIGNATURE_HASH)
            .from_block(chunk_start)
            .to_block(chunk_end);
        let logs = provider.get_logs(&filter).await.map_err(|e| EvmError::Network(e.to_string()))?;
        for log in logs {
            let decoded = log
                .log_decode::<AttestationReceived>()
                .map_err(|e| EvmError::Network(format!("decoding AttestationReceived log: {e}")))?;
            let event = decoded.inner.data;
            found.push((event.id, event.nonce.to::<u64>()));
        }
        if chunk_end == head {
            break;
        }
        chunk_start = chunk_end + 1;
    }
    Ok(found)
}
