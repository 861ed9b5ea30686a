//! The relay's event loop: query threshold-signed attestation requests,
//! enforce nonce/chain-id/replay guards, assemble and verify the signature
//! set, pre-flight simulate, submit to chain E, wait for confirmations, and
//! archive the request on L. One process per [`crate::config::RelayDirection`].

use crate::assembly::assemble_signature_set;
use crate::config::RelayConfig;
use alloy_network::EthereumWallet;
use alloy_primitives::{Address, B256, Bytes, U256};
use alloy_provider::Provider;
use alloy_signer_local::PrivateKeySigner;
use bridge_core::HealthState;
use bridge_core::util::UnixTimestamp;
use bridge_types::{
    AttestationRequest, Direction, Party, ProcessedIdCache, TemplateId, canonical_id, derive_timestamp,
    global_assets_u256, personal_message_wrap, signing_digest,
};
use evm_client::{Attestation, EvmChainClient, EvmError, simulate_process_attestation, submit_process_attestation, wait_for_confirmations};
use ledger_client::LedgerClient;
use serde_json::json;
use std::collections::BTreeMap;
use std::str::FromStr;
use tokio_util::sync::CancellationToken;

/// Maximum candidates pulled from a single `queryActive` response and acted
/// on per cycle, sorted by `nonce` ascending.
const BATCH_LIMIT: usize = 100;

fn build_wallet(config: &RelayConfig) -> Result<EthereumWallet, bridge_core::BridgeError> {
    let signer = PrivateKeySigner::from_str(&config.args.e_signer_key)
        .map_err(|e| bridge_core::BridgeError::Fatal(format!("invalid E_SIGNER_KEY: {e}")))?;
    Ok(EthereumWallet::from(signer))
}

pub async fn run(config: RelayConfig, health: HealthState, cancellation_token: CancellationToken) -> Result<(), bridge_core::BridgeError> {
    let l_token = bridge_core::config::resolve_secret("L_TOKEN", config.common.args.secrets_dir.as_deref(), "l-token")
        .unwrap_or_else(|| config.common.args.l_token.clone());
    let ledger = LedgerClient::new(
        config.common.args.l_host.clone(),
        l_token,
        config.common.args.l_package_id.clone(),
        config.common.args.l_party.clone(),
    );

    let wallet = build_wallet(&config)?;
    let mut urls = vec![config.common.args.e_rpc_url.clone()];
    urls.extend(config.common.args.e_fallback_rpc_urls.clone());
    let target_contract = config.common.args.e_contract_address;
    let evm = EvmChainClient::try_new(wallet, urls, target_contract)
        .await
        .map_err(|e| bridge_core::BridgeError::Fatal(format!("connecting to chain E: {e}")))?;

    let validator_address_list: Vec<Address> = config.common.validator_addresses.values().copied().collect();
    evm.assert_validator_roles(&validator_address_list)
        .await
        .map_err(|e| bridge_core::BridgeError::Fatal(format!("validator-address pinning failed: {e}")))?;

    let mut processed: ProcessedIdCache<B256> = ProcessedIdCache::default();
    {
        let provider = evm.provider().await;
        match evm_client::scan_attestation_received(&provider, target_contract).await {
            Ok(found) => {
                let count = found.len();
                for (id, _nonce) in found {
                    processed.insert(id);
                }
                tracing::info!(count, "pre-populated processed-set from boot-time AttestationReceived scan");
            }
            Err(e) => {
                tracing::warn!(error = %e, "boot-time AttestationReceived scan failed; starting with an empty processed-set");
            }
        }
    }

    let self_party = Party::from(config.common.args.l_party.clone());
    let direction = config.direction();
    let confirmations = config.common.args.e_confirmations;
    let max_skew_secs = config.args.max_timestamp_skew_secs;
    let poll_interval = config.poll_interval();

    health.set_ready(true);
    loop {
        tokio::select! {
            _ = cancellation_token.cancelled() => {
                tracing::info!("shutdown signal observed, relay loop exiting");
                break;
            }
            _ = tokio::time::sleep(poll_interval) => {}
        }

        if let Err(e) = poll_cycle(
            &ledger,
            &evm,
            &config.request_template,
            direction,
            &self_party,
            &config.common.validator_addresses,
            confirmations,
            max_skew_secs,
            &mut processed,
        )
        .await
        {
            tracing::warn!(error = %e, "relay poll cycle failed");
        }
    }

    health.set_ready(false);
    Ok(())
}

#[derive(Debug, thiserror::Error)]
enum PollError {
    #[error(transparent)]
    Ledger(#[from] ledger_client::LedgerError),
    #[error(transparent)]
    Evm(#[from] EvmError),
}

#[allow(clippy::too_many_arguments)]
async fn poll_cycle(
    ledger: &LedgerClient,
    evm: &EvmChainClient,
    request_template: &TemplateId,
    direction: Direction,
    self_party: &Party,
    validator_addresses: &BTreeMap<String, Address>,
    confirmations: u64,
    max_skew_secs: u64,
    processed: &mut ProcessedIdCache<B256>,
) -> Result<(), PollError> {
    // Step 1: query and filter to this relay's own direction/aggregator,
    // already-threshold-met candidates, then take the first 100 nonce-ascending.
    let contracts = ledger.query_active(Some(request_template.clone()), None).await?;
    let mut candidates: Vec<(ledger_client::ActiveContract, AttestationRequest)> = Vec::new();
    for contract in contracts {
        let request: AttestationRequest = match serde_json::from_value(contract.payload.clone()) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(contract_id = %contract.contract_id, error = %e, "skipping malformed attestation request");
                continue;
            }
        };
        if request.aggregator != *self_party || request.direction != direction {
            continue;
        }
        // Step 3: enough collected signatures.
        if (request.ecdsa_signatures.len() as u32) < request.required_signatures.get() {
            continue;
        }
        candidates.push((contract, request));
    }
    candidates.sort_by_key(|(_, request)| request.payload.nonce);
    candidates.truncate(BATCH_LIMIT);

    if candidates.is_empty() {
        evm.record_success();
        return Ok(());
    }

    let provider = evm.provider().await;
    let contract = evm.contract(provider.clone());

    // Step 4/5: read chain-E's current nonce and reported chain id once per
    // cycle — nonce sequencing means at most one candidate can match.
    let current_nonce: u64 = match contract.currentNonce().call().await {
        Ok(n) => n.to::<u64>(),
        Err(e) => {
            evm.record_network_error().await;
            return Err(EvmError::Network(e.to_string()).into());
        }
    };
    let reported_chain_id = match provider.get_chain_id().await {
        Ok(id) => id,
        Err(e) => {
            evm.record_network_error().await;
            return Err(EvmError::Network(e.to_string()).into());
        }
    };
    evm.record_success();

    let now = UnixTimestamp::try_now().unwrap_or(UnixTimestamp(0));

    let target_contract = *contract.address();
    for (active_contract, request) in candidates {
        let id = match canonical_id(&request.payload, target_contract) {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(attestation_id = %request.payload.attestation_id, error = %e, "skipping: cannot derive canonical id");
                continue;
            }
        };

        // Step 2: already processed locally.
        if processed.contains(&id) {
            continue;
        }
        // Step 4: nonce sequencing.
        if request.payload.nonce != current_nonce + 1 {
            tracing::debug!(
                attestation_id = %request.payload.attestation_id,
                payload_nonce = request.payload.nonce,
                current_nonce,
                "skipping: nonce does not immediately follow currentNonce"
            );
            continue;
        }
        // Step 5: chain-id check.
        if request.payload.chain_id != reported_chain_id {
            tracing::warn!(
                attestation_id = %request.payload.attestation_id,
                payload_chain_id = request.payload.chain_id,
                reported_chain_id,
                "skipping: chain-id mismatch, possible cross-chain replay"
            );
            continue;
        }

        // Step 6: already-used on chain.
        match contract.usedAttestationIds(id).call().await {
            Ok(true) => {
                processed.insert(id);
                continue;
            }
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(attestation_id = %request.payload.attestation_id, error = %e, "usedAttestationIds check failed, skipping for retry");
                continue;
            }
        }

        // Timestamp derivation sanity.
        let derived_timestamp = match derive_timestamp(&request.payload) {
            Ok(ts) => ts,
            Err(e) => {
                tracing::warn!(attestation_id = %request.payload.attestation_id, error = %e, "skipping: non-positive derived timestamp");
                continue;
            }
        };
        if derived_timestamp.abs_diff(&now) > max_skew_secs {
            tracing::warn!(
                attestation_id = %request.payload.attestation_id,
                derived_timestamp = derived_timestamp.0,
                now = now.0,
                "skipping: derived timestamp outside the allowed clock-skew window"
            );
            continue;
        }

        let digest = match signing_digest(&request.payload, id, target_contract) {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!(attestation_id = %request.payload.attestation_id, error = %e, "skipping: cannot derive signing digest");
                continue;
            }
        };
        let wrapped = personal_message_wrap(digest);

        // Step 7: assemble and verify the signature set.
        let sigs = assemble_signature_set(&request.ecdsa_signatures, wrapped.0, validator_addresses);
        if (sigs.len() as u32) < request.required_signatures.get() {
            tracing::warn!(
                attestation_id = %request.payload.attestation_id,
                accepted = sigs.len(),
                required = request.required_signatures.get(),
                "skipping: too many signatures dropped during verification to meet threshold"
            );
            continue;
        }
        let sig_bytes: Vec<Bytes> = sigs.into_iter().map(|s| Bytes::from(s.to_vec())).collect();

        let attestation = Attestation {
            id,
            cantonAssets: global_assets_u256(&request.payload.global_assets),
            nonce: U256::from(request.payload.nonce),
            timestamp: U256::from(derived_timestamp.0 as u64),
            entropy: B256::from(request.payload.entropy),
            cantonStateHash: B256::from(request.payload.state_hash),
        };

        // Step 8: pre-flight simulate.
        if let Err(e) = simulate_process_attestation(&contract, attestation.clone(), sig_bytes.clone()).await {
            tracing::warn!(attestation_id = %request.payload.attestation_id, error = %e, "simulation failed, re-checking usedAttestationIds");
            match contract.usedAttestationIds(id).call().await {
                Ok(true) => {
                    processed.insert(id);
                    tracing::info!(attestation_id = %request.payload.attestation_id, "front-run by a peer relay, marking processed");
                }
                _ => {
                    tracing::warn!(attestation_id = %request.payload.attestation_id, "leaving for retry");
                }
            }
            continue;
        }

        // Step 9: submit, wait for confirmations, archive on L.
        match submit_process_attestation(&contract, attestation, sig_bytes).await {
            Ok(tx_hash) => match wait_for_confirmations(&provider, tx_hash, confirmations).await {
                Ok(block) => {
                    processed.insert(id);
                    tracing::info!(
                        attestation_id = %request.payload.attestation_id,
                        canonical_id = %id,
                        %tx_hash,
                        block,
                        "attestation processed on chain E"
                    );
                    let args = json!({});
                    if let Err(e) = ledger
                        .exercise_choice(request_template, &active_contract.contract_id, "Attestation_Complete", args, &[])
                        .await
                    {
                        tracing::warn!(
                            attestation_id = %request.payload.attestation_id,
                            error = %e,
                            "Attestation_Complete archive failed; usedAttestationIds will gate the next cycle"
                        );
                    }
                }
                Err(e) => {
                    tracing::warn!(attestation_id = %request.payload.attestation_id, %tx_hash, error = %e, "confirmation wait failed, will retry next cycle");
                }
            },
            Err(e) => {
                tracing::warn!(attestation_id = %request.payload.attestation_id, error = %e, "submission failed, will retry next cycle");
            }
        }
    }

    Ok(())
}
