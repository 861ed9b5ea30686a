//! The validator's event loop: membership, dedupe, expiry, authoritative
//! re-verification, envelope checks, signing, and ledger submission, run
//! once per candidate attestation on every poll tick.

use crate::authoritative::AuthoritativeClient;
use crate::config::ValidatorConfig;
use crate::envelope::SigningEnvelope;
use crate::signing::sign_attestation;
use crate::verify::{CollateralRequirement, ToleranceConfig, verify_authoritative_state};
use alloy_primitives::Address;
use alloy_signer_local::PrivateKeySigner;
use bridge_core::HealthState;
use bridge_core::util::UnixTimestamp;
use bridge_types::{AttestationRequest, Party, TemplateId};
use hsm_signer::{HsmSigner, RawKeySigner, Signer};
use ledger_client::LedgerClient;
use serde_json::json;
use std::str::FromStr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Builds the configured signer backend: an HSM client in the normal case,
/// or a local raw-key signer in development/staging
/// (`Config::validate` already refused this combination in production).
fn build_signer(config: &ValidatorConfig) -> Result<Arc<dyn Signer>, bridge_core::BridgeError> {
    if let Some(raw_key) = &config.common.args.raw_signer_key {
        let local_signer = PrivateKeySigner::from_str(raw_key)
            .map_err(|e| bridge_core::BridgeError::Fatal(format!("invalid RAW_SIGNER_KEY: {e}")))?;
        let key_id = config.common.args.hsm_key_id.clone();
        let key_id = if key_id.is_empty() { "dev-key".to_string() } else { key_id };
        return Ok(Arc::new(RawKeySigner::new().with_key(key_id, local_signer)));
    }
    let base_url = config.args.hsm_base_url.clone().ok_or_else(|| {
        bridge_core::BridgeError::Fatal("HSM_BASE_URL is required unless RAW_SIGNER_KEY is set".to_string())
    })?;
    Ok(Arc::new(HsmSigner::new(base_url, config.common.args.hsm_region.clone())))
}

/// Operator CLI action: runs the self-test-then-switch rotation sequence
/// against the configured rotation key and exits. Does not touch the poll
/// loop or any ledger state — the persistent key id still needs to be
/// updated in configuration for the switch to survive a restart.
pub async fn rotate_key(config: &ValidatorConfig) -> Result<(), bridge_core::BridgeError> {
    let rotation_key_id = config.args.hsm_rotation_key_id.clone().ok_or_else(|| {
        bridge_core::BridgeError::Fatal("HSM_ROTATION_KEY_ID must be set to rotate".to_string())
    })?;
    let signer = build_signer(config)?;

    let primary_address = signer
        .public_key(&config.common.args.hsm_key_id)
        .await
        .map_err(|e| bridge_core::BridgeError::Fatal(format!("resolving primary key: {e}")))?;
    let rotation_address = signer
        .public_key(&rotation_key_id)
        .await
        .map_err(|e| bridge_core::BridgeError::Fatal(format!("resolving rotation key: {e}")))?;

    let mut active = hsm_signer::ActiveKey::new(
        hsm_signer::KeyHandle { key_id: config.common.args.hsm_key_id.clone(), address: primary_address },
        Some(hsm_signer::KeyHandle { key_id: rotation_key_id, address: rotation_address }),
    );

    active
        .activate_rotation(signer.as_ref())
        .await
        .map_err(|e| bridge_core::BridgeError::Fatal(format!("rotation self-test failed: {e}")))?;

    tracing::info!(
        key_id = %active.active().key_id,
        address = %active.active().address,
        "rotation self-test passed; update HSM_KEY_ID to this key id before the next restart"
    );
    Ok(())
}

pub async fn run(
    config: ValidatorConfig,
    health: HealthState,
    cancellation_token: CancellationToken,
) -> Result<(), bridge_core::BridgeError> {
    let l_token = bridge_core::config::resolve_secret(
        "L_TOKEN",
        config.common.args.secrets_dir.as_deref(),
        "l-token",
    )
    .unwrap_or_else(|| config.common.args.l_token.clone());
    let ledger = LedgerClient::new(
        config.common.args.l_host.clone(),
        l_token,
        config.common.args.l_package_id.clone(),
        config.common.args.l_party.clone(),
    );

    let authoritative_token = bridge_core::config::resolve_secret(
        "AUTHORITATIVE_API_TOKEN",
        config.common.args.secrets_dir.as_deref(),
        "authoritative-api-token",
    )
    .unwrap_or_else(|| config.args.authoritative_api_token.clone());
    let authoritative = AuthoritativeClient::new(config.args.authoritative_api_url.clone(), authoritative_token);

    let signer = build_signer(&config)?;
    let key_id = config.common.args.hsm_key_id.clone();
    let signer_address = signer
        .public_key(&key_id)
        .await
        .map_err(|e| bridge_core::BridgeError::Fatal(format!("resolving signer public key: {e}")))?;
    tracing::info!(%signer_address, key_id, "validator signing key resolved");

    let self_party = Party::from(config.common.args.l_party.clone());
    let target_contract: Address = config.common.args.e_contract_address;
    let tolerance = ToleranceConfig { relative_pct: config.args.asset_tolerance_pct, abs_cap: config.asset_tolerance_abs_cap };
    let collateral = CollateralRequirement { requested_cap: config.requested_cap, ratio_bps: config.args.collateral_ratio_bps };

    let mut envelope = SigningEnvelope::new(config.signing_window(), config.args.max_signs_per_window, config.args.max_value_jump_bps);
    let poll_interval = config.poll_interval();

    health.set_ready(true);
    loop {
        tokio::select! {
            _ = cancellation_token.cancelled() => {
                tracing::info!("shutdown signal observed, validator loop exiting");
                break;
            }
            _ = tokio::time::sleep(poll_interval) => {}
        }

        for template_id in config.template_allowlist.iter() {
            if let Err(e) = poll_template(
                &ledger,
                &authoritative,
                signer.as_ref(),
                &key_id,
                signer_address,
                target_contract,
                &tolerance,
                &collateral,
                &self_party,
                template_id,
                &mut envelope,
            )
            .await
            {
                tracing::warn!(template = %template_id, error = %e, "validator poll cycle failed");
            }
        }
    }

    health.set_ready(false);
    Ok(())
}

#[derive(Debug, thiserror::Error)]
enum PollError {
    #[error(transparent)]
    Ledger(#[from] ledger_client::LedgerError),
}

#[allow(clippy::too_many_arguments)]
async fn poll_template(
    ledger: &LedgerClient,
    authoritative: &AuthoritativeClient,
    signer: &dyn Signer,
    key_id: &str,
    signer_address: Address,
    target_contract: Address,
    tolerance: &ToleranceConfig,
    collateral: &CollateralRequirement,
    self_party: &Party,
    template_id: &TemplateId,
    envelope: &mut SigningEnvelope,
) -> Result<(), PollError> {
    let contracts = ledger.query_active(Some(template_id.clone()), None).await?;
    let now = UnixTimestamp::try_now().unwrap_or(UnixTimestamp(0));

    for contract in contracts {
        let request: AttestationRequest = match serde_json::from_value(contract.payload.clone()) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(contract_id = %contract.contract_id, error = %e, "skipping malformed attestation request");
                continue;
            }
        };

        // Step 1: membership.
        if !request.validator_group.contains(self_party) {
            continue;
        }
        // Step 2: already collected on-ledger, or already signed locally.
        if request.collected_signatures.contains(self_party) {
            continue;
        }
        if envelope.already_signed(&request.payload.attestation_id) {
            continue;
        }
        // Step 3: expiry.
        if request.payload.expires_at.0 <= now.0 {
            tracing::debug!(attestation_id = %request.payload.attestation_id, "skipping expired attestation");
            continue;
        }

        // Step 4: verify against the authoritative state. The payload has no
        // separate target-contract field on the wire — this validator always
        // derives the canonical id and signing digest against its single
        // configured `target_contract`, so that binding is structural rather
        // than a field comparison (see DESIGN.md).
        if let Err(e) = verify_authoritative_state(authoritative, &request.payload, tolerance, collateral).await {
            tracing::warn!(attestation_id = %request.payload.attestation_id, error = %e, "authoritative verification failed");
            continue;
        }

        // Step 5: envelope checks.
        if let Err(e) = envelope.check_rate(now) {
            tracing::warn!(attestation_id = %request.payload.attestation_id, error = %e, "sign-rate limit exceeded");
            continue;
        }
        if let Err(e) = envelope.check_jump(&request.payload.global_assets) {
            tracing::warn!(attestation_id = %request.payload.attestation_id, error = %e, "jump cap exceeded");
            continue;
        }

        // Step 7 (ordering): mark signed *before* the HSM call, so a crash
        // between here and the ledger submit cannot cause a double-sign race
        // on restart.
        envelope.mark_signed(&request.payload.attestation_id);

        let signed = match sign_attestation(signer, key_id, signer_address, &request.payload, target_contract).await {
            Ok(signed) => signed,
            Err(e) => {
                tracing::warn!(attestation_id = %request.payload.attestation_id, error = %e, "signing failed, unmarking for retry");
                envelope.unmark_signed(&request.payload.attestation_id);
                continue;
            }
        };

        let ecdsa_signature_hex = format!("0x{}", hex::encode(signed.rsv_signature));
        let state_hash_hex = format!("0x{}", hex::encode(request.payload.state_hash));
        let args = json!({
            "validator": self_party.0,
            "ecdsaSignatureHex": ecdsa_signature_hex,
            "stateHash": state_hash_hex,
        });

        match ledger.exercise_choice(template_id, &contract.contract_id, "ProvideSignature", args, &[]).await {
            Ok(_) => {
                envelope.record_signed(now, request.payload.global_assets);
                tracing::info!(
                    attestation_id = %request.payload.attestation_id,
                    canonical_id = %signed.canonical_id,
                    "provided validator signature"
                );
            }
            Err(e) => {
                let already_signed = matches!(&e, ledger_client::LedgerError::Http4xxOther { body, .. } if body.contains("already signed"));
                if !already_signed {
                    tracing::warn!(attestation_id = %request.payload.attestation_id, error = %e, "ProvideSignature submit failed, unmarking for retry");
                    envelope.unmark_signed(&request.payload.attestation_id);
                } else {
                    tracing::info!(attestation_id = %request.payload.attestation_id, "ProvideSignature already applied on ledger");
                }
            }
        }
    }

    Ok(())
}
