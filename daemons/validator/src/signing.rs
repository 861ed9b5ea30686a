//! Composes the validator's signing path: derive the canonical on-chain id,
//! pack the signing digest, apply the Ethereum personal-message wrap, hand
//! the wrapped digest to the HSM, and convert the returned DER signature
//! into the 65-byte RSV form chain E expects.

use alloy_primitives::{Address, B256};
use bridge_types::{AttestationPayload, CanonicalIdError, canonical_id, personal_message_wrap, signing_digest};
use hsm_signer::{Signer, SignerError};

#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    #[error("deriving canonical id / signing digest: {0}")]
    Digest(#[from] CanonicalIdError),
    #[error("HSM signing: {0}")]
    Signer(#[from] SignerError),
    #[error("DER-to-RSV conversion: {0}")]
    Codec(#[from] sig_codec::CodecError),
}

/// The product of signing one candidate attestation: the canonical id (also
/// the relay's/validator's cache key) and the 65-byte RSV signature.
pub struct SignedAttestation {
    pub canonical_id: B256,
    pub rsv_signature: [u8; 65],
}

/// Runs the full sign path for `payload` against `target_contract`, using
/// `key_id` through `signer`. `signer_address` is the address the active key
/// is expected to recover to — the same address `recover_rsv` validates
/// against.
pub async fn sign_attestation(
    signer: &dyn Signer,
    key_id: &str,
    signer_address: Address,
    payload: &AttestationPayload,
    target_contract: Address,
) -> Result<SignedAttestation, SigningError> {
    let id = canonical_id(payload, target_contract)?;
    let digest = signing_digest(payload, id, target_contract)?;
    let wrapped = personal_message_wrap(digest);

    let der = signer.sign(key_id, wrapped.0).await?;
    let rsv_signature = sig_codec::format_kms(&der, wrapped.0, signer_address)?;

    Ok(SignedAttestation { canonical_id: id, rsv_signature })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_signer_local::PrivateKeySigner;
    use async_trait::async_trait;
    use bridge_core::util::{FixedPoint18, UnixTimestamp};
    use hsm_signer::RawKeySigner;
    use std::str::FromStr;

    fn payload() -> AttestationPayload {
        AttestationPayload {
            attestation_id: "att-1".into(),
            global_assets: FixedPoint18::parse("1000.0").unwrap(),
            nonce: 1,
            chain_id: 8453,
            expires_at: UnixTimestamp(2_000_000_000),
            entropy: [3u8; 32],
            state_hash: [4u8; 32],
        }
    }

    #[tokio::test]
    async fn signs_and_recovers_to_the_active_key() {
        let local_signer = PrivateKeySigner::random();
        let address = alloy_signer::Signer::address(&local_signer);
        let hsm = RawKeySigner::new().with_key("validator-1", local_signer);
        let target = Address::from_str("0x0000000000000000000000000000000000000099").unwrap();

        let signed = sign_attestation(&hsm, "validator-1", address, &payload(), target).await.unwrap();
        assert_eq!(signed.rsv_signature.len(), 65);
        assert!(signed.rsv_signature[64] == 27 || signed.rsv_signature[64] == 28);
    }

    #[tokio::test]
    async fn unknown_key_id_surfaces_as_signing_error() {
        struct NeverSigns;
        #[async_trait]
        impl Signer for NeverSigns {
            async fn sign(&self, key_id: &str, _digest: [u8; 32]) -> Result<Vec<u8>, SignerError> {
                Err(SignerError::UnknownKey(key_id.to_string()))
            }
            async fn public_key(&self, key_id: &str) -> Result<Address, SignerError> {
                Err(SignerError::UnknownKey(key_id.to_string()))
            }
        }
        let target = Address::from_str("0x0000000000000000000000000000000000000099").unwrap();
        let err = sign_attestation(&NeverSigns, "missing", Address::ZERO, &payload(), target)
            .await
            .unwrap_err();
        assert!(matches!(err, SigningError::Signer(SignerError::UnknownKey(_))));
    }
}
