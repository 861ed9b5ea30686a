use crate::signer::{Signer, SignerError};
use alloy_primitives::{Address, B256, U256};
use alloy_signer::Signer as AlloySigner;
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use std::collections::HashMap;

/// A signer backed by a local, in-process private key.
///
/// **Forbidden in production** — raw-key signers must throw at start in
/// that environment, so `Config::validate` refuses to construct one when
/// `environment == Production`. Exists so a daemon can
/// run against a local devnet without an HSM dependency.
///
/// Implements [`Signer`] by producing a DER-encoded signature, matching the
/// HSM's own output shape, so callers (the validator's signing path) never
/// need to branch on which signer backend is in use.
pub struct RawKeySigner {
    keys: HashMap<String, PrivateKeySigner>,
}

impl RawKeySigner {
    pub fn new() -> Self {
        Self { keys: HashMap::new() }
    }

    /// Registers `signer` under `key_id`, the local analogue of an HSM key
    /// identifier.
    pub fn with_key(mut self, key_id: impl Into<String>, signer: PrivateKeySigner) -> Self {
        self.keys.insert(key_id.into(), signer);
        self
    }
}

impl Default for RawKeySigner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Signer for RawKeySigner {
    async fn sign(&self, key_id: &str, digest: [u8; 32]) -> Result<Vec<u8>, SignerError> {
        let signer = self
            .keys
            .get(key_id)
            .ok_or_else(|| SignerError::UnknownKey(key_id.to_string()))?;
        let signature = signer
            .sign_hash(&B256::from(digest))
            .await
            .map_err(|e| SignerError::Transport(e.to_string()))?;
        Ok(encode_der(signature.r(), signature.s()))
    }

    async fn public_key(&self, key_id: &str) -> Result<Address, SignerError> {
        let signer = self
            .keys
            .get(key_id)
            .ok_or_else(|| SignerError::UnknownKey(key_id.to_string()))?;
        Ok(signer.address())
    }
}

/// Minimal DER `SEQUENCE { INTEGER r, INTEGER s }` encoder — the inverse of
/// `sig_codec::parse_der`, used only so `RawKeySigner`'s output shape
/// matches the HSM's.
fn encode_der(r: U256, s: U256) -> Vec<u8> {
    let r_bytes = encode_der_integer(&r.to_be_bytes::<32>());
    let s_bytes = encode_der_integer(&s.to_be_bytes::<32>());
    let mut body = Vec::with_capacity(r_bytes.len() + s_bytes.len());
    body.extend_from_slice(&r_bytes);
    body.extend_from_slice(&s_bytes);
    let mut out = Vec::with_capacity(body.len() + 2);
    out.push(0x30);
    encode_der_length(body.len(), &mut out);
    out.extend_from_slice(&body);
    out
}

fn encode_der_integer(value_be: &[u8; 32]) -> Vec<u8> {
    let mut trimmed: &[u8] = value_be;
    while trimmed.len() > 1 && trimmed[0] == 0 {
        trimmed = &trimmed[1..];
    }
    let needs_sign_byte = trimmed[0] & 0x80 != 0;
    let mut out = Vec::with_capacity(trimmed.len() + 3);
    out.push(0x02);
    let len = trimmed.len() + if needs_sign_byte { 1 } else { 0 };
    encode_der_length(len, &mut out);
    if needs_sign_byte {
        out.push(0x00);
    }
    out.extend_from_slice(trimmed);
    out
}

fn encode_der_length(len: usize, out: &mut Vec<u8>) {
    if len < 0x80 {
        out.push(len as u8);
    } else {
        let bytes = len.to_be_bytes();
        let significant: Vec<u8> = bytes.iter().copied().skip_while(|b| *b == 0).collect();
        out.push(0x80 | significant.len() as u8);
        out.extend_from_slice(&significant);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sig_codec::parse_der;

    #[tokio::test]
    async fn signs_and_der_round_trips_through_sig_codec() {
        let local_signer = PrivateKeySigner::random();
        let address = local_signer.address();
        let raw = RawKeySigner::new().with_key("dev-key", local_signer);

        let digest = [7u8; 32];
        let der = raw.sign("dev-key", digest).await.unwrap();
        let (r, s) = parse_der(&der).unwrap();

        let recovered = sig_codec::format_kms(&der, digest, raw.public_key("dev-key").await.unwrap());
        assert!(recovered.is_ok());
        assert!(r > U256::ZERO);
        assert!(s > U256::ZERO);
        assert_eq!(address, raw.public_key("dev-key").await.unwrap());
    }

    #[tokio::test]
    async fn unknown_key_id_is_an_error() {
        let raw = RawKeySigner::new();
        let err = raw.sign("missing", [0u8; 32]).await.unwrap_err();
        assert!(matches!(err, SignerError::UnknownKey(_)));
    }
}
