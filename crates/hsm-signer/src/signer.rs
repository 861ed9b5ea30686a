use alloy_primitives::{Address, keccak256};
use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum SignerError {
    #[error("HSM returned an empty signature for key {key_id}")]
    EmptySignature { key_id: String },
    #[error("HSM request failed: {0}")]
    Transport(String),
    #[error("HSM returned a malformed public key for key {key_id}: {reason}")]
    MalformedPublicKey { key_id: String, reason: String },
    #[error("key id '{0}' is not configured")]
    UnknownKey(String),
    #[error("rotation self-test signature did not recover to the rotation key's address")]
    RotationSelfTestFailed,
}

/// The external HSM interface: a digest goes in, a DER-encoded ECDSA
/// signature comes out; the private key itself never enters process memory
/// (the validator only ever holds a `key_id`).
#[async_trait]
pub trait Signer: Send + Sync {
    /// Signs `digest` under `key_id` using `ECDSA_SHA_256` /
    /// `messageType=DIGEST`, returning the raw DER `SEQUENCE`.
    async fn sign(&self, key_id: &str, digest: [u8; 32]) -> Result<Vec<u8>, SignerError>;

    /// Returns the on-chain address the given key id recovers to.
    async fn public_key(&self, key_id: &str) -> Result<Address, SignerError>;
}

/// Derives the on-chain address from an uncompressed secp256k1 point
/// (65 bytes, `0x04 || X || Y`): `keccak256(X || Y)[12..]`.
pub fn derive_address(uncompressed_point: &[u8]) -> Result<Address, SignerError> {
    let body = match uncompressed_point.len() {
        65 if uncompressed_point[0] == 0x04 => &uncompressed_point[1..],
        64 => uncompressed_point,
        other => {
            return Err(SignerError::MalformedPublicKey {
                key_id: String::new(),
                reason: format!("expected a 64 or 65-byte uncompressed point, got {other} bytes"),
            });
        }
    };
    let hash = keccak256(body);
    Ok(Address::from_slice(&hash[12..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_compressed_or_malformed_points() {
        let err = derive_address(&[0x02; 33]).unwrap_err();
        assert!(matches!(err, SignerError::MalformedPublicKey { .. }));
    }
}
