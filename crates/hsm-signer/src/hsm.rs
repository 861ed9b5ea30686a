use crate::signer::{Signer, SignerError, derive_address};
use alloy_primitives::Address;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as b64;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

const HSM_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for the external HSM-backed signing service.
///
/// `GetPublicKey(keyId)` returns a DER `SubjectPublicKeyInfo` wrapping a
/// 65-byte uncompressed point, and `Sign(keyId, digest, "ECDSA_SHA_256",
/// messageType=DIGEST)` returns a DER signature. The HSM service itself is
/// out of scope; this is only the thin boundary the validator calls through
/// for an external collaborator it does not reimplement (e.g. a DEX quote
/// endpoint would be handled the same way).
#[derive(Debug, Clone)]
pub struct HsmSigner {
    http: reqwest::Client,
    base_url: Url,
    region: Option<String>,
}

#[derive(Serialize)]
struct SignRequest<'a> {
    key_id: &'a str,
    message: String,
    message_type: &'static str,
    signing_algorithm: &'static str,
}

#[derive(Deserialize)]
struct SignResponse {
    signature: String,
}

#[derive(Deserialize)]
struct PublicKeyResponse {
    #[serde(rename = "publicKey")]
    public_key: String,
}

impl HsmSigner {
    pub fn new(base_url: Url, region: Option<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(HSM_TIMEOUT)
            .build()
            .expect("reqwest client configuration is static and always valid");
        Self { http, base_url, region }
    }

    fn path_url(&self, path: &str) -> Url {
        self.base_url.join(path).expect("path is a static relative literal")
    }
}

#[async_trait]
impl Signer for HsmSigner {
    #[tracing::instrument(skip(self, digest), fields(region = self.region.as_deref()), err)]
    async fn sign(&self, key_id: &str, digest: [u8; 32]) -> Result<Vec<u8>, SignerError> {
        let body = SignRequest {
            key_id,
            message: b64.encode(digest),
            message_type: "DIGEST",
            signing_algorithm: "ECDSA_SHA_256",
        };
        let response = self
            .http
            .post(self.path_url("/sign"))
            .json(&body)
            .send()
            .await
            .map_err(|e| SignerError::Transport(e.to_string()))?;
        if !response.status().is_success() {
            return Err(SignerError::Transport(format!("HSM sign returned {}", response.status())));
        }
        let parsed: SignResponse = response
            .json()
            .await
            .map_err(|e| SignerError::Transport(e.to_string()))?;
        let der = b64
            .decode(&parsed.signature)
            .map_err(|e| SignerError::Transport(format!("invalid base64 signature: {e}")))?;
        if der.is_empty() {
            return Err(SignerError::EmptySignature { key_id: key_id.to_string() });
        }
        Ok(der)
    }

    #[tracing::instrument(skip(self), err)]
    async fn public_key(&self, key_id: &str) -> Result<Address, SignerError> {
        let response = self
            .http
            .get(self.path_url(&format!("/keys/{key_id}/public")))
            .send()
            .await
            .map_err(|e| SignerError::Transport(e.to_string()))?;
        if !response.status().is_success() {
            return Err(SignerError::Transport(format!("HSM public_key returned {}", response.status())));
        }
        let parsed: PublicKeyResponse = response
            .json()
            .await
            .map_err(|e| SignerError::Transport(e.to_string()))?;
        let der_spki = b64
            .decode(&parsed.public_key)
            .map_err(|e| SignerError::Transport(format!("invalid base64 public key: {e}")))?;
        let point = extract_uncompressed_point(&der_spki).ok_or_else(|| SignerError::MalformedPublicKey {
            key_id: key_id.to_string(),
            reason: "could not locate a 65-byte uncompressed point in the SubjectPublicKeyInfo".into(),
        })?;
        derive_address(point)
    }
}

/// Scans a DER `SubjectPublicKeyInfo` for the trailing 65-byte uncompressed
/// secp256k1 point (`0x04` followed by 64 bytes of X||Y) rather than fully
/// parsing the ASN.1 structure — the HSM always appends it as the final BIT
/// STRING payload, and a full DER parser is unneeded machinery for a single
/// known shape.
fn extract_uncompressed_point(der_spki: &[u8]) -> Option<&[u8]> {
    if der_spki.len() < 65 {
        return None;
    }
    let tail = &der_spki[der_spki.len() - 65..];
    if tail[0] == 0x04 { Some(tail) } else { None }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_trailing_uncompressed_point() {
        let mut der = vec![0x30, 0x59, 0x30, 0x13];
        der.push(0x04);
        der.extend_from_slice(&[0xab; 64]);
        let point = extract_uncompressed_point(&der).unwrap();
        assert_eq!(point.len(), 65);
        assert_eq!(point[0], 0x04);
    }

    #[test]
    fn rejects_short_input() {
        assert!(extract_uncompressed_point(&[0u8; 10]).is_none());
    }
}
