//! Client for the authoritative asset API: the off-chain source of truth
//! validators re-verify every candidate attestation against before signing.

use bridge_core::util::scrub::scrub_url;
use bridge_core::util::{FixedPoint18, UnixTimestamp};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

const AUTHORITATIVE_API_TIMEOUT: Duration = Duration::from_secs(10);

mod hex_32 {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(value)))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; 32], D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let trimmed = s.strip_prefix("0x").unwrap_or(&s);
        let bytes = hex::decode(trimmed).map_err(serde::de::Error::custom)?;
        bytes.try_into().map_err(|v: Vec<u8>| serde::de::Error::custom(format!("expected 32 bytes, got {}", v.len())))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthoritativeError {
    #[error("{0} unreachable: {1}")]
    Network(String, String),
    #[error("unexpected status {0} from authoritative API")]
    UnexpectedStatus(u16),
    #[error("decoding authoritative API response: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Asset {
    #[serde(rename = "assetId")]
    pub asset_id: String,
    pub category: String,
    #[serde(rename = "issuerName")]
    pub issuer_name: String,
    #[serde(rename = "currentValue")]
    pub current_value: FixedPoint18,
    #[serde(rename = "lastUpdated")]
    pub last_updated: UnixTimestamp,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetSnapshot {
    #[serde(rename = "snapshotId")]
    pub snapshot_id: String,
    pub timestamp: UnixTimestamp,
    pub assets: Vec<Asset>,
    #[serde(rename = "totalValue")]
    pub total_value: FixedPoint18,
    #[serde(rename = "stateHash", with = "hex_32")]
    pub state_hash: [u8; 32],
}

#[derive(Clone)]
pub struct AuthoritativeClient {
    http: reqwest::Client,
    base_url: Url,
    bearer_token: String,
}

impl std::fmt::Debug for AuthoritativeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthoritativeClient").field("base_url", &scrub_url(self.base_url.as_str())).finish()
    }
}

impl AuthoritativeClient {
    pub fn new(base_url: Url, bearer_token: String) -> Self {
        let http = reqwest::Client::builder()
            .timeout(AUTHORITATIVE_API_TIMEOUT)
            .build()
            .expect("reqwest client configuration is static and always valid");
        Self { http, base_url, bearer_token }
    }

    fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder.bearer_auth(&self.bearer_token)
    }

    pub async fn snapshot(&self) -> Result<AssetSnapshot, AuthoritativeError> {
        let url = self.base_url.join("v1/assets/snapshot").expect("static relative path");
        let response = self
            .authed(self.http.get(url.clone()))
            .send()
            .await
            .map_err(|e| AuthoritativeError::Network(scrub_url(url.as_str()), e.to_string()))?;
        if !response.status().is_success() {
            return Err(AuthoritativeError::UnexpectedStatus(response.status().as_u16()));
        }
        response.json().await.map_err(|e| AuthoritativeError::Decode(e.to_string()))
    }

    pub async fn batch(&self, asset_ids: &[String]) -> Result<Vec<Asset>, AuthoritativeError> {
        #[derive(Serialize)]
        struct BatchBody<'a> {
            #[serde(rename = "assetIds")]
            asset_ids: &'a [String],
        }
        #[derive(Deserialize)]
        struct BatchResponse {
            assets: Vec<Asset>,
        }
        let url = self.base_url.join("v1/assets/batch").expect("static relative path");
        let response = self
            .authed(self.http.post(url.clone()))
            .json(&BatchBody { asset_ids })
            .send()
            .await
            .map_err(|e| AuthoritativeError::Network(scrub_url(url.as_str()), e.to_string()))?;
        if !response.status().is_success() {
            return Err(AuthoritativeError::UnexpectedStatus(response.status().as_u16()));
        }
        let body: BatchResponse = response.json().await.map_err(|e| AuthoritativeError::Decode(e.to_string()))?;
        Ok(body.assets)
    }

    pub async fn verify_state_hash(&self, state_hash: [u8; 32]) -> Result<bool, AuthoritativeError> {
        #[derive(Serialize)]
        struct VerifyBody {
            #[serde(rename = "stateHash", with = "hex_32")]
            state_hash: [u8; 32],
        }
        #[derive(Deserialize)]
        struct VerifyResponse {
            valid: bool,
        }
        let url = self.base_url.join("v1/state/verify").expect("static relative path");
        let response = self
            .authed(self.http.post(url.clone()))
            .json(&VerifyBody { state_hash })
            .send()
            .await
            .map_err(|e| AuthoritativeError::Network(scrub_url(url.as_str()), e.to_string()))?;
        if !response.status().is_success() {
            return Err(AuthoritativeError::UnexpectedStatus(response.status().as_u16()));
        }
        let body: VerifyResponse = response.json().await.map_err(|e| AuthoritativeError::Decode(e.to_string()))?;
        Ok(body.valid)
    }
}
