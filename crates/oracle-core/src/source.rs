use crate::error::OracleError;
use async_trait::async_trait;
use bridge_core::util::scrub::scrub_url;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

const EXTERNAL_API_TIMEOUT: Duration = Duration::from_secs(10);

/// A price feed the oracle loop can fetch from. Two concrete sources are
/// provided, a primary and a fallback; both report failures as
/// [`OracleError::SourceFailed`] so the pipeline can treat them uniformly.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch(&self, symbol: &str) -> Result<Decimal, OracleError>;

    /// Stable label used in divergence/single-source error messages and logs.
    fn name(&self) -> &str;
}

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    price: Decimal,
}

/// Primary source: a no-auth AMM quote endpoint (`GET {base_url}/quote?symbol=...`).
#[derive(Debug, Clone)]
pub struct AmmQuoteSource {
    http: reqwest::Client,
    base_url: Url,
}

impl AmmQuoteSource {
    pub fn new(base_url: Url) -> Self {
        let http = reqwest::Client::builder()
            .timeout(EXTERNAL_API_TIMEOUT)
            .build()
            .expect("reqwest client configuration is static and always valid");
        Self { http, base_url }
    }
}

#[async_trait]
impl PriceSource for AmmQuoteSource {
    async fn fetch(&self, symbol: &str) -> Result<Decimal, OracleError> {
        let mut url = self.base_url.clone();
        url.query_pairs_mut().append_pair("symbol", symbol);
        let response = self.http.get(url.clone()).send().await.map_err(|e| OracleError::SourceFailed {
            source: self.name().to_string(),
            reason: format!("{} unreachable: {e}", scrub_url(url.as_str())),
        })?;
        let response = response.error_for_status().map_err(|e| OracleError::SourceFailed {
            source: self.name().to_string(),
            reason: format!("unexpected status: {e}"),
        })?;
        let body: QuoteResponse = response.json().await.map_err(|e| OracleError::SourceFailed {
            source: self.name().to_string(),
            reason: format!("decoding quote response: {e}"),
        })?;
        Ok(body.price)
    }

    fn name(&self) -> &str {
        "amm-quote"
    }
}

/// Fallback source: a bearer/JWT-authenticated ticker endpoint
/// (`GET {base_url}/ticker/{symbol}`).
#[derive(Clone)]
pub struct JwtTickerSource {
    http: reqwest::Client,
    base_url: Url,
    bearer_token: String,
}

impl JwtTickerSource {
    pub fn new(base_url: Url, bearer_token: String) -> Self {
        let http = reqwest::Client::builder()
            .timeout(EXTERNAL_API_TIMEOUT)
            .build()
            .expect("reqwest client configuration is static and always valid");
        Self { http, base_url, bearer_token }
    }
}

impl std::fmt::Debug for JwtTickerSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtTickerSource").field("base_url", &scrub_url(self.base_url.as_str())).finish()
    }
}

#[async_trait]
impl PriceSource for JwtTickerSource {
    async fn fetch(&self, symbol: &str) -> Result<Decimal, OracleError> {
        let url = self
            .base_url
            .join(&format!("ticker/{symbol}"))
            .map_err(|e| OracleError::SourceFailed { source: self.name().to_string(), reason: format!("bad url: {e}") })?;
        let response = self
            .http
            .get(url.clone())
            .bearer_auth(&self.bearer_token)
            .send()
            .await
            .map_err(|e| OracleError::SourceFailed {
                source: self.name().to_string(),
                reason: format!("{} unreachable: {e}", scrub_url(url.as_str())),
            })?;
        let response = response.error_for_status().map_err(|e| OracleError::SourceFailed {
            source: self.name().to_string(),
            reason: format!("unexpected status: {e}"),
        })?;
        let body: QuoteResponse = response.json().await.map_err(|e| OracleError::SourceFailed {
            source: self.name().to_string(),
            reason: format!("decoding ticker response: {e}"),
        })?;
        Ok(body.price)
    }

    fn name(&self) -> &str {
        "jwt-ticker"
    }
}
