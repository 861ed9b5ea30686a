use crate::error::LedgerError;
use crate::retry::{MAX_ATTEMPTS_READ, MAX_ATTEMPTS_WRITE, retrying};
use bridge_types::TemplateId;
use rand::Rng;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use url::Url;

const DEFAULT_QUERY_LIMIT: usize = 200;
const L_API_TIMEOUT: Duration = Duration::from_secs(30);

/// A contract returned from `queryActive`, with its template id still
/// attached so the defensive client-side filter can check it.
#[derive(Debug, Clone, Deserialize)]
pub struct ActiveContract {
    pub contract_id: String,
    #[serde(rename = "templateId")]
    pub template_id_raw: String,
    pub payload: Value,
}

impl ActiveContract {
    pub fn template_id(&self) -> Option<TemplateId> {
        TemplateId::from_str(&self.template_id_raw).ok()
    }
}

/// A predicate over an active contract's decoded payload, run after the
/// defensive template re-filter.
pub type PayloadFilter = fn(&Value) -> bool;

/// Client for Ledger L's JSON Ledger API (`/v2/...`).
///
/// Wraps a plain `reqwest::Client` — retries are handled explicitly by
/// [`crate::retry::retrying`] rather than generic HTTP-retry middleware,
/// since retry eligibility needs per-status-code judgement this client
/// alone understands (413 is fatal, 429/5xx are not, network errors are).
#[derive(Debug, Clone)]
pub struct LedgerClient {
    http: reqwest::Client,
    base_url: Url,
    bearer_token: String,
    package_id: String,
    party: String,
    query_limit: usize,
}

impl LedgerClient {
    pub fn new(base_url: Url, bearer_token: String, package_id: String, party: String) -> Self {
        let http = reqwest::Client::builder()
            .timeout(L_API_TIMEOUT)
            .build()
            .expect("reqwest client configuration is static and always valid");
        Self {
            http,
            base_url,
            bearer_token,
            package_id,
            party,
            query_limit: DEFAULT_QUERY_LIMIT,
        }
    }

    fn path_url(&self, path: &str) -> Url {
        self.base_url.join(path).expect("path is a static relative literal")
    }

    fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder.bearer_auth(&self.bearer_token)
    }

    /// Mints a fresh, locally-unique commandId: `<role>-<unix_millis>-<random_hex>`.
    fn mint_command_id(&self, role: &str) -> String {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        let random: u64 = rand::rng().random();
        format!("{role}-{millis}-{random:016x}")
    }

    #[tracing::instrument(skip_all, err)]
    pub async fn get_latest_offset(&self) -> Result<i64, LedgerError> {
        let path = "/v2/state/ledger-end";
        let url = self.path_url(path);
        retrying(MAX_ATTEMPTS_READ, || async {
            let response = self
                .authed(self.http.get(url.clone()))
                .send()
                .await
                .map_err(|source| LedgerError::Network { path: path.to_string(), source })?;
            let response = raise_for_status(response, path).await?;
            #[derive(Deserialize)]
            struct LedgerEnd {
                offset: i64,
            }
            let body: LedgerEnd = response
                .json()
                .await
                .map_err(|source| LedgerError::Network { path: path.to_string(), source })?;
            Ok(body.offset)
        })
        .await
    }

    /// Queries active contracts, applying the defensive client-side
    /// template re-filter before the optional payload predicate.
    #[tracing::instrument(skip(self, filter), err)]
    pub async fn query_active(
        &self,
        template_id: Option<TemplateId>,
        filter: Option<PayloadFilter>,
    ) -> Result<Vec<ActiveContract>, LedgerError> {
        let _offset = self.get_latest_offset().await?;
        let path = "/v2/state/active-contracts";
        let url = self.path_url(path);
        let limit = self.query_limit;

        let contracts: Vec<ActiveContract> = retrying(MAX_ATTEMPTS_READ, || async {
            #[derive(Serialize)]
            struct QueryBody<'a> {
                #[serde(rename = "templateId", skip_serializing_if = "Option::is_none")]
                template_id: Option<&'a str>,
                limit: usize,
            }
            let template_id_str = template_id.as_ref().map(|t| t.to_string());
            let body = QueryBody {
                template_id: template_id_str.as_deref(),
                limit,
            };
            let response = self
                .authed(self.http.post(url.clone()))
                .json(&body)
                .send()
                .await
                .map_err(|source| LedgerError::Network { path: path.to_string(), source })?;
            let response = raise_for_status(response, path).await?;
            let contracts: Vec<ActiveContract> = response
                .json()
                .await
                .map_err(|source| LedgerError::Network { path: path.to_string(), source })?;
            Ok(contracts)
        })
        .await?;

        if contracts.len() >= limit {
            return Err(LedgerError::QueryLimitExceeded { template_id });
        }

        let filtered: Vec<ActiveContract> = contracts
            .into_iter()
            .filter(|c| match (&template_id, c.template_id()) {
                (Some(expected), Some(actual)) => *expected == actual,
                (Some(_), None) => false,
                (None, _) => true,
            })
            .filter(|c| filter.map(|f| f(&c.payload)).unwrap_or(true))
            .collect();

        Ok(filtered)
    }

    /// Qualifies `template_id` with the configured package id, the way
    /// `createContract` formats template ids before submission.
    fn qualify(&self, module: &str, entity: &str) -> String {
        format!("{}:{}:{}", self.package_id, module, entity)
    }

    #[tracing::instrument(skip(self, payload), err)]
    pub async fn create_contract(&self, module: &str, entity: &str, payload: Value) -> Result<Value, LedgerError> {
        let path = "/v2/commands/submit-and-wait";
        let url = self.path_url(path);
        let template_id = self.qualify(module, entity);
        let command_id = self.mint_command_id("create");

        retrying(MAX_ATTEMPTS_WRITE, || async {
            #[derive(Serialize)]
            struct CreateBody<'a> {
                #[serde(rename = "templateId")]
                template_id: &'a str,
                payload: &'a Value,
                #[serde(rename = "commandId")]
                command_id: &'a str,
                #[serde(rename = "actAs")]
                act_as: &'a [String],
            }
            let act_as = [self.party.clone()];
            let body = CreateBody {
                template_id: &template_id,
                payload: &payload,
                command_id: &command_id,
                act_as: &act_as,
            };
            let response = self
                .authed(self.http.post(url.clone()))
                .json(&body)
                .send()
                .await
                .map_err(|source| LedgerError::Network { path: path.to_string(), source })?;
            let response = raise_for_status(response, path).await?;
            response
                .json()
                .await
                .map_err(|source| LedgerError::Network { path: path.to_string(), source })
        })
        .await
    }

    #[tracing::instrument(skip(self, args), err)]
    pub async fn exercise_choice(
        &self,
        template_id: &TemplateId,
        contract_id: &str,
        choice: &str,
        args: Value,
        extra_act_as: &[String],
    ) -> Result<Value, LedgerError> {
        let path = "/v2/commands/submit-and-wait";
        let url = self.path_url(path);
        let command_id = self.mint_command_id("exercise");
        let mut act_as = vec![self.party.clone()];
        act_as.extend_from_slice(extra_act_as);

        retrying(MAX_ATTEMPTS_WRITE, || async {
            #[derive(Serialize)]
            struct ExerciseBody<'a> {
                #[serde(rename = "templateId")]
                template_id: String,
                #[serde(rename = "contractId")]
                contract_id: &'a str,
                choice: &'a str,
                #[serde(rename = "choiceArgument")]
                choice_argument: &'a Value,
                #[serde(rename = "commandId")]
                command_id: &'a str,
                #[serde(rename = "actAs")]
                act_as: &'a [String],
            }
            let body = ExerciseBody {
                template_id: template_id.to_string(),
                contract_id,
                choice,
                choice_argument: &args,
                command_id: &command_id,
                act_as: &act_as,
            };
            let response = self
                .authed(self.http.post(url.clone()))
                .json(&body)
                .send()
                .await
                .map_err(|source| LedgerError::Network { path: path.to_string(), source })?;
            let response = raise_for_status(response, path).await?;
            response
                .json()
                .await
                .map_err(|source| LedgerError::Network { path: path.to_string(), source })
        })
        .await
    }
}

async fn raise_for_status(response: reqwest::Response, path: &str) -> Result<reqwest::Response, LedgerError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    match status {
        StatusCode::TOO_MANY_REQUESTS => Err(LedgerError::Http429 { path: path.to_string() }),
        s if s.is_server_error() => Err(LedgerError::Http5xx { status: s.as_u16(), path: path.to_string() }),
        StatusCode::PAYLOAD_TOO_LARGE => Err(LedgerError::Http413 { path: path.to_string() }),
        s => {
            let body = response.text().await.unwrap_or_default();
            Err(LedgerError::Http4xxOther { status: s.as_u16(), path: path.to_string(), body })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_id_has_role_timestamp_and_random_suffix() {
        let client = LedgerClient::new(
            Url::parse("http://localhost:7575").unwrap(),
            "token".into(),
            "pkg".into(),
            "Relay".into(),
        );
        let id = client.mint_command_id("exercise");
        let parts: Vec<&str> = id.splitn(3, '-').collect();
        assert_eq!(parts[0], "exercise");
        assert!(parts[1].parse::<u128>().is_ok());
        assert_eq!(parts[2].len(), 16);
    }

    #[test]
    fn qualify_prefixes_configured_package_id() {
        let client = LedgerClient::new(
            Url::parse("http://localhost:7575").unwrap(),
            "token".into(),
            "abc123".into(),
            "Relay".into(),
        );
        assert_eq!(client.qualify("Bridge.Attestation", "AttestationRequest"), "abc123:Bridge.Attestation:AttestationRequest");
    }
}
