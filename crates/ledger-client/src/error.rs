use bridge_types::TemplateId;

/// Error taxonomy for L-API calls. `classify` maps a raw HTTP/transport
/// failure into one of these so the retry combinator and the caller both
/// see the same judgement.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("rate limited (429) calling {path}")]
    Http429 { path: String },
    #[error("server error ({status}) calling {path}")]
    Http5xx { status: u16, path: String },
    #[error("payload too large (413) calling {path}, will not retry")]
    Http413 { path: String },
    #[error("client error ({status}) calling {path}: {body}")]
    Http4xxOther { status: u16, path: String, body: String },
    #[error("network error calling {path}: {source}")]
    Network { path: String, #[source] source: reqwest::Error },
    #[error("active-contract query for {template_id:?} hit the result cap and may be truncated")]
    QueryLimitExceeded { template_id: Option<TemplateId> },
    #[error("failed to decode response body from {path}: {source}")]
    Decode { path: String, #[source] source: serde_json::Error },
    #[error("other ledger client error: {0}")]
    Other(String),
}

/// Which class of error `classify` assigned to a failed call, used to pick
/// retry eligibility and backoff multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    Http429,
    Http5xx,
    Http413,
    Http4xxOther,
    Network,
    Other,
}

impl RetryClass {
    pub fn is_retryable(self) -> bool {
        matches!(self, RetryClass::Http429 | RetryClass::Http5xx | RetryClass::Network)
    }

    pub fn backoff_multiplier(self) -> u32 {
        match self {
            RetryClass::Http429 => 3,
            RetryClass::Http5xx | RetryClass::Network => 1,
            RetryClass::Http413 | RetryClass::Http4xxOther | RetryClass::Other => 1,
        }
    }
}

/// Classifies a [`LedgerError`] into a [`RetryClass`].
pub fn classify(err: &LedgerError) -> RetryClass {
    match err {
        LedgerError::Http429 { .. } => RetryClass::Http429,
        LedgerError::Http5xx { .. } => RetryClass::Http5xx,
        LedgerError::Http413 { .. } => RetryClass::Http413,
        LedgerError::Http4xxOther { .. } => RetryClass::Http4xxOther,
        LedgerError::Network { .. } => RetryClass::Network,
        LedgerError::QueryLimitExceeded { .. }
        | LedgerError::Decode { .. }
        | LedgerError::Other(_) => RetryClass::Other,
    }
}
