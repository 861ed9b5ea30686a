//! Relay-specific configuration, layered on top of the ambient
//! [`bridge_core::config::CliArgs`] shared by every daemon.

use bridge_types::{Direction, TemplateId, TemplateIdError};
use clap::Parser;
use std::str::FromStr;
use std::time::Duration;

/// One relay process runs a single direction; `clap::ValueEnum` needs a
/// local type since [`Direction`] doesn't derive it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum RelayDirection {
    LToE,
    EToL,
}

impl From<RelayDirection> for Direction {
    fn from(value: RelayDirection) -> Self {
        match value {
            RelayDirection::LToE => Direction::LToE,
            RelayDirection::EToL => Direction::EToL,
        }
    }
}

#[derive(Parser, Debug, Clone)]
pub struct RelayArgs {
    #[command(flatten)]
    pub common: bridge_core::config::CliArgs,

    /// Direction this relay process carries attestations in. One process
    /// per direction; running both directions needs two processes.
    #[arg(long, env = "RELAY_DIRECTION")]
    pub direction: RelayDirection,

    /// Qualified `pkg:Module:Entity` id of the attestation-request template
    /// this relay queries.
    #[arg(long, env = "REQUEST_TEMPLATE")]
    pub request_template: String,

    /// Poll interval for the relay's event loop.
    #[arg(long, env = "POLL_INTERVAL_MS", default_value_t = 5_000)]
    pub poll_interval_ms: u64,

    /// Maximum allowed clock skew, in seconds, between the derived
    /// created-at timestamp and wall-clock "now" before an attestation is
    /// rejected as stale or clock-skewed.
    #[arg(long, env = "MAX_TIMESTAMP_SKEW_SECS", default_value_t = 86_400)]
    pub max_timestamp_skew_secs: u64,

    /// Raw hex private key the relay signs its own chain-E
    /// `processAttestation` transactions with.
    ///
    /// This is a distinct identity from `common.hsm_key_id`/`raw_signer_key`:
    /// those gate a *validator's* attestation-signing key behind
    /// `Config::validate`'s production HSM requirement, but the relay never
    /// signs attestation digests — it only submits transactions it didn't
    /// author the signatures for. Submission identity is always a plain key,
    /// the same way `EVM_PRIVATE_KEY` is read unconditionally for settlement
    /// transactions regardless of deployment tier.
    #[arg(long, env = "E_SIGNER_KEY")]
    pub e_signer_key: String,
}

#[derive(Debug, thiserror::Error)]
pub enum RelayConfigError {
    #[error(transparent)]
    Common(#[from] bridge_core::config::ConfigError),
    #[error("REQUEST_TEMPLATE: {0}")]
    RequestTemplate(#[from] TemplateIdError),
}

pub struct RelayConfig {
    pub common: bridge_core::Config,
    pub args: RelayArgs,
    pub request_template: TemplateId,
}

impl RelayConfig {
    pub fn load() -> Result<Self, RelayConfigError> {
        let args = RelayArgs::try_parse().map_err(bridge_core::config::ConfigError::Args)?;
        Self::from_args(args)
    }

    pub fn from_args(args: RelayArgs) -> Result<Self, RelayConfigError> {
        let common = bridge_core::Config::from_args(args.common.clone())?;
        let request_template = TemplateId::from_str(&args.request_template)?;
        Ok(Self { common, args, request_template })
    }

    pub fn direction(&self) -> Direction {
        self.args.direction.into()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.args.poll_interval_ms)
    }
}
