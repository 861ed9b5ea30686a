//! Validator-specific configuration, layered on top of the ambient
//! [`bridge_core::config::CliArgs`] shared by every daemon.

use bridge_core::util::FixedPoint18;
use clap::Parser;
use rust_decimal::Decimal;
use std::time::Duration;
use url::Url;

use crate::allowlist::{AllowlistError, TemplateAllowlist};

#[derive(Parser, Debug, Clone)]
pub struct ValidatorArgs {
    #[command(flatten)]
    pub common: bridge_core::config::CliArgs,

    /// Base URL of the authoritative asset API the validator re-verifies
    /// every candidate attestation against.
    #[arg(long, env = "AUTHORITATIVE_API_URL")]
    pub authoritative_api_url: Url,

    /// Bearer token for the authoritative asset API.
    #[arg(long, env = "AUTHORITATIVE_API_TOKEN")]
    pub authoritative_api_token: String,

    /// Base URL of the HSM signing service. Unused when `raw_signer_key` is
    /// set (development/staging only).
    #[arg(long, env = "HSM_BASE_URL")]
    pub hsm_base_url: Option<Url>,

    /// Optional rotation key id, paired with the primary `hsm_key_id`.
    #[arg(long, env = "HSM_ROTATION_KEY_ID")]
    pub hsm_rotation_key_id: Option<String>,

    /// Run the self-test-then-switch rotation sequence against
    /// `hsm_rotation_key_id` once, log the outcome, and exit instead of
    /// entering the poll loop. An operator CLI action, not a daemon mode.
    #[arg(long)]
    pub rotate_key: bool,

    /// Poll interval for the candidate-attestation event loop.
    #[arg(long, env = "POLL_INTERVAL_MS", default_value_t = 3_000)]
    pub poll_interval_ms: u64,

    /// Comma-separated allowlist of `pkg:Module:Entity` template ids this
    /// validator is permitted to query and sign.
    #[arg(long, env = "TEMPLATE_ALLOWLIST")]
    pub template_allowlist: String,

    /// Maximum signs within `signing_window_ms`.
    #[arg(long, env = "MAX_SIGNS_PER_WINDOW", default_value_t = 50)]
    pub max_signs_per_window: usize,

    /// Sliding-window size, milliseconds, for the sign-rate limit.
    #[arg(long, env = "SIGNING_WINDOW_MS", default_value_t = 3_600_000)]
    pub signing_window_ms: u64,

    /// Maximum fractional jump, in basis points, between consecutive signed
    /// `globalAssets` values (default 20%).
    #[arg(long, env = "MAX_VALUE_JUMP_BPS", default_value_t = 2_000)]
    pub max_value_jump_bps: u32,

    /// Relative tolerance, as a percentage, between a payload's
    /// `globalAssets` and the authoritative snapshot's `totalValue`.
    #[arg(long, env = "ASSET_TOLERANCE_PCT", default_value = "0.1")]
    pub asset_tolerance_pct: Decimal,

    /// Absolute cap on the same tolerance, in the asset's decimal units.
    #[arg(long, env = "ASSET_TOLERANCE_ABS_CAP", default_value = "1000")]
    pub asset_tolerance_abs_cap: String,

    /// Required collateral ratio, in basis points, against `requested_cap`.
    #[arg(long, env = "COLLATERAL_RATIO_BPS", default_value_t = 0)]
    pub collateral_ratio_bps: u32,

    /// The requested capacity the collateral ratio is measured against. Zero
    /// disables the collateral-ratio check.
    #[arg(long, env = "REQUESTED_CAP", default_value = "0")]
    pub requested_cap: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ValidatorConfigError {
    #[error(transparent)]
    Common(#[from] bridge_core::config::ConfigError),
    #[error("TEMPLATE_ALLOWLIST: {0}")]
    Allowlist(#[from] AllowlistError),
    #[error("ASSET_TOLERANCE_ABS_CAP is not a valid decimal: {0}")]
    ToleranceAbsCap(String),
    #[error("REQUESTED_CAP is not a valid decimal: {0}")]
    RequestedCap(String),
}

pub struct ValidatorConfig {
    pub common: bridge_core::Config,
    pub args: ValidatorArgs,
    pub template_allowlist: TemplateAllowlist,
    pub asset_tolerance_abs_cap: FixedPoint18,
    pub requested_cap: FixedPoint18,
}

impl ValidatorConfig {
    pub fn load() -> Result<Self, ValidatorConfigError> {
        let args = ValidatorArgs::try_parse().map_err(bridge_core::config::ConfigError::Args)?;
        Self::from_args(args)
    }

    pub fn from_args(args: ValidatorArgs) -> Result<Self, ValidatorConfigError> {
        let common = bridge_core::Config::from_args(args.common.clone())?;
        let template_allowlist = TemplateAllowlist::parse(&args.template_allowlist)?;
        let asset_tolerance_abs_cap = FixedPoint18::parse(&args.asset_tolerance_abs_cap)
            .map_err(|e| ValidatorConfigError::ToleranceAbsCap(e.to_string()))?;
        let requested_cap = FixedPoint18::parse(&args.requested_cap)
            .map_err(|e| ValidatorConfigError::RequestedCap(e.to_string()))?;
        Ok(Self { common, args, template_allowlist, asset_tolerance_abs_cap, requested_cap })
    }

    pub fn signing_window(&self) -> Duration {
        Duration::from_millis(self.args.signing_window_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.args.poll_interval_ms)
    }
}
