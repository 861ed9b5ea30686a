//! Rebalancer-specific configuration, layered on top of the ambient
//! [`bridge_core::config::CliArgs`] shared by every daemon.

use clap::Parser;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
pub struct RebalancerArgs {
    #[command(flatten)]
    pub common: bridge_core::config::CliArgs,

    /// Qualified `pkg:Module:Entity` id of the vault-position template this
    /// rebalancer polls and exercises `Rebalance` on.
    #[arg(long, env = "VAULT_TEMPLATE")]
    pub vault_template: String,

    /// Target loan-to-value ratio, in basis points.
    #[arg(long, env = "TARGET_LTV_BPS")]
    pub target_ltv_bps: u32,

    /// Allowed drift either side of `targetLtvBps` before a rebalance fires.
    #[arg(long, env = "SAFETY_BUFFER_BPS")]
    pub safety_buffer_bps: u32,

    #[arg(long, env = "POLL_INTERVAL_MS", default_value_t = 15_000)]
    pub poll_interval_ms: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum RebalancerConfigError {
    #[error(transparent)]
    Common(#[from] bridge_core::config::ConfigError),
    #[error("safetyBufferBps ({buffer}) must be less than targetLtvBps ({target})")]
    BufferExceedsTarget { buffer: u32, target: u32 },
}

pub struct RebalancerConfig {
    pub common: bridge_core::Config,
    pub args: RebalancerArgs,
}

impl RebalancerConfig {
    pub fn load() -> Result<Self, RebalancerConfigError> {
        let args = RebalancerArgs::try_parse().map_err(bridge_core::config::ConfigError::Args)?;
        Self::from_args(args)
    }

    pub fn from_args(args: RebalancerArgs) -> Result<Self, RebalancerConfigError> {
        if args.safety_buffer_bps >= args.target_ltv_bps {
            return Err(RebalancerConfigError::BufferExceedsTarget {
                buffer: args.safety_buffer_bps,
                target: args.target_ltv_bps,
            });
        }
        let common = bridge_core::Config::from_args(args.common.clone())?;
        Ok(Self { common, args })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.args.poll_interval_ms)
    }

    /// Lower/upper LTV bounds outside of which a vault needs rebalancing.
    pub fn bounds(&self) -> (u32, u32) {
        (self.args.target_ltv_bps - self.args.safety_buffer_bps, self.args.target_ltv_bps + self.args.safety_buffer_bps)
    }
}
