//! Keeper-specific configuration, layered on top of the ambient
//! [`bridge_core::config::CliArgs`] shared by every daemon.

use clap::Parser;
use rust_decimal::Decimal;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
pub struct KeeperArgs {
    #[command(flatten)]
    pub common: bridge_core::config::CliArgs,

    /// Qualified `pkg:Module:Entity` id of the loan-position template this
    /// keeper polls and exercises `Liquidate` on.
    #[arg(long, env = "LOAN_TEMPLATE")]
    pub loan_template: String,

    /// Qualified `pkg:Module:Entity` id of the price-feed template used to
    /// revalue collateral. Must match the symbol each loan names.
    #[arg(long, env = "PRICE_TEMPLATE")]
    pub price_template: String,

    /// Health factor below which a loan is liquidated.
    #[arg(long, env = "CRITICAL_HF")]
    pub critical_hf: Decimal,

    /// Health factor below which a loan is logged as at-risk but not yet
    /// liquidated.
    #[arg(long, env = "WARN_HF")]
    pub warn_hf: Decimal,

    #[arg(long, env = "POLL_INTERVAL_MS", default_value_t = 15_000)]
    pub poll_interval_ms: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum KeeperConfigError {
    #[error(transparent)]
    Common(#[from] bridge_core::config::ConfigError),
    #[error("criticalHF ({critical}) must be less than warnHF ({warn})")]
    InvalidHfOrdering { critical: Decimal, warn: Decimal },
}

pub struct KeeperConfig {
    pub common: bridge_core::Config,
    pub args: KeeperArgs,
}

impl KeeperConfig {
    pub fn load() -> Result<Self, KeeperConfigError> {
        let args = KeeperArgs::try_parse().map_err(bridge_core::config::ConfigError::Args)?;
        Self::from_args(args)
    }

    pub fn from_args(args: KeeperArgs) -> Result<Self, KeeperConfigError> {
        if args.critical_hf >= args.warn_hf {
            return Err(KeeperConfigError::InvalidHfOrdering { critical: args.critical_hf, warn: args.warn_hf });
        }
        let common = bridge_core::Config::from_args(args.common.clone())?;
        Ok(Self { common, args })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.args.poll_interval_ms)
    }
}
