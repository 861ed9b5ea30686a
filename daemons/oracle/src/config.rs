//! Oracle-specific configuration, layered on top of the ambient
//! [`bridge_core::config::CliArgs`] shared by every daemon.

use clap::Parser;
use rust_decimal::Decimal;
use std::time::Duration;
use url::Url;

#[derive(Parser, Debug, Clone)]
pub struct OracleArgs {
    #[command(flatten)]
    pub common: bridge_core::config::CliArgs,

    /// Symbol this process tracks, e.g. `CTN`.
    #[arg(long, env = "ORACLE_SYMBOL", default_value = "CTN")]
    pub symbol: String,

    /// Qualified `pkg:Module:Entity` id of the price-feed contract this
    /// oracle queries and exercises `UpdatePrice` on.
    #[arg(long, env = "PRICE_TEMPLATE")]
    pub price_template: String,

    /// Primary, no-auth AMM quote endpoint.
    #[arg(long, env = "AMM_QUOTE_URL")]
    pub amm_quote_url: Url,

    /// Fallback, bearer/JWT-authenticated ticker endpoint.
    #[arg(long, env = "JWT_TICKER_URL")]
    pub jwt_ticker_url: Url,

    /// Bearer token for the fallback ticker endpoint.
    #[arg(long, env = "JWT_TICKER_TOKEN")]
    pub jwt_ticker_token: String,

    /// Poll interval for the oracle's fetch-and-publish loop.
    #[arg(long, env = "POLL_INTERVAL_MS", default_value_t = 30_000)]
    pub poll_interval_ms: u64,

    #[arg(long, env = "MIN_PRICE_USD")]
    pub min_price_usd: Decimal,

    #[arg(long, env = "MAX_PRICE_USD")]
    pub max_price_usd: Decimal,

    #[arg(long, env = "DIVERGENCE_THRESHOLD_PCT", default_value = "5")]
    pub divergence_threshold_pct: Decimal,

    #[arg(long, env = "MAX_CHANGE_PER_UPDATE_PCT", default_value = "25")]
    pub max_change_per_update_pct: Decimal,

    #[arg(long, env = "MAX_CONSECUTIVE_FAILURES", default_value_t = 10)]
    pub max_consecutive_failures: u32,

    /// After this many consecutive bounds rejections the accepted-price
    /// baseline is cleared so the next accepted price re-anchors.
    #[arg(long, env = "MAX_CONSECUTIVE_REJECTIONS", default_value_t = 5)]
    pub max_consecutive_rejections: u32,

    /// Optional stable-coin symbol pinned to 1.0, refreshed once at boot.
    #[arg(long, env = "STABLE_SYMBOL")]
    pub stable_symbol: Option<String>,

    /// Telegram bot token for circuit-breaker-trip alerts. Alerting is
    /// disabled unless both this and `telegram_chat_id` are set.
    #[arg(long, env = "TELEGRAM_BOT_TOKEN")]
    pub telegram_bot_token: Option<String>,

    #[arg(long, env = "TELEGRAM_CHAT_ID")]
    pub telegram_chat_id: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum OracleConfigError {
    #[error(transparent)]
    Common(#[from] bridge_core::config::ConfigError),
    #[error("minPriceUsd ({min}) must be less than maxPriceUsd ({max})")]
    InvalidPriceBounds { min: Decimal, max: Decimal },
}

pub struct OracleConfig {
    pub common: bridge_core::Config,
    pub args: OracleArgs,
}

impl OracleConfig {
    pub fn load() -> Result<Self, OracleConfigError> {
        let args = OracleArgs::try_parse().map_err(bridge_core::config::ConfigError::Args)?;
        Self::from_args(args)
    }

    pub fn from_args(args: OracleArgs) -> Result<Self, OracleConfigError> {
        if args.min_price_usd >= args.max_price_usd {
            return Err(OracleConfigError::InvalidPriceBounds { min: args.min_price_usd, max: args.max_price_usd });
        }
        let common = bridge_core::Config::from_args(args.common.clone())?;
        Ok(Self { common, args })
    }

    pub fn bounds(&self) -> oracle_core::PriceBounds {
        oracle_core::PriceBounds {
            min_price: self.args.min_price_usd,
            max_price: self.args.max_price_usd,
            divergence_threshold_pct: self.args.divergence_threshold_pct,
            max_change_per_update_pct: self.args.max_change_per_update_pct,
            max_consecutive_rejections: self.args.max_consecutive_rejections,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.args.poll_interval_ms)
    }
}
