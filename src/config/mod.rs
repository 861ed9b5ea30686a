//! Runtime configuration, shared by every daemon binary.
//!
//! Settings are read from environment variables (optionally via
//! [`clap`]'s `env` feature) or from per-name files under a secrets
//! directory (see [`secrets`]). [`Config::validate`] performs every
//! startup check a production rollout needs before a daemon is allowed to
//! start its poll loop: well-formed addresses, no raw-key signer outside
//! development, TLS-only endpoints in production, and JSON map size caps.

mod literal_or_env;
mod secrets;

pub use literal_or_env::LiteralOrEnv;
pub use secrets::{read_secret_file, resolve as resolve_secret};

use alloy_primitives::Address;
use clap::Parser;
use std::collections::BTreeMap;
use std::path::PathBuf;
use url::Url;

/// Deployment tier. Several [`Config::validate`] checks only fire in
/// [`Environment::Production`] — development and staging deliberately allow
/// looser setups (cleartext ledger transport, raw-key signers) so the daemon
/// can run against a local devnet without HSM access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Default for Environment {
    fn default() -> Self {
        Environment::Development
    }
}

/// Maximum accepted size, in bytes, of the `validatorAddresses` JSON map —
/// bounds this input to protect against unbounded allocation from a
/// misconfigured or hostile input source.
pub const MAX_VALIDATOR_ADDRESS_MAP_BYTES: usize = 10 * 1024;

/// CLI entry point shared by every daemon binary.
///
/// Each daemon's `main.rs` parses this, then layers daemon-specific fields
/// on top (poll interval, envelope thresholds) via `#[command(flatten)]`.
#[derive(Parser, Debug, Clone)]
pub struct CliArgs {
    /// Path to an optional JSON config file. Values present in the file take
    /// precedence over defaults but are overridden by explicit environment
    /// variables for any field backed by `LiteralOrEnv`.
    #[arg(long, short, env = "CONFIG")]
    pub config: Option<PathBuf>,

    /// Deployment tier; gates the strict production checks in `validate()`.
    #[arg(long, env = "BRIDGE_ENVIRONMENT", default_value = "development")]
    pub environment: Environment,

    /// Base URL of the ledger's JSON API (e.g. `https://l-node.example:7575`).
    #[arg(long, env = "L_HOST")]
    pub l_host: Url,

    /// Bearer token for the ledger API. Supports `$VAR`/`${VAR}` resolution.
    #[arg(long, env = "L_TOKEN")]
    pub l_token: String,

    /// The party this daemon acts as when submitting ledger commands.
    #[arg(long, env = "L_PARTY")]
    pub l_party: String,

    /// DAML package id used to resolve `pkg:Module:Entity` template ids.
    #[arg(long, env = "L_PACKAGE_ID")]
    pub l_package_id: String,

    /// Primary JSON-RPC URL for chain E.
    #[arg(long, env = "E_RPC_URL")]
    pub e_rpc_url: Url,

    /// Comma-separated fallback JSON-RPC URLs, tried in order on failover.
    #[arg(long, env = "E_FALLBACK_RPC_URLS", value_delimiter = ',')]
    pub e_fallback_rpc_urls: Vec<Url>,

    /// Address of the deployed attestation-bridge contract on chain E.
    #[arg(long, env = "E_CONTRACT_ADDRESS")]
    pub e_contract_address: Address,

    /// Chain id chain E reports; rejects cross-chain replay when mismatched.
    #[arg(long, env = "E_CHAIN_ID")]
    pub e_chain_id: u64,

    /// Number of confirmations to await before treating a submission final.
    #[arg(long, env = "E_CONFIRMATIONS", default_value_t = 3)]
    pub e_confirmations: u64,

    /// HSM key id used for threshold signing. Forbidden to be empty in
    /// production (see `validate`).
    #[arg(long, env = "HSM_KEY_ID", default_value = "")]
    pub hsm_key_id: String,

    /// Optional HSM region/endpoint qualifier.
    #[arg(long, env = "HSM_REGION")]
    pub hsm_region: Option<String>,

    /// Raw hex private key, development/staging only. `validate()` is fatal
    /// if this is set while `environment == Production`.
    #[arg(long, env = "RAW_SIGNER_KEY")]
    pub raw_signer_key: Option<String>,

    /// JSON object mapping party id to validator EVM address, bounded to
    /// [`MAX_VALIDATOR_ADDRESS_MAP_BYTES`].
    #[arg(long, env = "VALIDATOR_ADDRESSES")]
    pub validator_addresses: String,

    /// Directory of per-name secret files, checked when an env var is unset.
    #[arg(long, env = "SECRETS_DIR")]
    pub secrets_dir: Option<PathBuf>,

    /// How long a daemon may take to drain in-flight work after SIGTERM
    /// before it force-exits with code 1.
    #[arg(long, env = "DRAIN_TIMEOUT_MS", default_value_t = 10_000)]
    pub drain_timeout_ms: u64,

    /// Local port a Kubernetes `preStop` hook probes before sending SIGTERM.
    #[arg(long, env = "PRE_STOP_PORT", default_value_t = 9_090)]
    pub pre_stop_port: u16,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file at {0}: {1}")]
    FileRead(PathBuf, std::io::Error),
    #[error("failed to parse config file: {0}")]
    JsonParse(#[from] serde_json::Error),
    #[error("failed to parse CLI/env arguments: {0}")]
    Args(#[from] clap::Error),
    #[error(
        "validatorAddresses JSON map is {actual} bytes, exceeding the {limit} byte cap"
    )]
    ValidatorMapTooLarge { actual: usize, limit: usize },
    #[error("validatorAddresses is not a valid JSON object of party -> address: {0}")]
    ValidatorMapInvalid(String),
    #[error("raw-key signer is forbidden in production; configure HSM_KEY_ID instead")]
    RawKeyInProduction,
    #[error("HSM_KEY_ID is required outside development")]
    MissingHsmKeyId,
    #[error("ledger host must use HTTPS in production, got: {0}")]
    LedgerTransportNotSecure(String),
    #[error("chain E RPC URL must use HTTPS in production, got: {0}")]
    ChainRpcNotSecure(String),
    #[error("chain E confirmations must be at least 1, got {0}")]
    ZeroConfirmations(u64),
}

/// Fully resolved configuration: [`CliArgs`] plus the derived validator
/// address map, ready for a daemon's `run()` to consume.
#[derive(Debug, Clone)]
pub struct Config {
    pub args: CliArgs,
    pub validator_addresses: BTreeMap<String, Address>,
}

impl Config {
    /// Parses CLI/env arguments, resolves secrets, and validates.
    ///
    /// This is the single entry point every daemon's `main` calls; it never
    /// partially constructs a `Config` that `validate()` would reject.
    pub fn load() -> Result<Self, ConfigError> {
        if let Some(path) = Self::peek_config_path() {
            Self::apply_json_file(&path)?;
        }
        let args = CliArgs::try_parse()?;
        Self::from_args(args)
    }

    /// Scans `std::env::args()` for `--config`/`-c` or the `CONFIG` env var
    /// without fully parsing, since the file must be applied *before*
    /// `CliArgs::try_parse` so its values can seed env vars that fields read
    /// via `env = "..."`.
    fn peek_config_path() -> Option<PathBuf> {
        let mut args = std::env::args().skip(1).peekable();
        while let Some(arg) = args.next() {
            if arg == "--config" || arg == "-c" {
                return args.next().map(PathBuf::from);
            }
            if let Some(value) = arg.strip_prefix("--config=") {
                return Some(PathBuf::from(value));
            }
        }
        std::env::var("CONFIG").ok().map(PathBuf::from)
    }

    /// Loads a flat JSON object of `UPPER_SNAKE_CASE` key/value overrides and
    /// sets each as an environment variable, unless already set — explicit
    /// process environment always wins over the file.
    fn apply_json_file(path: &PathBuf) -> Result<(), ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.clone(), e))?;
        let values: BTreeMap<String, serde_json::Value> = serde_json::from_str(&content)?;
        for (key, value) in values {
            if std::env::var_os(&key).is_some() {
                continue;
            }
            let as_str = match value {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            // SAFETY: config loading runs single-threaded at startup before
            // any other subsystem reads the environment.
            unsafe {
                std::env::set_var(&key, as_str);
            }
        }
        Ok(())
    }

    pub fn from_args(args: CliArgs) -> Result<Self, ConfigError> {
        let validator_addresses = parse_validator_addresses(&args.validator_addresses)?;
        let config = Config {
            args,
            validator_addresses,
        };
        config.validate()?;
        Ok(config)
    }

    /// Performs every startup validity check required before a daemon may run.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.args.e_confirmations == 0 {
            return Err(ConfigError::ZeroConfirmations(self.args.e_confirmations));
        }

        if self.args.environment == Environment::Production {
            if self.args.raw_signer_key.is_some() {
                return Err(ConfigError::RawKeyInProduction);
            }
            if self.args.hsm_key_id.is_empty() {
                return Err(ConfigError::MissingHsmKeyId);
            }
            if self.args.l_host.scheme() != "https" {
                return Err(ConfigError::LedgerTransportNotSecure(
                    crate::util::scrub::scrub_url(self.args.l_host.as_str()),
                ));
            }
            if self.args.e_rpc_url.scheme() != "https" {
                return Err(ConfigError::ChainRpcNotSecure(crate::util::scrub::scrub_url(
                    self.args.e_rpc_url.as_str(),
                )));
            }
            for fallback in &self.args.e_fallback_rpc_urls {
                if fallback.scheme() != "https" {
                    return Err(ConfigError::ChainRpcNotSecure(
                        crate::util::scrub::scrub_url(fallback.as_str()),
                    ));
                }
            }
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.args.environment == Environment::Production
    }
}

fn parse_validator_addresses(raw: &str) -> Result<BTreeMap<String, Address>, ConfigError> {
    if raw.len() > MAX_VALIDATOR_ADDRESS_MAP_BYTES {
        return Err(ConfigError::ValidatorMapTooLarge {
            actual: raw.len(),
            limit: MAX_VALIDATOR_ADDRESS_MAP_BYTES,
        });
    }
    if raw.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    let raw_map: BTreeMap<String, String> = serde_json::from_str(raw)
        .map_err(|e| ConfigError::ValidatorMapInvalid(e.to_string()))?;
    raw_map
        .into_iter()
        .map(|(party, addr)| {
            addr.parse::<Address>()
                .map(|parsed| (party, parsed))
                .map_err(|e| ConfigError::ValidatorMapInvalid(e.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> CliArgs {
        CliArgs {
            config: None,
            environment: Environment::Development,
            l_host: Url::parse("http://localhost:7575").unwrap(),
            l_token: "tok".into(),
            l_party: "Validator1".into(),
            l_package_id: "abc123".into(),
            e_rpc_url: Url::parse("http://localhost:8545").unwrap(),
            e_fallback_rpc_urls: vec![],
            e_contract_address: Address::ZERO,
            e_chain_id: 1337,
            e_confirmations: 3,
            hsm_key_id: String::new(),
            hsm_region: None,
            raw_signer_key: Some("0xabc".into()),
            validator_addresses: "{}".into(),
            secrets_dir: None,
            drain_timeout_ms: 10_000,
            pre_stop_port: 9090,
        }
    }

    #[test]
    fn development_allows_raw_key_and_cleartext() {
        let config = Config::from_args(base_args()).expect("development config is permissive");
        assert!(!config.is_production());
    }

    #[test]
    fn production_rejects_raw_key_signer() {
        let mut args = base_args();
        args.environment = Environment::Production;
        args.hsm_key_id = "projects/x/keys/y".into();
        args.l_host = Url::parse("https://l-node.example").unwrap();
        args.e_rpc_url = Url::parse("https://rpc.example").unwrap();
        let err = Config::from_args(args).unwrap_err();
        assert!(matches!(err, ConfigError::RawKeyInProduction));
    }

    #[test]
    fn production_rejects_cleartext_ledger_host() {
        let mut args = base_args();
        args.environment = Environment::Production;
        args.raw_signer_key = None;
        args.hsm_key_id = "projects/x/keys/y".into();
        args.e_rpc_url = Url::parse("https://rpc.example").unwrap();
        let err = Config::from_args(args).unwrap_err();
        assert!(matches!(err, ConfigError::LedgerTransportNotSecure(_)));
    }

    #[test]
    fn validator_address_map_rejects_oversize_input() {
        let oversized = format!("{{{}}}", "\"a\":\"0x0\",".repeat(2000));
        let err = parse_validator_addresses(&oversized).unwrap_err();
        assert!(matches!(err, ConfigError::ValidatorMapTooLarge { .. }));
    }

    #[test]
    fn validator_address_map_parses_valid_entries() {
        let raw = r#"{"Validator1":"0x0000000000000000000000000000000000000001"}"#;
        let parsed = parse_validator_addresses(raw).unwrap();
        assert_eq!(parsed.len(), 1);
        assert!(parsed.contains_key("Validator1"));
    }
}
