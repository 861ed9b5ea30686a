//! Top-level error taxonomy.
//!
//! Each plumbing crate (`ledger-client`, `sig-codec`, `hsm-signer`,
//! `evm-client`, `oracle-core`) defines its own error enum close to the
//! operations that can fail; this module wraps them into one type so daemon
//! binaries can propagate a single error up to `main` with `?` and log it
//! uniformly.

use crate::config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("system clock error: {0}")]
    Clock(#[from] std::time::SystemTimeError),

    #[error("signal handler setup failed: {0}")]
    Signal(#[source] std::io::Error),

    #[error("telemetry initialization failed: {0}")]
    Telemetry(String),

    #[error("fatal: {0}")]
    Fatal(String),
}
