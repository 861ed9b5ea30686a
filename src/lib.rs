//! Shared primitives for the Canton-ledger <-> EVM attestation bridge daemons.
//!
//! This crate carries the ambient stack every daemon binary needs: config
//! loading and validation, the top-level error taxonomy, graceful shutdown,
//! telemetry bootstrap, and small wire-format helpers (money amounts,
//! timestamps, base64). Domain-specific types live in `bridge-types`;
//! ledger/chain/signer plumbing live in their own crates.

pub mod config;
pub mod error;
pub mod health;
pub mod telemetry;
pub mod util;

pub use config::{Config, ConfigError, Environment};
pub use error::BridgeError;
pub use health::HealthState;
pub use telemetry::Telemetry;
pub use util::shutdown::SigDown;
