//! Chain-E (EVM) plumbing shared by the relay, keeper, and rebalancer
//! daemons: a failover-capable RPC provider, the attestation-bridge ABI
//! binding, pre-flight simulation and submission helpers, and the boot-time
//! log scan used to recover in-flight processed-id state.

mod contract;
mod error;
mod nonce;
mod provider;
mod scan;
mod submit;

pub use contract::{Attestation, AttestationBridgeInstance, AttestationReceived, validator_role};
pub use error::EvmError;
pub use nonce::PendingNonceManager;
pub use provider::{EvmChainClient, FAILOVER_THRESHOLD, InnerProvider};
pub use scan::{SCAN_CHUNK_BLOCKS, SCAN_WINDOW_BLOCKS, scan_attestation_received};
pub use submit::{simulate_process_attestation, submit_process_attestation, wait_for_confirmations};
