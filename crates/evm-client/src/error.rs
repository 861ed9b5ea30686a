#[derive(Debug, thiserror::Error)]
pub enum EvmError {
    #[error("network error talking to chain E: {0}")]
    Network(String),
    #[error("no RPC providers configured")]
    NoProviders,
    #[error("transaction simulation reverted: {0}")]
    SimulationReverted(String),
    #[error("transaction submission failed: {0}")]
    SubmissionFailed(String),
    #[error("timed out waiting for {confirmations} confirmations on {tx_hash}")]
    ConfirmationTimeout { tx_hash: String, confirmations: u64 },
    #[error("validator address {address} lacks VALIDATOR_ROLE on the attestation-bridge contract")]
    MissingValidatorRole { address: String },
}
