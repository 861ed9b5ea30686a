//! Converts HSM-produced DER ECDSA signatures into the 65-byte recoverable
//! `(r, s, v)` form chain E's `ecrecover` expects: curve-order low-S
//! canonicalisation plus a recovery-id search against an expected signer.

mod der;
mod recover;
mod sort;

pub use der::parse_der;
pub use recover::{format_kms, normalize_low_s, recover_rsv, validate_signature};
pub use sort::sort_signatures_by_signer;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("malformed DER signature: {0}")]
    MalformedDer(String),
    #[error("unexpected end of DER input")]
    UnexpectedEof,
    #[error("neither recovery id (27, 28) recovered the expected signer address")]
    RecoveryIdFailed,
}
