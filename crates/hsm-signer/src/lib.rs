//! The HSM signing interface an attestation validator signs through, plus a
//! non-production raw-key fallback explicitly gated out of production by
//! `Config::validate`.
//!
//! The HSM's own backend is out of scope here: this crate implements only
//! the client-side shape the core consumes — `GetPublicKey`/`Sign` under
//! `ECDSA_SHA_256` with `messageType=DIGEST`, returning a DER-encoded
//! signature.

mod hsm;
mod raw_key;
mod rotation;
mod signer;

pub use hsm::HsmSigner;
pub use raw_key::RawKeySigner;
pub use rotation::{ActiveKey, KeyHandle};
pub use signer::{Signer, SignerError, derive_address};
