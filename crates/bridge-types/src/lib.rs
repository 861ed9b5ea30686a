//! The on-ledger data model shared by every attestation-bridge daemon:
//! parties, contract/template ids, the attestation payload and request, the
//! canonical cross-chain id derivation, and the bounded processed-id cache
//! used by both the relay and the validator.

pub mod cache;
pub mod ids;
pub mod payload;
pub mod request;

pub use cache::ProcessedIdCache;
pub use ids::{ContractId, Party, TemplateId, TemplateIdError};
pub use payload::{
    AttestationPayload, CANONICAL_ID_TTL, CanonicalIdError, canonical_id, derive_timestamp, global_assets_u256,
    personal_message_wrap, signing_digest,
};
pub use request::{AttestationRequest, AttestationRequestError, Direction, ValidatorSignature};
