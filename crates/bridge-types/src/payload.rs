use alloy_primitives::{Address, B256, U256, keccak256};
use bridge_core::util::{FixedPoint18, UnixTimestamp};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The canonical-id time-to-live window subtracted from `expiresAt` before
/// hashing: `id = H(..., expiresAt − TTL, ...)`. Fixed at one hour; baking a
/// fresh attestation's expiry into the id would otherwise let an attacker
/// mint a distinct id for every resubmission of the same fact by nudging
/// the expiry forward.
pub const CANONICAL_ID_TTL: Duration = Duration::from_secs(3600);

/// The off-chain state snapshot a validator attests to.
///
/// Field names are `camelCase` on the wire (`attestationId`, `globalAssets`,
/// ...) to match the ledger's JSON encoding of the DAML record verbatim —
/// boundary validation lives at deserialization time via these `serde`
/// attributes, not in a separate hand-rolled parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationPayload {
    pub attestation_id: String,
    pub global_assets: FixedPoint18,
    pub nonce: u64,
    pub chain_id: u64,
    pub expires_at: UnixTimestamp,
    #[serde(with = "hex_32")]
    pub entropy: [u8; 32],
    #[serde(with = "hex_32")]
    pub state_hash: [u8; 32],
}

pub(crate) mod hex_32 {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(value: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(value)))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; 32], D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let trimmed = s.strip_prefix("0x").unwrap_or(&s);
        let bytes = hex::decode(trimmed).map_err(serde::de::Error::custom)?;
        let array: [u8; 32] = bytes
            .try_into()
            .map_err(|v: Vec<u8>| serde::de::Error::custom(format!("expected 32 bytes, got {}", v.len())))?;
        Ok(array)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CanonicalIdError {
    #[error("expiresAt ({expires_at}) minus the canonical TTL ({ttl_secs}s) is non-positive")]
    NonPositiveDerivedTimestamp { expires_at: UnixTimestamp, ttl_secs: u64 },
}

/// Derives the canonical on-chain attestation id for `payload`, targeting
/// `target_contract` on the chain named by `payload.chain_id`.
///
/// `id = keccak256(nonce || globalAssets_fixed18 || expiresAt-TTL || entropy
/// || stateHash || chainId || targetContractAddress)`, packed the way the
/// target contract packs it (no padding between fields, matching Solidity's
/// `abi.encodePacked`). This is the bridge's only notion of attestation
/// identity across the two ledgers — `attestationId` is a local convenience
/// string, not the cross-chain key.
pub fn canonical_id(payload: &AttestationPayload, target_contract: Address) -> Result<B256, CanonicalIdError> {
    let derived_timestamp = derive_timestamp(payload)?;
    let global_assets_u256 = global_assets_u256(&payload.global_assets);

    let mut packed = Vec::with_capacity(32 * 6 + 20);
    packed.extend_from_slice(&U256::from(payload.nonce).to_be_bytes::<32>());
    packed.extend_from_slice(&global_assets_u256.to_be_bytes::<32>());
    packed.extend_from_slice(&U256::from(derived_timestamp.0 as u64).to_be_bytes::<32>());
    packed.extend_from_slice(&payload.entropy);
    packed.extend_from_slice(&payload.state_hash);
    packed.extend_from_slice(&U256::from(payload.chain_id).to_be_bytes::<32>());
    packed.extend_from_slice(target_contract.as_slice());

    Ok(keccak256(packed))
}

/// `floor(expiresAt_ms / 1000) − TTL`, the on-chain struct's *created-at*
/// timestamp.
pub fn derive_timestamp(payload: &AttestationPayload) -> Result<UnixTimestamp, CanonicalIdError> {
    let derived_timestamp = payload.expires_at - CANONICAL_ID_TTL.as_secs();
    if derived_timestamp.0 <= 0 {
        return Err(CanonicalIdError::NonPositiveDerivedTimestamp {
            expires_at: payload.expires_at,
            ttl_secs: CANONICAL_ID_TTL.as_secs(),
        });
    }
    Ok(derived_timestamp)
}

/// The validator's signing digest: the canonical id packed together with
/// every field the id itself commits to, plus the id as a leading binder —
/// `(id, assets, nonce, derivedTimestamp, entropy, stateHash, chainId,
/// contractAddress)`. The HSM signs this digest (after personal-message
/// wrapping), never the bare id.
pub fn signing_digest(payload: &AttestationPayload, id: B256, target_contract: Address) -> Result<B256, CanonicalIdError> {
    let derived_timestamp = derive_timestamp(payload)?;
    let global_assets_u256 = global_assets_u256(&payload.global_assets);

    let mut packed = Vec::with_capacity(32 * 8 + 20);
    packed.extend_from_slice(id.as_slice());
    packed.extend_from_slice(&global_assets_u256.to_be_bytes::<32>());
    packed.extend_from_slice(&U256::from(payload.nonce).to_be_bytes::<32>());
    packed.extend_from_slice(&U256::from(derived_timestamp.0 as u64).to_be_bytes::<32>());
    packed.extend_from_slice(&payload.entropy);
    packed.extend_from_slice(&payload.state_hash);
    packed.extend_from_slice(&U256::from(payload.chain_id).to_be_bytes::<32>());
    packed.extend_from_slice(target_contract.as_slice());

    Ok(keccak256(packed))
}

/// Applies Ethereum's `personal_sign` length-prefix wrapping
/// (`"\x19Ethereum Signed Message:\n32"` followed by the 32-byte digest)
/// before handing a digest to the HSM.
pub fn personal_message_wrap(digest: B256) -> B256 {
    const PREFIX: &[u8] = b"\x19Ethereum Signed Message:\n32";
    let mut packed = Vec::with_capacity(PREFIX.len() + 32);
    packed.extend_from_slice(PREFIX);
    packed.extend_from_slice(digest.as_slice());
    keccak256(packed)
}

/// Converts an 18-fractional-digit decimal into its fixed-point `U256`
/// on-chain representation (value scaled by `10^18`, matching Solidity's
/// convention for an 18-decimals token-style quantity).
pub fn global_assets_u256(amount: &FixedPoint18) -> U256 {
    let scaled = amount.inner() * rust_decimal::Decimal::from(1_000_000_000_000_000_000u64);
    let truncated = scaled.trunc();
    U256::from_str_radix(&truncated.to_string(), 10).unwrap_or(U256::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn sample_payload() -> AttestationPayload {
        AttestationPayload {
            attestation_id: "att-1".to_string(),
            global_assets: FixedPoint18::parse("1000.5").unwrap(),
            nonce: 7,
            chain_id: 8453,
            expires_at: UnixTimestamp(2_000_000_000),
            entropy: [7u8; 32],
            state_hash: [9u8; 32],
        }
    }

    #[test]
    fn canonical_id_is_deterministic() {
        let payload = sample_payload();
        let target = Address::from_str("0x0000000000000000000000000000000000000001").unwrap();
        let a = canonical_id(&payload, target).unwrap();
        let b = canonical_id(&payload, target).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn canonical_id_changes_with_target_contract() {
        let payload = sample_payload();
        let target_a = Address::from_str("0x0000000000000000000000000000000000000001").unwrap();
        let target_b = Address::from_str("0x0000000000000000000000000000000000000002").unwrap();
        assert_ne!(
            canonical_id(&payload, target_a).unwrap(),
            canonical_id(&payload, target_b).unwrap()
        );
    }

    #[test]
    fn rejects_expiry_too_close_to_epoch() {
        let mut payload = sample_payload();
        payload.expires_at = UnixTimestamp(100);
        let target = Address::from_str("0x0000000000000000000000000000000000000001").unwrap();
        let err = canonical_id(&payload, target).unwrap_err();
        assert!(matches!(err, CanonicalIdError::NonPositiveDerivedTimestamp { .. }));
    }

    #[test]
    fn payload_round_trips_through_json() {
        let payload = sample_payload();
        let json = serde_json::to_string(&payload).unwrap();
        let back: AttestationPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(payload, back);
    }
}
