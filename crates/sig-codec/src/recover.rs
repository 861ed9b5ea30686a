use crate::CodecError;
use crate::der::parse_der;
use alloy_primitives::{Address, B256, Signature, U256};

/// secp256k1 group order `n`.
const SECP256K1_ORDER: U256 = U256::from_limbs([
    0xBFD25E8CD0364141,
    0xBAAEDCE6AF48A03B,
    0xFFFFFFFFFFFFFFFE,
    0xFFFFFFFFFFFFFFFF,
]);

/// Canonicalises `s` to the lower half of the curve order: if `s > n/2`,
/// replaces it with `n - s`. Ethereum's `ecrecover` (and most verifiers)
/// reject the high-S form to eliminate signature malleability.
pub fn normalize_low_s(s: U256) -> U256 {
    let half_order = SECP256K1_ORDER >> 1;
    if s > half_order { SECP256K1_ORDER - s } else { s }
}

/// Searches `v ∈ {27, 28}` for the recovery id that recovers `expected` from
/// `(digest, r, s)`, returning the assembled 65-byte `(r, s, v)` signature.
pub fn recover_rsv(digest: [u8; 32], r: U256, s: U256, expected: Address) -> Result<[u8; 65], CodecError> {
    let prehash = B256::from(digest);
    for v in [27u8, 28u8] {
        let y_parity = v == 28;
        let signature = Signature::new(r, s, y_parity);
        if let Ok(recovered) = signature.recover_address_from_prehash(&prehash) {
            if recovered == expected {
                let mut out = [0u8; 65];
                out[..32].copy_from_slice(&r.to_be_bytes::<32>());
                out[32..64].copy_from_slice(&s.to_be_bytes::<32>());
                out[64] = v;
                return Ok(out);
            }
        }
    }
    Err(CodecError::RecoveryIdFailed)
}

/// Composes [`parse_der`], [`normalize_low_s`], and [`recover_rsv`]: the
/// full DER-to-RSV conversion path a validator runs after the HSM returns a
/// signature.
pub fn format_kms(der: &[u8], digest: [u8; 32], expected: Address) -> Result<[u8; 65], CodecError> {
    let (r, s) = parse_der(der)?;
    let s = normalize_low_s(s);
    recover_rsv(digest, r, s, expected)
}

/// Whether `sig` (65-byte RSV) recovers `signer` from `digest`.
pub fn validate_signature(sig: &[u8; 65], digest: [u8; 32], signer: Address) -> bool {
    let r = U256::from_be_bytes::<32>(sig[0..32].try_into().expect("fixed-size slice"));
    let s = U256::from_be_bytes::<32>(sig[32..64].try_into().expect("fixed-size slice"));
    let y_parity = match sig[64] {
        27 => false,
        28 => true,
        _ => return false,
    };
    let signature = Signature::new(r, s, y_parity);
    match signature.recover_address_from_prehash(&B256::from(digest)) {
        Ok(recovered) => recovered == signer,
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_low_s_is_idempotent() {
        let high_s = SECP256K1_ORDER - U256::from(1u64);
        let normalized = normalize_low_s(high_s);
        assert!(normalized <= SECP256K1_ORDER >> 1);
        assert_eq!(normalize_low_s(normalized), normalized);
    }

    #[test]
    fn normalize_low_s_leaves_low_values_untouched() {
        let low_s = U256::from(12345u64);
        assert_eq!(normalize_low_s(low_s), low_s);
    }
}
