//! Assembles and verifies the signature set the relay submits alongside an
//! attestation: resolves each signer's on-chain address, accepts raw RSV or
//! converts DER via `sig_codec`, drops anything that doesn't recover to the
//! expected address, then sorts ascending by signer (the on-chain verifier's
//! dedup requirement).

use alloy_primitives::Address;
use bridge_types::Party;
use std::collections::BTreeMap;

/// Resolves, verifies, and sorts `signatures` against `digest`. Any entry
/// that fails to resolve, decode, or recover is dropped and logged — the
/// caller is left with whatever subset is sound, and it's on the caller to
/// check the remaining count still meets the threshold.
pub fn assemble_signature_set(
    signatures: &[(Party, String)],
    digest: [u8; 32],
    validator_addresses: &BTreeMap<String, Address>,
) -> Vec<[u8; 65]> {
    let mut accepted: Vec<([u8; 65], Address)> = Vec::with_capacity(signatures.len());

    for (party, sig_hex) in signatures {
        let Some(&address) = validator_addresses.get(&party.0) else {
            tracing::warn!(validator = %party, "dropping signature: no configured on-chain address for signer");
            continue;
        };

        let trimmed = sig_hex.strip_prefix("0x").unwrap_or(sig_hex);
        let bytes = match hex::decode(trimmed) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(validator = %party, error = %e, "dropping signature: not valid hex");
                continue;
            }
        };

        let rsv = if bytes.len() == 65 {
            if bytes[64] != 0x1b && bytes[64] != 0x1c {
                tracing::warn!(validator = %party, "dropping signature: RSV recovery byte is neither 0x1b nor 0x1c");
                continue;
            }
            let mut array = [0u8; 65];
            array.copy_from_slice(&bytes);
            array
        } else {
            match sig_codec::format_kms(&bytes, digest, address) {
                Ok(rsv) => rsv,
                Err(e) => {
                    tracing::warn!(validator = %party, error = %e, "dropping signature: DER-to-RSV conversion failed");
                    continue;
                }
            }
        };

        if !sig_codec::validate_signature(&rsv, digest, address) {
            tracing::warn!(validator = %party, "dropping signature: does not recover to the configured address");
            continue;
        }

        accepted.push((rsv, address));
    }

    sig_codec::sort_signatures_by_signer(accepted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::B256;
    use alloy_signer::SignerSync;
    use alloy_signer_local::PrivateKeySigner;

    #[test]
    fn drops_signature_from_unconfigured_validator() {
        let digest = [1u8; 32];
        let sigs = vec![(Party::from("Unknown"), "0x".to_string() + &"00".repeat(65))];
        let addresses = BTreeMap::new();
        let out = assemble_signature_set(&sigs, digest, &addresses);
        assert!(out.is_empty());
    }

    #[test]
    fn accepts_raw_rsv_that_recovers_correctly() {
        let signer = PrivateKeySigner::random();
        let address = alloy_signer::Signer::address(&signer);
        let digest = [7u8; 32];
        let signature = signer.sign_hash_sync(&B256::from(digest)).unwrap();
        let rsv = signature.as_bytes();

        let mut addresses = BTreeMap::new();
        addresses.insert("V1".to_string(), address);
        let sigs = vec![(Party::from("V1"), format!("0x{}", hex::encode(rsv)))];

        let out = assemble_signature_set(&sigs, digest, &addresses);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn drops_rsv_with_invalid_recovery_byte() {
        let signer = PrivateKeySigner::random();
        let address = alloy_signer::Signer::address(&signer);
        let digest = [7u8; 32];
        let mut rsv = [0u8; 65];
        rsv[64] = 0x02;

        let mut addresses = BTreeMap::new();
        addresses.insert("V1".to_string(), address);
        let sigs = vec![(Party::from("V1"), format!("0x{}", hex::encode(rsv)))];

        let out = assemble_signature_set(&sigs, digest, &addresses);
        assert!(out.is_empty());
    }
}
