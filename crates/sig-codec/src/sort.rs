use alloy_primitives::Address;

/// Sorts `(signature, signer)` pairs by ascending signer address and drops
/// the signer, returning just the signatures in the order the on-chain
/// verifier requires — it deduplicates signers by monotonic comparison, so
/// an unsorted or duplicate-containing list would be rejected on chain.
pub fn sort_signatures_by_signer(mut sigs: Vec<([u8; 65], Address)>) -> Vec<[u8; 65]> {
    sigs.sort_by_key(|(_, signer)| *signer);
    sigs.into_iter().map(|(sig, _)| sig).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn sorts_ascending_by_signer_address() {
        let low = Address::from_str("0x0000000000000000000000000000000000000001").unwrap();
        let high = Address::from_str("0x00000000000000000000000000000000000000ff").unwrap();
        let sigs = vec![([1u8; 65], high), ([2u8; 65], low)];
        let sorted = sort_signatures_by_signer(sigs);
        assert_eq!(sorted[0], [2u8; 65]);
        assert_eq!(sorted[1], [1u8; 65]);
    }
}
