use alloy_sol_types::sol;

// The attestation-bridge contract ABI, inlined via `sol!` since this crate
// owns the contract and there's no JSON artifact to load the way
// `USDC.json`/`Validator6492.json` are loaded for third-party contracts.
sol! {
    #[allow(missing_docs)]
    #[derive(Debug)]
    #[sol(rpc)]
    interface AttestationBridge {
        struct Attestation {
            bytes32 id;
            uint256 cantonAssets;
            uint256 nonce;
            uint256 timestamp;
            bytes32 entropy;
            bytes32 cantonStateHash;
        }

        function processAttestation(Attestation attestation, bytes[] sigs) external;
        function currentNonce() external view returns (uint256);
        function minSignatures() external view returns (uint256);
        function usedAttestationIds(bytes32 id) external view returns (bool);
        function hasRole(bytes32 role, address account) external view returns (bool);

        event AttestationReceived(bytes32 indexed id, uint256 nonce);
    }
}

pub use AttestationBridge::{AttestationBridgeInstance, AttestationReceived, Attestation};

/// `VALIDATOR_ROLE` — the `bytes32` role id the relay checks via `hasRole`
/// at start-up. Matches the standard OpenZeppelin `AccessControl`
/// convention: `keccak256("VALIDATOR_ROLE")`.
pub fn validator_role() -> alloy_primitives::B256 {
    alloy_primitives::keccak256(b"VALIDATOR_ROLE")
}
