use crate::ids::Party;
use crate::payload::AttestationPayload;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::num::NonZeroU32;

/// Direction an attestation travels: from Ledger L to Chain E, or the
/// reverse (used for e.g. withdrawal acknowledgements flowing back to L).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    LToE,
    EToL,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AttestationRequestError {
    #[error("collectedSignatures contains {party} which is not in validatorGroup")]
    CollectedSignatureNotInGroup { party: Party },
    #[error("ecdsaSignatures contains duplicate entry for {party}")]
    DuplicateSigner { party: Party },
    #[error("ecdsaSignatures contains {party} which has not contributed a collected signature")]
    SignerNotCollected { party: Party },
}

/// A single validator's contribution: `(requestId, validator, ecdsaSignature,
/// nonce, stateHash)` as it lives on L, keyed informally by `validator` within
/// an `AttestationRequest`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatorSignature {
    pub request_id: String,
    pub validator: Party,
    pub ecdsa_signature_hex: String,
    pub nonce: u64,
    #[serde(with = "crate::payload::hex_32")]
    pub state_hash: [u8; 32],
}

/// The attestation request contract as it lives on L.
///
/// Construction is the only place these invariants can be violated, so
/// `AttestationRequest::new` is the sole constructor and re-validates on
/// every call rather than trusting callers to have checked beforehand.
/// `Deserialize` is routed through it so a contract payload decoded
/// straight off the wire can't skip validation — boundary checks live here,
/// not in a second hand-rolled pass over the active-contract JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationRequest {
    pub aggregator: Party,
    pub validator_group: BTreeSet<Party>,
    pub payload: AttestationPayload,
    pub collected_signatures: BTreeSet<Party>,
    pub ecdsa_signatures: Vec<(Party, String)>,
    pub required_signatures: NonZeroU32,
    pub direction: Direction,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAttestationRequest {
    aggregator: Party,
    validator_group: BTreeSet<Party>,
    payload: AttestationPayload,
    collected_signatures: BTreeSet<Party>,
    ecdsa_signatures: Vec<(Party, String)>,
    required_signatures: NonZeroU32,
    direction: Direction,
}

impl<'de> Deserialize<'de> for AttestationRequest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = RawAttestationRequest::deserialize(deserializer)?;
        AttestationRequest::new(
            raw.aggregator,
            raw.validator_group,
            raw.payload,
            raw.collected_signatures,
            raw.ecdsa_signatures,
            raw.required_signatures,
            raw.direction,
        )
        .map_err(serde::de::Error::custom)
    }
}

impl AttestationRequest {
    pub fn new(
        aggregator: Party,
        validator_group: BTreeSet<Party>,
        payload: AttestationPayload,
        collected_signatures: BTreeSet<Party>,
        ecdsa_signatures: Vec<(Party, String)>,
        required_signatures: NonZeroU32,
        direction: Direction,
    ) -> Result<Self, AttestationRequestError> {
        for party in &collected_signatures {
            if !validator_group.contains(party) {
                return Err(AttestationRequestError::CollectedSignatureNotInGroup {
                    party: party.clone(),
                });
            }
        }

        let mut seen = BTreeSet::new();
        for (party, _sig) in &ecdsa_signatures {
            if !seen.insert(party.clone()) {
                return Err(AttestationRequestError::DuplicateSigner { party: party.clone() });
            }
            if !collected_signatures.contains(party) {
                return Err(AttestationRequestError::SignerNotCollected { party: party.clone() });
            }
        }

        Ok(Self {
            aggregator,
            validator_group,
            payload,
            collected_signatures,
            ecdsa_signatures,
            required_signatures,
            direction,
        })
    }

    /// Whether enough validators have signed to hand this off to the relay.
    pub fn has_threshold(&self) -> bool {
        self.collected_signatures.len() as u32 >= self.required_signatures.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_core::util::{FixedPoint18, UnixTimestamp};

    fn payload() -> AttestationPayload {
        AttestationPayload {
            attestation_id: "att-1".into(),
            global_assets: FixedPoint18::parse("1.0").unwrap(),
            nonce: 1,
            chain_id: 1,
            expires_at: UnixTimestamp(10_000),
            entropy: [0u8; 32],
            state_hash: [0u8; 32],
        }
    }

    #[test]
    fn rejects_collected_signature_outside_group() {
        let group: BTreeSet<Party> = ["V1".into()].into_iter().collect();
        let collected: BTreeSet<Party> = ["V2".into()].into_iter().collect();
        let err = AttestationRequest::new(
            "Aggregator".into(),
            group,
            payload(),
            collected,
            vec![],
            NonZeroU32::new(1).unwrap(),
            Direction::LToE,
        )
        .unwrap_err();
        assert!(matches!(err, AttestationRequestError::CollectedSignatureNotInGroup { .. }));
    }

    #[test]
    fn rejects_signer_not_in_collected_set() {
        let group: BTreeSet<Party> = ["V1".into(), "V2".into()].into_iter().collect();
        let collected: BTreeSet<Party> = ["V1".into()].into_iter().collect();
        let err = AttestationRequest::new(
            "Aggregator".into(),
            group,
            payload(),
            collected,
            vec![("V2".into(), "0xsig".into())],
            NonZeroU32::new(1).unwrap(),
            Direction::LToE,
        )
        .unwrap_err();
        assert!(matches!(err, AttestationRequestError::SignerNotCollected { .. }));
    }

    #[test]
    fn threshold_is_inclusive() {
        let group: BTreeSet<Party> = ["V1".into(), "V2".into()].into_iter().collect();
        let collected: BTreeSet<Party> = ["V1".into()].into_iter().collect();
        let req = AttestationRequest::new(
            "Aggregator".into(),
            group,
            payload(),
            collected,
            vec![("V1".into(), "0xsig".into())],
            NonZeroU32::new(1).unwrap(),
            Direction::LToE,
        )
        .unwrap();
        assert!(req.has_threshold());
    }
}
