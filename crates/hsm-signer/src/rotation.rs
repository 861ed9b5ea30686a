use crate::signer::{Signer, SignerError};
use alloy_primitives::{Address, keccak256};

/// A configured signing key: its HSM/local identifier and derived address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyHandle {
    pub key_id: String,
    pub address: Address,
}

/// Tracks the validator's primary and (optional) rotation key, and performs
/// a self-test-then-switch sequence: `activateRotation()` first exercises a
/// self-test signature with the rotation key and only switches the active
/// identifiers once that self-test recovers. Rotation is in-process; the
/// persistent key id must be supplied from configuration again on restart.
#[derive(Debug, Clone)]
pub struct ActiveKey {
    primary: KeyHandle,
    rotation: Option<KeyHandle>,
    active_is_rotation: bool,
}

impl ActiveKey {
    pub fn new(primary: KeyHandle, rotation: Option<KeyHandle>) -> Self {
        Self { primary, rotation, active_is_rotation: false }
    }

    /// The key id/address the validator currently signs with.
    pub fn active(&self) -> &KeyHandle {
        if self.active_is_rotation {
            self.rotation.as_ref().unwrap_or(&self.primary)
        } else {
            &self.primary
        }
    }

    /// Runs a self-test signature through `signer` using the configured
    /// rotation key, and only flips the active key over if that signature
    /// recovers to the rotation key's own address.
    pub async fn activate_rotation(&mut self, signer: &dyn Signer) -> Result<(), SignerError> {
        let rotation = self
            .rotation
            .clone()
            .ok_or_else(|| SignerError::UnknownKey("no rotation key configured".to_string()))?;

        let self_test_digest = keccak256(b"bridge-validator-rotation-self-test");
        let der = signer.sign(&rotation.key_id, self_test_digest.0).await?;
        let recovered = sig_codec::format_kms(&der, self_test_digest.0, rotation.address);
        if recovered.is_err() {
            return Err(SignerError::RotationSelfTestFailed);
        }

        self.active_is_rotation = true;
        tracing::info!(key_id = %rotation.key_id, address = %rotation.address, "activated rotation signing key");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw_key::RawKeySigner;
    use alloy_signer_local::PrivateKeySigner;

    #[tokio::test]
    async fn activates_rotation_only_after_self_test_recovers() {
        let primary_signer = PrivateKeySigner::random();
        let rotation_signer = PrivateKeySigner::random();
        let primary_address = primary_signer.address();
        let rotation_address = rotation_signer.address();

        let signer = RawKeySigner::new()
            .with_key("primary", primary_signer)
            .with_key("rotation", rotation_signer);

        let mut active = ActiveKey::new(
            KeyHandle { key_id: "primary".into(), address: primary_address },
            Some(KeyHandle { key_id: "rotation".into(), address: rotation_address }),
        );
        assert_eq!(active.active().key_id, "primary");

        active.activate_rotation(&signer).await.unwrap();
        assert_eq!(active.active().key_id, "rotation");
    }

    #[tokio::test]
    async fn rejects_rotation_without_a_configured_key() {
        let signer = RawKeySigner::new();
        let mut active = ActiveKey::new(
            KeyHandle { key_id: "primary".into(), address: Address::ZERO },
            None,
        );
        let err = active.activate_rotation(&signer).await.unwrap_err();
        assert!(matches!(err, SignerError::UnknownKey(_)));
    }
}
