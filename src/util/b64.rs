use base64::Engine;
use base64::engine::general_purpose::STANDARD as b64;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Cow;
use std::fmt::Display;

/// Bytes carried on the wire as a base64 string.
///
/// Used for DER signature blobs coming back from the HSM/KMS signer and for
/// any raw byte payload embedded in JSON (ledger API `bytes`-kind template
/// arguments, for instance).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Base64Bytes<'a>(pub Cow<'a, [u8]>);

impl Base64Bytes<'_> {
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        b64.decode(&self.0)
    }

    pub fn encode<T: AsRef<[u8]>>(input: T) -> Base64Bytes<'static> {
        let encoded = b64.encode(input.as_ref());
        Base64Bytes(Cow::Owned(encoded.into_bytes()))
    }

    pub fn into_owned(self) -> Base64Bytes<'static> {
        Base64Bytes(Cow::Owned(self.0.into_owned()))
    }
}

impl AsRef<[u8]> for Base64Bytes<'_> {
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl<'a> From<&'a [u8]> for Base64Bytes<'a> {
    fn from(slice: &'a [u8]) -> Self {
        Base64Bytes(Cow::Borrowed(slice))
    }
}

impl Display for Base64Bytes<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(self.0.as_ref()))
    }
}

impl Serialize for Base64Bytes<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&b64.encode(self.0.as_ref()))
    }
}

impl<'de> Deserialize<'de> for Base64Bytes<'static> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        // Validate eagerly so a malformed payload is rejected at the trust
        // boundary instead of surfacing as a decode error deep in sig-codec.
        b64.decode(s.as_bytes())
            .map_err(|e| serde::de::Error::custom(format!("invalid base64: {e}")))?;
        Ok(Base64Bytes(Cow::Owned(s.into_bytes())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_arbitrary_bytes() {
        let raw = vec![0u8, 1, 2, 255, 254, 10];
        let encoded = Base64Bytes::encode(&raw);
        assert_eq!(encoded.decode().unwrap(), raw);
    }

    #[test]
    fn deserializes_from_json_string() {
        let json = "\"AQID\"";
        let wrapped: Base64Bytes<'static> = serde_json::from_str(json).unwrap();
        assert_eq!(wrapped.decode().unwrap(), vec![1, 2, 3]);
    }
}
