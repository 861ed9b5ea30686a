use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A ledger party identifier, opaque beyond string equality.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Party(pub String);

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Party {
    fn from(value: &str) -> Self {
        Party(value.to_string())
    }
}

impl From<String> for Party {
    fn from(value: String) -> Self {
        Party(value)
    }
}

/// An opaque ledger contract identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContractId(pub String);

impl fmt::Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ContractId {
    fn from(value: String) -> Self {
        ContractId(value)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TemplateIdError {
    #[error("template id '{0}' is not of the form pkg:Module:Entity")]
    Malformed(String),
}

/// A fully qualified template identifier, `pkg:Module:Entity`.
///
/// This is how the ledger identifies the DAML template backing a contract;
/// the relay and validator both re-derive this from each active-contract
/// entry to defensively re-filter results a query's server-side template
/// filter already claimed to apply.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TemplateId {
    pub package_id: String,
    pub module: String,
    pub entity: String,
}

impl TemplateId {
    pub fn new(package_id: impl Into<String>, module: impl Into<String>, entity: impl Into<String>) -> Self {
        Self {
            package_id: package_id.into(),
            module: module.into(),
            entity: entity.into(),
        }
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.package_id, self.module, self.entity)
    }
}

impl FromStr for TemplateId {
    type Err = TemplateIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(package_id), Some(module), Some(entity))
                if !package_id.is_empty() && !module.is_empty() && !entity.is_empty() =>
            {
                Ok(TemplateId {
                    package_id: package_id.to_string(),
                    module: module.to_string(),
                    entity: entity.to_string(),
                })
            }
            _ => Err(TemplateIdError::Malformed(s.to_string())),
        }
    }
}

impl Serialize for TemplateId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for TemplateId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        TemplateId::from_str(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_template_id() {
        let parsed: TemplateId = "abc123:Bridge.Attestation:AttestationRequest".parse().unwrap();
        assert_eq!(parsed.package_id, "abc123");
        assert_eq!(parsed.module, "Bridge.Attestation");
        assert_eq!(parsed.entity, "AttestationRequest");
    }

    #[test]
    fn rejects_missing_segments() {
        assert!("abc123:Bridge.Attestation".parse::<TemplateId>().is_err());
        assert!(":Bridge.Attestation:AttestationRequest"
            .parse::<TemplateId>()
            .is_err());
    }

    #[test]
    fn display_round_trips_through_parse() {
        let original = TemplateId::new("pkg", "Mod", "Entity");
        let text = original.to_string();
        let parsed: TemplateId = text.parse().unwrap();
        assert_eq!(original, parsed);
    }
}
