//! Template allowlist: the validator only queries and signs templates whose
//! qualified id is explicitly configured, guarding against signing arbitrary
//! new templates that happen to share the attestation field names.

use bridge_types::TemplateId;
use std::collections::HashSet;
use std::str::FromStr;

#[derive(Debug, thiserror::Error)]
pub enum AllowlistError {
    #[error("template allowlist entry '{0}' is not of the form pkg:Module:Entity")]
    MalformedEntry(String),
    #[error("template allowlist is empty; the validator would never sign anything")]
    Empty,
}

#[derive(Debug, Clone)]
pub struct TemplateAllowlist {
    allowed: HashSet<TemplateId>,
}

impl TemplateAllowlist {
    /// Parses a comma-separated list of `pkg:Module:Entity` ids.
    pub fn parse(raw: &str) -> Result<Self, AllowlistError> {
        let mut allowed = HashSet::new();
        for entry in raw.split(',') {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            let template_id =
                TemplateId::from_str(entry).map_err(|_| AllowlistError::MalformedEntry(entry.to_string()))?;
            allowed.insert(template_id);
        }
        if allowed.is_empty() {
            return Err(AllowlistError::Empty);
        }
        Ok(Self { allowed })
    }

    pub fn contains(&self, template_id: &TemplateId) -> bool {
        self.allowed.contains(template_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TemplateId> {
        self.allowed.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comma_separated_entries() {
        let allowlist = TemplateAllowlist::parse("pkg:Bridge.Attestation:AttestationRequest, pkg:Bridge.Attestation:ValidatorSignature").unwrap();
        assert!(allowlist.contains(&TemplateId::new("pkg", "Bridge.Attestation", "AttestationRequest")));
        assert!(allowlist.contains(&TemplateId::new("pkg", "Bridge.Attestation", "ValidatorSignature")));
        assert!(!allowlist.contains(&TemplateId::new("pkg", "Bridge.Attestation", "SomethingElse")));
    }

    #[test]
    fn rejects_empty_allowlist() {
        assert!(matches!(TemplateAllowlist::parse(""), Err(AllowlistError::Empty)));
        assert!(matches!(TemplateAllowlist::parse("  ,  "), Err(AllowlistError::Empty)));
    }

    #[test]
    fn rejects_malformed_entry() {
        assert!(matches!(
            TemplateAllowlist::parse("not-a-template-id"),
            Err(AllowlistError::MalformedEntry(_))
        ));
    }
}
