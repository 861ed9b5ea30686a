use serde::{Deserialize, Serialize};
use std::ops::{Deref, DerefMut};
use std::str::FromStr;

/// A transparent wrapper that resolves environment variables during
/// deserialization.
///
/// Supports both literal values and environment variable references:
/// - Literal: `"eip155:8453"`
/// - Simple env var: `"$HSM_KEY_ID"`
/// - Braced env var: `"${HSM_KEY_ID}"`
///
/// Every secret-shaped config field (HSM key id, ledger bearer token, RPC
/// URLs with embedded API keys) goes through this wrapper so operators can
/// choose between baking a value into the config file or keeping it in the
/// process environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralOrEnv<T>(T);

impl<T> LiteralOrEnv<T> {
    pub fn inner(&self) -> &T {
        &self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }

    fn parse_env_var_syntax(s: &str) -> Option<String> {
        if let Some(stripped) = s.strip_prefix("${") {
            stripped.strip_suffix('}').map(|s| s.to_string())
        } else if let Some(var_name) = s.strip_prefix('$') {
            if !var_name.is_empty() && var_name.chars().all(|c| c.is_alphanumeric() || c == '_') {
                Some(var_name.to_string())
            } else {
                None
            }
        } else {
            None
        }
    }
}

impl<T> Deref for LiteralOrEnv<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> DerefMut for LiteralOrEnv<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<'de, T> Deserialize<'de> for LiteralOrEnv<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let value = if let Some(var_name) = Self::parse_env_var_syntax(&s) {
            std::env::var(&var_name).map_err(|_| {
                serde::de::Error::custom(format!(
                    "environment variable '{var_name}' not found (referenced as '{s}')"
                ))
            })?
        } else {
            s
        };
        let parsed = value
            .parse::<T>()
            .map_err(|e| serde::de::Error::custom(format!("failed to parse value: {e}")))?;
        Ok(LiteralOrEnv(parsed))
    }
}

impl<T> Serialize for LiteralOrEnv<T>
where
    T: Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_braced_env_var() {
        // SAFETY: test-only, single-threaded access to this var name.
        unsafe {
            std::env::set_var("BRIDGE_TEST_LITERAL_OR_ENV", "42");
        }
        let wrapped: LiteralOrEnv<u64> = serde_json::from_str("\"${BRIDGE_TEST_LITERAL_OR_ENV}\"")
            .expect("should resolve env var");
        assert_eq!(*wrapped, 42);
        unsafe {
            std::env::remove_var("BRIDGE_TEST_LITERAL_OR_ENV");
        }
    }

    #[test]
    fn accepts_literal_value() {
        let wrapped: LiteralOrEnv<u64> =
            serde_json::from_str("\"7\"").expect("literal should parse directly");
        assert_eq!(*wrapped, 7);
    }

    #[test]
    fn missing_env_var_is_an_error() {
        let result: Result<LiteralOrEnv<u64>, _> =
            serde_json::from_str("\"$BRIDGE_TEST_DOES_NOT_EXIST\"");
        assert!(result.is_err());
    }
}
