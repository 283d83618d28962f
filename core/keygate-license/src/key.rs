//! Activation key parsing.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{LicenseError, LicenseResult};

/// Length of a key in hex characters (a SHA-256 digest).
pub const KEY_HEX_LEN: usize = 64;

/// A well-formed activation key, normalized to upper-case hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ActivationKey(String);

impl ActivationKey {
    /// Parses a key, trimming whitespace and upper-casing it.
    pub fn parse(input: &str) -> LicenseResult<Self> {
        let key = input.trim();
        if key.len() != KEY_HEX_LEN {
            return Err(LicenseError::InvalidKeyFormat(format!(
                "expected {KEY_HEX_LEN} hex characters, got {}",
                key.len()
            )));
        }
        if let Some(bad) = key.chars().find(|c| !c.is_ascii_hexdigit()) {
            return Err(LicenseError::InvalidKeyFormat(format!(
                "unexpected character {bad:?}"
            )));
        }
        Ok(Self(key.to_ascii_uppercase()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActivationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ActivationKey {
    type Err = LicenseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ActivationKey {
    type Error = LicenseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ActivationKey> for String {
    fn from(key: ActivationKey) -> Self {
        key.0
    }
}
