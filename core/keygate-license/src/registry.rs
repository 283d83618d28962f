//! The set of issued activation keys.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info};

use crate::error::{LicenseError, LicenseResult};
use crate::key::ActivationKey;

/// Whether a client may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationStatus {
    /// The key has been issued.
    Activated,
    /// Unknown, revoked, or malformed key.
    NotActivated,
}

impl ActivationStatus {
    /// Returns true if the client may run.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        matches!(self, Self::Activated)
    }
}

/// Issued activation keys.
///
/// Serializes as a plain JSON array of key strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct KeyRegistry {
    keys: BTreeSet<ActivationKey>,
}

impl KeyRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from key strings, failing on the first malformed one.
    pub fn from_keys<I, S>(keys: I) -> LicenseResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keys = keys
            .into_iter()
            .map(|k| ActivationKey::parse(k.as_ref()))
            .collect::<LicenseResult<BTreeSet<_>>>()?;
        Ok(Self { keys })
    }

    /// Parses a JSON array of key strings.
    pub fn from_json_str(json: &str) -> LicenseResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Issues a key. Returns false if it was already issued.
    pub fn issue(&mut self, key: ActivationKey) -> bool {
        let added = self.keys.insert(key);
        if added {
            info!("Activation key issued ({} total)", self.keys.len());
        }
        added
    }

    /// Revokes a key. Returns false if it was not issued.
    pub fn revoke(&mut self, key: &ActivationKey) -> bool {
        let removed = self.keys.remove(key);
        if removed {
            info!("Activation key revoked ({} remaining)", self.keys.len());
        }
        removed
    }

    #[must_use]
    pub fn contains(&self, key: &ActivationKey) -> bool {
        self.keys.contains(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Checks a key presented by a client. Malformed input is simply not
    /// activated.
    #[must_use]
    pub fn verify(&self, presented: &str) -> ActivationStatus {
        match ActivationKey::parse(presented) {
            Ok(key) if self.keys.contains(&key) => ActivationStatus::Activated,
            Ok(_) => {
                debug!("Activation rejected: key not issued");
                ActivationStatus::NotActivated
            }
            Err(e) => {
                debug!("Activation rejected: {}", e);
                ActivationStatus::NotActivated
            }
        }
    }
}

impl TryFrom<Vec<String>> for KeyRegistry {
    type Error = LicenseError;

    fn try_from(keys: Vec<String>) -> Result<Self, Self::Error> {
        Self::from_keys(keys)
    }
}

impl From<KeyRegistry> for Vec<String> {
    fn from(registry: KeyRegistry) -> Self {
        registry.keys.into_iter().map(String::from).collect()
    }
}
