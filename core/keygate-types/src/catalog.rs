//! Choice catalogs.
//!
//! Each catalog is an independent namespace of choices with its own pending
//! and published stores. All catalogs follow the same approval rules.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Which choice namespace an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Catalog {
    /// Router choices.
    Router,
    /// Claimed-method choices.
    Claimed,
    /// Unclaimed-method choices.
    Unclaimed,
}

impl Catalog {
    /// Every catalog, in index order.
    pub const ALL: [Catalog; 3] = [Catalog::Router, Catalog::Claimed, Catalog::Unclaimed];

    /// Stable short name, used as the partition key in storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Router => "router",
            Self::Claimed => "claimed",
            Self::Unclaimed => "unclaimed",
        }
    }

    /// Dense index into per-catalog arrays.
    #[must_use]
    pub const fn index(&self) -> usize {
        match self {
            Self::Router => 0,
            Self::Claimed => 1,
            Self::Unclaimed => 2,
        }
    }
}

impl fmt::Display for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Catalog {
    type Err = Error;

    /// Accepts the short names as well as the `-methods` spellings used by
    /// older clients (`claimed-methods`, `unclaimed_methods`).
    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "router" => Ok(Self::Router),
            "claimed" | "claimed-methods" => Ok(Self::Claimed),
            "unclaimed" | "unclaimed-methods" => Ok(Self::Unclaimed),
            _ => Err(Error::UnknownCatalog(s.to_string())),
        }
    }
}
