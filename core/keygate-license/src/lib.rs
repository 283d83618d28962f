//! Activation gating for keygate clients.
//!
//! A client presents its activation key; the service answers whether that
//! key has been issued. Keys are SHA-256 digests rendered as 64 hex
//! characters. How a client derives its key is not this crate's concern.
//!
//! # Key Format
//!
//! Keys are compared case-insensitively and with surrounding whitespace
//! stripped, so a key pasted from an email still matches.

mod error;
mod key;
mod registry;

pub use error::{LicenseError, LicenseResult};
pub use key::{ActivationKey, KEY_HEX_LEN};
pub use registry::{ActivationStatus, KeyRegistry};
