//! Core type definitions for keygate.
//!
//! This crate defines the identifiers shared by the approval core and the
//! activation service:
//! - Administrator identities (opaque, pre-established strings)
//! - Choice catalog tags (router, claimed methods, unclaimed methods)

mod catalog;
mod ids;

pub use catalog::Catalog;
pub use ids::AdminId;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unknown catalog: {0}")]
    UnknownCatalog(String),

    #[error("administrator id must not be empty")]
    EmptyAdminId,
}
