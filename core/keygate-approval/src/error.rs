//! Error types for the approval workflow and its stores.

use keygate_types::{AdminId, Catalog};
use std::path::PathBuf;
use thiserror::Error;

/// Result type for store and roster operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for workflow operations.
pub type ApprovalResult<T> = Result<T, ApprovalError>;

/// Errors raised by persistence backends and roster sources.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error (file system).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The roster file does not exist.
    #[error("roster file not found: {}", .0.display())]
    RosterMissing(PathBuf),

    /// Stored data violates an invariant.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// A store mutex was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    LockPoisoned,
}

/// Errors returned by [`ApprovalWorkflow`](crate::ApprovalWorkflow) operations.
#[derive(Debug, Error)]
pub enum ApprovalError {
    /// The name is already pending or published in this catalog.
    #[error("choice '{name}' already exists in the {catalog} catalog")]
    AlreadyPending { catalog: Catalog, name: String },

    /// No pending entry with this name (never submitted, or already promoted).
    #[error("no pending choice '{name}' in the {catalog} catalog")]
    NotFound { catalog: Catalog, name: String },

    /// The administrator has already approved this entry.
    #[error("{approver} already approved choice '{name}'")]
    AlreadyApproved { name: String, approver: AdminId },

    /// Choice names must be non-blank.
    #[error("invalid choice name: {0:?}")]
    InvalidName(String),

    /// Persistence or roster failure.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
