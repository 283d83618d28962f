//! Quorum approval for keygate shared choices.
//!
//! Administrators publish named code snippets ("choices") to clients, but a
//! choice only becomes visible once enough administrators approve it:
//! - `submit` records a pending choice with the submitter as first approver
//! - `approve` adds an approval and promotes the choice once the count
//!   reaches the number of currently active administrators
//! - promotion moves the choice from the pending store to the published store
//!   in one atomic step
//!
//! # Catalogs
//!
//! Choices live in three independent catalogs (router, claimed methods,
//! unclaimed methods). They share the rules above but never share data or
//! locks.
//!
//! # Quorum
//!
//! The quorum is the active-administrator count read from the
//! [`AdminRoster`] on every approval. If the roster shrinks below the
//! approvals an entry already holds, the next approval (or a `recheck`)
//! promotes it.

mod config;
mod entry;
mod error;
mod roster;
pub mod store;
mod workflow;

pub use config::{ApprovalConfig, StoreConfig};
pub use entry::{ApprovalStatus, PendingEntry, PendingStatus, PublishedEntry};
pub use error::{ApprovalError, ApprovalResult, StoreError, StoreResult};
pub use roster::{AdminRoster, AdministratorRecord, FileRoster, MemoryRoster};
pub use store::{CatalogStore, ChoiceStore, MemoryCatalogStore, PendingStore, SqliteCatalogStore};
pub use workflow::ApprovalWorkflow;
