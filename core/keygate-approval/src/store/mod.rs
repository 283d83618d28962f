//! Persistence contract for pending and published choices.
//!
//! Each catalog gets its own store instance. A store must make a write
//! visible to the next read in the same process, and `promote` must publish
//! and drop the pending record as one unit.

mod memory;
mod sqlite;

use keygate_types::Catalog;
use std::collections::BTreeMap;

use crate::entry::{PendingEntry, PublishedEntry};
use crate::error::StoreResult;

pub use memory::MemoryCatalogStore;
pub use sqlite::SqliteCatalogStore;

/// Choices awaiting quorum.
pub trait PendingStore: Send + Sync {
    fn get_pending(&self, name: &str) -> StoreResult<Option<PendingEntry>>;

    /// Inserts or replaces the pending record for `name`.
    fn put_pending(&self, name: &str, entry: &PendingEntry) -> StoreResult<()>;

    /// Removes the record. Returns false if there was none.
    fn delete_pending(&self, name: &str) -> StoreResult<bool>;

    fn list_pending(&self) -> StoreResult<BTreeMap<String, PendingEntry>>;
}

/// Choices visible to clients.
pub trait ChoiceStore: Send + Sync {
    fn get_published(&self, name: &str) -> StoreResult<Option<PublishedEntry>>;

    /// Inserts or replaces the published record for `name`.
    fn put_published(&self, name: &str, entry: &PublishedEntry) -> StoreResult<()>;

    /// Removes the record. Returns false if there was none.
    fn delete_published(&self, name: &str) -> StoreResult<bool>;

    fn list_published(&self) -> StoreResult<BTreeMap<String, PublishedEntry>>;
}

/// The pending/published pair backing one catalog.
pub trait CatalogStore: PendingStore + ChoiceStore {
    /// The catalog this instance holds.
    fn catalog(&self) -> Catalog;

    /// Publishes `entry` under `name` and deletes the pending record.
    ///
    /// Fails without changing either side if `name` has no pending record or
    /// is already published.
    fn promote(&self, name: &str, entry: &PublishedEntry) -> StoreResult<()>;
}
