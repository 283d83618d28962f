//! In-process catalog store.

use keygate_types::Catalog;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use super::{CatalogStore, ChoiceStore, PendingStore};
use crate::entry::{PendingEntry, PublishedEntry};
use crate::error::{StoreError, StoreResult};

#[derive(Debug, Default)]
struct Tables {
    pending: BTreeMap<String, PendingEntry>,
    published: BTreeMap<String, PublishedEntry>,
}

/// Catalog store held entirely in memory. Both maps sit behind one mutex so
/// promotion is a single critical section.
#[derive(Debug)]
pub struct MemoryCatalogStore {
    catalog: Catalog,
    tables: Mutex<Tables>,
}

impl MemoryCatalogStore {
    #[must_use]
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            tables: Mutex::new(Tables::default()),
        }
    }

    fn tables(&self) -> StoreResult<MutexGuard<'_, Tables>> {
        self.tables.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

impl PendingStore for MemoryCatalogStore {
    fn get_pending(&self, name: &str) -> StoreResult<Option<PendingEntry>> {
        Ok(self.tables()?.pending.get(name).cloned())
    }

    fn put_pending(&self, name: &str, entry: &PendingEntry) -> StoreResult<()> {
        self.tables()?.pending.insert(name.to_string(), entry.clone());
        Ok(())
    }

    fn delete_pending(&self, name: &str) -> StoreResult<bool> {
        Ok(self.tables()?.pending.remove(name).is_some())
    }

    fn list_pending(&self) -> StoreResult<BTreeMap<String, PendingEntry>> {
        Ok(self.tables()?.pending.clone())
    }
}

impl ChoiceStore for MemoryCatalogStore {
    fn get_published(&self, name: &str) -> StoreResult<Option<PublishedEntry>> {
        Ok(self.tables()?.published.get(name).cloned())
    }

    fn put_published(&self, name: &str, entry: &PublishedEntry) -> StoreResult<()> {
        self.tables()?.published.insert(name.to_string(), entry.clone());
        Ok(())
    }

    fn delete_published(&self, name: &str) -> StoreResult<bool> {
        Ok(self.tables()?.published.remove(name).is_some())
    }

    fn list_published(&self) -> StoreResult<BTreeMap<String, PublishedEntry>> {
        Ok(self.tables()?.published.clone())
    }
}

impl CatalogStore for MemoryCatalogStore {
    fn catalog(&self) -> Catalog {
        self.catalog
    }

    fn promote(&self, name: &str, entry: &PublishedEntry) -> StoreResult<()> {
        let mut tables = self.tables()?;
        if tables.published.contains_key(name) {
            return Err(StoreError::InvalidData(format!(
                "{name} is already published in {}",
                self.catalog
            )));
        }
        if tables.pending.remove(name).is_none() {
            return Err(StoreError::InvalidData(format!(
                "{name} has no pending record in {}",
                self.catalog
            )));
        }
        tables.published.insert(name.to_string(), entry.clone());
        Ok(())
    }
}
