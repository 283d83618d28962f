//! Shared test helpers for approval tests.

#![allow(dead_code)]

use keygate_approval::{
    ApprovalWorkflow, CatalogStore, ChoiceStore, MemoryCatalogStore, MemoryRoster, PendingEntry,
    PendingStore, PublishedEntry, StoreError, StoreResult,
};
use keygate_types::{AdminId, Catalog};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub type MemoryWorkflow = ApprovalWorkflow<MemoryCatalogStore, Arc<MemoryRoster>>;

/// Installs a tracing subscriber once per test binary. Honors `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn admin(id: &str) -> AdminId {
    AdminId::new(id).unwrap()
}

/// Roster with the given administrators all active.
pub fn roster(ids: &[&str]) -> Arc<MemoryRoster> {
    Arc::new(MemoryRoster::with_active(ids.iter().map(|id| admin(id))))
}

/// In-memory workflow over a shared roster handle.
pub fn memory_workflow(roster: Arc<MemoryRoster>) -> MemoryWorkflow {
    init_tracing();
    ApprovalWorkflow::with_stores(roster, |c| Ok(MemoryCatalogStore::new(c))).unwrap()
}

/// Memory store whose `promote` can be switched to fail.
pub struct FlakyStore {
    inner: MemoryCatalogStore,
    fail_promote: AtomicBool,
}

impl FlakyStore {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            inner: MemoryCatalogStore::new(catalog),
            fail_promote: AtomicBool::new(false),
        }
    }

    pub fn set_fail_promote(&self, fail: bool) {
        self.fail_promote.store(fail, Ordering::SeqCst);
    }
}

impl PendingStore for FlakyStore {
    fn get_pending(&self, name: &str) -> StoreResult<Option<PendingEntry>> {
        self.inner.get_pending(name)
    }

    fn put_pending(&self, name: &str, entry: &PendingEntry) -> StoreResult<()> {
        self.inner.put_pending(name, entry)
    }

    fn delete_pending(&self, name: &str) -> StoreResult<bool> {
        self.inner.delete_pending(name)
    }

    fn list_pending(&self) -> StoreResult<BTreeMap<String, PendingEntry>> {
        self.inner.list_pending()
    }
}

impl ChoiceStore for FlakyStore {
    fn get_published(&self, name: &str) -> StoreResult<Option<PublishedEntry>> {
        self.inner.get_published(name)
    }

    fn put_published(&self, name: &str, entry: &PublishedEntry) -> StoreResult<()> {
        self.inner.put_published(name, entry)
    }

    fn delete_published(&self, name: &str) -> StoreResult<bool> {
        self.inner.delete_published(name)
    }

    fn list_published(&self) -> StoreResult<BTreeMap<String, PublishedEntry>> {
        self.inner.list_published()
    }
}

impl CatalogStore for FlakyStore {
    fn catalog(&self) -> Catalog {
        self.inner.catalog()
    }

    fn promote(&self, name: &str, entry: &PublishedEntry) -> StoreResult<()> {
        if self.fail_promote.load(Ordering::SeqCst) {
            return Err(StoreError::Io(std::io::Error::other("disk unplugged")));
        }
        self.inner.promote(name, entry)
    }
}
