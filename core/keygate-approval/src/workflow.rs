//! The quorum approval workflow.
//!
//! One algorithm serves every catalog. Each catalog has its own store and its
//! own table of entry locks; operations on the same (catalog, name) run one at
//! a time, everything else runs in parallel.

use keygate_types::{AdminId, Catalog};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

use crate::config::ApprovalConfig;
use crate::entry::{ApprovalStatus, PendingEntry, PendingStatus};
use crate::error::{ApprovalError, ApprovalResult, StoreError, StoreResult};
use crate::roster::{AdminRoster, FileRoster};
use crate::store::{CatalogStore, SqliteCatalogStore};

/// Per-name mutexes for one catalog, created on demand.
#[derive(Default)]
struct EntryLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl EntryLocks {
    /// Runs `f` while holding the lock for `name`.
    fn with_entry<T>(&self, name: &str, f: impl FnOnce() -> T) -> T {
        let handle = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            EntryHandle {
                locks: self,
                name,
                lock: Arc::clone(locks.entry(name.to_string()).or_default()),
            }
        };

        // The mutex guards no data, so a poisoned lock is still usable.
        let _guard = handle.lock.lock().unwrap_or_else(PoisonError::into_inner);
        f()
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// A caller's clone of one entry lock. Dropping it prunes the map entry,
/// also when the closure run under the lock unwinds.
struct EntryHandle<'a> {
    locks: &'a EntryLocks,
    name: &'a str,
    lock: Arc<Mutex<()>>,
}

impl Drop for EntryHandle<'_> {
    fn drop(&mut self) {
        // Clones are only handed out under the map lock, so a count of two
        // (map + ours) means nobody else holds or waits on this entry.
        let mut locks = self.locks.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if Arc::strong_count(&self.lock) == 2 {
            locks.remove(self.name);
        }
    }
}

struct CatalogSlot<S> {
    store: S,
    locks: EntryLocks,
}

/// Multi-administrator approval for shared choices.
pub struct ApprovalWorkflow<S, R> {
    catalogs: [CatalogSlot<S>; 3],
    roster: R,
}

impl<S: CatalogStore, R: AdminRoster> ApprovalWorkflow<S, R> {
    /// Builds a workflow from one store per catalog.
    ///
    /// Fails if a store reports a different catalog than the slot it is
    /// mounted in.
    pub fn new(roster: R, router: S, claimed: S, unclaimed: S) -> ApprovalResult<Self> {
        let stores = [router, claimed, unclaimed];
        for (expected, store) in Catalog::ALL.iter().zip(&stores) {
            if store.catalog() != *expected {
                return Err(StoreError::InvalidData(format!(
                    "{} store mounted as {expected}",
                    store.catalog()
                ))
                .into());
            }
        }
        let catalogs = stores.map(|store| CatalogSlot {
            store,
            locks: EntryLocks::default(),
        });
        Ok(Self { catalogs, roster })
    }

    /// Builds a workflow, opening each catalog's store with `open`.
    pub fn with_stores(
        roster: R,
        mut open: impl FnMut(Catalog) -> StoreResult<S>,
    ) -> ApprovalResult<Self> {
        let router = open(Catalog::Router)?;
        let claimed = open(Catalog::Claimed)?;
        let unclaimed = open(Catalog::Unclaimed)?;
        Self::new(roster, router, claimed, unclaimed)
    }

    /// The roster quorum is read from.
    pub fn roster(&self) -> &R {
        &self.roster
    }

    /// The store backing `catalog`.
    pub fn store(&self, catalog: Catalog) -> &S {
        &self.slot(catalog).store
    }

    fn slot(&self, catalog: Catalog) -> &CatalogSlot<S> {
        &self.catalogs[catalog.index()]
    }

    /// Submits a new choice for approval. The submitter's approval is
    /// recorded immediately.
    pub fn submit(
        &self,
        catalog: Catalog,
        name: &str,
        payload: impl Into<String>,
        submitter: &AdminId,
    ) -> ApprovalResult<()> {
        validate_name(name)?;
        let slot = self.slot(catalog);
        slot.locks.with_entry(name, || {
            // Pending and published names share one namespace.
            if slot.store.get_pending(name)?.is_some()
                || slot.store.get_published(name)?.is_some()
            {
                return Err(ApprovalError::AlreadyPending {
                    catalog,
                    name: name.to_string(),
                });
            }

            let entry = PendingEntry::new(payload, submitter.clone());
            slot.store.put_pending(name, &entry).inspect_err(|e| {
                warn!("Failed to store pending choice {}/{}: {}", catalog, name, e);
            })?;
            info!("Choice {}/{} submitted by {}", catalog, name, submitter);
            Ok(())
        })
    }

    /// Records `approver`'s approval and promotes the entry once the live
    /// quorum is met.
    pub fn approve(
        &self,
        catalog: Catalog,
        name: &str,
        approver: &AdminId,
    ) -> ApprovalResult<ApprovalStatus> {
        let slot = self.slot(catalog);
        slot.locks.with_entry(name, || {
            let mut entry = Self::load_pending(slot, catalog, name)?;
            if !entry.add_approver(approver.clone()) {
                return Err(ApprovalError::AlreadyApproved {
                    name: name.to_string(),
                    approver: approver.clone(),
                });
            }

            let quorum = self.roster.active_count()?;
            debug!(
                "Choice {}/{} approved by {} ({}/{})",
                catalog,
                name,
                approver,
                entry.approval_count(),
                quorum
            );
            Self::settle(slot, catalog, name, &entry, quorum, true)
        })
    }

    /// Re-evaluates a pending entry against the current roster without
    /// adding an approval. Promotes it if the quorum has dropped to or below
    /// its approval count.
    pub fn recheck(&self, catalog: Catalog, name: &str) -> ApprovalResult<ApprovalStatus> {
        let slot = self.slot(catalog);
        slot.locks.with_entry(name, || {
            let entry = Self::load_pending(slot, catalog, name)?;
            let quorum = self.roster.active_count()?;
            Self::settle(slot, catalog, name, &entry, quorum, false)
        })
    }

    /// Withdraws a pending entry and returns it.
    pub fn cancel(&self, catalog: Catalog, name: &str) -> ApprovalResult<PendingEntry> {
        let slot = self.slot(catalog);
        slot.locks.with_entry(name, || {
            let entry = Self::load_pending(slot, catalog, name)?;
            slot.store.delete_pending(name)?;
            info!("Choice {}/{} cancelled", catalog, name);
            Ok(entry)
        })
    }

    /// Approval progress for every pending entry in `catalog`.
    pub fn pending_status(&self, catalog: Catalog) -> ApprovalResult<BTreeMap<String, PendingStatus>> {
        let pending = self.slot(catalog).store.list_pending()?;
        let quorum = self.roster.active_count()?;
        Ok(pending
            .into_iter()
            .map(|(name, entry)| {
                let status = PendingStatus {
                    approval_count: entry.approval_count(),
                    remaining: entry.remaining(quorum),
                };
                (name, status)
            })
            .collect())
    }

    /// A single pending entry, if any.
    pub fn get_pending(&self, catalog: Catalog, name: &str) -> ApprovalResult<Option<PendingEntry>> {
        Ok(self.slot(catalog).store.get_pending(name)?)
    }

    /// Every published choice in `catalog`, name to payload.
    pub fn list_published(&self, catalog: Catalog) -> ApprovalResult<BTreeMap<String, String>> {
        let published = self.slot(catalog).store.list_published()?;
        Ok(published
            .into_iter()
            .map(|(name, entry)| (name, entry.into_payload()))
            .collect())
    }

    /// The published payload for `name`, if any.
    pub fn get_published(&self, catalog: Catalog, name: &str) -> ApprovalResult<Option<String>> {
        let entry = self.slot(catalog).store.get_published(name)?;
        Ok(entry.map(|e| e.into_payload()))
    }

    fn load_pending(
        slot: &CatalogSlot<S>,
        catalog: Catalog,
        name: &str,
    ) -> ApprovalResult<PendingEntry> {
        slot.store
            .get_pending(name)?
            .ok_or_else(|| ApprovalError::NotFound {
                catalog,
                name: name.to_string(),
            })
    }

    /// Promotes `entry` if it meets `quorum`; otherwise writes it back when
    /// `persist` is set and reports what is missing.
    fn settle(
        slot: &CatalogSlot<S>,
        catalog: Catalog,
        name: &str,
        entry: &PendingEntry,
        quorum: usize,
        persist: bool,
    ) -> ApprovalResult<ApprovalStatus> {
        if entry.is_satisfied(quorum) {
            slot.store.promote(name, &entry.to_published()).inspect_err(|e| {
                warn!("Failed to promote choice {}/{}: {}", catalog, name, e);
            })?;
            info!(
                "Choice {}/{} promoted with {} approvals (quorum {})",
                catalog,
                name,
                entry.approval_count(),
                quorum
            );
            return Ok(ApprovalStatus::Promoted);
        }

        if persist {
            slot.store.put_pending(name, entry).inspect_err(|e| {
                warn!("Failed to store approval for {}/{}: {}", catalog, name, e);
            })?;
        }
        Ok(ApprovalStatus::Pending {
            remaining: entry.remaining(quorum),
        })
    }
}

impl ApprovalWorkflow<SqliteCatalogStore, FileRoster> {
    /// Opens a durable workflow: SQLite stores plus a JSON roster file.
    ///
    /// Fails if the roster file cannot be read, so a mistyped path is caught
    /// before any approval runs against it.
    pub fn open(config: &ApprovalConfig) -> ApprovalResult<Self> {
        let roster = FileRoster::new(config.roster_path.clone());
        let active = roster.active_count().inspect_err(|e| {
            warn!("Cannot read roster {}: {}", roster.path().display(), e);
        })?;
        info!("Roster {} has {} active administrators", roster.path().display(), active);
        Self::with_stores(roster, |catalog| {
            SqliteCatalogStore::open(&config.store, catalog)
        })
    }
}

fn validate_name(name: &str) -> ApprovalResult<()> {
    if name.trim().is_empty() || name.chars().any(char::is_control) {
        return Err(ApprovalError::InvalidName(name.to_string()));
    }
    Ok(())
}
