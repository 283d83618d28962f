//! Administrator roster: the source of the live quorum size.
//!
//! The workflow asks the roster for its active count on every approval, so
//! implementations must answer from current state and never from a value
//! computed earlier.

use keygate_types::AdminId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::error::{StoreError, StoreResult};

/// Supplies the number of active administrators.
pub trait AdminRoster: Send + Sync {
    /// Counts administrators whose `active` flag is set.
    fn active_count(&self) -> StoreResult<usize>;
}

impl<T: AdminRoster + ?Sized> AdminRoster for Arc<T> {
    fn active_count(&self) -> StoreResult<usize> {
        (**self).active_count()
    }
}

/// One administrator and whether they currently count toward quorum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdministratorRecord {
    pub id: AdminId,
    pub active: bool,
}

/// In-process roster.
#[derive(Debug, Default)]
pub struct MemoryRoster {
    admins: RwLock<BTreeMap<AdminId, bool>>,
}

impl MemoryRoster {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a roster where every given administrator is active.
    #[must_use]
    pub fn with_active(ids: impl IntoIterator<Item = AdminId>) -> Self {
        let admins = ids.into_iter().map(|id| (id, true)).collect();
        Self {
            admins: RwLock::new(admins),
        }
    }

    /// Adds or replaces an administrator. Returns true if the id was new.
    pub fn register(&self, id: AdminId, active: bool) -> StoreResult<bool> {
        let mut admins = self.admins.write().map_err(|_| StoreError::LockPoisoned)?;
        Ok(admins.insert(id, active).is_none())
    }

    /// Flips an administrator's flag. Returns false if the id is unknown.
    pub fn set_active(&self, id: &AdminId, active: bool) -> StoreResult<bool> {
        let mut admins = self.admins.write().map_err(|_| StoreError::LockPoisoned)?;
        match admins.get_mut(id) {
            Some(flag) => {
                *flag = active;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Removes an administrator. Returns false if the id is unknown.
    pub fn remove(&self, id: &AdminId) -> StoreResult<bool> {
        let mut admins = self.admins.write().map_err(|_| StoreError::LockPoisoned)?;
        Ok(admins.remove(id).is_some())
    }

    /// Snapshot of every registered administrator, ordered by id.
    pub fn records(&self) -> StoreResult<Vec<AdministratorRecord>> {
        let admins = self.admins.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(admins
            .iter()
            .map(|(id, active)| AdministratorRecord {
                id: id.clone(),
                active: *active,
            })
            .collect())
    }
}

impl AdminRoster for MemoryRoster {
    fn active_count(&self) -> StoreResult<usize> {
        let admins = self.admins.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(admins.values().filter(|active| **active).count())
    }
}

/// Roster kept in a JSON file, re-read on every query.
///
/// The file holds an array of [`AdministratorRecord`]s. Duplicate ids count
/// once. A missing file is an error, not an empty roster.
#[derive(Debug, Clone)]
pub struct FileRoster {
    path: PathBuf,
}

impl FileRoster {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the roster file.
    pub fn load(&self) -> StoreResult<Vec<AdministratorRecord>> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(Vec::new()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::RosterMissing(self.path.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Overwrites the roster file.
    pub fn save(&self, records: &[AdministratorRecord]) -> StoreResult<()> {
        let json = serde_json::to_string_pretty(records)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

impl AdminRoster for FileRoster {
    fn active_count(&self) -> StoreResult<usize> {
        let active: BTreeSet<AdminId> = self
            .load()?
            .into_iter()
            .filter(|r| r.active)
            .map(|r| r.id)
            .collect();
        Ok(active.len())
    }
}
