//! SQLite-backed catalog store.
//!
//! Every catalog opens its own connection. Opened from a [`StoreConfig`],
//! each catalog also gets its own database file, so a write transaction in
//! one catalog never holds a lock another catalog waits on. Rows carry a
//! `catalog` column as well, so stores opened on one explicit path stay
//! partitioned.

use chrono::{DateTime, Utc};
use keygate_types::{AdminId, Catalog};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use super::{CatalogStore, ChoiceStore, PendingStore};
use crate::config::StoreConfig;
use crate::entry::{PendingEntry, PublishedEntry};
use crate::error::{StoreError, StoreResult};

type PendingRow = (String, String, String, i64, String);

/// Durable catalog store backed by SQLite.
pub struct SqliteCatalogStore {
    catalog: Catalog,
    conn: Mutex<Connection>,
}

impl SqliteCatalogStore {
    /// Opens the store described by `config` in the catalog's own file;
    /// no path means in-memory.
    pub fn open(config: &StoreConfig, catalog: Catalog) -> StoreResult<Self> {
        let conn = match config.catalog_path(catalog) {
            Some(path) => Connection::open(path)?,
            None => Connection::open_in_memory()?,
        };
        conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
        Self::from_connection(conn, catalog)
    }

    /// Opens (or creates) a store at exactly the given path.
    pub fn open_path(path: impl AsRef<Path>, catalog: Catalog) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_millis(StoreConfig::default().busy_timeout_ms))?;
        Self::from_connection(conn, catalog)
    }

    /// Opens an in-memory store (for testing).
    pub fn open_in_memory(catalog: Catalog) -> StoreResult<Self> {
        Self::open(&StoreConfig::default(), catalog)
    }

    fn from_connection(conn: Connection, catalog: Catalog) -> StoreResult<Self> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS pending_choices (
                catalog TEXT NOT NULL,
                name TEXT NOT NULL,
                payload TEXT NOT NULL,
                submitter TEXT NOT NULL,
                approvers TEXT NOT NULL,
                approval_count INTEGER NOT NULL,
                submitted_at TEXT NOT NULL,
                PRIMARY KEY (catalog, name)
            );

            CREATE TABLE IF NOT EXISTS published_choices (
                catalog TEXT NOT NULL,
                name TEXT NOT NULL,
                payload TEXT NOT NULL,
                PRIMARY KEY (catalog, name)
            );
            ",
        )?;
        Ok(Self {
            catalog,
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

fn decode_pending(row: PendingRow) -> StoreResult<PendingEntry> {
    let (payload, submitter, approvers_json, count, submitted_at) = row;
    let submitter = AdminId::new(submitter)
        .map_err(|e| StoreError::InvalidData(format!("bad submitter: {e}")))?;
    let approvers: BTreeSet<AdminId> = serde_json::from_str(&approvers_json)?;
    let count = usize::try_from(count)
        .map_err(|_| StoreError::InvalidData(format!("negative approval count {count}")))?;
    let submitted_at = DateTime::parse_from_rfc3339(&submitted_at)
        .map_err(|e| StoreError::InvalidData(format!("bad submitted_at: {e}")))?
        .with_timezone(&Utc);
    PendingEntry::from_parts(payload, submitter, approvers, count, submitted_at)
}

impl PendingStore for SqliteCatalogStore {
    fn get_pending(&self, name: &str) -> StoreResult<Option<PendingEntry>> {
        let conn = self.conn()?;
        let row: Option<PendingRow> = conn
            .query_row(
                "SELECT payload, submitter, approvers, approval_count, submitted_at
                 FROM pending_choices WHERE catalog = ?1 AND name = ?2",
                params![self.catalog.as_str(), name],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
            )
            .optional()?;
        row.map(decode_pending).transpose()
    }

    fn put_pending(&self, name: &str, entry: &PendingEntry) -> StoreResult<()> {
        let approvers = serde_json::to_string(entry.approvers())?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO pending_choices
                (catalog, name, payload, submitter, approvers, approval_count, submitted_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                self.catalog.as_str(),
                name,
                entry.payload(),
                entry.submitter().as_str(),
                approvers,
                entry.approval_count() as i64,
                entry.submitted_at().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn delete_pending(&self, name: &str) -> StoreResult<bool> {
        let conn = self.conn()?;
        let removed = conn.execute(
            "DELETE FROM pending_choices WHERE catalog = ?1 AND name = ?2",
            params![self.catalog.as_str(), name],
        )?;
        Ok(removed > 0)
    }

    fn list_pending(&self) -> StoreResult<BTreeMap<String, PendingEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT name, payload, submitter, approvers, approval_count, submitted_at
             FROM pending_choices WHERE catalog = ?1",
        )?;
        let rows = stmt.query_map(params![self.catalog.as_str()], |row| {
            let name: String = row.get(0)?;
            let fields: PendingRow =
                (row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?, row.get(5)?);
            Ok((name, fields))
        })?;

        let mut result = BTreeMap::new();
        for row in rows {
            let (name, fields) = row?;
            result.insert(name, decode_pending(fields)?);
        }
        Ok(result)
    }
}

impl ChoiceStore for SqliteCatalogStore {
    fn get_published(&self, name: &str) -> StoreResult<Option<PublishedEntry>> {
        let conn = self.conn()?;
        let payload: Option<String> = conn
            .query_row(
                "SELECT payload FROM published_choices WHERE catalog = ?1 AND name = ?2",
                params![self.catalog.as_str(), name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(payload.map(PublishedEntry::new))
    }

    fn put_published(&self, name: &str, entry: &PublishedEntry) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO published_choices (catalog, name, payload) VALUES (?1, ?2, ?3)",
            params![self.catalog.as_str(), name, entry.payload()],
        )?;
        Ok(())
    }

    fn delete_published(&self, name: &str) -> StoreResult<bool> {
        let conn = self.conn()?;
        let removed = conn.execute(
            "DELETE FROM published_choices WHERE catalog = ?1 AND name = ?2",
            params![self.catalog.as_str(), name],
        )?;
        Ok(removed > 0)
    }

    fn list_published(&self) -> StoreResult<BTreeMap<String, PublishedEntry>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT name, payload FROM published_choices WHERE catalog = ?1")?;
        let rows = stmt.query_map(params![self.catalog.as_str()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut result = BTreeMap::new();
        for row in rows {
            let (name, payload) = row?;
            result.insert(name, PublishedEntry::new(payload));
        }
        Ok(result)
    }
}

impl CatalogStore for SqliteCatalogStore {
    fn catalog(&self) -> Catalog {
        self.catalog
    }

    fn promote(&self, name: &str, entry: &PublishedEntry) -> StoreResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        // Plain INSERT: an existing published row aborts the transaction.
        tx.execute(
            "INSERT INTO published_choices (catalog, name, payload) VALUES (?1, ?2, ?3)",
            params![self.catalog.as_str(), name, entry.payload()],
        )?;
        let removed = tx.execute(
            "DELETE FROM pending_choices WHERE catalog = ?1 AND name = ?2",
            params![self.catalog.as_str(), name],
        )?;
        if removed == 0 {
            return Err(StoreError::InvalidData(format!(
                "{name} has no pending record in {}",
                self.catalog
            )));
        }
        tx.commit()?;
        Ok(())
    }
}
