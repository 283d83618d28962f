//! Pending and published choice records.

use chrono::{DateTime, Utc};
use keygate_types::AdminId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::{StoreError, StoreResult};

/// A submitted choice awaiting quorum.
///
/// `approval_count` is stored alongside `approvers` so listings don't have to
/// deserialize the set, and is kept equal to `approvers.len()` by every
/// mutation. Entries read back from storage go through [`Self::from_parts`],
/// which rejects records where the two disagree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingEntry {
    payload: String,
    submitter: AdminId,
    approvers: BTreeSet<AdminId>,
    approval_count: usize,
    submitted_at: DateTime<Utc>,
}

impl PendingEntry {
    /// Creates a new entry. The submitter counts as the first approval.
    #[must_use]
    pub fn new(payload: impl Into<String>, submitter: AdminId) -> Self {
        let approvers = BTreeSet::from([submitter.clone()]);
        Self {
            payload: payload.into(),
            submitter,
            approvers,
            approval_count: 1,
            submitted_at: Utc::now(),
        }
    }

    /// Rebuilds an entry from stored fields, checking the count invariant.
    pub fn from_parts(
        payload: String,
        submitter: AdminId,
        approvers: BTreeSet<AdminId>,
        approval_count: usize,
        submitted_at: DateTime<Utc>,
    ) -> StoreResult<Self> {
        if approval_count != approvers.len() {
            return Err(StoreError::InvalidData(format!(
                "approval count {approval_count} does not match {} recorded approvers",
                approvers.len()
            )));
        }
        if !approvers.contains(&submitter) {
            return Err(StoreError::InvalidData(format!(
                "submitter {submitter} missing from approvers"
            )));
        }
        Ok(Self {
            payload,
            submitter,
            approvers,
            approval_count,
            submitted_at,
        })
    }

    #[must_use]
    pub fn payload(&self) -> &str {
        &self.payload
    }

    #[must_use]
    pub fn submitter(&self) -> &AdminId {
        &self.submitter
    }

    #[must_use]
    pub fn approvers(&self) -> &BTreeSet<AdminId> {
        &self.approvers
    }

    #[must_use]
    pub fn approval_count(&self) -> usize {
        self.approval_count
    }

    #[must_use]
    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }

    /// Returns true if `admin` has already approved.
    #[must_use]
    pub fn has_approved(&self, admin: &AdminId) -> bool {
        self.approvers.contains(admin)
    }

    /// Records an approval. Returns false (and changes nothing) if the
    /// administrator already approved.
    pub(crate) fn add_approver(&mut self, admin: AdminId) -> bool {
        if !self.approvers.insert(admin) {
            return false;
        }
        self.approval_count = self.approvers.len();
        true
    }

    /// True once the approvals meet or exceed `quorum`.
    #[must_use]
    pub fn is_satisfied(&self, quorum: usize) -> bool {
        self.approval_count >= quorum
    }

    /// Approvals still missing for `quorum`.
    #[must_use]
    pub fn remaining(&self, quorum: usize) -> usize {
        quorum.saturating_sub(self.approval_count)
    }

    /// The published form of this entry.
    #[must_use]
    pub fn to_published(&self) -> PublishedEntry {
        PublishedEntry::new(self.payload.clone())
    }
}

/// A choice that reached quorum and is visible to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedEntry {
    payload: String,
}

impl PublishedEntry {
    #[must_use]
    pub fn new(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
        }
    }

    #[must_use]
    pub fn payload(&self) -> &str {
        &self.payload
    }

    #[must_use]
    pub fn into_payload(self) -> String {
        self.payload
    }
}

/// Outcome of an approval or recheck.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "status")]
pub enum ApprovalStatus {
    /// Quorum reached; the entry moved to the published store.
    Promoted,
    /// Still waiting for `remaining` more approvals.
    Pending { remaining: usize },
}

impl ApprovalStatus {
    #[must_use]
    pub fn is_promoted(&self) -> bool {
        matches!(self, Self::Promoted)
    }
}

/// Read-only view of a pending entry's progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingStatus {
    pub approval_count: usize,
    pub remaining: usize,
}
