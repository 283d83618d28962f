mod common;

use common::{admin, memory_workflow, roster, FlakyStore};
use keygate_approval::{
    ApprovalError, ApprovalStatus, ApprovalWorkflow, ChoiceStore, MemoryRoster, PendingStatus,
    PublishedEntry, StoreError,
};
use keygate_types::Catalog;
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;

// ── Submit ────────────────────────────────────────────────────────

#[test]
fn submit_records_submitter_as_first_approver() {
    let wf = memory_workflow(roster(&["a", "b", "c"]));
    wf.submit(Catalog::Router, "fast", "route=1", &admin("a")).unwrap();

    let entry = wf.get_pending(Catalog::Router, "fast").unwrap().unwrap();
    assert_eq!(entry.payload(), "route=1");
    assert_eq!(entry.submitter(), &admin("a"));
    assert_eq!(entry.approval_count(), 1);
    assert!(entry.has_approved(&admin("a")));
}

#[test]
fn submit_twice_is_already_pending() {
    let wf = memory_workflow(roster(&["a", "b", "c"]));
    wf.submit(Catalog::Router, "x", "one", &admin("a")).unwrap();
    let err = wf.submit(Catalog::Router, "x", "two", &admin("b")).unwrap_err();
    assert!(matches!(err, ApprovalError::AlreadyPending { .. }));

    // The original payload is untouched.
    let entry = wf.get_pending(Catalog::Router, "x").unwrap().unwrap();
    assert_eq!(entry.payload(), "one");
}

#[test]
fn submit_collides_with_published_name() {
    let wf = memory_workflow(roster(&["a", "b"]));
    wf.store(Catalog::Claimed)
        .put_published("X", &PublishedEntry::new("live"))
        .unwrap();

    let err = wf.submit(Catalog::Claimed, "X", "new", &admin("a")).unwrap_err();
    assert!(matches!(
        err,
        ApprovalError::AlreadyPending { catalog: Catalog::Claimed, .. }
    ));
    assert!(wf.get_pending(Catalog::Claimed, "X").unwrap().is_none());
}

// ── Approve ───────────────────────────────────────────────────────

#[test]
fn submitter_cannot_approve_again() {
    for catalog in Catalog::ALL {
        let wf = memory_workflow(roster(&["a", "b", "c"]));
        wf.submit(catalog, "n", "code", &admin("a")).unwrap();
        let err = wf.approve(catalog, "n", &admin("a")).unwrap_err();
        assert!(matches!(err, ApprovalError::AlreadyApproved { .. }));
        let entry = wf.get_pending(catalog, "n").unwrap().unwrap();
        assert_eq!(entry.approval_count(), 1);
    }
}

#[test]
fn duplicate_approval_does_not_count() {
    let wf = memory_workflow(roster(&["a", "b", "c", "d"]));
    wf.submit(Catalog::Router, "n", "code", &admin("a")).unwrap();
    assert_eq!(
        wf.approve(Catalog::Router, "n", &admin("b")).unwrap(),
        ApprovalStatus::Pending { remaining: 2 }
    );
    let err = wf.approve(Catalog::Router, "n", &admin("b")).unwrap_err();
    assert!(matches!(err, ApprovalError::AlreadyApproved { .. }));
    assert_eq!(
        wf.get_pending(Catalog::Router, "n").unwrap().unwrap().approval_count(),
        2
    );
}

#[test]
fn quorum_of_three_promotes_on_third_approval() {
    let wf = memory_workflow(roster(&["a", "b", "c"]));
    wf.submit(Catalog::Unclaimed, "m", "payload", &admin("a")).unwrap();

    // Submitter plus one more: one short.
    assert_eq!(
        wf.approve(Catalog::Unclaimed, "m", &admin("b")).unwrap(),
        ApprovalStatus::Pending { remaining: 1 }
    );
    assert_eq!(
        wf.pending_status(Catalog::Unclaimed).unwrap(),
        BTreeMap::from([(
            "m".to_string(),
            PendingStatus { approval_count: 2, remaining: 1 }
        )])
    );

    assert_eq!(
        wf.approve(Catalog::Unclaimed, "m", &admin("c")).unwrap(),
        ApprovalStatus::Promoted
    );
    assert!(wf.pending_status(Catalog::Unclaimed).unwrap().is_empty());
    assert_eq!(
        wf.list_published(Catalog::Unclaimed).unwrap(),
        BTreeMap::from([("m".to_string(), "payload".to_string())])
    );
}

#[test]
fn approve_after_promotion_is_not_found() {
    let wf = memory_workflow(roster(&["a", "b"]));
    wf.submit(Catalog::Router, "n", "code", &admin("a")).unwrap();
    assert!(wf.approve(Catalog::Router, "n", &admin("b")).unwrap().is_promoted());

    let err = wf.approve(Catalog::Router, "n", &admin("c")).unwrap_err();
    assert!(matches!(err, ApprovalError::NotFound { .. }));
}

#[test]
fn approve_unknown_name_is_not_found() {
    let wf = memory_workflow(roster(&["a"]));
    let err = wf.approve(Catalog::Claimed, "ghost", &admin("a")).unwrap_err();
    assert!(matches!(
        err,
        ApprovalError::NotFound { catalog: Catalog::Claimed, .. }
    ));
}

#[test]
fn quorum_tracks_roster_growth() {
    let roster = roster(&["a", "b"]);
    let wf = memory_workflow(roster.clone());
    wf.submit(Catalog::Router, "n", "code", &admin("a")).unwrap();

    // A third admin joins before the second approval lands.
    roster.register(admin("c"), true).unwrap();
    assert_eq!(
        wf.approve(Catalog::Router, "n", &admin("b")).unwrap(),
        ApprovalStatus::Pending { remaining: 1 }
    );
    assert!(wf.approve(Catalog::Router, "n", &admin("c")).unwrap().is_promoted());
}

#[test]
fn roster_shrink_promotes_on_next_approval() {
    let roster = roster(&["a", "b", "c", "d"]);
    let wf = memory_workflow(roster.clone());
    wf.submit(Catalog::Router, "n", "code", &admin("a")).unwrap();
    assert_eq!(
        wf.approve(Catalog::Router, "n", &admin("b")).unwrap(),
        ApprovalStatus::Pending { remaining: 2 }
    );

    // Two admins deactivated: quorum 2, but the next approval makes it 3.
    roster.set_active(&admin("c"), false).unwrap();
    roster.set_active(&admin("d"), false).unwrap();
    assert!(wf.approve(Catalog::Router, "n", &admin("e")).unwrap().is_promoted());
}

#[test]
fn roster_shrink_promotes_on_recheck() {
    let roster = roster(&["a", "b", "c"]);
    let wf = memory_workflow(roster.clone());
    wf.submit(Catalog::Claimed, "n", "code", &admin("a")).unwrap();
    assert_eq!(
        wf.approve(Catalog::Claimed, "n", &admin("b")).unwrap(),
        ApprovalStatus::Pending { remaining: 1 }
    );
    assert_eq!(
        wf.recheck(Catalog::Claimed, "n").unwrap(),
        ApprovalStatus::Pending { remaining: 1 }
    );

    roster.remove(&admin("c")).unwrap();
    assert_eq!(
        wf.pending_status(Catalog::Claimed).unwrap()["n"],
        PendingStatus { approval_count: 2, remaining: 0 }
    );
    assert_eq!(wf.recheck(Catalog::Claimed, "n").unwrap(), ApprovalStatus::Promoted);
    assert_eq!(
        wf.get_published(Catalog::Claimed, "n").unwrap().as_deref(),
        Some("code")
    );
}

#[test]
fn single_admin_publishes_through_recheck() {
    let wf = memory_workflow(roster(&["solo"]));
    wf.submit(Catalog::Router, "n", "code", &admin("solo")).unwrap();
    assert!(matches!(
        wf.approve(Catalog::Router, "n", &admin("solo")),
        Err(ApprovalError::AlreadyApproved { .. })
    ));
    assert_eq!(wf.recheck(Catalog::Router, "n").unwrap(), ApprovalStatus::Promoted);
}

#[test]
fn recheck_unknown_is_not_found() {
    let wf = memory_workflow(roster(&["a"]));
    assert!(matches!(
        wf.recheck(Catalog::Router, "nope"),
        Err(ApprovalError::NotFound { .. })
    ));
}

// ── Cancel ────────────────────────────────────────────────────────

#[test]
fn cancel_removes_pending_entry() {
    let wf = memory_workflow(roster(&["a", "b", "c"]));
    wf.submit(Catalog::Router, "n", "code", &admin("a")).unwrap();
    wf.approve(Catalog::Router, "n", &admin("b")).unwrap();

    let removed = wf.cancel(Catalog::Router, "n").unwrap();
    assert_eq!(removed.approval_count(), 2);
    assert!(wf.get_pending(Catalog::Router, "n").unwrap().is_none());
    assert!(wf.list_published(Catalog::Router).unwrap().is_empty());
    assert!(matches!(
        wf.approve(Catalog::Router, "n", &admin("c")),
        Err(ApprovalError::NotFound { .. })
    ));

    // The name is free again.
    wf.submit(Catalog::Router, "n", "code v2", &admin("b")).unwrap();
}

#[test]
fn cancel_does_not_touch_published() {
    let wf = memory_workflow(roster(&["a", "b"]));
    wf.submit(Catalog::Router, "n", "code", &admin("a")).unwrap();
    wf.approve(Catalog::Router, "n", &admin("b")).unwrap();
    assert!(matches!(
        wf.cancel(Catalog::Router, "n"),
        Err(ApprovalError::NotFound { .. })
    ));
    assert_eq!(wf.list_published(Catalog::Router).unwrap().len(), 1);
}

// ── Catalog isolation ─────────────────────────────────────────────

#[test]
fn catalogs_are_independent_namespaces() {
    let wf = memory_workflow(roster(&["a", "b"]));
    wf.submit(Catalog::Claimed, "shared", "claimed code", &admin("a")).unwrap();
    wf.approve(Catalog::Claimed, "shared", &admin("b")).unwrap();

    // Same name in another catalog is unaffected by the published one.
    wf.submit(Catalog::Router, "shared", "router code", &admin("a")).unwrap();
    assert!(wf.get_pending(Catalog::Router, "shared").unwrap().is_some());
    assert!(wf.list_published(Catalog::Router).unwrap().is_empty());
    assert!(wf.pending_status(Catalog::Unclaimed).unwrap().is_empty());
    assert_eq!(
        wf.get_published(Catalog::Claimed, "shared").unwrap().as_deref(),
        Some("claimed code")
    );
}

// ── Store failures ────────────────────────────────────────────────

#[test]
fn failed_promotion_leaves_entry_pending() {
    let roster = std::sync::Arc::new(MemoryRoster::with_active([admin("a"), admin("b")]));
    let wf = ApprovalWorkflow::with_stores(roster, |c| Ok(FlakyStore::new(c))).unwrap();
    wf.submit(Catalog::Router, "n", "code", &admin("a")).unwrap();

    wf.store(Catalog::Router).set_fail_promote(true);
    let err = wf.approve(Catalog::Router, "n", &admin("b")).unwrap_err();
    assert!(matches!(err, ApprovalError::Store(StoreError::Io(_))));

    // Neither published nor half-approved.
    assert!(wf.list_published(Catalog::Router).unwrap().is_empty());
    let entry = wf.get_pending(Catalog::Router, "n").unwrap().unwrap();
    assert_eq!(entry.approval_count(), 1);

    // The approver can retry once the store recovers.
    wf.store(Catalog::Router).set_fail_promote(false);
    assert!(wf.approve(Catalog::Router, "n", &admin("b")).unwrap().is_promoted());
}
