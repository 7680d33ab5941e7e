//! Scenario: store failures are surfaced unchanged; only two cases are absorbed.
//!
//! # Invariants under test
//!
//! 1. Any non-not-found error on scan lookup, unit lookup, create or status
//!    write is returned as `ReconcileError::Store` carrying the original error.
//! 2. No retries happen inside a pass: each failing call is issued once.
//! 3. Conflict on create (a concurrent pass won the race) counts as "exists".
//! 4. Owner-reference failure is fatal for the pass and precedes every write.
//! 5. A status write raced by another writer fails the pass; the next pass
//!    succeeds against the fresh object.

use std::sync::Arc;

use scan_api::{ScanKey, UnitKind};
use scan_reconcile::{
    EnsureAction, ErrorClass, OwnershipError, ReconcileError, Reconciler, ScanStore, StoreError,
};
use scan_testkit::{fixtures, InMemoryStore, StoreCall, StoreOp};

fn setup(schedule: &str) -> (Arc<InMemoryStore>, Reconciler<Arc<InMemoryStore>>, ScanKey) {
    let store = Arc::new(InMemoryStore::new());
    store.insert_scan(fixtures::scan("sec", "audit", schedule));
    let r = Reconciler::new(store.clone());
    (store, r, ScanKey::new("sec", "audit"))
}

fn unavailable() -> StoreError {
    StoreError::Transport("connection refused".to_string())
}

fn assert_store_error(err: ReconcileError, expected: StoreError) {
    match err {
        ReconcileError::Store(e) => assert_eq!(e, expected),
        other => panic!("expected store error, got {other:?}"),
    }
}

#[tokio::test]
async fn scan_lookup_failure_is_transient() {
    let (store, r, key) = setup("0 * * * *");
    store.fail_next(StoreOp::GetScan, unavailable());

    let err = r.reconcile(&key).await.unwrap_err();
    assert_eq!(err.class(), ErrorClass::Transient);
    assert_store_error(err, unavailable());
    assert_eq!(store.calls(), vec![StoreCall::GetScan(key)]);
}

#[tokio::test]
async fn unit_lookup_failure_stops_before_create() {
    let (store, r, key) = setup("0 * * * *");
    let api_err = StoreError::Api {
        code: 500,
        message: "etcdserver: request timed out".to_string(),
    };
    store.fail_next(StoreOp::GetUnit, api_err.clone());

    let err = r.reconcile(&key).await.unwrap_err();
    assert_store_error(err, api_err);
    assert_eq!(store.count_calls(StoreOp::CreateUnit), 0);
    assert_eq!(store.count_calls(StoreOp::UpdateStatus), 0);
    assert!(store.scan(&key).unwrap().status.is_none());
}

#[tokio::test]
async fn create_failure_skips_status_and_is_retried_by_next_pass() {
    let (store, r, key) = setup("");
    let forbidden = StoreError::Api {
        code: 403,
        message: "jobs.batch is forbidden".to_string(),
    };
    store.fail_next(StoreOp::CreateUnit, forbidden.clone());

    let err = r.reconcile(&key).await.unwrap_err();
    assert_store_error(err, forbidden);
    assert_eq!(store.count_calls(StoreOp::CreateUnit), 1);
    assert_eq!(store.count_calls(StoreOp::UpdateStatus), 0);
    assert!(store.units().is_empty());

    let out = r.reconcile(&key).await.unwrap();
    assert_eq!(out.ensured.unwrap().action, EnsureAction::Created);
    assert_eq!(store.units().len(), 1);
}

#[tokio::test]
async fn conflict_on_create_counts_as_present() {
    let (store, r, key) = setup("0 * * * *");

    // Another pass created the CronJob between our lookup and our create.
    r.reconcile(&key).await.unwrap();
    store.fail_next(
        StoreOp::GetUnit,
        StoreError::not_found("CronJob", "sec", "audit-cronjob"),
    );
    store.clear_calls();

    let out = r.reconcile(&key).await.expect("race is not an error");
    assert_eq!(out.ensured.unwrap().action, EnsureAction::CreateRaced);
    assert_eq!(store.count_calls(StoreOp::CreateUnit), 1);
    assert_eq!(store.count_calls(StoreOp::UpdateStatus), 1);
    assert_eq!(store.units().len(), 1);

    let status = store.scan(&key).unwrap().status.unwrap();
    assert_eq!(status.last_scan_result, "CronJob created");
}

#[tokio::test]
async fn owner_reference_failure_is_fatal_and_writes_nothing() {
    let (store, r, key) = setup("0 * * * *");
    store.fail_owner_reference(OwnershipError::MissingParentIdentity("uid"));

    let err = r.reconcile(&key).await.unwrap_err();
    assert_eq!(err.class(), ErrorClass::FatalForPass);
    match &err {
        ReconcileError::OwnerReference { kind, name, source } => {
            assert_eq!(*kind, UnitKind::CronJob);
            assert_eq!(name, "audit-cronjob");
            assert_eq!(*source, OwnershipError::MissingParentIdentity("uid"));
        }
        other => panic!("expected owner reference error, got {other:?}"),
    }

    // Linkage happens before any unit lookup or write.
    assert_eq!(store.calls(), vec![StoreCall::GetScan(key)]);
    assert!(store.units().is_empty());
}

#[tokio::test]
async fn status_conflict_surfaces_then_next_pass_succeeds() {
    let (store, r, key) = setup("");
    let raced = StoreError::conflict("ClusterScan", "sec", "audit", "object has been modified");
    store.fail_next(StoreOp::UpdateStatus, raced.clone());

    let err = r.reconcile(&key).await.unwrap_err();
    assert_eq!(err.class(), ErrorClass::Transient);
    assert_store_error(err, raced);
    // The Job was still created; only the status write lost the race.
    assert_eq!(store.units().len(), 1);
    assert!(store.scan(&key).unwrap().status.is_none());

    let out = r.reconcile(&key).await.unwrap();
    assert_eq!(out.ensured.unwrap().action, EnsureAction::AlreadyPresent);
    assert_eq!(
        store.scan(&key).unwrap().status.unwrap().last_scan_result,
        "Job created"
    );
}

#[tokio::test]
async fn spec_edit_during_pass_makes_status_write_conflict() {
    let (store, _, key) = setup("");

    // A writer that loads, then loses to a concurrent spec edit.
    let stale = store.scan(&key).unwrap();
    store.update_scan_spec(&key, fixtures::scan("sec", "audit", "*/10 * * * *").spec);

    let err = store.update_status(&stale).await.unwrap_err();
    assert!(err.is_conflict());
}
