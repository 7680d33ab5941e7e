//! Scenario: a scan with a schedule is satisfied by `<name>-cronjob`.
//!
//! # Invariants under test
//!
//! 1. The derived unit is a CronJob named `<name>-cronjob` in the scan's
//!    namespace, carrying the exact schedule string and the scan's template.
//! 2. Its controller owner reference resolves to the scan (kind, name, uid).
//! 3. Status becomes `{lastScanResult: "CronJob created", lastScanTime: now}`.
//! 4. The pass issues exactly: get scan, get unit, create unit, update status.

use std::sync::Arc;

use scan_api::{build_derived_unit, DerivedUnit, ScanKey, ScanMode, UnitKind};
use scan_reconcile::{Clock, EnsureAction, Reconciler};
use scan_testkit::{fixtures, InMemoryStore, ManualClock, StoreCall, StoreOp};

#[tokio::test]
async fn daily_audit_creates_cronjob_with_schedule() {
    let store = Arc::new(InMemoryStore::new());
    let clock = Arc::new(ManualClock::fixed());
    let scan = store.insert_scan(fixtures::scan("sec", "daily-audit", "0 * * * *"));
    let r = Reconciler::with_clock(store.clone(), clock.clone());

    let key = ScanKey::new("sec", "daily-audit");
    let out = r.reconcile(&key).await.expect("reconcile ok");

    assert_eq!(out.requeue_after, None);
    let ensured = out.ensured.expect("unit ensured");
    assert_eq!(ensured.kind, UnitKind::CronJob);
    assert_eq!(ensured.name, "daily-audit-cronjob");
    assert_eq!(ensured.action, EnsureAction::Created);

    let unit = store
        .unit(UnitKind::CronJob, "sec", "daily-audit-cronjob")
        .expect("cronjob stored");
    assert_eq!(unit.namespace(), "sec");
    assert_eq!(unit.schedule(), Some("0 * * * *"));

    let DerivedUnit::Recurring(cj) = &unit else {
        panic!("expected a CronJob, got {unit:?}");
    };
    let tmpl = cj
        .spec
        .as_ref()
        .and_then(|s| s.job_template.spec.clone())
        .expect("job template present");
    assert_eq!(tmpl, scan.spec.job_template);

    // No Job is created on the scheduled path.
    assert!(store.unit(UnitKind::Job, "sec", "daily-audit-job").is_none());
    assert_eq!(store.units().len(), 1);

    let status = store.scan(&key).unwrap().status.expect("status written");
    assert_eq!(status.last_scan_result, "CronJob created");
    assert_eq!(status.last_scan_time, Some(clock.now()));

    assert_eq!(
        store.calls(),
        vec![
            StoreCall::GetScan(key.clone()),
            StoreCall::GetUnit {
                kind: UnitKind::CronJob,
                namespace: "sec".to_string(),
                name: "daily-audit-cronjob".to_string(),
            },
            StoreCall::CreateUnit {
                kind: UnitKind::CronJob,
                namespace: "sec".to_string(),
                name: "daily-audit-cronjob".to_string(),
            },
            StoreCall::UpdateStatus(key),
        ]
    );
}

#[tokio::test]
async fn cronjob_is_controlled_by_its_scan() {
    let store = Arc::new(InMemoryStore::new());
    let scan = store.insert_scan(fixtures::scan("sec", "daily-audit", "0 * * * *"));
    let r = Reconciler::new(store.clone());

    r.reconcile(&ScanKey::new("sec", "daily-audit")).await.unwrap();

    let unit = store
        .unit(UnitKind::CronJob, "sec", "daily-audit-cronjob")
        .unwrap();
    let refs = unit.owner_references();
    assert_eq!(refs.len(), 1);

    let owner = &refs[0];
    assert_eq!(owner.kind, "ClusterScan");
    assert_eq!(owner.api_version, "scan.clusterscandemo.com/v1alpha1");
    assert_eq!(owner.name, "daily-audit");
    assert_eq!(Some(owner.uid.clone()), scan.metadata.uid);
    assert_eq!(owner.controller, Some(true));
    assert_eq!(owner.block_owner_deletion, Some(true));
}

#[tokio::test]
async fn cronjob_created_elsewhere_is_adopted_as_is() {
    let store = Arc::new(InMemoryStore::new());
    store.insert_scan(fixtures::scan("sec", "daily-audit", "0 * * * *"));

    // Same name, created by someone else before the first pass.
    let foreign = build_derived_unit(
        &ScanKey::new("sec", "daily-audit"),
        &fixtures::scan("sec", "daily-audit", "*/5 * * * *").spec,
        &ScanMode::Scheduled {
            cron: "*/5 * * * *".to_string(),
        },
    );
    store.insert_unit(foreign);

    let key = ScanKey::new("sec", "daily-audit");
    let out = Reconciler::new(store.clone()).reconcile(&key).await.unwrap();

    assert_eq!(out.ensured.unwrap().action, EnsureAction::AlreadyPresent);
    assert_eq!(store.count_calls(StoreOp::CreateUnit), 0);

    let unit = store
        .unit(UnitKind::CronJob, "sec", "daily-audit-cronjob")
        .unwrap();
    assert_eq!(unit.schedule(), Some("*/5 * * * *"));
    assert!(unit.owner_references().is_empty());

    let status = store.scan(&key).unwrap().status.unwrap();
    assert_eq!(status.last_scan_result, "CronJob created");
}
