//! scan-testkit
//!
//! In-memory stand-ins for the cluster, used by the scenario tests under
//! `tests/` and by downstream crates' tests:
//!
//! - [`InMemoryStore`]: a [`ScanStore`] with resourceVersion checks, a call
//!   log, and one-shot fault injection per operation.
//! - [`ManualClock`]: a [`Clock`] the test moves by hand.
//! - [`fixtures`]: ClusterScan builders.

pub mod fixtures;

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;

use chrono::{DateTime, Duration, TimeZone, Utc};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use scan_api::{ClusterScan, DerivedUnit, ScanKey, UnitKind};
use scan_reconcile::{link_controller_owner, Clock, OwnershipError, ScanStore, StoreError};

const SCAN_KIND: &str = "ClusterScan";

// ---------------------------------------------------------------------------
// Call log + fault injection
// ---------------------------------------------------------------------------

/// Store operation selector for fault injection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StoreOp {
    GetScan,
    GetUnit,
    CreateUnit,
    UpdateStatus,
}

/// One recorded store call, in issue order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreCall {
    GetScan(ScanKey),
    GetUnit {
        kind: UnitKind,
        namespace: String,
        name: String,
    },
    CreateUnit {
        kind: UnitKind,
        namespace: String,
        name: String,
    },
    UpdateStatus(ScanKey),
}

type UnitKey = (UnitKind, String, String);

#[derive(Default)]
struct Inner {
    scans: BTreeMap<ScanKey, ClusterScan>,
    units: BTreeMap<UnitKey, DerivedUnit>,
    calls: Vec<StoreCall>,
    faults: HashMap<StoreOp, VecDeque<StoreError>>,
    owner_fault: Option<OwnershipError>,
    next_version: u64,
}

impl Inner {
    fn bump_version(&mut self) -> String {
        self.next_version += 1;
        self.next_version.to_string()
    }

    fn take_fault(&mut self, op: StoreOp) -> Option<StoreError> {
        self.faults.get_mut(&op).and_then(VecDeque::pop_front)
    }
}

/// In-memory object store.
///
/// - objects get a uid and resourceVersion on insert/create, like the API server;
/// - `update_status` with a stale resourceVersion returns `Conflict`;
/// - creating an existing unit name returns `Conflict`;
/// - status updates replace only the status subresource.
#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A panicking test thread poisons the lock; the data is still usable.
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Store a scan as a user would `kubectl apply` it. Assigns a uid when
    /// absent and a fresh resourceVersion. Returns the stored object.
    pub fn insert_scan(&self, mut scan: ClusterScan) -> ClusterScan {
        let mut inner = self.lock();
        let key = ScanKey::of(&scan).expect("fixture scan must have name and namespace");
        if scan.metadata.uid.is_none() {
            scan.metadata.uid = Some(format!("uid-{}-{}", key.namespace, key.name));
        }
        scan.metadata.resource_version = Some(inner.bump_version());
        inner.scans.insert(key, scan.clone());
        scan
    }

    /// Replace the spec of a stored scan, keeping status and identity.
    pub fn update_scan_spec(&self, key: &ScanKey, spec: scan_api::ClusterScanSpec) {
        let mut inner = self.lock();
        let version = inner.bump_version();
        if let Some(scan) = inner.scans.get_mut(key) {
            scan.spec = spec;
            scan.metadata.resource_version = Some(version);
        }
    }

    /// Delete a scan and, like the garbage collector, every unit it controls.
    pub fn delete_scan(&self, key: &ScanKey) {
        let mut inner = self.lock();
        let Some(scan) = inner.scans.remove(key) else {
            return;
        };
        let uid = scan.metadata.uid.unwrap_or_default();
        inner.units.retain(|_, unit| {
            !unit
                .owner_references()
                .iter()
                .any(|r| r.controller == Some(true) && r.uid == uid)
        });
    }

    /// Seed a unit directly, bypassing the call log.
    pub fn insert_unit(&self, unit: DerivedUnit) {
        let mut inner = self.lock();
        let key = (unit.kind(), unit.namespace().to_string(), unit.name().to_string());
        inner.units.insert(key, unit);
    }

    pub fn scan(&self, key: &ScanKey) -> Option<ClusterScan> {
        self.lock().scans.get(key).cloned()
    }

    pub fn unit(&self, kind: UnitKind, namespace: &str, name: &str) -> Option<DerivedUnit> {
        self.lock()
            .units
            .get(&(kind, namespace.to_string(), name.to_string()))
            .cloned()
    }

    pub fn units(&self) -> Vec<DerivedUnit> {
        self.lock().units.values().cloned().collect()
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn count_calls(&self, op: StoreOp) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| {
                matches!(
                    (op, c),
                    (StoreOp::GetScan, StoreCall::GetScan(_))
                        | (StoreOp::GetUnit, StoreCall::GetUnit { .. })
                        | (StoreOp::CreateUnit, StoreCall::CreateUnit { .. })
                        | (StoreOp::UpdateStatus, StoreCall::UpdateStatus(_))
                )
            })
            .count()
    }

    /// Make the next call of `op` fail with `err` (queued, one-shot).
    /// The call is still recorded.
    pub fn fail_next(&self, op: StoreOp, err: StoreError) {
        self.lock().faults.entry(op).or_default().push_back(err);
    }

    /// Make every owner-reference linkage fail with `err`.
    pub fn fail_owner_reference(&self, err: OwnershipError) {
        self.lock().owner_fault = Some(err);
    }
}

#[async_trait::async_trait]
impl ScanStore for InMemoryStore {
    async fn get_scan(&self, key: &ScanKey) -> Result<ClusterScan, StoreError> {
        let mut inner = self.lock();
        inner.calls.push(StoreCall::GetScan(key.clone()));
        if let Some(err) = inner.take_fault(StoreOp::GetScan) {
            return Err(err);
        }
        inner
            .scans
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::not_found(SCAN_KIND, &key.namespace, &key.name))
    }

    async fn get_unit(
        &self,
        kind: UnitKind,
        namespace: &str,
        name: &str,
    ) -> Result<DerivedUnit, StoreError> {
        let mut inner = self.lock();
        inner.calls.push(StoreCall::GetUnit {
            kind,
            namespace: namespace.to_string(),
            name: name.to_string(),
        });
        if let Some(err) = inner.take_fault(StoreOp::GetUnit) {
            return Err(err);
        }
        inner
            .units
            .get(&(kind, namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| StoreError::not_found(kind.as_str(), namespace, name))
    }

    async fn create_unit(&self, unit: &DerivedUnit) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let kind = unit.kind();
        let (namespace, name) = (unit.namespace().to_string(), unit.name().to_string());
        inner.calls.push(StoreCall::CreateUnit {
            kind,
            namespace: namespace.clone(),
            name: name.clone(),
        });
        if let Some(err) = inner.take_fault(StoreOp::CreateUnit) {
            return Err(err);
        }

        let key = (kind, namespace, name);
        if inner.units.contains_key(&key) {
            return Err(StoreError::conflict(
                kind.as_str(),
                &key.1,
                &key.2,
                "already exists",
            ));
        }

        let mut stored = unit.clone();
        let version = inner.bump_version();
        let meta = stored.metadata_mut();
        meta.uid = Some(format!("uid-{}-{}", key.1, key.2));
        meta.resource_version = Some(version);
        inner.units.insert(key, stored);
        Ok(())
    }

    async fn update_status(&self, scan: &ClusterScan) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let key = ScanKey::of(scan).ok_or_else(|| StoreError::Api {
            code: 422,
            message: "status update without name/namespace".to_string(),
        })?;
        inner.calls.push(StoreCall::UpdateStatus(key.clone()));
        if let Some(err) = inner.take_fault(StoreOp::UpdateStatus) {
            return Err(err);
        }

        let version = inner.bump_version();
        let Some(stored) = inner.scans.get_mut(&key) else {
            return Err(StoreError::not_found(SCAN_KIND, &key.namespace, &key.name));
        };
        if stored.metadata.resource_version != scan.metadata.resource_version {
            return Err(StoreError::conflict(
                SCAN_KIND,
                &key.namespace,
                &key.name,
                "the object has been modified; please apply your changes to the latest version",
            ));
        }
        stored.status = scan.status.clone();
        stored.metadata.resource_version = Some(version);
        Ok(())
    }

    fn set_owner_reference(
        &self,
        child: &mut ObjectMeta,
        parent: &ClusterScan,
    ) -> Result<(), OwnershipError> {
        if let Some(err) = self.lock().owner_fault.clone() {
            return Err(err);
        }
        link_controller_owner(child, parent)
    }
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Clock that only moves when told to.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// 2024-05-01T00:00:00Z
    pub fn fixed() -> Self {
        Self::new(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap())
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|p| p.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|p| p.into_inner())
    }
}
