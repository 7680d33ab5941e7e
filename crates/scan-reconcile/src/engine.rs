use std::time::Duration;

use scan_api::{build_derived_unit, ClusterScanStatus, ScanKey, ScanMode, UnitKind};
use tracing::{debug, info, warn};

use crate::{Clock, ReconcileError, ScanStore, SystemClock};

/// What the ensure step did with the derived unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnsureAction {
    /// The unit was absent and has been created.
    Created,
    /// The unit already existed; left untouched.
    AlreadyPresent,
    /// The unit was absent on lookup but create reported a conflict:
    /// a concurrent pass created it first.
    CreateRaced,
}

/// The derived unit a pass ensured.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ensured {
    pub kind: UnitKind,
    pub name: String,
    pub action: EnsureAction,
}

/// Result of a successful pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Explicit requeue request. Always `None`: re-invocation is driven by
    /// watch events on the scan and its owned units.
    pub requeue_after: Option<Duration>,
    /// `None` when the scan no longer exists.
    pub ensured: Option<Ensured>,
}

impl ReconcileOutcome {
    fn scan_gone() -> Self {
        Self {
            requeue_after: None,
            ensured: None,
        }
    }

    fn ensured(ensured: Ensured) -> Self {
        Self {
            requeue_after: None,
            ensured: Some(ensured),
        }
    }
}

/// Drives one ClusterScan towards its declared state.
///
/// Holds no state across passes beyond its store handle and clock, so one
/// instance may serve any number of keys.
#[derive(Debug)]
pub struct Reconciler<S, C = SystemClock> {
    store: S,
    clock: C,
}

impl<S: ScanStore> Reconciler<S> {
    pub fn new(store: S) -> Self {
        Self::with_clock(store, SystemClock)
    }
}

impl<S: ScanStore, C: Clock> Reconciler<S, C> {
    pub fn with_clock(store: S, clock: C) -> Self {
        Self { store, clock }
    }

    /// One reconciliation pass for the scan at `key`.
    #[tracing::instrument(
        name = "reconcile_scan",
        skip_all,
        fields(namespace = %key.namespace, name = %key.name)
    )]
    pub async fn reconcile(&self, key: &ScanKey) -> Result<ReconcileOutcome, ReconcileError> {
        // 1) Load. Absent => deleted; owned units are garbage collected.
        let scan = match self.store.get_scan(key).await {
            Ok(scan) => scan,
            Err(e) if e.is_not_found() => {
                debug!("scan not found; nothing to do");
                return Ok(ReconcileOutcome::scan_gone());
            }
            Err(e) => return Err(e.into()),
        };

        // 2) Build the target unit and link it to the scan before any write.
        let mode = ScanMode::of(&scan.spec);
        let kind = mode.unit_kind();
        let mut unit = build_derived_unit(key, &scan.spec, &mode);
        let unit_name = unit.name().to_string();

        self.store
            .set_owner_reference(unit.metadata_mut(), &scan)
            .map_err(|source| ReconcileError::OwnerReference {
                kind,
                name: unit_name.clone(),
                source,
            })?;

        // 3) Ensure exists. An existing unit is never patched, even when its
        //    template or schedule no longer matches the scan.
        let action = match self.store.get_unit(kind, &key.namespace, &unit_name).await {
            Ok(_) => {
                debug!(unit = %unit_name, kind = %kind, "derived unit already present");
                EnsureAction::AlreadyPresent
            }
            Err(e) if e.is_not_found() => {
                info!(unit = %unit_name, kind = %kind, "creating derived unit");
                match self.store.create_unit(&unit).await {
                    Ok(()) => EnsureAction::Created,
                    Err(e) if e.is_conflict() => {
                        warn!(unit = %unit_name, kind = %kind, "create raced; unit already exists");
                        EnsureAction::CreateRaced
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            Err(e) => return Err(e.into()),
        };

        // 4) Status: overwrite as a whole. The timestamp never moves backwards.
        let now = self.clock.now();
        let last_scan_time = match scan.status.as_ref().and_then(|s| s.last_scan_time) {
            Some(prev) if prev > now => prev,
            _ => now,
        };

        let mut updated = scan;
        updated.status = Some(ClusterScanStatus::new(
            last_scan_time,
            kind.outcome_message(),
        ));
        self.store.update_status(&updated).await?;

        Ok(ReconcileOutcome::ensured(Ensured {
            kind,
            name: unit_name,
            action,
        }))
    }
}
