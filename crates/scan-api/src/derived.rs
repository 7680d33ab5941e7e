use std::fmt;

use k8s_openapi::api::batch::v1::{CronJob, CronJobSpec, Job, JobTemplateSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};

use crate::{ClusterScanSpec, ScanKey};

// ---------------------------------------------------------------------------
// Run mode
// ---------------------------------------------------------------------------

/// How a scan is to be executed. Derived once per pass from the spec.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScanMode {
    /// Recurring execution on the given cron schedule.
    Scheduled { cron: String },
    /// Single execution, as soon as possible.
    Immediate,
}

impl ScanMode {
    /// Any non-empty schedule selects the recurring path. The string is not
    /// validated here; the cluster owns cron semantics.
    pub fn of(spec: &ClusterScanSpec) -> Self {
        if spec.schedule.is_empty() {
            ScanMode::Immediate
        } else {
            ScanMode::Scheduled {
                cron: spec.schedule.clone(),
            }
        }
    }

    pub fn unit_kind(&self) -> UnitKind {
        match self {
            ScanMode::Scheduled { .. } => UnitKind::CronJob,
            ScanMode::Immediate => UnitKind::Job,
        }
    }
}

// ---------------------------------------------------------------------------
// Unit kind + naming
// ---------------------------------------------------------------------------

/// Kind of execution unit derived from a scan.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UnitKind {
    CronJob,
    Job,
}

impl UnitKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitKind::CronJob => "CronJob",
            UnitKind::Job => "Job",
        }
    }

    /// Name suffix appended to the parent scan's name.
    pub fn name_suffix(&self) -> &'static str {
        match self {
            UnitKind::CronJob => "-cronjob",
            UnitKind::Job => "-job",
        }
    }

    /// Value written to `status.lastScanResult` after a successful ensure.
    pub fn outcome_message(&self) -> &'static str {
        match self {
            UnitKind::CronJob => "CronJob created",
            UnitKind::Job => "Job created",
        }
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deterministic name of the unit of `kind` derived from scan `parent`.
pub fn derived_name(parent: &str, kind: UnitKind) -> String {
    format!("{parent}{}", kind.name_suffix())
}

// ---------------------------------------------------------------------------
// Derived unit
// ---------------------------------------------------------------------------

/// A CronJob or Job descriptor created on behalf of a scan.
#[derive(Clone, Debug, PartialEq)]
pub enum DerivedUnit {
    Recurring(CronJob),
    OneShot(Job),
}

impl DerivedUnit {
    pub fn kind(&self) -> UnitKind {
        match self {
            DerivedUnit::Recurring(_) => UnitKind::CronJob,
            DerivedUnit::OneShot(_) => UnitKind::Job,
        }
    }

    pub fn metadata(&self) -> &ObjectMeta {
        match self {
            DerivedUnit::Recurring(c) => &c.metadata,
            DerivedUnit::OneShot(j) => &j.metadata,
        }
    }

    pub fn metadata_mut(&mut self) -> &mut ObjectMeta {
        match self {
            DerivedUnit::Recurring(c) => &mut c.metadata,
            DerivedUnit::OneShot(j) => &mut j.metadata,
        }
    }

    pub fn name(&self) -> &str {
        self.metadata().name.as_deref().unwrap_or_default()
    }

    pub fn namespace(&self) -> &str {
        self.metadata().namespace.as_deref().unwrap_or_default()
    }

    pub fn owner_references(&self) -> &[OwnerReference] {
        self.metadata().owner_references.as_deref().unwrap_or_default()
    }

    /// Cron schedule of a recurring unit.
    pub fn schedule(&self) -> Option<&str> {
        match self {
            DerivedUnit::Recurring(c) => c.spec.as_ref().map(|s| s.schedule.as_str()),
            DerivedUnit::OneShot(_) => None,
        }
    }
}

/// Build the unit that satisfies `spec` in `mode` for the scan at `key`.
///
/// Owner references are left empty; linkage to the parent is established
/// separately before the unit is sent to the store.
pub fn build_derived_unit(key: &ScanKey, spec: &ClusterScanSpec, mode: &ScanMode) -> DerivedUnit {
    let metadata = ObjectMeta {
        name: Some(derived_name(&key.name, mode.unit_kind())),
        namespace: Some(key.namespace.clone()),
        ..ObjectMeta::default()
    };

    match mode {
        ScanMode::Scheduled { cron } => DerivedUnit::Recurring(CronJob {
            metadata,
            spec: Some(CronJobSpec {
                schedule: cron.clone(),
                job_template: JobTemplateSpec {
                    metadata: None,
                    spec: Some(spec.job_template.clone()),
                },
                ..CronJobSpec::default()
            }),
            status: None,
        }),
        ScanMode::Immediate => DerivedUnit::OneShot(Job {
            metadata,
            spec: Some(spec.job_template.clone()),
            status: None,
        }),
    }
}
