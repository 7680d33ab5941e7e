//! scan-api
//!
//! The `ClusterScan` custom resource and the execution units derived from it.
//!
//! - `ClusterScan` declares *what* to run (`spec.jobTemplate`) and *when*
//!   (`spec.schedule`, empty = run once).
//! - A scheduled scan is satisfied by a `CronJob` named `<name>-cronjob`.
//! - An immediate scan is satisfied by a `Job` named `<name>-job`.
//!
//! Derived names are a wire contract: other tooling looks units up by them.
//!
//! Pure types and constructors. No IO.

mod derived;
mod key;
mod types;

pub use derived::{build_derived_unit, derived_name, DerivedUnit, ScanMode, UnitKind};
pub use key::ScanKey;
pub use types::*;
