//! scan-reconcile
//!
//! ClusterScan reconciliation engine.
//!
//! One pass, for one scan key:
//! - scan absent => nothing to do (derived units are garbage collected)
//! - schedule set => ensure `<name>-cronjob` exists
//! - schedule empty => ensure `<name>-job` exists
//! - record the outcome on the scan's status subresource
//!
//! Single attempt per pass. Every store error is surfaced to the caller,
//! which owns retry and backoff. Existing units are never patched.
//!
//! All IO goes through the injected [`ScanStore`].

mod clock;
mod engine;
mod error;
mod store;

pub use clock::{Clock, SystemClock};
pub use engine::{EnsureAction, Ensured, ReconcileOutcome, Reconciler};
pub use error::{ErrorClass, OwnershipError, ReconcileError, StoreError};
pub use store::{link_controller_owner, ScanStore};
