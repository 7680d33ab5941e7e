//! Registration with the kube-rs controller runtime.
//!
//! Watch set: every `ClusterScan`, plus the `CronJob`s and `Job`s it owns.
//! Any change to either side enqueues the owning scan; the runtime
//! coalesces events and guarantees one in-flight pass per scan.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use k8s_openapi::api::batch::v1::{CronJob, Job};
use kube::runtime::controller::{self, Action, Controller};
use kube::runtime::watcher;
use kube::{Api, Client};
use scan_api::{ClusterScan, ScanKey};
use scan_config::OperatorConfig;
use scan_reconcile::{ReconcileError, ReconcileOutcome, Reconciler, ScanStore};
use tracing::{debug, info, warn};

use crate::kube_store::KubeStore;
use crate::state::OperatorState;

/// Per-controller context handed to every pass.
pub struct Context<S> {
    pub reconciler: Reconciler<S>,
    pub error_requeue: Duration,
}

impl<S: ScanStore> Context<S> {
    pub fn new(store: S, error_requeue: Duration) -> Self {
        Self {
            reconciler: Reconciler::new(store),
            error_requeue,
        }
    }
}

/// Translate a pass outcome into a runtime action.
pub fn action_for(outcome: &ReconcileOutcome) -> Action {
    match outcome.requeue_after {
        Some(after) => Action::requeue(after),
        None => Action::await_change(),
    }
}

/// Reconcile entry point for the runtime. The watched object only supplies
/// the key; the pass reloads the scan from the store.
pub async fn reconcile_scan<S: ScanStore>(
    scan: Arc<ClusterScan>,
    ctx: Arc<Context<S>>,
) -> Result<Action, ReconcileError> {
    let key = ScanKey::of(&scan).ok_or(ReconcileError::MissingObjectKey(
        ".metadata.name/.metadata.namespace",
    ))?;
    let outcome = ctx.reconciler.reconcile(&key).await?;
    Ok(action_for(&outcome))
}

/// Failed passes are retried after the configured delay.
pub fn error_policy<S>(
    scan: Arc<ClusterScan>,
    err: &ReconcileError,
    ctx: Arc<Context<S>>,
) -> Action {
    let key = ScanKey::of(&scan)
        .map(|k| k.to_string())
        .unwrap_or_else(|| "<unnamed>".to_string());
    warn!(
        scan = %key,
        class = err.class().as_str(),
        error = %err,
        "reconcile failed; requeueing"
    );
    Action::requeue(ctx.error_requeue)
}

/// Failures already reported by [`error_policy`]; the stream repeats them.
pub fn reported_by_error_policy<E1, E2>(err: &controller::Error<E1, E2>) -> bool
where
    E1: std::error::Error + 'static,
    E2: std::error::Error + 'static,
{
    matches!(err, controller::Error::ReconcilerFailed(..))
}

/// Run the controller until a shutdown signal. `state` turns ready once the
/// initial list of scans has landed in the controller's cache.
pub async fn run(client: Client, cfg: &OperatorConfig, state: Arc<OperatorState>) {
    let (scans, cronjobs, jobs) = match cfg.watch_namespace.as_deref() {
        Some(ns) => (
            Api::<ClusterScan>::namespaced(client.clone(), ns),
            Api::<CronJob>::namespaced(client.clone(), ns),
            Api::<Job>::namespaced(client.clone(), ns),
        ),
        None => (
            Api::<ClusterScan>::all(client.clone()),
            Api::<CronJob>::all(client.clone()),
            Api::<Job>::all(client.clone()),
        ),
    };

    let ctx = Arc::new(Context::new(
        KubeStore::new(client),
        Duration::from_secs(cfg.error_requeue_secs),
    ));

    info!(
        namespace = cfg.watch_namespace.as_deref().unwrap_or("<all>"),
        "starting ClusterScan controller"
    );

    let controller = Controller::new(scans, watcher::Config::default())
        .owns(cronjobs, watcher::Config::default())
        .owns(jobs, watcher::Config::default())
        .shutdown_on_signal();
    let cache = controller.store();

    let readiness = async {
        // Errs only when the stream ends before the first list completes.
        if cache.wait_until_ready().await.is_ok() {
            info!("ClusterScan cache synced; ready");
            state.set_ready(true);
        }
    };

    let pipeline = controller
        .run(reconcile_scan::<KubeStore>, error_policy::<KubeStore>, ctx)
        .for_each(|res| async move {
            match res {
                Ok((obj, _action)) => debug!(scan = %obj, "reconciled"),
                Err(e) if reported_by_error_policy(&e) => debug!(error = %e, "reconcile failed"),
                Err(e) => warn!(error = %e, "controller error"),
            }
        });

    tokio::join!(readiness, pipeline);

    state.set_ready(false);
    info!("ClusterScan controller terminated");
}
