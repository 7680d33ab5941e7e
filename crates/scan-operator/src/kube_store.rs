//! [`ScanStore`] backed by the Kubernetes API server.

use k8s_openapi::api::batch::v1::{CronJob, Job};
use kube::api::{Api, PostParams};
use kube::Client;
use scan_api::{ClusterScan, DerivedUnit, ScanKey, UnitKind};
use scan_reconcile::{ScanStore, StoreError};

/// Field manager recorded on objects this operator creates.
pub const FIELD_MANAGER: &str = "clusterscan-operator";

const SCAN_KIND: &str = "ClusterScan";

/// Store over a shared [`kube::Client`]. Cheap to clone.
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn post_params() -> PostParams {
        PostParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..PostParams::default()
        }
    }
}

/// Map a client error onto the store taxonomy.
///
/// 404 => NotFound, 409 => Conflict (AlreadyExists on create, stale
/// resourceVersion on update), other API statuses => Api, everything else
/// => Transport.
pub fn map_kube_error(kind: &str, namespace: &str, name: &str, err: kube::Error) -> StoreError {
    match err {
        kube::Error::Api(resp) if resp.code == 404 => StoreError::not_found(kind, namespace, name),
        kube::Error::Api(resp) if resp.code == 409 => {
            StoreError::conflict(kind, namespace, name, resp.message)
        }
        kube::Error::Api(resp) => StoreError::Api {
            code: resp.code,
            message: resp.message,
        },
        kube::Error::SerdeError(e) => StoreError::Serialization(e.to_string()),
        other => StoreError::Transport(other.to_string()),
    }
}

#[async_trait::async_trait]
impl ScanStore for KubeStore {
    async fn get_scan(&self, key: &ScanKey) -> Result<ClusterScan, StoreError> {
        let api: Api<ClusterScan> = Api::namespaced(self.client.clone(), &key.namespace);
        api.get(&key.name)
            .await
            .map_err(|e| map_kube_error(SCAN_KIND, &key.namespace, &key.name, e))
    }

    async fn get_unit(
        &self,
        kind: UnitKind,
        namespace: &str,
        name: &str,
    ) -> Result<DerivedUnit, StoreError> {
        let map = |e: kube::Error| map_kube_error(kind.as_str(), namespace, name, e);
        match kind {
            UnitKind::CronJob => {
                let api: Api<CronJob> = Api::namespaced(self.client.clone(), namespace);
                api.get(name).await.map(DerivedUnit::Recurring).map_err(map)
            }
            UnitKind::Job => {
                let api: Api<Job> = Api::namespaced(self.client.clone(), namespace);
                api.get(name).await.map(DerivedUnit::OneShot).map_err(map)
            }
        }
    }

    async fn create_unit(&self, unit: &DerivedUnit) -> Result<(), StoreError> {
        let (namespace, name) = (unit.namespace(), unit.name());
        let map = |e: kube::Error| map_kube_error(unit.kind().as_str(), namespace, name, e);
        let pp = Self::post_params();
        match unit {
            DerivedUnit::Recurring(cj) => {
                let api: Api<CronJob> = Api::namespaced(self.client.clone(), namespace);
                api.create(&pp, cj).await.map(|_| ()).map_err(map)
            }
            DerivedUnit::OneShot(job) => {
                let api: Api<Job> = Api::namespaced(self.client.clone(), namespace);
                api.create(&pp, job).await.map(|_| ()).map_err(map)
            }
        }
    }

    async fn update_status(&self, scan: &ClusterScan) -> Result<(), StoreError> {
        let key = ScanKey::of(scan).ok_or_else(|| StoreError::Api {
            code: 422,
            message: "status update without name/namespace".to_string(),
        })?;
        // Full object with its resourceVersion: the server rejects a stale write with 409.
        let body = serde_json::to_vec(scan).map_err(|e| StoreError::Serialization(e.to_string()))?;

        let api: Api<ClusterScan> = Api::namespaced(self.client.clone(), &key.namespace);
        api.replace_status(&key.name, &Self::post_params(), body)
            .await
            .map(|_| ())
            .map_err(|e| map_kube_error(SCAN_KIND, &key.namespace, &key.name, e))
    }
}
