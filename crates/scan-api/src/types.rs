use chrono::{DateTime, Utc};
use k8s_openapi::api::batch::v1::JobSpec;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// API group of the `ClusterScan` resource.
pub const API_GROUP: &str = "scan.clusterscandemo.com";

/// API version of the `ClusterScan` resource.
pub const API_VERSION: &str = "v1alpha1";

/// Desired state of a cluster scan.
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "scan.clusterscandemo.com",
    version = "v1alpha1",
    kind = "ClusterScan",
    namespaced,
    status = "ClusterScanStatus",
    shortname = "cscan",
    printcolumn = r#"{"name":"Schedule","type":"string","jsonPath":".spec.schedule"}"#,
    printcolumn = r#"{"name":"Last Result","type":"string","jsonPath":".status.lastScanResult"}"#,
    printcolumn = r#"{"name":"Last Scan","type":"date","jsonPath":".status.lastScanTime"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterScanSpec {
    /// Cron expression. Empty means "run once".
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub schedule: String,

    /// Workload to run; copied verbatim into the derived CronJob or Job.
    pub job_template: JobSpec,
}

/// Observed state of a cluster scan.
///
/// Only records that the derived unit was ensured, not that the workload
/// itself succeeded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterScanStatus {
    /// Time of the last successful reconciliation pass.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_scan_time: Option<DateTime<Utc>>,

    /// Short summary of which unit was ensured ("CronJob created" / "Job created").
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub last_scan_result: String,
}

impl ClusterScanStatus {
    pub fn new(last_scan_time: DateTime<Utc>, last_scan_result: impl Into<String>) -> Self {
        Self {
            last_scan_time: Some(last_scan_time),
            last_scan_result: last_scan_result.into(),
        }
    }
}
