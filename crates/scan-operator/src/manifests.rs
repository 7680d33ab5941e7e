//! Deployment manifests generated from code: the CRD and the ClusterRole.

use anyhow::{Context, Result};
use k8s_openapi::api::rbac::v1::{ClusterRole, PolicyRule};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::CustomResourceExt;
use scan_api::{ClusterScan, API_GROUP};

pub const CLUSTER_ROLE_NAME: &str = "clusterscan-operator-manager-role";

/// The ClusterScan CustomResourceDefinition as YAML.
pub fn crd_yaml() -> Result<String> {
    serde_yaml::to_string(&ClusterScan::crd()).context("failed to render CRD yaml")
}

fn rule(group: &str, resources: &[&str], verbs: &[&str]) -> PolicyRule {
    PolicyRule {
        api_groups: Some(vec![group.to_string()]),
        resources: Some(resources.iter().map(|r| r.to_string()).collect()),
        verbs: verbs.iter().map(|v| v.to_string()).collect(),
        ..PolicyRule::default()
    }
}

/// Permissions the controller needs: full access to its own resource, its
/// status and finalizers, and to the batch units it derives.
pub fn cluster_role() -> ClusterRole {
    const ALL: &[&str] = &["create", "delete", "get", "list", "patch", "update", "watch"];

    ClusterRole {
        metadata: ObjectMeta {
            name: Some(CLUSTER_ROLE_NAME.to_string()),
            ..ObjectMeta::default()
        },
        rules: Some(vec![
            rule(API_GROUP, &["clusterscans"], ALL),
            rule(API_GROUP, &["clusterscans/status"], &["get", "patch", "update"]),
            rule(API_GROUP, &["clusterscans/finalizers"], &["update"]),
            rule("batch", &["cronjobs"], ALL),
            rule("batch", &["jobs"], ALL),
        ]),
        aggregation_rule: None,
    }
}

pub fn rbac_yaml() -> Result<String> {
    serde_yaml::to_string(&cluster_role()).context("failed to render ClusterRole yaml")
}
