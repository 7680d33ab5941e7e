//! ClusterScan builders for tests.

use k8s_openapi::api::batch::v1::JobSpec;
use k8s_openapi::api::core::v1::{Container, PodSpec, PodTemplateSpec};
use scan_api::{ClusterScan, ClusterScanSpec};

/// A small but realistic scanner workload.
pub fn scanner_template(image: &str) -> JobSpec {
    JobSpec {
        backoff_limit: Some(1),
        template: PodTemplateSpec {
            metadata: None,
            spec: Some(PodSpec {
                containers: vec![Container {
                    name: "scanner".to_string(),
                    image: Some(image.to_string()),
                    args: Some(vec!["--report".to_string(), "json".to_string()]),
                    ..Container::default()
                }],
                restart_policy: Some("Never".to_string()),
                ..PodSpec::default()
            }),
        },
        ..JobSpec::default()
    }
}

/// Scan `namespace/name` with `schedule` ("" = run once) and the default
/// scanner template.
pub fn scan(namespace: &str, name: &str, schedule: &str) -> ClusterScan {
    scan_with_template(namespace, name, schedule, scanner_template("scanner:1.0"))
}

pub fn scan_with_template(
    namespace: &str,
    name: &str,
    schedule: &str,
    job_template: JobSpec,
) -> ClusterScan {
    let mut scan = ClusterScan::new(
        name,
        ClusterScanSpec {
            schedule: schedule.to_string(),
            job_template,
        },
    );
    scan.metadata.namespace = Some(namespace.to_string());
    scan
}
