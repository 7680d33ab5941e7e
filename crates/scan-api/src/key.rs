use std::fmt;

use kube::ResourceExt;

use crate::ClusterScan;

/// Namespaced identity of a `ClusterScan`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScanKey {
    pub namespace: String,
    pub name: String,
}

impl ScanKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Key of a stored object. `None` when name or namespace is unset
    /// (objects that never went through the API server).
    pub fn of(scan: &ClusterScan) -> Option<Self> {
        let namespace = scan.namespace()?;
        let name = scan.metadata.name.clone()?;
        Some(Self { namespace, name })
    }
}

impl fmt::Display for ScanKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}
