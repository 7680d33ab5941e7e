use std::sync::Arc;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::{Resource, ResourceExt};
use scan_api::{ClusterScan, DerivedUnit, ScanKey, UnitKind};

use crate::OwnershipError;

/// Object store consumed by the [`crate::Reconciler`].
///
/// Lookups return [`StoreError::NotFound`](crate::StoreError::NotFound) for
/// absent objects. Writes follow the store's optimistic-concurrency rules;
/// a raced write returns [`StoreError::Conflict`](crate::StoreError::Conflict).
///
/// Implementations must not retry internally. Dropping a returned future
/// abandons the call.
#[async_trait::async_trait]
pub trait ScanStore: Send + Sync {
    async fn get_scan(&self, key: &ScanKey) -> Result<ClusterScan, crate::StoreError>;

    async fn get_unit(
        &self,
        kind: UnitKind,
        namespace: &str,
        name: &str,
    ) -> Result<DerivedUnit, crate::StoreError>;

    async fn create_unit(&self, unit: &DerivedUnit) -> Result<(), crate::StoreError>;

    /// Replace the status subresource of `scan` as a whole.
    async fn update_status(&self, scan: &ClusterScan) -> Result<(), crate::StoreError>;

    /// Record `parent` as the controlling owner of `child`.
    fn set_owner_reference(
        &self,
        child: &mut ObjectMeta,
        parent: &ClusterScan,
    ) -> Result<(), OwnershipError> {
        link_controller_owner(child, parent)
    }
}

#[async_trait::async_trait]
impl<T: ScanStore + ?Sized> ScanStore for Arc<T> {
    async fn get_scan(&self, key: &ScanKey) -> Result<ClusterScan, crate::StoreError> {
        (**self).get_scan(key).await
    }

    async fn get_unit(
        &self,
        kind: UnitKind,
        namespace: &str,
        name: &str,
    ) -> Result<DerivedUnit, crate::StoreError> {
        (**self).get_unit(kind, namespace, name).await
    }

    async fn create_unit(&self, unit: &DerivedUnit) -> Result<(), crate::StoreError> {
        (**self).create_unit(unit).await
    }

    async fn update_status(&self, scan: &ClusterScan) -> Result<(), crate::StoreError> {
        (**self).update_status(scan).await
    }

    fn set_owner_reference(
        &self,
        child: &mut ObjectMeta,
        parent: &ClusterScan,
    ) -> Result<(), OwnershipError> {
        (**self).set_owner_reference(child, parent)
    }
}

/// Add a controller owner reference (`controller` and `blockOwnerDeletion`
/// set) pointing at `parent`.
///
/// Idempotent when `parent` already controls `child`. Refuses a child that
/// is controlled by someone else, or that lives in another namespace.
pub fn link_controller_owner(
    child: &mut ObjectMeta,
    parent: &ClusterScan,
) -> Result<(), OwnershipError> {
    if parent.meta().name.is_none() {
        return Err(OwnershipError::MissingParentIdentity("name"));
    }
    if parent.meta().uid.is_none() {
        return Err(OwnershipError::MissingParentIdentity("uid"));
    }

    let parent_ns = parent.namespace().unwrap_or_default();
    let child_ns = child.namespace.clone().unwrap_or_default();
    if parent_ns != child_ns {
        return Err(OwnershipError::CrossNamespace {
            parent: parent_ns,
            child: child_ns,
        });
    }

    let mut oref = parent
        .controller_owner_ref(&())
        .ok_or(OwnershipError::MissingParentIdentity("name"))?;
    oref.block_owner_deletion = Some(true);

    let refs = child.owner_references.get_or_insert_with(Vec::new);
    if let Some(existing) = refs.iter().find(|r| r.controller == Some(true)) {
        if existing.uid == oref.uid {
            return Ok(());
        }
        return Err(OwnershipError::AlreadyControlled {
            kind: existing.kind.clone(),
            name: existing.name.clone(),
        });
    }
    refs.push(oref);
    Ok(())
}
