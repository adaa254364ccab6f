//! Reconciler: pushes a catalog and its compiled roles into the stores.
//!
//! Permissions are find-or-create by exact name. Role links are replaced
//! wholesale, so anything no longer granted is detached. A store error
//! aborts the run; nothing is rolled back here.

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::errors::AppResult;
use crate::models::rbac::{Permission, Role};
use crate::roles::CompiledRole;

#[async_trait]
pub trait PermissionStore: Send + Sync {
    /// Returns the record and whether it was created by this call.
    async fn find_or_create(&self, name: &str) -> AppResult<(Permission, bool)>;
}

#[async_trait]
pub trait RoleStore: Send + Sync {
    async fn find_or_create(&self, name: &str) -> AppResult<Role>;

    /// Make `permission_names` the role's exact permission set.
    async fn replace_permissions(&self, role: &Role, permission_names: &[String]) -> AppResult<()>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub permissions_total: usize,
    pub permissions_created: usize,
    pub permissions_existing: usize,
    pub roles_processed: usize,
    /// Role name to number of permissions attached.
    pub roles: IndexMap<String, usize>,
}

pub async fn sync<P, R>(
    catalog: &Catalog,
    compiled_roles: &IndexMap<String, CompiledRole>,
    permission_store: &P,
    role_store: &R,
) -> AppResult<SyncReport>
where
    P: PermissionStore + ?Sized,
    R: RoleStore + ?Sized,
{
    let flat = catalog.flatten();
    let mut report = SyncReport {
        permissions_total: flat.len(),
        ..SyncReport::default()
    };

    for name in &flat {
        let (_, created) = permission_store.find_or_create(name).await?;
        if created {
            tracing::debug!(permission = %name, "permission created");
            report.permissions_created += 1;
        } else {
            report.permissions_existing += 1;
        }
    }

    for (role_name, permissions) in compiled_roles {
        let role = role_store.find_or_create(role_name).await?;
        let names: Vec<String> = permissions.iter().cloned().collect();
        role_store.replace_permissions(&role, &names).await?;

        tracing::info!(role = %role_name, permissions = names.len(), "role permissions synced");
        report.roles.insert(role_name.clone(), names.len());
    }
    report.roles_processed = report.roles.len();

    tracing::info!(
        total = report.permissions_total,
        created = report.permissions_created,
        existing = report.permissions_existing,
        roles = report.roles_processed,
        "permission sync finished"
    );

    Ok(report)
}
