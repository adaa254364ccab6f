use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use indexmap::IndexMap;
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::models::rbac::{Permission, Role};
use crate::sync::{PermissionStore, RoleStore};

#[derive(Debug, Default)]
struct State {
    permissions: IndexMap<String, Permission>,
    roles: IndexMap<String, Role>,
    links: IndexMap<Uuid, Vec<Uuid>>,
}

/// Process-local store, used for dry runs and tests.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| AppError::internal("in-memory store lock poisoned"))
    }

    /// Permission names in creation order.
    pub fn permission_names(&self) -> AppResult<Vec<String>> {
        Ok(self.lock()?.permissions.keys().cloned().collect())
    }

    pub fn role_names(&self) -> AppResult<Vec<String>> {
        Ok(self.lock()?.roles.keys().cloned().collect())
    }

    /// Names attached to a role, or `None` if the role does not exist.
    pub fn role_permissions(&self, role_name: &str) -> AppResult<Option<Vec<String>>> {
        let state = self.lock()?;
        let Some(role) = state.roles.get(role_name) else {
            return Ok(None);
        };

        let names = state
            .links
            .get(&role.id)
            .into_iter()
            .flatten()
            .filter_map(|id| state.permissions.values().find(|p| p.id == *id))
            .map(|p| p.name.clone())
            .collect();
        Ok(Some(names))
    }
}

#[async_trait]
impl PermissionStore for InMemoryStore {
    async fn find_or_create(&self, name: &str) -> AppResult<(Permission, bool)> {
        let mut state = self.lock()?;
        if let Some(existing) = state.permissions.get(name) {
            return Ok((existing.clone(), false));
        }

        let permission = Permission::new(name);
        state.permissions.insert(name.to_string(), permission.clone());
        Ok((permission, true))
    }
}

#[async_trait]
impl RoleStore for InMemoryStore {
    async fn find_or_create(&self, name: &str) -> AppResult<Role> {
        let mut state = self.lock()?;
        let role = state
            .roles
            .entry(name.to_string())
            .or_insert_with(|| Role::new(name))
            .clone();
        Ok(role)
    }

    async fn replace_permissions(&self, role: &Role, permission_names: &[String]) -> AppResult<()> {
        let mut state = self.lock()?;
        if !state.roles.values().any(|r| r.id == role.id) {
            return Err(AppError::internal(format!("unknown role: {}", role.name)));
        }

        let ids: Vec<Uuid> = permission_names
            .iter()
            .filter_map(|name| state.permissions.get(name).map(|p| p.id))
            .collect();
        state.links.insert(role.id, ids);
        Ok(())
    }
}
