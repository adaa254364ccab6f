//! Facade tying the catalog, role definitions and reconciler together.

use indexmap::{IndexMap, IndexSet};

use crate::catalog::{Catalog, PermissionSpec, SpecialPermissions};
use crate::config::ManagerConfig;
use crate::errors::AppResult;
use crate::roles::{compile_all_roles, CompiledRole, RoleDefinitions};
use crate::sync::{self, PermissionStore, RoleStore, SyncReport};

/// Holds the built catalog and an optional set of role definitions.
///
/// `only` and `remove` return a new manager; the one they were called on
/// keeps its catalog.
#[derive(Debug, Clone, Default)]
pub struct PermissionManager {
    catalog: Catalog,
    roles_definition: RoleDefinitions,
}

impl PermissionManager {
    pub fn make(spec: &PermissionSpec, specials: &SpecialPermissions) -> Self {
        Self {
            catalog: Catalog::build(spec, specials),
            roles_definition: RoleDefinitions::new(),
        }
    }

    /// Build from a parsed document, applying `only` then `remove`.
    pub fn from_config(config: &ManagerConfig) -> Self {
        let mut manager = Self::make(&config.permissions, &config.special_permissions);
        if let Some(only) = &config.only {
            manager = manager.only(only);
        }
        if let Some(remove) = &config.remove {
            manager = manager.remove(remove);
        }
        manager.with_roles(config.roles.clone())
    }

    pub fn with_roles(mut self, definitions: RoleDefinitions) -> Self {
        self.roles_definition = definitions;
        self
    }

    pub fn roles_definition(&self) -> &RoleDefinitions {
        &self.roles_definition
    }

    pub fn get(&self) -> &Catalog {
        &self.catalog
    }

    pub fn all(&self) -> IndexSet<String> {
        self.catalog.flatten()
    }

    pub fn only<S: AsRef<str>>(&self, allowed: &[S]) -> Self {
        Self {
            catalog: self.catalog.only(allowed),
            roles_definition: self.roles_definition.clone(),
        }
    }

    pub fn remove<S: AsRef<str>>(&self, denied: &[S]) -> Self {
        Self {
            catalog: self.catalog.remove(denied),
            roles_definition: self.roles_definition.clone(),
        }
    }

    pub fn pick<S: AsRef<str>>(&self, names: &[S]) -> Vec<String> {
        self.catalog.pick(names)
    }

    /// Compile arbitrary definitions against the current catalog.
    pub fn roles(&self, definitions: &RoleDefinitions) -> IndexMap<String, CompiledRole> {
        compile_all_roles(definitions, &self.all())
    }

    /// Compile the attached definitions.
    pub fn compiled_roles(&self) -> IndexMap<String, CompiledRole> {
        self.roles(&self.roles_definition)
    }

    /// Push the catalog and compiled roles into the stores. `definitions`,
    /// when given, replaces the attached ones first.
    pub async fn sync<P, R>(
        &mut self,
        permission_store: &P,
        role_store: &R,
        definitions: Option<RoleDefinitions>,
    ) -> AppResult<SyncReport>
    where
        P: PermissionStore + ?Sized,
        R: RoleStore + ?Sized,
    {
        if let Some(definitions) = definitions {
            self.roles_definition = definitions;
        }

        let compiled = self.compiled_roles();
        sync::sync(&self.catalog, &compiled, permission_store, role_store).await
    }
}
