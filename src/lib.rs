pub mod catalog;
pub mod config;
pub mod db;
pub mod errors;
pub mod manager;
pub mod models;
pub mod permission;
pub mod roles;
pub mod stores;
pub mod sync;

// Re-export commonly used items for tests
pub use catalog::{Catalog, PermissionSpec, ResourceEntry, SpecialPermissions};
pub use errors::{AppError, AppResult};
pub use manager::PermissionManager;
pub use permission::ActionSpec;
pub use roles::{compile_all_roles, compile_role, CompiledRole, RoleDefinition, RoleDefinitions, RoleEntry};
pub use sync::{sync, PermissionStore, RoleStore, SyncReport};
