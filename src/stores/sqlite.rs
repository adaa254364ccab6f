use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use crate::db::row_parsers::{permission_from_row, role_from_row};
use crate::errors::AppResult;
use crate::models::rbac::{Permission, Role};
use crate::sync::{PermissionStore, RoleStore};

const PERMISSION_COLUMNS: &str = "id, name, description, created_at, updated_at";
const ROLE_COLUMNS: &str = "id, name, description, created_at, updated_at";

/// SQLite-backed store over the `permissions`, `roles` and
/// `role_permissions` tables.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn find_permission(&self, name: &str) -> AppResult<Option<Permission>> {
        let sql = format!("SELECT {} FROM permissions WHERE name = ?", PERMISSION_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(permission_from_row).transpose()
    }

    async fn find_role(&self, name: &str) -> AppResult<Option<Role>> {
        let sql = format!("SELECT {} FROM roles WHERE name = ?", ROLE_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(role_from_row).transpose()
    }

    /// Permission names attached to a role, ordered by name.
    pub async fn role_permission_names(&self, role_name: &str) -> AppResult<Vec<String>> {
        let names = sqlx::query_scalar::<_, String>(
            "SELECT p.name FROM permissions p \
             JOIN role_permissions rp ON rp.permission_id = p.id \
             JOIN roles r ON r.id = rp.role_id \
             WHERE r.name = ? ORDER BY p.name",
        )
        .bind(role_name)
        .fetch_all(&self.pool)
        .await?;

        Ok(names)
    }

    pub async fn permission_count(&self) -> AppResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM permissions")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl PermissionStore for SqliteStore {
    async fn find_or_create(&self, name: &str) -> AppResult<(Permission, bool)> {
        if let Some(existing) = self.find_permission(name).await? {
            return Ok((existing, false));
        }

        let permission = Permission::new(name);
        sqlx::query(
            "INSERT INTO permissions (id, name, description, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(permission.id.to_string())
        .bind(&permission.name)
        .bind(&permission.description)
        .bind(permission.created_at)
        .bind(permission.updated_at)
        .execute(&self.pool)
        .await?;

        Ok((permission, true))
    }
}

#[async_trait]
impl RoleStore for SqliteStore {
    async fn find_or_create(&self, name: &str) -> AppResult<Role> {
        if let Some(existing) = self.find_role(name).await? {
            return Ok(existing);
        }

        let role = Role::new(name);
        sqlx::query(
            "INSERT INTO roles (id, name, description, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(role.id.to_string())
        .bind(&role.name)
        .bind(&role.description)
        .bind(role.created_at)
        .bind(role.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(role)
    }

    async fn replace_permissions(&self, role: &Role, permission_names: &[String]) -> AppResult<()> {
        let role_id = role.id.to_string();
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM role_permissions WHERE role_id = ?")
            .bind(&role_id)
            .execute(&mut *tx)
            .await?;

        for name in permission_names {
            let permission_id: Option<String> =
                sqlx::query_scalar("SELECT id FROM permissions WHERE name = ?")
                    .bind(name)
                    .fetch_optional(&mut *tx)
                    .await?;

            let Some(permission_id) = permission_id else {
                tracing::warn!(role = %role.name, permission = %name, "skipping unknown permission");
                continue;
            };

            sqlx::query(
                "INSERT OR IGNORE INTO role_permissions (role_id, permission_id, created_at) VALUES (?, ?, ?)",
            )
            .bind(&role_id)
            .bind(&permission_id)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
