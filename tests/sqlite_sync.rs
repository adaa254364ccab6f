use anyhow::Result;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use tempfile::tempdir;

use permission_seeder::db;
use permission_seeder::stores::SqliteStore;
use permission_seeder::{
    ActionSpec, PermissionManager, PermissionSpec, PermissionStore, RoleDefinition, RoleDefinitions,
    RoleEntry, RoleStore, SpecialPermissions,
};

async fn setup_pool(dir: &tempfile::TempDir) -> Result<SqlitePool> {
    let opts = SqliteConnectOptions::new()
        .filename(dir.path().join("test.db"))
        .create_if_missing(true);
    let pool = SqlitePool::connect_with(opts).await?;

    db::migrate(&pool).await?;

    Ok(pool)
}

fn manager() -> PermissionManager {
    let spec = PermissionSpec::new().resource("posts").resource("post_translations");
    let mut roles = RoleDefinitions::new();
    roles.insert("admin".to_string(), RoleDefinition::wildcard());
    roles.insert(
        "translator".to_string(),
        RoleDefinition::entries(vec![RoleEntry::named(
            "post_translations",
            ActionSpec::single("read,update"),
        )]),
    );
    PermissionManager::make(&spec, &SpecialPermissions::new()).with_roles(roles)
}

#[tokio::test]
async fn sync_seeds_and_is_idempotent() -> Result<()> {
    let dir = tempdir()?;
    let pool = setup_pool(&dir).await?;
    let store = SqliteStore::new(pool);
    let mut manager = manager();

    let first = manager.sync(&store, &store, None).await?;
    assert_eq!(first.permissions_total, 8);
    assert_eq!(first.permissions_created, 8);
    assert_eq!(first.roles["admin"], 8);
    assert_eq!(first.roles["translator"], 2);

    let second = manager.sync(&store, &store, None).await?;
    assert_eq!(second.permissions_created, 0);
    assert_eq!(second.permissions_existing, 8);
    assert_eq!(second.roles, first.roles);

    assert_eq!(store.permission_count().await?, 8);
    assert_eq!(
        store.role_permission_names("translator").await?,
        vec!["read post_translations", "update post_translations"]
    );
    Ok(())
}

#[tokio::test]
async fn resync_replaces_role_links() -> Result<()> {
    let dir = tempdir()?;
    let pool = setup_pool(&dir).await?;
    let store = SqliteStore::new(pool);
    let mut manager = manager();
    manager.sync(&store, &store, None).await?;

    let mut narrowed = RoleDefinitions::new();
    narrowed.insert("admin".to_string(), RoleDefinition::permissions(["read posts"]));
    manager.sync(&store, &store, Some(narrowed)).await?;

    assert_eq!(store.role_permission_names("admin").await?, vec!["read posts"]);
    assert_eq!(
        store.role_permission_names("translator").await?,
        vec!["read post_translations", "update post_translations"]
    );
    Ok(())
}

#[tokio::test]
async fn find_or_create_reuses_existing_rows() -> Result<()> {
    let dir = tempdir()?;
    let pool = setup_pool(&dir).await?;
    let store = SqliteStore::new(pool);

    let (created, was_created) = PermissionStore::find_or_create(&store, "read posts").await?;
    let (found, was_created_again) = PermissionStore::find_or_create(&store, "read posts").await?;
    assert!(was_created);
    assert!(!was_created_again);
    assert_eq!(created.id, found.id);

    let role = RoleStore::find_or_create(&store, "admin").await?;
    let again = RoleStore::find_or_create(&store, "admin").await?;
    assert_eq!(role.id, again.id);
    assert_eq!(again.name, "admin");

    // unknown names are skipped rather than failing the replace
    store
        .replace_permissions(&role, &["read posts".to_string(), "fly posts".to_string()])
        .await?;
    assert_eq!(store.role_permission_names("admin").await?, vec!["read posts"]);
    Ok(())
}

#[tokio::test]
async fn tampered_migration_history_is_a_migration_error() -> Result<()> {
    let dir = tempdir()?;
    let pool = setup_pool(&dir).await?;

    db::migrate(&pool).await?;

    sqlx::query("UPDATE _sqlx_migrations SET checksum = x'00'")
        .execute(&pool)
        .await?;

    let err = db::migrate(&pool).await.unwrap_err();
    assert_eq!(err.kind(), "migration");
    Ok(())
}
