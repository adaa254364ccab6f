use std::io::Write;

use anyhow::Result;
use tempfile::NamedTempFile;

use permission_seeder::config::ManagerConfig;
use permission_seeder::{ActionSpec, AppError, PermissionManager, ResourceEntry, RoleDefinition, RoleEntry};

#[test]
fn object_form_resolves_numeric_keys_as_positional() -> Result<()> {
    let config = ManagerConfig::from_json_str(
        r#"{"permissions": {"0": "posts", "comments": ["read", null, ""], "tags": "read", "pages": null}}"#,
    )?;

    assert_eq!(
        config.permissions.entries(),
        &[
            ResourceEntry::Positional("posts".to_string()),
            ResourceEntry::Named {
                resource: "comments".to_string(),
                actions: ActionSpec::list(["read", ""]),
            },
            ResourceEntry::Named {
                resource: "tags".to_string(),
                actions: ActionSpec::single("read"),
            },
            ResourceEntry::Named {
                resource: "pages".to_string(),
                actions: ActionSpec::Absent,
            },
        ]
    );
    Ok(())
}

#[test]
fn array_form_mixes_positional_and_named_entries() -> Result<()> {
    let config = ManagerConfig::from_json_str(
        r#"{"permissions": ["posts", {"comments": [["read"], "destroy"]}, null, "pages"]}"#,
    )?;

    let resources: Vec<&str> = config.permissions.entries().iter().map(|e| e.resource()).collect();
    assert_eq!(resources, vec!["posts", "comments", "pages"]);
    assert_eq!(
        config.permissions.entries()[1],
        ResourceEntry::Named {
            resource: "comments".to_string(),
            actions: ActionSpec::list(["read", "destroy"]),
        }
    );
    Ok(())
}

#[test]
fn role_definitions_keep_their_shapes() -> Result<()> {
    let config = ManagerConfig::from_json_str(
        r#"{
            "roles": {
                "admin": "*",
                "auditor": ["read posts", 7, {"comments": "read"}],
                "editor": {"posts": "read, update", "0": "publish posts"},
                "nobody": null
            }
        }"#,
    )?;

    let names: Vec<&str> = config.roles.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["admin", "auditor", "editor", "nobody"]);
    assert_eq!(config.roles["admin"], RoleDefinition::wildcard());
    assert_eq!(
        config.roles["auditor"],
        RoleDefinition::entries(vec![
            RoleEntry::positional("read posts"),
            RoleEntry::positional("7"),
            RoleEntry::named("comments", ActionSpec::single("read")),
        ])
    );
    assert_eq!(
        config.roles["editor"],
        RoleDefinition::entries(vec![
            RoleEntry::named("posts", ActionSpec::single("read, update")),
            RoleEntry::positional("publish posts"),
        ])
    );
    assert_eq!(config.roles["nobody"], RoleDefinition::entries(Vec::new()));
    Ok(())
}

#[test]
fn wrong_top_level_shape_reports_path() {
    let err = ManagerConfig::from_json_str(r#"{"permissions": 42}"#).unwrap_err();
    match err {
        AppError::InvalidConfig { path, message } => {
            assert_eq!(path, "permissions");
            assert!(message.contains("number"), "unexpected message: {message}");
        }
        other => panic!("expected InvalidConfig, got {other:?}"),
    }

    let err = ManagerConfig::from_json_str(r#"{"roles": {"admin": true}}"#).unwrap_err();
    assert!(matches!(err, AppError::InvalidConfig { ref path, .. } if path == "roles.admin"));
}

#[test]
fn full_document_drives_the_manager() -> Result<()> {
    let mut file = NamedTempFile::new()?;
    write!(
        file,
        r#"{{
            "permissions": ["posts", {{"comments": ["read", "destroy"]}}],
            "special_permissions": {{"posts": ["publish posts", null]}},
            "roles": {{
                "admin": "*",
                "editor": {{"posts": "read | update | publish posts", "comments": "read"}}
            }},
            "remove": ["destroy comments"]
        }}"#
    )?;

    let config = ManagerConfig::load(file.path())?;
    let manager = PermissionManager::from_config(&config);

    assert_eq!(
        manager.get().to_map()["posts"],
        vec!["read posts", "create posts", "update posts", "destroy posts", "publish posts"]
    );
    assert_eq!(manager.get().to_map()["comments"], vec!["read comments"]);

    let roles = manager.compiled_roles();
    assert_eq!(roles["admin"].len(), 6);
    let editor: Vec<&str> = roles["editor"].iter().map(String::as_str).collect();
    assert_eq!(editor, vec!["read posts", "update posts", "publish posts", "read comments"]);
    Ok(())
}

#[test]
fn filter_lists_drop_non_scalar_names() -> Result<()> {
    let config = ManagerConfig::from_json_str(
        r#"{
            "permissions": ["posts", "comments"],
            "only": ["read posts", null, "destroy comments", 5, {"nested": true}],
            "remove": ["destroy comments", null]
        }"#,
    )?;

    assert_eq!(
        config.only.as_deref(),
        Some(&["read posts".to_string(), "destroy comments".to_string(), "5".to_string()][..])
    );
    assert_eq!(config.remove.as_deref(), Some(&["destroy comments".to_string()][..]));

    let manager = PermissionManager::from_config(&config);
    let all = manager.all();
    assert_eq!(all.iter().map(String::as_str).collect::<Vec<_>>(), vec!["read posts"]);
    Ok(())
}

#[test]
fn filter_accepts_a_single_name_and_rejects_objects() -> Result<()> {
    let config = ManagerConfig::from_json_str(r#"{"permissions": ["posts"], "remove": "read posts"}"#)?;
    assert_eq!(config.remove.as_deref(), Some(&["read posts".to_string()][..]));

    let err = ManagerConfig::from_json_str(r#"{"only": {"posts": "read"}}"#).unwrap_err();
    assert!(matches!(err, AppError::InvalidConfig { ref path, .. } if path == "only"));
    Ok(())
}

#[test]
fn missing_file_is_a_configuration_error() {
    let err = ManagerConfig::load(std::path::Path::new("/definitely/not/here.json")).unwrap_err();
    assert_eq!(err.kind(), "configuration");
}
