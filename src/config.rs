//! Environment settings and the declarative permissions document.
//!
//! Shapes are decided once here: numeric keys become positional entries,
//! everything else is named. Malformed tokens inside a valid shape are
//! dropped; a wrong top-level shape is an [`AppError::InvalidConfig`].

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::catalog::{PermissionSpec, ResourceEntry, SpecialPermissions};
use crate::errors::{AppError, AppResult};
use crate::permission::{is_positional_key, ActionSpec};
use crate::roles::{RoleDefinition, RoleDefinitions, RoleEntry};

pub const DEFAULT_CONFIG_PATH: &str = "config/permissions.json";

/// Load `.env` from the working directory, falling back to the crate root.
pub fn load_env() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    let crate_env = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    let _ = dotenvy::from_path(crate_env);
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: Option<String>,
    pub permissions_config: PathBuf,
}

impl Settings {
    pub fn from_env() -> Self {
        let database_url = std::env::var("DATABASE_URL").ok().filter(|v| !v.trim().is_empty());
        let permissions_config = std::env::var("PERMISSIONS_CONFIG")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

        Self {
            database_url,
            permissions_config,
        }
    }

    /// The store is required for syncing; its absence is fatal.
    pub fn require_database_url(&self) -> AppResult<&str> {
        self.database_url
            .as_deref()
            .ok_or_else(|| AppError::configuration("DATABASE_URL not set"))
    }
}

/// Parsed permissions document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ManagerConfig {
    #[serde(default)]
    pub permissions: PermissionSpec,
    #[serde(default, deserialize_with = "deserialize_specials")]
    pub special_permissions: SpecialPermissions,
    #[serde(default)]
    pub roles: RoleDefinitions,
    #[serde(default, deserialize_with = "deserialize_filter")]
    pub only: Option<Vec<String>>,
    #[serde(default, deserialize_with = "deserialize_filter")]
    pub remove: Option<Vec<String>>,
}

impl ManagerConfig {
    pub fn from_json_str(raw: &str) -> AppResult<Self> {
        let de = &mut serde_json::Deserializer::from_str(raw);
        serde_path_to_error::deserialize(de).map_err(|err| {
            let path = err.path().to_string();
            AppError::invalid_config(path, err.into_inner().to_string())
        })
    }

    pub fn load(path: &Path) -> AppResult<Self> {
        let raw = fs::read_to_string(path).map_err(|err| {
            AppError::configuration(format!("cannot read {}: {}", path.display(), err))
        })?;
        tracing::debug!(path = %path.display(), "loading permissions config");
        Self::from_json_str(&raw)
    }
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Scalars, plus the scalars of directly nested arrays.
fn flatten_scalars<'a>(values: impl Iterator<Item = &'a Value>) -> Vec<String> {
    values
        .flat_map(|value| match value {
            Value::Array(inner) => inner.iter().filter_map(scalar).collect::<Vec<_>>(),
            other => scalar(other).into_iter().collect::<Vec<_>>(),
        })
        .collect()
}

fn action_spec(value: &Value) -> ActionSpec {
    match value {
        Value::Null => ActionSpec::Absent,
        Value::Array(items) => ActionSpec::List(flatten_scalars(items.iter())),
        Value::Object(map) => ActionSpec::List(flatten_scalars(map.values())),
        other => scalar(other).map(ActionSpec::Single).unwrap_or_default(),
    }
}

fn resource_entries(map: &Map<String, Value>) -> Vec<ResourceEntry> {
    map.iter()
        .filter_map(|(key, value)| {
            if is_positional_key(key) {
                scalar(value).map(ResourceEntry::Positional)
            } else {
                Some(ResourceEntry::Named {
                    resource: key.clone(),
                    actions: action_spec(value),
                })
            }
        })
        .collect()
}

fn permission_spec(value: Value) -> Result<PermissionSpec, String> {
    match value {
        Value::Null => Ok(PermissionSpec::new()),
        Value::Object(map) => Ok(resource_entries(&map).into_iter().collect()),
        Value::Array(items) => Ok(items
            .iter()
            .flat_map(|item| match item {
                Value::Object(map) => resource_entries(map),
                other => scalar(other).map(ResourceEntry::Positional).into_iter().collect(),
            })
            .collect()),
        other => Err(format!("expected object or array of resources, found {}", kind(&other))),
    }
}

fn role_entries(map: &Map<String, Value>) -> Vec<RoleEntry> {
    map.iter()
        .filter_map(|(key, value)| {
            if is_positional_key(key) {
                scalar(value).map(RoleEntry::Positional)
            } else {
                Some(RoleEntry::named(key.clone(), action_spec(value)))
            }
        })
        .collect()
}

fn role_definition(value: Value) -> Result<RoleDefinition, String> {
    match value {
        Value::Null => Ok(RoleDefinition::entries(Vec::new())),
        Value::Object(map) => Ok(RoleDefinition::entries(role_entries(&map))),
        Value::Array(items) => Ok(RoleDefinition::entries(
            items
                .iter()
                .flat_map(|item| match item {
                    Value::Object(map) => role_entries(map),
                    other => scalar(other).map(RoleEntry::Positional).into_iter().collect(),
                })
                .collect(),
        )),
        other => scalar(&other)
            .map(RoleDefinition::Token)
            .ok_or_else(|| format!("expected role definition, found {}", kind(&other))),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl<'de> Deserialize<'de> for PermissionSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        permission_spec(Value::deserialize(deserializer)?).map_err(de::Error::custom)
    }
}

impl<'de> Deserialize<'de> for RoleDefinition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        role_definition(Value::deserialize(deserializer)?).map_err(de::Error::custom)
    }
}

fn deserialize_specials<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<SpecialPermissions, D::Error> {
    let map = match Value::deserialize(deserializer)? {
        Value::Null => return Ok(SpecialPermissions::new()),
        Value::Object(map) => map,
        other => {
            return Err(de::Error::custom(format!(
                "expected object of special permissions, found {}",
                kind(&other)
            )))
        }
    };

    Ok(map
        .iter()
        .map(|(resource, value)| {
            let extra = match value {
                Value::Array(items) => flatten_scalars(items.iter()),
                other => scalar(other).into_iter().collect(),
            };
            (resource.clone(), extra)
        })
        .collect())
}

fn deserialize_filter<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Vec<String>>, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::Array(items) => Ok(Some(flatten_scalars(items.iter()))),
        other @ (Value::String(_) | Value::Number(_)) => {
            Ok(Some(scalar(&other).into_iter().collect()))
        }
        other => Err(de::Error::custom(format!(
            "expected array of permission names, found {}",
            kind(&other)
        ))),
    }
}
