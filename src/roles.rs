//! Role compiler.
//!
//! Resolves role definitions (wildcard, literal permission lists or
//! resource-to-action shorthand) into concrete subsets of a flat catalog.
//! Tokens that do not resolve to a catalog permission are dropped.

use indexmap::{IndexMap, IndexSet};

use crate::permission::{expand_token, split_phrases, ActionSpec, WILDCARD};

/// Permissions granted to one role, in first-seen order.
pub type CompiledRole = IndexSet<String>;

/// Role name to definition, in declaration order.
pub type RoleDefinitions = IndexMap<String, RoleDefinition>;

/// One item of a role definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleEntry {
    /// A complete permission name, matched exactly.
    Positional(String),
    /// Action shorthand scoped to a resource.
    Named { resource: String, actions: ActionSpec },
}

impl RoleEntry {
    pub fn positional(permission: impl Into<String>) -> Self {
        Self::Positional(permission.into())
    }

    pub fn named(resource: impl Into<String>, actions: ActionSpec) -> Self {
        Self::Named {
            resource: resource.into(),
            actions,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleDefinition {
    /// Bare string: the wildcard, or comma/pipe separated permission names.
    Token(String),
    /// List or mapping form.
    Entries(Vec<RoleEntry>),
}

impl RoleDefinition {
    pub fn wildcard() -> Self {
        Self::Token(WILDCARD.to_string())
    }

    pub fn token(raw: impl Into<String>) -> Self {
        Self::Token(raw.into())
    }

    /// Literal permission names.
    pub fn permissions<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Entries(names.into_iter().map(RoleEntry::positional).collect())
    }

    pub fn entries(entries: Vec<RoleEntry>) -> Self {
        Self::Entries(entries)
    }

    /// `"*"` itself, or a single-item container whose only value is `"*"`.
    pub fn is_wildcard(&self) -> bool {
        match self {
            RoleDefinition::Token(token) => token == WILDCARD,
            RoleDefinition::Entries(entries) => match entries.as_slice() {
                [RoleEntry::Positional(token)] => token == WILDCARD,
                [RoleEntry::Named { actions, .. }] => actions.is_wildcard(),
                _ => false,
            },
        }
    }

    fn normalized(&self) -> Vec<RoleEntry> {
        match self {
            RoleDefinition::Token(raw) => split_phrases(raw)
                .into_iter()
                .map(RoleEntry::Positional)
                .collect(),
            RoleDefinition::Entries(entries) => entries.clone(),
        }
    }
}

/// Compile one definition against the flat catalog.
///
/// The result is always a subset of `flat`. A named resource with no
/// actions contributes nothing; defaults never apply here.
pub fn compile_role(definition: &RoleDefinition, flat: &IndexSet<String>) -> CompiledRole {
    if definition.is_wildcard() {
        return flat.clone();
    }

    let mut compiled = CompiledRole::new();
    for entry in definition.normalized() {
        match entry {
            RoleEntry::Positional(permission) => {
                if flat.contains(&permission) {
                    compiled.insert(permission);
                }
            }
            RoleEntry::Named { resource, actions } => {
                let expanded = actions
                    .shorthand()
                    .into_iter()
                    .map(|token| expand_token(&token, &resource))
                    .filter(|permission| flat.contains(permission));
                compiled.extend(expanded);
            }
        }
    }

    compiled
}

pub fn compile_all_roles(
    definitions: &RoleDefinitions,
    flat: &IndexSet<String>,
) -> IndexMap<String, CompiledRole> {
    definitions
        .iter()
        .map(|(name, definition)| (name.clone(), compile_role(definition, flat)))
        .collect()
}
