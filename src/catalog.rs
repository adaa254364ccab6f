//! Catalog builder.
//!
//! Turns resource/action declarations plus special permissions into an
//! ordered map of resource name to permission set. Every operation here is a
//! pure function: filters hand back a new [`Catalog`] and leave the source
//! untouched.

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

use crate::permission::{format_permission, ActionSpec, DEFAULT_ACTIONS};

/// One declared resource, tagged when the document is parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceEntry {
    /// Resource listed by position: always gets the default actions.
    Positional(String),
    /// Resource listed by name with its own action spec.
    Named { resource: String, actions: ActionSpec },
}

impl ResourceEntry {
    pub fn resource(&self) -> &str {
        match self {
            ResourceEntry::Positional(resource) => resource,
            ResourceEntry::Named { resource, .. } => resource,
        }
    }

    /// Actions this entry grants. Defaults are used verbatim, never merged
    /// with explicit actions.
    pub fn actions(&self) -> Vec<String> {
        let explicit = match self {
            ResourceEntry::Positional(_) => Vec::new(),
            ResourceEntry::Named { actions, .. } => actions.wrapped(),
        };

        if explicit.is_empty() {
            DEFAULT_ACTIONS.iter().map(|a| a.to_string()).collect()
        } else {
            explicit
        }
    }
}

/// Ordered resource declarations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionSpec {
    entries: Vec<ResourceEntry>,
}

impl PermissionSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a resource with the default action set.
    pub fn resource(mut self, resource: impl Into<String>) -> Self {
        self.entries.push(ResourceEntry::Positional(resource.into()));
        self
    }

    /// Declare a resource with explicit actions.
    pub fn with_actions(mut self, resource: impl Into<String>, actions: ActionSpec) -> Self {
        self.entries.push(ResourceEntry::Named {
            resource: resource.into(),
            actions,
        });
        self
    }

    pub fn push(&mut self, entry: ResourceEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[ResourceEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<ResourceEntry> for PermissionSpec {
    fn from_iter<T: IntoIterator<Item = ResourceEntry>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Extra permissions appended to an already declared resource.
pub type SpecialPermissions = IndexMap<String, Vec<String>>;

/// Resource name to ordered, deduplicated permission set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Catalog {
    resources: IndexMap<String, IndexSet<String>>,
}

impl Catalog {
    /// Build a catalog. Resources only named in `specials` are ignored.
    ///
    /// A resource declared twice keeps its first position and the last
    /// declaration's permissions.
    pub fn build(spec: &PermissionSpec, specials: &SpecialPermissions) -> Self {
        let mut resources = IndexMap::new();

        for entry in spec.entries() {
            let resource = entry.resource();
            let base = entry
                .actions()
                .into_iter()
                .map(|action| format_permission(&action, resource));
            let extra = specials
                .get(resource)
                .into_iter()
                .flatten()
                .filter(|permission| !permission.is_empty())
                .cloned();

            let permissions: IndexSet<String> = base.chain(extra).collect();
            resources.insert(resource.to_string(), permissions);
        }

        Self { resources }
    }

    pub fn get(&self, resource: &str) -> Option<&IndexSet<String>> {
        self.resources.get(resource)
    }

    pub fn resources(&self) -> impl Iterator<Item = (&str, &IndexSet<String>)> {
        self.resources.iter().map(|(name, perms)| (name.as_str(), perms))
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// All permissions, resource by resource, first occurrence wins.
    pub fn flatten(&self) -> IndexSet<String> {
        self.resources.values().flatten().cloned().collect()
    }

    /// Keep only permissions listed in `allowed`. Emptied resources vanish.
    pub fn only<S: AsRef<str>>(&self, allowed: &[S]) -> Self {
        let allowed: IndexSet<&str> = allowed.iter().map(AsRef::as_ref).collect();
        self.retain(|permission| allowed.contains(permission))
    }

    /// Drop permissions listed in `denied`. Emptied resources vanish.
    pub fn remove<S: AsRef<str>>(&self, denied: &[S]) -> Self {
        let denied: IndexSet<&str> = denied.iter().map(AsRef::as_ref).collect();
        self.retain(|permission| !denied.contains(permission))
    }

    /// Names that exist in the catalog, in the caller's order, deduplicated.
    /// Unknown names are dropped.
    pub fn pick<S: AsRef<str>>(&self, names: &[S]) -> Vec<String> {
        let flat = self.flatten();
        let picked: IndexSet<&str> = names
            .iter()
            .map(AsRef::as_ref)
            .filter(|name| flat.contains(*name))
            .collect();
        picked.into_iter().map(str::to_string).collect()
    }

    /// Plain map view, handy for printing and assertions.
    pub fn to_map(&self) -> IndexMap<String, Vec<String>> {
        self.resources
            .iter()
            .map(|(name, perms)| (name.clone(), perms.iter().cloned().collect()))
            .collect()
    }

    fn retain(&self, keep: impl Fn(&str) -> bool) -> Self {
        let resources = self
            .resources
            .iter()
            .filter_map(|(name, perms)| {
                let kept: IndexSet<String> = perms
                    .iter()
                    .filter(|permission| keep(permission.as_str()))
                    .cloned()
                    .collect();
                (!kept.is_empty()).then(|| (name.clone(), kept))
            })
            .collect();

        Self { resources }
    }
}
