//! Permission strings and action tokens.
//!
//! A permission is a plain string so the stores can look it up by name.
//! Base permissions follow the `"<action> <resource>"` shape and are only
//! ever built through [`format_permission`]; special permissions are
//! arbitrary literals.

/// Actions granted to a resource declared without an explicit action list.
pub const DEFAULT_ACTIONS: [&str; 4] = ["read", "create", "update", "destroy"];

/// Role definition token granting the whole flat catalog.
pub const WILDCARD: &str = "*";

/// Build the canonical `"<action> <resource>"` permission name.
pub fn format_permission(action: &str, resource: &str) -> String {
    format!("{} {}", action, resource)
}

/// Expand a role token against a resource.
///
/// Tokens that already carry a space are complete permission phrases and are
/// returned untouched.
pub fn expand_token(token: &str, resource: &str) -> String {
    if token.contains(' ') {
        token.to_string()
    } else {
        format_permission(token, resource)
    }
}

/// Split a shorthand action string on runs of whitespace, commas or pipes.
pub fn split_actions(raw: &str) -> Vec<String> {
    raw.split(|c: char| c.is_whitespace() || c == ',' || c == '|')
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// Split a bare role definition string into literal permission phrases.
///
/// Whitespace is part of a phrase here, so only commas and pipes separate.
pub fn split_phrases(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c == '|')
        .map(str::trim)
        .filter(|phrase| !phrase.is_empty())
        .map(str::to_string)
        .collect()
}

/// Keys made only of ASCII digits mark positional entries.
pub fn is_positional_key(key: &str) -> bool {
    !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit())
}

/// Action specification attached to a named resource.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ActionSpec {
    #[default]
    Absent,
    Single(String),
    List(Vec<String>),
}

impl ActionSpec {
    pub fn single(action: impl Into<String>) -> Self {
        Self::Single(action.into())
    }

    pub fn list<I, S>(actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::List(actions.into_iter().map(Into::into).collect())
    }

    /// Tokens as the catalog sees them: scalars wrapped, empties dropped,
    /// nothing split.
    pub fn wrapped(&self) -> Vec<String> {
        match self {
            ActionSpec::Absent => Vec::new(),
            ActionSpec::Single(action) => non_empty(std::iter::once(action)),
            ActionSpec::List(actions) => non_empty(actions.iter()),
        }
    }

    /// Tokens as role definitions see them: strings are shorthand and get
    /// split on delimiters.
    pub fn shorthand(&self) -> Vec<String> {
        match self {
            ActionSpec::Absent => Vec::new(),
            ActionSpec::Single(raw) => split_actions(raw.trim()),
            ActionSpec::List(actions) => non_empty(actions.iter()),
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, ActionSpec::Single(token) if token == WILDCARD)
    }
}

fn non_empty<'a>(tokens: impl Iterator<Item = &'a String>) -> Vec<String> {
    tokens.filter(|t| !t.is_empty()).cloned().collect()
}
