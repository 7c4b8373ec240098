//! `.wikisync/config.toml` contents

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

const DEFAULT_CONCURRENCY: usize = 4;

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

/// What part of the wiki a workspace mirrors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeKind {
    /// A single page
    Page,
    /// A page and all its descendants
    Tree,
    /// A whole space
    Space,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    pub kind: ScopeKind,
    /// Root page for `page` and `tree` scopes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_id: Option<String>,
}

impl Scope {
    pub fn page(id: impl Into<String>) -> Self {
        Self {
            kind: ScopeKind::Page,
            page_id: Some(id.into()),
        }
    }

    pub fn tree(id: impl Into<String>) -> Self {
        Self {
            kind: ScopeKind::Tree,
            page_id: Some(id.into()),
        }
    }

    pub fn space() -> Self {
        Self {
            kind: ScopeKind::Space,
            page_id: None,
        }
    }
}

/// Workspace configuration
///
/// Field order matters for TOML output: the `scope` table must follow the
/// scalar keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Wiki base URL, informational for the remote client
    pub base_url: String,
    /// Space key the scope lives in
    pub space: String,
    /// Credential profile name, resolved by whoever builds the remote client
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    /// Bounded parallelism for per-node remote calls
    #[serde(default = "default_concurrency")]
    pub max_concurrency: usize,
    pub scope: Scope,
}

impl WorkspaceConfig {
    pub fn new(base_url: impl Into<String>, space: impl Into<String>, scope: Scope) -> Self {
        Self {
            base_url: base_url.into(),
            space: space.into(),
            profile: None,
            max_concurrency: DEFAULT_CONCURRENCY,
            scope,
        }
    }

    /// Reject scopes that do not identify exactly one subtree.
    pub fn validate(&self) -> Result<()> {
        if self.space.trim().is_empty() {
            return Err(Error::ambiguous_scope("space key is empty"));
        }
        match (self.scope.kind, self.scope.page_id.as_deref()) {
            (ScopeKind::Page | ScopeKind::Tree, None) => Err(Error::ambiguous_scope(
                "page and tree scopes need a page_id",
            )),
            (ScopeKind::Page | ScopeKind::Tree, Some(id)) if id.trim().is_empty() => {
                Err(Error::ambiguous_scope("page_id is empty"))
            }
            (ScopeKind::Space, Some(_)) => Err(Error::ambiguous_scope(
                "space scope cannot also name a page_id; use a tree scope",
            )),
            _ => Ok(()),
        }
    }

    /// Parallelism actually used; never zero.
    pub fn concurrency(&self) -> usize {
        self.max_concurrency.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_documented_layout() {
        let config: WorkspaceConfig = toml::from_str(
            r#"
base_url = "https://wiki.example.com"
space = "DOCS"
profile = "work"

[scope]
kind = "tree"
page_id = "100"
"#,
        )
        .unwrap();
        assert_eq!(config.scope, Scope::tree("100"));
        assert_eq!(config.max_concurrency, 4);
        assert_eq!(config.profile.as_deref(), Some("work"));
        config.validate().unwrap();
    }

    #[test]
    fn round_trips_through_toml() {
        let config = WorkspaceConfig::new("https://w", "DOCS", Scope::space());
        let text = toml::to_string_pretty(&config).unwrap();
        let back: WorkspaceConfig = toml::from_str(&text).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn tree_without_page_is_ambiguous() {
        let config = WorkspaceConfig::new(
            "https://w",
            "DOCS",
            Scope {
                kind: ScopeKind::Tree,
                page_id: None,
            },
        );
        assert!(matches!(config.validate(), Err(Error::AmbiguousScope { .. })));
    }

    #[test]
    fn space_with_page_is_ambiguous() {
        let mut config = WorkspaceConfig::new("https://w", "DOCS", Scope::space());
        config.scope.page_id = Some("1".into());
        assert!(matches!(config.validate(), Err(Error::AmbiguousScope { .. })));
    }

    #[test]
    fn zero_concurrency_is_clamped() {
        let mut config = WorkspaceConfig::new("https://w", "DOCS", Scope::page("1"));
        config.max_concurrency = 0;
        assert_eq!(config.concurrency(), 1);
    }
}
