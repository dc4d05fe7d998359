//! Collaborators the manager consumes: where bundle declarations come from
//! and how symbolic path aliases resolve.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::bundle::BundleDeclaration;
use crate::ViewError;

// ---------------------------------------------------------------------------
// Bundle Source
// ---------------------------------------------------------------------------

/// Supplies the static declaration of a bundle by name.
pub trait BundleSource: Send + Sync {
    fn declaration(&self, name: &str) -> Option<BundleDeclaration>;
}

/// A [`BundleSource`] backed by an in-memory table.
///
/// Deserializes from a JSON object of `name → declaration`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaticBundleSource {
    declarations: HashMap<String, BundleDeclaration>,
}

impl StaticBundleSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, name: impl Into<String>, declaration: BundleDeclaration) -> Self {
        self.insert(name, declaration);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, declaration: BundleDeclaration) {
        self.declarations.insert(name.into(), declaration);
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }
}

impl BundleSource for StaticBundleSource {
    fn declaration(&self, name: &str) -> Option<BundleDeclaration> {
        self.declarations.get(name).cloned()
    }
}

// ---------------------------------------------------------------------------
// Alias Resolution
// ---------------------------------------------------------------------------

/// Resolves symbolic path aliases (`@web/assets`) to concrete paths or URLs.
pub trait AliasResolver: Send + Sync {
    fn resolve(&self, path: &str) -> Result<String, ViewError>;
}

/// Identity resolver: paths are used exactly as given.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAliases;

impl AliasResolver for NoAliases {
    fn resolve(&self, path: &str) -> Result<String, ViewError> {
        Ok(path.to_string())
    }
}

/// Table of root aliases.
///
/// A path starting with `@` has its first segment (up to the first `/`)
/// replaced by the registered value. Paths without `@` pass through.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Aliases {
    roots: HashMap<String, String>,
}

impl Aliases {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `alias` (with or without the leading `@`). A trailing `/` on
    /// the value is dropped.
    pub fn with(mut self, alias: &str, value: &str) -> Self {
        let alias = if alias.starts_with('@') {
            alias.to_string()
        } else {
            format!("@{}", alias)
        };
        self.roots
            .insert(alias, value.trim_end_matches('/').to_string());
        self
    }
}

impl AliasResolver for Aliases {
    fn resolve(&self, path: &str) -> Result<String, ViewError> {
        if !path.starts_with('@') {
            return Ok(path.to_string());
        }

        let (root, rest) = match path.find('/') {
            Some(idx) => path.split_at(idx),
            None => (path, ""),
        };

        self.roots
            .get(root)
            .map(|value| format!("{}{}", value, rest))
            .ok_or_else(|| ViewError::UnknownAlias(root.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_replace_root_segment() {
        let aliases = Aliases::new().with("@web", "/static/").with("webroot", "/srv/www");
        assert_eq!(aliases.resolve("@web/assets").unwrap(), "/static/assets");
        assert_eq!(aliases.resolve("@webroot").unwrap(), "/srv/www");
        assert_eq!(aliases.resolve("css/site.css").unwrap(), "css/site.css");
    }

    #[test]
    fn unknown_alias_is_an_error() {
        let err = Aliases::new().resolve("@cdn/x.js").unwrap_err();
        assert!(matches!(err, ViewError::UnknownAlias(ref a) if a == "@cdn"));
    }

    #[test]
    fn static_source_lookup() {
        let source = StaticBundleSource::new().with(
            "Core",
            BundleDeclaration {
                js: vec!["core.js".into()],
                ..Default::default()
            },
        );
        assert_eq!(source.len(), 1);
        assert_eq!(source.declaration("Core").unwrap().js, vec!["core.js"]);
        assert!(source.declaration("Missing").is_none());
    }

    #[test]
    fn static_source_from_json() {
        let source: StaticBundleSource =
            serde_json::from_str(r#"{"Grid": {"css": ["grid.css"], "depends": ["Core"]}}"#)
                .unwrap();
        let grid = source.declaration("Grid").unwrap();
        assert_eq!(grid.depends, vec!["Core"]);
    }
}
