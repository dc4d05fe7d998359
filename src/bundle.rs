//! Asset bundles: named groups of CSS/JS files plus their dependencies.
//!
//! A [`BundleDeclaration`] is the static, serializable description supplied by
//! a [`BundleSource`](crate::source::BundleSource) or by manager overrides. An
//! [`AssetBundle`] is the resolved, shared instance the manager caches.
//!
//! **Invariants:**
//! - A bundle is immutable once built. Positions pinned while resolving a
//!   render belong to that render's view, never to the shared bundle.

use std::collections::BTreeMap;

use arcstr::ArcStr;
use serde::{Deserialize, Serialize};

use crate::html::Attributes;
use crate::manager::AssetManager;
use crate::position::Position;
use crate::source::AliasResolver;
use crate::utils;
use crate::ViewError;

// ---------------------------------------------------------------------------
// FileOptions
// ---------------------------------------------------------------------------

/// Options for a registered CSS or JS file.
///
/// Every key other than the named fields is an HTML attribute of the
/// rendered `<link>` / `<script>` tag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileOptions {
    /// JS files only. Defaults to [`Position::End`] when registered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,

    /// Wrap the tag in an IE conditional comment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,

    /// CSS files only. Wrap the tag in `<noscript>` (ignored with `condition`).
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub noscript: bool,

    /// Bundles this single file depends on. When non-empty, the file is
    /// registered through an ad-hoc bundle instead of the flat registry.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends: Vec<String>,

    #[serde(flatten)]
    pub attributes: Attributes,
}

impl FileOptions {
    pub fn at(position: Position) -> Self {
        Self {
            position: Some(position),
            ..Default::default()
        }
    }

    pub fn depends_on<I, S>(mut self, bundles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends = bundles.into_iter().map(Into::into).collect();
        self
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

// ---------------------------------------------------------------------------
// BundleDeclaration
// ---------------------------------------------------------------------------

/// Static description of a bundle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BundleDeclaration {
    #[serde(default)]
    pub base_path: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub js: Vec<String>,
    #[serde(default)]
    pub css: Vec<String>,
    #[serde(default)]
    pub depends: Vec<String>,
    #[serde(default)]
    pub js_options: FileOptions,
    #[serde(default)]
    pub css_options: FileOptions,
    #[serde(default)]
    pub concat: Option<bool>,
    #[serde(default)]
    pub compress: Option<bool>,
    #[serde(default)]
    pub watch: Option<bool>,
}

impl BundleDeclaration {
    /// Apply a configuration map on top of this declaration.
    ///
    /// Keys in `overrides` replace the corresponding top-level fields.
    pub fn merged(
        &self,
        overrides: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<Self, serde_json::Error> {
        let mut base = match serde_json::to_value(self)? {
            serde_json::Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        for (key, value) in overrides {
            base.insert(key.clone(), value.clone());
        }
        serde_json::from_value(serde_json::Value::Object(base))
    }
}

// ---------------------------------------------------------------------------
// AssetBundle
// ---------------------------------------------------------------------------

/// A resolved bundle, shared between renders via `Arc`.
#[derive(Debug)]
pub struct AssetBundle {
    name: ArcStr,
    /// Directory holding the bundle's files (no trailing separator).
    pub base_path: Option<String>,
    /// URL prefix for the bundle's relative files (no trailing `/`).
    pub base_url: Option<String>,
    pub js: Vec<String>,
    pub css: Vec<String>,
    pub depends: Vec<String>,
    /// Options forwarded to every JS file. `position` lives in [`AssetBundle::position`].
    pub js_options: FileOptions,
    /// Options forwarded to every CSS file.
    pub css_options: FileOptions,
    pub concat: Option<bool>,
    pub compress: Option<bool>,
    pub watch: Option<bool>,
    position: Option<Position>,
}

impl AssetBundle {
    /// Build a bundle from its declaration, resolving path aliases.
    pub fn from_declaration(
        name: &str,
        declaration: BundleDeclaration,
        aliases: &dyn AliasResolver,
    ) -> Result<Self, ViewError> {
        let base_path = declaration
            .base_path
            .map(|p| aliases.resolve(&p))
            .transpose()?
            .map(|p| p.trim_end_matches(['/', '\\']).to_string());
        let base_url = declaration
            .base_url
            .map(|u| aliases.resolve(&u))
            .transpose()?
            .map(|u| u.trim_end_matches('/').to_string());

        let mut js_options = declaration.js_options;
        let position = js_options.position.take();
        js_options.depends.clear();

        let mut css_options = declaration.css_options;
        css_options.position = None;
        css_options.depends.clear();

        Ok(Self {
            name: ArcStr::from(name),
            base_path,
            base_url,
            js: declaration.js,
            css: declaration.css,
            depends: declaration.depends,
            js_options,
            css_options,
            concat: declaration.concat,
            compress: declaration.compress,
            watch: declaration.watch,
            position,
        })
    }

    /// An empty stand-in used when bundles are disabled.
    pub fn dummy(name: &str) -> Self {
        Self {
            name: ArcStr::from(name),
            base_path: None,
            base_url: None,
            js: Vec::new(),
            css: Vec::new(),
            depends: Vec::new(),
            js_options: FileOptions::default(),
            css_options: FileOptions::default(),
            concat: None,
            compress: None,
            watch: None,
            position: None,
        }
    }

    /// A single-file bundle synthesized for a file registered with `depends`.
    pub(crate) fn single_file(name: &str, url: &str, options: FileOptions, is_js: bool) -> Self {
        let mut bundle = Self::dummy(name);
        bundle.base_url = Some(String::new());
        let FileOptions {
            position,
            condition,
            noscript,
            depends,
            attributes,
        } = options;
        let file_options = FileOptions {
            position: None,
            condition,
            noscript,
            depends: Vec::new(),
            attributes,
        };
        bundle.depends = depends;
        if is_js {
            bundle.js = vec![utils::ad_hoc_asset(url)];
            bundle.js_options = file_options;
            bundle.position = position;
        } else {
            bundle.css = vec![utils::ad_hoc_asset(url)];
            bundle.css_options = file_options;
        }
        bundle
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn shared_name(&self) -> ArcStr {
        self.name.clone()
    }

    /// The JS position declared for this bundle, if any.
    pub fn position(&self) -> Option<Position> {
        self.position
    }

    /// Options for registering one of this bundle's JS files at `position`.
    pub fn js_file_options(&self, position: Option<Position>) -> FileOptions {
        FileOptions {
            position,
            ..self.js_options.clone()
        }
    }

    /// Name of the concatenated package: `<short-name>-<hash>`.
    pub fn package_name(&self) -> String {
        let short = utils::short_name(&self.name);
        let short = short.strip_suffix("Asset").unwrap_or(short).to_lowercase();
        format!("{}-{}", short, utils::stable_hash_8(&self.name))
    }

    /// Local file paths of every JS and CSS entry, grouped by extension.
    /// Absolute URLs have no local path and are skipped.
    pub fn files_grouped_by_extension(&self, manager: &AssetManager) -> BTreeMap<String, Vec<String>> {
        let mut files: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for asset in self.js.iter().chain(self.css.iter()) {
            if let Some(path) = manager.asset_path(self, asset) {
                files
                    .entry(utils::file_extension(asset))
                    .or_default()
                    .push(path);
            }
        }
        files
    }

    pub fn effective_concat(&self, manager: &AssetManager) -> bool {
        self.concat.unwrap_or(manager.concat())
    }

    pub fn effective_compress(&self, manager: &AssetManager) -> bool {
        self.compress.unwrap_or(manager.compress())
    }

    pub fn effective_watch(&self, manager: &AssetManager) -> bool {
        self.watch.unwrap_or(manager.watch())
    }
}
