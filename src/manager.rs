//! Asset manager: the process-wide bundle registry.
//!
//! Resolves bundle names to shared [`AssetBundle`] instances, applying
//! per-bundle overrides and the disabled-bundles policy, and maps bundle
//! files to their final URLs and paths.
//!
//! The manager is shared between concurrent renders (`Arc<AssetManager>`);
//! its cache is a `DashMap`, so lookups never need `&mut self`.

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::bundle::{AssetBundle, BundleDeclaration};
use crate::source::{AliasResolver, BundleSource, NoAliases};
use crate::utils;
use crate::ViewError;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Deployment environment, used to derive the `compress` and `watch` defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
    Test,
}

/// Serializable manager configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetManagerConfig {
    /// `false` disables every bundle; otherwise an object of
    /// `name → false | { declaration overrides }`.
    pub bundles: serde_json::Value,
    /// Root directory of published assets. May be an alias.
    pub base_path: String,
    /// Base URL of published assets. May be an alias.
    pub base_url: String,
    /// Suffix rewrite table: an asset ending in a key is replaced by the value,
    /// resolved against `base_url` / `base_path`.
    pub asset_map: BTreeMap<String, String>,
    pub concat: bool,
    /// `None` → on in production.
    pub compress: Option<bool>,
    /// `None` → on in development.
    pub watch: Option<bool>,
    pub environment: Environment,
}

impl Default for AssetManagerConfig {
    fn default() -> Self {
        Self {
            bundles: serde_json::Value::Object(Default::default()),
            base_path: "@webroot/assets".into(),
            base_url: "@web/assets".into(),
            asset_map: BTreeMap::new(),
            concat: false,
            compress: None,
            watch: None,
            environment: Environment::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Bundle Entries
// ---------------------------------------------------------------------------

/// What the manager knows about a bundle name.
#[derive(Debug, Clone)]
enum BundleEntry {
    /// Declaration overrides, applied on first lookup.
    Config(serde_json::Map<String, serde_json::Value>),
    /// Explicitly disabled: lookups return the dummy bundle.
    Disabled,
    Resolved(Arc<AssetBundle>),
    /// A configuration value of the wrong shape, reported on lookup.
    Invalid(serde_json::Value),
}

impl From<serde_json::Value> for BundleEntry {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Object(map) => BundleEntry::Config(map),
            serde_json::Value::Bool(false) => BundleEntry::Disabled,
            other => BundleEntry::Invalid(other),
        }
    }
}

// ---------------------------------------------------------------------------
// AssetManager
// ---------------------------------------------------------------------------

pub struct AssetManager {
    source: Arc<dyn BundleSource>,
    aliases: Arc<dyn AliasResolver>,
    /// `false` when the whole bundle feature is disabled.
    bundles_enabled: bool,
    bundles: DashMap<String, BundleEntry>,
    dummy_bundles: DashMap<String, Arc<AssetBundle>>,
    base_path: String,
    base_url: String,
    asset_map: BTreeMap<String, String>,
    concat: bool,
    compress: bool,
    watch: bool,
}

impl std::fmt::Debug for AssetManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetManager")
            .field("bundles_enabled", &self.bundles_enabled)
            .field("bundles", &self.bundles.len())
            .field("base_path", &self.base_path)
            .field("base_url", &self.base_url)
            .field("concat", &self.concat)
            .field("compress", &self.compress)
            .field("watch", &self.watch)
            .finish()
    }
}

impl AssetManager {
    /// Build a manager from its configuration.
    ///
    /// Fails if `bundles` is neither `false` nor an object, or if the base
    /// path/URL use an unknown alias.
    pub fn new(
        config: AssetManagerConfig,
        source: Arc<dyn BundleSource>,
        aliases: Arc<dyn AliasResolver>,
    ) -> Result<Self, ViewError> {
        let bundles = DashMap::new();
        let bundles_enabled = match config.bundles {
            serde_json::Value::Bool(false) => false,
            serde_json::Value::Object(map) => {
                for (name, value) in map {
                    bundles.insert(name, BundleEntry::from(value));
                }
                true
            }
            serde_json::Value::Null => true,
            other => {
                return Err(ViewError::InvalidBundleConfig(format!(
                    "`bundles` must be false or an object, got {}",
                    other
                )))
            }
        };

        let base_path = aliases.resolve(&config.base_path)?;
        let base_url = aliases
            .resolve(&config.base_url)?
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            source,
            aliases,
            bundles_enabled,
            bundles,
            dummy_bundles: DashMap::new(),
            base_path,
            base_url,
            asset_map: config.asset_map,
            concat: config.concat,
            compress: config
                .compress
                .unwrap_or(config.environment == Environment::Production),
            watch: config
                .watch
                .unwrap_or(config.environment == Environment::Development),
        })
    }

    /// A manager over `source` with default configuration and no aliases.
    pub fn with_source(source: impl BundleSource + 'static) -> Self {
        Self {
            source: Arc::new(source),
            aliases: Arc::new(NoAliases),
            bundles_enabled: true,
            bundles: DashMap::new(),
            dummy_bundles: DashMap::new(),
            base_path: "assets".into(),
            base_url: "/assets".into(),
            asset_map: BTreeMap::new(),
            concat: false,
            compress: false,
            watch: false,
        }
    }

    /// Build a manager from a JSON configuration document.
    pub fn from_json(
        json: &str,
        source: Arc<dyn BundleSource>,
        aliases: Arc<dyn AliasResolver>,
    ) -> Result<Self, ViewError> {
        let config: AssetManagerConfig = serde_json::from_str(json)?;
        Self::new(config, source, aliases)
    }

    pub fn aliases(&self) -> &dyn AliasResolver {
        self.aliases.as_ref()
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn concat(&self) -> bool {
        self.concat
    }

    pub fn compress(&self) -> bool {
        self.compress
    }

    pub fn watch(&self) -> bool {
        self.watch
    }

    pub fn bundles_enabled(&self) -> bool {
        self.bundles_enabled
    }

    // -----------------------------------------------------------------------
    // Bundle Registry
    // -----------------------------------------------------------------------

    /// Return the named bundle, loading and caching it on first use.
    ///
    /// Repeated calls with the same name return the same `Arc`.
    pub fn get_bundle(&self, name: &str) -> Result<Arc<AssetBundle>, ViewError> {
        if !self.bundles_enabled {
            return Ok(self.dummy_bundle(name));
        }

        match self.bundles.entry(name.to_string()) {
            Entry::Vacant(vacant) => {
                let bundle = Arc::new(self.load_bundle(name, None)?);
                vacant.insert(BundleEntry::Resolved(Arc::clone(&bundle)));
                Ok(bundle)
            }
            Entry::Occupied(mut occupied) => match occupied.get().clone() {
                BundleEntry::Resolved(bundle) => Ok(bundle),
                BundleEntry::Config(overrides) => {
                    let bundle = Arc::new(self.load_bundle(name, Some(&overrides))?);
                    occupied.insert(BundleEntry::Resolved(Arc::clone(&bundle)));
                    Ok(bundle)
                }
                BundleEntry::Disabled => Ok(self.dummy_bundle(name)),
                BundleEntry::Invalid(value) => Err(ViewError::InvalidBundleConfig(format!(
                    "{} (unexpected value {})",
                    name, value
                ))),
            },
        }
    }

    /// Resolve every bundle named in the configuration.
    pub fn get_bundles(&self) -> Result<Vec<Arc<AssetBundle>>, ViewError> {
        let mut names: Vec<String> = self.bundles.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names.iter().map(|name| self.get_bundle(name)).collect()
    }

    fn load_bundle(
        &self,
        name: &str,
        overrides: Option<&serde_json::Map<String, serde_json::Value>>,
    ) -> Result<AssetBundle, ViewError> {
        let declaration = match (self.source.declaration(name), overrides) {
            (Some(declaration), None) => declaration,
            (Some(declaration), Some(overrides)) => declaration
                .merged(overrides)
                .map_err(|e| ViewError::InvalidBundleConfig(format!("{}: {}", name, e)))?,
            (None, Some(overrides)) => BundleDeclaration::default()
                .merged(overrides)
                .map_err(|e| ViewError::InvalidBundleConfig(format!("{}: {}", name, e)))?,
            (None, None) => return Err(ViewError::UnknownBundle(name.to_string())),
        };

        debug!(
            "loaded asset bundle `{}` ({} js, {} css, {} deps)",
            name,
            declaration.js.len(),
            declaration.css.len(),
            declaration.depends.len()
        );
        AssetBundle::from_declaration(name, declaration, self.aliases.as_ref())
    }

    fn dummy_bundle(&self, name: &str) -> Arc<AssetBundle> {
        let entry = self
            .dummy_bundles
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(AssetBundle::dummy(name)));
        Arc::clone(entry.value())
    }

    // -----------------------------------------------------------------------
    // URLs and Paths
    // -----------------------------------------------------------------------

    /// URL of the concatenated `ext` package of `bundle`.
    pub fn package_url(&self, bundle: &AssetBundle, ext: &str) -> String {
        format!("{}/{}.{}", self.base_url, bundle.package_name(), ext)
    }

    /// File path of the concatenated `ext` package of `bundle`.
    pub fn package_path(&self, bundle: &AssetBundle, ext: &str) -> String {
        format!("{}/{}.{}", self.base_path, bundle.package_name(), ext)
    }

    /// Final URL of one of `bundle`'s files.
    pub fn asset_url(&self, bundle: &AssetBundle, asset: &str) -> String {
        if let Some(mapped) = self.resolve_asset(asset) {
            return if utils::is_relative_url(mapped) {
                utils::join_url(&self.base_url, mapped)
            } else {
                mapped.to_string()
            };
        }

        if utils::is_relative_url(asset) {
            utils::join_url(bundle.base_url.as_deref().unwrap_or_default(), asset)
        } else {
            asset.to_string()
        }
    }

    /// Local file path of one of `bundle`'s files; `None` for absolute URLs.
    pub fn asset_path(&self, bundle: &AssetBundle, asset: &str) -> Option<String> {
        if let Some(mapped) = self.resolve_asset(asset) {
            return utils::is_relative_url(mapped).then(|| utils::join_url(&self.base_path, mapped));
        }

        utils::is_relative_url(asset)
            .then(|| utils::join_url(bundle.base_path.as_deref().unwrap_or_default(), asset))
    }

    /// Look `asset` up in the asset map: exact key first, then the longest
    /// key the asset ends with.
    pub fn resolve_asset(&self, asset: &str) -> Option<&str> {
        if let Some(target) = self.asset_map.get(asset) {
            return Some(target);
        }

        self.asset_map
            .iter()
            .filter(|(from, _)| asset.ends_with(from.as_str()))
            .max_by_key(|(from, _)| from.len())
            .map(|(_, to)| to.as_str())
    }
}
