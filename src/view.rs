//! Per-render view state: the resource collector.
//!
//! A [`WebView`] lives for one render. Components register meta tags, link
//! tags, CSS, JS and asset bundles against it while the page body renders;
//! the composer then turns the collected registries into the head,
//! body-begin and body-end fragments and clears everything.
//!
//! A `WebView` is not meant to be shared between in-flight renders. Create
//! one per request, or make sure it is cleared between uses (every
//! composition path clears it, and [`RenderScope`] clears on drop).

mod compose;
mod registry;
mod resolver;

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use arcstr::ArcStr;
use indexmap::IndexMap;
use log::warn;

use crate::bundle::{AssetBundle, FileOptions};
use crate::html::{self, Attributes, HtmlTagRenderer, TagRenderer};
use crate::manager::AssetManager;
use crate::position::Position;
use crate::utils;
use crate::ViewError;

pub use compose::Sections;
pub use registry::{PositionedRegistry, Registry};

// ---------------------------------------------------------------------------
// Placeholders
// ---------------------------------------------------------------------------

/// Token replaced by the head fragment.
pub const PH_HEAD: &str = "<![CDATA[WEBVIEW-BLOCK-HEAD]]>";

/// Token replaced by the body-begin fragment.
pub const PH_BODY_BEGIN: &str = "<![CDATA[WEBVIEW-BLOCK-BODY-BEGIN]]>";

/// Token replaced by the body-end fragment.
pub const PH_BODY_END: &str = "<![CDATA[WEBVIEW-BLOCK-BODY-END]]>";

// ---------------------------------------------------------------------------
// BundleState
// ---------------------------------------------------------------------------

/// Resolution state of a bundle within one view.
#[derive(Debug, Clone)]
pub enum BundleState {
    /// Not registered with this view.
    Unvisited,
    /// Its dependencies are being registered; seeing it again means a cycle.
    InProgress,
    /// Registered; its files are emitted when the view drains bundles.
    Resolved(Arc<AssetBundle>),
}

// ---------------------------------------------------------------------------
// WebView
// ---------------------------------------------------------------------------

pub struct WebView {
    manager: Arc<AssetManager>,
    tags: Arc<dyn TagRenderer>,
    /// Bundle that provides the ready/load guards, registered on demand.
    ready_bundle: Option<String>,
    /// Page title, available to layouts.
    pub title: Option<String>,
    meta_tags: Registry,
    link_tags: Registry,
    css: Registry,
    css_files: Registry,
    js: PositionedRegistry,
    js_files: PositionedRegistry,
    asset_bundles: IndexMap<ArcStr, BundleState>,
    /// JS positions of bundles in this render, declared or pinned by the resolver.
    positions: HashMap<ArcStr, Position>,
    /// Single-file bundles synthesized for files registered with `depends`.
    local_bundles: HashMap<ArcStr, Arc<AssetBundle>>,
}

impl std::fmt::Debug for WebView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebView")
            .field("title", &self.title)
            .field("meta_tags", &self.meta_tags.len())
            .field("link_tags", &self.link_tags.len())
            .field("css", &self.css.len())
            .field("css_files", &self.css_files.len())
            .field("js", &self.js.len())
            .field("js_files", &self.js_files.len())
            .field("asset_bundles", &self.asset_bundles.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl WebView {
    pub fn new(manager: Arc<AssetManager>) -> Self {
        Self {
            manager,
            tags: Arc::new(HtmlTagRenderer),
            ready_bundle: None,
            title: None,
            meta_tags: Registry::new(),
            link_tags: Registry::new(),
            css: Registry::new(),
            css_files: Registry::new(),
            js: PositionedRegistry::default(),
            js_files: PositionedRegistry::default(),
            asset_bundles: IndexMap::new(),
            positions: HashMap::new(),
            local_bundles: HashMap::new(),
        }
    }

    pub fn with_tag_renderer(mut self, tags: Arc<dyn TagRenderer>) -> Self {
        self.tags = tags;
        self
    }

    /// Register `bundle` whenever inline JS is registered at
    /// [`Position::Ready`] or [`Position::Load`].
    pub fn with_ready_bundle(mut self, bundle: impl Into<String>) -> Self {
        self.ready_bundle = Some(bundle.into());
        self
    }

    pub fn manager(&self) -> &Arc<AssetManager> {
        &self.manager
    }

    pub fn meta_tags(&self) -> &Registry {
        &self.meta_tags
    }

    pub fn link_tags(&self) -> &Registry {
        &self.link_tags
    }

    pub fn css(&self) -> &Registry {
        &self.css
    }

    pub fn css_files(&self) -> &Registry {
        &self.css_files
    }

    pub fn js(&self) -> &PositionedRegistry {
        &self.js
    }

    pub fn js_files(&self) -> &PositionedRegistry {
        &self.js_files
    }

    /// Bundles registered with this view and not yet drained, in registration order.
    pub fn asset_bundles(&self) -> impl Iterator<Item = (&str, &BundleState)> {
        self.asset_bundles.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn bundle_state(&self, name: &str) -> BundleState {
        self.asset_bundles
            .get(name)
            .cloned()
            .unwrap_or(BundleState::Unvisited)
    }

    /// The JS position `name` has in this render, if declared or pinned.
    pub fn bundle_position(&self, name: &str) -> Option<Position> {
        self.positions.get(name).copied()
    }

    /// True when nothing at all is registered.
    pub fn is_empty(&self) -> bool {
        self.meta_tags.is_empty()
            && self.link_tags.is_empty()
            && self.css.is_empty()
            && self.css_files.is_empty()
            && self.js.is_empty()
            && self.js_files.is_empty()
            && self.asset_bundles.is_empty()
            && self.positions.is_empty()
            && self.local_bundles.is_empty()
    }

    /// Drop every registered resource and bundle.
    pub fn clear(&mut self) {
        self.meta_tags.clear();
        self.link_tags.clear();
        self.css.clear();
        self.css_files.clear();
        self.js.clear();
        self.js_files.clear();
        self.asset_bundles.clear();
        self.positions.clear();
        self.local_bundles.clear();
    }

    /// Borrow the view for one render; it is cleared when the scope drops.
    pub fn scope(&mut self) -> RenderScope<'_> {
        RenderScope { view: self }
    }

    // -----------------------------------------------------------------------
    // Placeholder Markers
    // -----------------------------------------------------------------------

    /// Marks where the head fragment goes.
    pub fn head(&self) -> &'static str {
        PH_HEAD
    }

    /// Marks where the body-begin fragment goes.
    pub fn begin_body(&self) -> &'static str {
        PH_BODY_BEGIN
    }

    /// Marks where the body-end fragment goes. Drains registered bundles
    /// into the file registries first.
    pub fn end_body(&mut self) -> Result<&'static str, ViewError> {
        self.register_pending_bundles()?;
        Ok(PH_BODY_END)
    }

    // -----------------------------------------------------------------------
    // Resource Registration
    // -----------------------------------------------------------------------

    /// Register a `<meta>` tag. Without a key, the rendered tag's hash is used.
    pub fn register_meta_tag(&mut self, attributes: Attributes, key: Option<&str>) {
        let html = self.tags.void_tag("meta", &attributes);
        let key = key.map_or_else(|| utils::content_key(&html), str::to_string);
        self.meta_tags.insert(key, html);
    }

    /// Register a `<link>` tag. Without a key, the rendered tag's hash is used.
    pub fn register_link_tag(&mut self, attributes: Attributes, key: Option<&str>) {
        let html = self.tags.void_tag("link", &attributes);
        let key = key.map_or_else(|| utils::content_key(&html), str::to_string);
        self.link_tags.insert(key, html);
    }

    /// Register an inline CSS block. Without a key, the code's hash is used.
    ///
    /// The block is minified when the manager has `compress` enabled.
    pub fn register_css(&mut self, code: &str, attributes: Attributes, key: Option<&str>) {
        let key = key.map_or_else(|| utils::content_key(code), str::to_string);
        let code = if self.manager.compress() {
            utils::minify_css(code).unwrap_or_else(|e| {
                warn!("keeping inline CSS `{}` unminified: {}", key, e);
                code.to_string()
            })
        } else {
            code.to_string()
        };
        let html = self.tags.content_tag("style", &code, &attributes);
        self.css.insert(key, html);
    }

    /// Register a CSS file. Without a key, the resolved URL is used.
    ///
    /// With `options.depends`, the file is wrapped in a single-file bundle
    /// and registered through the dependency resolver instead.
    pub fn register_css_file(
        &mut self,
        url: &str,
        options: FileOptions,
        key: Option<&str>,
    ) -> Result<(), ViewError> {
        let url = self.manager.aliases().resolve(url)?;
        let key = key.map_or_else(|| url.clone(), str::to_string);

        if options.depends.is_empty() {
            let html = self.render_css_file(&url, options);
            self.css_files.insert(key, html);
        } else {
            self.register_single_file_bundle(&key, &url, options, false)?;
        }
        Ok(())
    }

    /// Register an inline JS block at `position` (default [`Position::Ready`]).
    /// Without a key, the code's hash is used.
    pub fn register_js(
        &mut self,
        code: &str,
        position: Option<Position>,
        key: Option<&str>,
    ) -> Result<(), ViewError> {
        let position = position.unwrap_or(Position::Ready);
        if position.is_deferred() {
            if let Some(bundle) = self.ready_bundle.clone() {
                self.register_asset_bundle(&bundle, None)?;
            }
        }

        let key = key.map_or_else(|| utils::content_key(code), str::to_string);
        self.js.insert(position, key, code);
        Ok(())
    }

    /// Register inline JS produced by `code`. The result is trimmed.
    pub fn register_js_fn<F>(
        &mut self,
        code: F,
        position: Option<Position>,
        key: Option<&str>,
    ) -> Result<(), ViewError>
    where
        F: FnOnce() -> String,
    {
        let code = code();
        self.register_js(code.trim(), position, key)
    }

    /// Register a JS file at `options.position` (default [`Position::End`]).
    /// Files have no ready/load guard, so `Ready` and `Load` place them at
    /// `End`. Without a key, the resolved URL is used.
    ///
    /// With `options.depends`, the file is wrapped in a single-file bundle
    /// and registered through the dependency resolver instead.
    pub fn register_js_file(
        &mut self,
        url: &str,
        options: FileOptions,
        key: Option<&str>,
    ) -> Result<(), ViewError> {
        let url = self.manager.aliases().resolve(url)?;
        let key = key.map_or_else(|| url.clone(), str::to_string);

        if options.depends.is_empty() {
            let position = match options.position.unwrap_or(Position::End) {
                p if p.is_deferred() => Position::End,
                p => p,
            };
            let html = self.render_js_file(&url, options);
            self.js_files.insert(position, key, html);
        } else {
            self.register_single_file_bundle(&key, &url, options, true)?;
        }
        Ok(())
    }

    fn register_single_file_bundle(
        &mut self,
        key: &str,
        url: &str,
        options: FileOptions,
        is_js: bool,
    ) -> Result<(), ViewError> {
        let bundle = AssetBundle::single_file(key, url, options, is_js);
        if matches!(self.asset_bundles.get(key), Some(BundleState::Resolved(_))) {
            self.asset_bundles.shift_remove(key);
            self.positions.remove(key);
        }
        self.local_bundles
            .insert(bundle.shared_name(), Arc::new(bundle));
        self.register_asset_bundle(key, None)?;
        Ok(())
    }

    fn render_css_file(&self, url: &str, options: FileOptions) -> String {
        let mut attributes = options.attributes;
        attributes.insert("href".into(), url.to_string());
        attributes
            .entry("rel".into())
            .or_insert_with(|| "stylesheet".into());

        let link = self.tags.void_tag("link", &attributes);
        match options.condition {
            Some(condition) => html::conditional_comment(&condition, &link),
            None if options.noscript => format!("<noscript>{}</noscript>", link),
            None => link,
        }
    }

    fn render_js_file(&self, url: &str, options: FileOptions) -> String {
        let mut attributes = options.attributes;
        attributes.insert("src".into(), url.to_string());

        let script = self.tags.content_tag("script", "", &attributes);
        match options.condition {
            Some(condition) => html::conditional_comment(&condition, &script),
            None => script,
        }
    }
}

// ---------------------------------------------------------------------------
// RenderScope
// ---------------------------------------------------------------------------

/// Exclusive borrow of a [`WebView`] for one render.
///
/// Clears the view when dropped, whether the render succeeded, failed, or
/// unwound, so nothing registered leaks into the next render.
pub struct RenderScope<'a> {
    view: &'a mut WebView,
}

impl Deref for RenderScope<'_> {
    type Target = WebView;

    fn deref(&self) -> &WebView {
        self.view
    }
}

impl DerefMut for RenderScope<'_> {
    fn deref_mut(&mut self) -> &mut WebView {
        self.view
    }
}

impl Drop for RenderScope<'_> {
    fn drop(&mut self) {
        self.view.clear();
    }
}
