//! # WebView Assets
//!
//! Asset registration and page composition for server-rendered web views.
//!
//! A page handler registers asset bundles and ad-hoc resources (meta tags,
//! link tags, CSS, JS) against a per-render [`WebView`]. Bundle dependency
//! graphs are expanded by the resolver, and at layout time the composer turns
//! everything that was collected into three HTML fragments (head, body-begin,
//! body-end) substituted for placeholder tokens in the rendered page.
//!
//! **Invariants:**
//! - A bundle's files are emitted exactly once per render, after its dependencies.
//! - Keyed registration overwrites in place; it never duplicates or reorders.
//! - A dependency is never positioned later on the page than its dependents.
//! - Registries are empty after every composition, successful or not.

pub mod bundle;
pub mod html;
pub mod manager;
pub mod position;
pub mod render;
pub mod source;
pub mod utils;
pub mod view;

use thiserror::Error;

pub use bundle::{AssetBundle, BundleDeclaration, FileOptions};
pub use html::{Attributes, HtmlTagRenderer, TagRenderer};
pub use manager::{AssetManager, AssetManagerConfig, Environment};
pub use position::Position;
pub use render::{MarkupRenderer, RenderHooks, Rendered, Renderer, ViewEvent};
pub use source::{AliasResolver, Aliases, BundleSource, NoAliases, StaticBundleSource};
pub use view::{BundleState, RenderScope, Sections, WebView};

// ---------------------------------------------------------------------------
// ViewError
// ---------------------------------------------------------------------------

/// Errors raised while registering or composing page assets.
///
/// None of these are transient: each one points at a configuration or
/// authoring defect and the render should be aborted.
#[derive(Debug, Error)]
pub enum ViewError {
    #[error("Invalid asset bundle configuration: {0}")]
    InvalidBundleConfig(String),

    #[error("Unknown asset bundle `{0}`")]
    UnknownBundle(String),

    #[error("A circular dependency is detected for bundle `{0}`")]
    CircularDependency(String),

    #[error(
        "An asset bundle that depends on `{bundle}` requires position `{requested}`, \
         but `{bundle}` is already positioned at `{current}`"
    )]
    PositionConflict {
        bundle: String,
        current: Position,
        requested: Position,
    },

    #[error("Unknown path alias `{0}`")]
    UnknownAlias(String),

    #[error("Asset bundle `{0}` is still being resolved")]
    UnresolvedBundle(String),

    #[error("Invalid JSON configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Render failed: {0}")]
    Render(String),
}

/// Coarse classification of a [`ViewError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed configuration or an unsatisfiable position constraint.
    Configuration,
    /// A bundle transitively depends on itself.
    CircularDependency,
    /// A renderer failed to produce output.
    Render,
}

impl ViewError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ViewError::CircularDependency(_) => ErrorKind::CircularDependency,
            ViewError::Render(_) => ErrorKind::Render,
            ViewError::InvalidBundleConfig(_)
            | ViewError::UnknownBundle(_)
            | ViewError::PositionConflict { .. }
            | ViewError::UnknownAlias(_)
            | ViewError::UnresolvedBundle(_)
            | ViewError::Json(_) => ErrorKind::Configuration,
        }
    }
}

pub type Result<T, E = ViewError> = std::result::Result<T, E>;
