//! Dependency resolution and bundle draining.
//!
//! Registration walks a bundle's dependency graph depth-first, recording
//! each bundle as `InProgress` until its dependencies are done, so a cycle
//! is reported as soon as the walk re-enters a bundle.

use std::sync::Arc;

use log::debug;

use super::{BundleState, WebView};
use crate::bundle::AssetBundle;
use crate::position::Position;
use crate::ViewError;

impl WebView {
    /// Register the named bundle and, transitively, everything it depends on.
    ///
    /// `position` is a minimum JS position requested by a dependent: it is
    /// pinned for this view if the bundle has none, and it is an error if the
    /// bundle is already positioned later. The effective position is then
    /// pushed down to every dependency. Pins never reach the shared manager.
    ///
    /// Single-file bundles registered on this view shadow manager bundles of
    /// the same name.
    pub fn register_asset_bundle(
        &mut self,
        name: &str,
        position: Option<Position>,
    ) -> Result<Arc<AssetBundle>, ViewError> {
        let bundle = match self.bundle_state(name) {
            BundleState::Unvisited => {
                let bundle = match self.local_bundles.get(name) {
                    Some(local) => Arc::clone(local),
                    None => self.manager.get_bundle(name)?,
                };
                let key = bundle.shared_name();
                self.asset_bundles.insert(key.clone(), BundleState::InProgress);

                let declared = bundle.position();
                let seeded = match declared {
                    Some(declared) => self.positions.insert(key.clone(), declared).is_none(),
                    None => false,
                };
                for dependency in &bundle.depends {
                    if let Err(err) = self.register_asset_bundle(dependency, declared) {
                        self.asset_bundles.shift_remove(name);
                        if seeded {
                            self.positions.remove(name);
                        }
                        return Err(err);
                    }
                }

                debug!(
                    "registered asset bundle `{}` ({} dependencies)",
                    name,
                    bundle.depends.len()
                );
                self.asset_bundles
                    .insert(key, BundleState::Resolved(Arc::clone(&bundle)));
                bundle
            }
            BundleState::InProgress => {
                return Err(ViewError::CircularDependency(name.to_string()));
            }
            BundleState::Resolved(bundle) => bundle,
        };

        if let Some(requested) = position {
            let current = *self
                .positions
                .entry(bundle.shared_name())
                .or_insert(requested);
            if current > requested {
                return Err(ViewError::PositionConflict {
                    bundle: name.to_string(),
                    current,
                    requested,
                });
            }

            for dependency in &bundle.depends {
                self.register_asset_bundle(dependency, Some(current))?;
            }
        }

        Ok(bundle)
    }

    /// Move the files of every registered bundle into the file registries,
    /// dependencies first. Drained bundles leave [`WebView::asset_bundles`].
    pub fn register_pending_bundles(&mut self) -> Result<(), ViewError> {
        let names: Vec<_> = self.asset_bundles.keys().cloned().collect();
        for name in names {
            self.register_asset_files(&name)?;
        }
        Ok(())
    }

    fn register_asset_files(&mut self, name: &str) -> Result<(), ViewError> {
        let bundle = match self.asset_bundles.get(name) {
            None => return Ok(()),
            Some(BundleState::Resolved(bundle)) => Arc::clone(bundle),
            Some(_) => return Err(ViewError::UnresolvedBundle(name.to_string())),
        };

        for dependency in &bundle.depends {
            self.register_asset_files(dependency)?;
        }
        self.register_bundle_files(&bundle)?;
        self.asset_bundles.shift_remove(name);
        Ok(())
    }

    fn register_bundle_files(&mut self, bundle: &AssetBundle) -> Result<(), ViewError> {
        let manager = Arc::clone(&self.manager);
        let js_options = bundle.js_file_options(self.bundle_position(bundle.name()));

        if bundle.effective_concat(&manager) {
            if !bundle.js.is_empty() {
                let url = manager.package_url(bundle, "js");
                self.register_js_file(&url, js_options.clone(), None)?;
            }
            if !bundle.css.is_empty() {
                let url = manager.package_url(bundle, "css");
                self.register_css_file(&url, bundle.css_options.clone(), None)?;
            }
        } else {
            for js in &bundle.js {
                let url = manager.asset_url(bundle, js);
                self.register_js_file(&url, js_options.clone(), None)?;
            }
            for css in &bundle.css {
                let url = manager.asset_url(bundle, css);
                self.register_css_file(&url, bundle.css_options.clone(), None)?;
            }
        }

        debug!(
            "drained asset bundle `{}` ({} js, {} css)",
            bundle.name(),
            bundle.js.len(),
            bundle.css.len()
        );
        Ok(())
    }
}
