use std::fs;
use std::path::{Path, PathBuf};

use complyscope_core::ApplicationDirectory;

use crate::BundleError;

pub const APP_DIR_NAME: &str = "complyscope";
pub const PLUGINS_DIR: &str = "plugins";
pub const BUNDLES_DIR: &str = "bundles";
pub const CONTROLS_DIR: &str = "controls";

/// On-disk layout rooted at `<root>/complyscope`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppDirectory {
    app_dir: PathBuf,
    plugin_dir: PathBuf,
    bundle_dir: PathBuf,
    controls_dir: PathBuf,
}

impl AppDirectory {
    /// # Errors
    /// Returns [`BundleError::Io`] when `create` is set and a directory
    /// cannot be created.
    pub fn new(root: &Path, create: bool) -> Result<Self, BundleError> {
        let app_dir = root.join(APP_DIR_NAME);
        let layout = Self {
            plugin_dir: app_dir.join(PLUGINS_DIR),
            bundle_dir: app_dir.join(BUNDLES_DIR),
            controls_dir: app_dir.join(CONTROLS_DIR),
            app_dir,
        };

        if create {
            for dir in layout.dirs() {
                fs::create_dir_all(dir)
                    .map_err(|source| BundleError::Io { path: dir.to_path_buf(), source })?;
            }
            tracing::debug!(app_dir = %layout.app_dir.display(), "application directory ready");
        }

        Ok(layout)
    }

    #[must_use]
    pub fn plugin_dir(&self) -> &Path {
        &self.plugin_dir
    }

    #[must_use]
    pub fn controls_dir(&self) -> &Path {
        &self.controls_dir
    }

    #[must_use]
    pub fn dirs(&self) -> Vec<&Path> {
        vec![&self.app_dir, &self.plugin_dir, &self.bundle_dir, &self.controls_dir]
    }
}

impl ApplicationDirectory for AppDirectory {
    fn app_dir(&self) -> &Path {
        &self.app_dir
    }

    fn bundle_dir(&self) -> &Path {
        &self.bundle_dir
    }
}
