//! Filesystem collaborators for the scope engine: application directory
//! layout, document loading and writing, validation, and profile/catalog
//! lookup for control titles.

use std::path::PathBuf;

use complyscope_core::{ScopeError, ValidationError};

mod app_dir;
mod documents;
mod loader;
mod validate;

pub use app_dir::{AppDirectory, APP_DIR_NAME, BUNDLES_DIR, CONTROLS_DIR, PLUGINS_DIR};
pub use documents::{
    find_component_definitions, read_assessment_plan, read_catalog, read_component_definition,
    read_profile, read_scope, write_assessment_plan, write_scope,
};
pub use loader::{resolve_href, FsProfileLoader};
pub use validate::{NoopValidator, StructuralValidator};

#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{}: {source}", .path.display())]
    Validation {
        path: PathBuf,
        #[source]
        source: ValidationError,
    },
    #[error("no component definitions found in {}", .0.display())]
    NoComponentDefinitionsFound(PathBuf),
    #[error("scope descriptor {}: {source}", .path.display())]
    Scope {
        path: PathBuf,
        #[source]
        source: ScopeError,
    },
}
