use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use complyscope_core::oscal::{Catalog, Profile};
use complyscope_core::{ApplicationDirectory, LoadError, ProfileLoader, Validator};

use crate::documents::{read_catalog, read_profile};
use crate::{BundleError, CONTROLS_DIR};

const TRESTLE_SCHEME: &str = "trestle://";
const FILE_SCHEME: &str = "file://";

/// Map a profile `source` or import `href` onto the filesystem.
///
/// `trestle://` references are rooted at the application directory and
/// `file://` references are plain paths. Other relative references are tried
/// under the `controls` directory first, then the application directory.
#[must_use]
pub fn resolve_href(app_dir: &dyn ApplicationDirectory, href: &str) -> PathBuf {
    if let Some(rest) = href.strip_prefix(TRESTLE_SCHEME) {
        return app_dir.app_dir().join(rest);
    }

    let path = Path::new(href.strip_prefix(FILE_SCHEME).unwrap_or(href));
    if path.is_absolute() {
        return path.to_path_buf();
    }

    let in_controls = app_dir.app_dir().join(CONTROLS_DIR).join(path);
    if in_controls.is_file() {
        return in_controls;
    }
    app_dir.app_dir().join(path)
}

/// [`ProfileLoader`] reading profiles and catalogs from disk.
///
/// Documents are cached by resolved path, so a scope build that touches the
/// same profile for every control only parses it once.
#[derive(Debug, Default)]
pub struct FsProfileLoader {
    profiles: RefCell<HashMap<PathBuf, Profile>>,
    catalogs: RefCell<HashMap<PathBuf, Catalog>>,
}

impl FsProfileLoader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn cached_documents(&self) -> usize {
        self.profiles.borrow().len() + self.catalogs.borrow().len()
    }
}

fn load_error(kind: &'static str, location: &str, err: &BundleError) -> LoadError {
    LoadError { kind, location: location.to_string(), reason: err.to_string() }
}

impl ProfileLoader for FsProfileLoader {
    fn load_profile(
        &self,
        app_dir: &dyn ApplicationDirectory,
        source: &str,
        validator: &dyn Validator,
    ) -> Result<Profile, LoadError> {
        let path = resolve_href(app_dir, source);
        if let Some(profile) = self.profiles.borrow().get(&path) {
            return Ok(profile.clone());
        }

        let profile =
            read_profile(&path, validator).map_err(|err| load_error("profile", source, &err))?;
        tracing::debug!(source, path = %path.display(), "loaded profile");
        self.profiles.borrow_mut().insert(path, profile.clone());
        Ok(profile)
    }

    fn load_catalog_source(
        &self,
        app_dir: &dyn ApplicationDirectory,
        catalog_source: &str,
        validator: &dyn Validator,
    ) -> Result<Catalog, LoadError> {
        let path = resolve_href(app_dir, catalog_source);
        if let Some(catalog) = self.catalogs.borrow().get(&path) {
            return Ok(catalog.clone());
        }

        let catalog = read_catalog(&path, validator)
            .map_err(|err| load_error("catalog", catalog_source, &err))?;
        tracing::debug!(catalog_source, path = %path.display(), "loaded catalog");
        self.catalogs.borrow_mut().insert(path, catalog.clone());
        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use complyscope_core::oscal::ControlImplementationSet;
    use complyscope_core::{CancelSignal, CatalogTitleResolver, TitleLookup, TitleResolver};

    use super::*;
    use crate::{AppDirectory, StructuralValidator};

    fn write(path: &Path, body: &serde_json::Value) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .unwrap_or_else(|err| panic!("failed to create {}: {err}", parent.display()));
        }
        fs::write(path, body.to_string())
            .unwrap_or_else(|err| panic!("failed to write fixture {}: {err}", path.display()));
    }

    fn layout(root: &Path) -> AppDirectory {
        AppDirectory::new(root, true).unwrap_or_else(|err| panic!("layout failed: {err}"))
    }

    #[test]
    fn resolves_each_reference_style() {
        let tmp = tempfile::tempdir().unwrap_or_else(|err| panic!("tempdir failed: {err}"));
        let app = layout(tmp.path());
        let app_root = tmp.path().join("complyscope");
        write(&app_root.join("controls").join("profile.json"), &serde_json::json!({}));

        assert_eq!(
            resolve_href(&app, "trestle://profiles/example/profile.json"),
            app_root.join("profiles/example/profile.json")
        );
        assert_eq!(resolve_href(&app, "profile.json"), app_root.join("controls/profile.json"));
        assert_eq!(resolve_href(&app, "catalogs/cat.json"), app_root.join("catalogs/cat.json"));

        let absolute = tmp.path().join("elsewhere.json");
        let absolute_str = absolute.to_string_lossy().to_string();
        assert_eq!(resolve_href(&app, &absolute_str), absolute);
        assert_eq!(resolve_href(&app, &format!("file://{absolute_str}")), absolute);
    }

    #[test]
    fn resolves_titles_through_profile_and_catalog_on_disk() {
        let tmp = tempfile::tempdir().unwrap_or_else(|err| panic!("tempdir failed: {err}"));
        let app = layout(tmp.path());
        let controls = tmp.path().join("complyscope").join("controls");
        write(
            &controls.join("profile.json"),
            &serde_json::json!({"profile": {
                "uuid": "profile-1",
                "metadata": {"title": "Profile"},
                "imports": [{"href": "missing-catalog.json"}, {"href": "catalog.json"}]
            }}),
        );
        write(
            &controls.join("catalog.json"),
            &serde_json::json!({"catalog": {
                "uuid": "catalog-1",
                "metadata": {"title": "Catalog"},
                "groups": [{"id": "ac", "title": "Access Control", "controls": [
                    {"id": "ac-1", "title": "Policy and Procedures"}
                ]}]
            }}),
        );

        let resolver = CatalogTitleResolver::new(FsProfileLoader::new());
        let lookup =
            TitleLookup { app_dir: &app, validator: &StructuralValidator, cancel: CancelSignal::never() };
        let implementation = ControlImplementationSet {
            source: "profile.json".to_string(),
            ..ControlImplementationSet::default()
        };

        let title = resolver
            .resolve_title("ac-1", &implementation, &lookup)
            .unwrap_or_else(|err| panic!("title should resolve: {err}"));
        assert_eq!(title, "Policy and Procedures");

        let again = resolver
            .resolve_title("ac-1", &implementation, &lookup)
            .unwrap_or_else(|err| panic!("title should resolve: {err}"));
        assert_eq!(again, title);
        assert_eq!(resolver.loader().cached_documents(), 2);
    }

    #[test]
    fn missing_profile_reports_source_and_kind() {
        let tmp = tempfile::tempdir().unwrap_or_else(|err| panic!("tempdir failed: {err}"));
        let app = layout(tmp.path());

        let err = FsProfileLoader::new()
            .load_profile(&app, "trestle://profiles/none/profile.json", &StructuralValidator)
            .err()
            .unwrap_or_else(|| panic!("expected failure"));
        assert_eq!(err.kind, "profile");
        assert_eq!(err.location, "trestle://profiles/none/profile.json");
    }
}
