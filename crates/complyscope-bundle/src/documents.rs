use std::fs;
use std::path::{Path, PathBuf};

use complyscope_core::oscal::{
    AssessmentPlan, AssessmentPlanDocument, Catalog, CatalogDocument, ComponentDefinition,
    ComponentDefinitionDocument, OscalModel, Profile, ProfileDocument,
};
use complyscope_core::{AssessmentScope, Validator};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::BundleError;

const COMPONENT_DEFINITION_ROOT: &str = "component-definition";

fn read_bytes(path: &Path) -> Result<Vec<u8>, BundleError> {
    fs::read(path).map_err(|source| BundleError::Io { path: path.to_path_buf(), source })
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, BundleError> {
    let bytes = read_bytes(path)?;
    serde_json::from_slice(&bytes)
        .map_err(|source| BundleError::Json { path: path.to_path_buf(), source })
}

fn write_bytes(path: &Path, bytes: &[u8]) -> Result<(), BundleError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|source| BundleError::Io { path: parent.to_path_buf(), source })?;
    }
    fs::write(path, bytes).map_err(|source| BundleError::Io { path: path.to_path_buf(), source })
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), BundleError> {
    let mut body = serde_json::to_vec_pretty(value)
        .map_err(|source| BundleError::Json { path: path.to_path_buf(), source })?;
    body.push(b'\n');
    write_bytes(path, &body)
}

fn validated(path: &Path, validator: &dyn Validator, model: OscalModel<'_>) -> Result<(), BundleError> {
    validator
        .validate(model)
        .map_err(|source| BundleError::Validation { path: path.to_path_buf(), source })
}

/// # Errors
/// Returns [`BundleError`] when the file cannot be read, parsed or validated.
pub fn read_component_definition(
    path: &Path,
    validator: &dyn Validator,
) -> Result<ComponentDefinition, BundleError> {
    let document: ComponentDefinitionDocument = read_json(path)?;
    validated(path, validator, OscalModel::ComponentDefinition(&document.component_definition))?;
    Ok(document.component_definition)
}

/// Load every component definition stored as a `*.json` file directly under
/// `dir`, in path order. JSON files holding other document types are skipped.
///
/// # Errors
/// Returns [`BundleError::NoComponentDefinitionsFound`] when the directory
/// holds none, and other [`BundleError`] variants for unreadable, malformed
/// or invalid files.
pub fn find_component_definitions(
    dir: &Path,
    validator: &dyn Validator,
) -> Result<Vec<ComponentDefinition>, BundleError> {
    let entries =
        fs::read_dir(dir).map_err(|source| BundleError::Io { path: dir.to_path_buf(), source })?;

    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| BundleError::Io { path: dir.to_path_buf(), source })?;
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut definitions = Vec::new();
    for path in paths {
        let mut value: Value = read_json(&path)?;
        let Some(root) = value.get_mut(COMPONENT_DEFINITION_ROOT).map(Value::take) else {
            tracing::debug!(path = %path.display(), "not a component definition; skipping");
            continue;
        };
        let definition: ComponentDefinition = serde_json::from_value(root)
            .map_err(|source| BundleError::Json { path: path.clone(), source })?;
        validated(&path, validator, OscalModel::ComponentDefinition(&definition))?;
        tracing::debug!(path = %path.display(), "loaded component definition");
        definitions.push(definition);
    }

    if definitions.is_empty() {
        return Err(BundleError::NoComponentDefinitionsFound(dir.to_path_buf()));
    }
    Ok(definitions)
}

/// # Errors
/// Returns [`BundleError`] when the file cannot be read, parsed or validated.
pub fn read_assessment_plan(
    path: &Path,
    validator: &dyn Validator,
) -> Result<AssessmentPlan, BundleError> {
    let document: AssessmentPlanDocument = read_json(path)?;
    validated(path, validator, OscalModel::AssessmentPlan(&document.assessment_plan))?;
    Ok(document.assessment_plan)
}

/// Write `plan` wrapped in its `assessment-plan` root, creating parent
/// directories as needed.
///
/// # Errors
/// Returns [`BundleError`] when serialization or the write fails.
pub fn write_assessment_plan(path: &Path, plan: &AssessmentPlan) -> Result<(), BundleError> {
    write_json(path, &AssessmentPlanDocument { assessment_plan: plan.clone() })
}

/// # Errors
/// Returns [`BundleError`] when the file cannot be read, parsed or validated.
pub fn read_profile(path: &Path, validator: &dyn Validator) -> Result<Profile, BundleError> {
    let document: ProfileDocument = read_json(path)?;
    validated(path, validator, OscalModel::Profile(&document.profile))?;
    Ok(document.profile)
}

/// # Errors
/// Returns [`BundleError`] when the file cannot be read, parsed or validated.
pub fn read_catalog(path: &Path, validator: &dyn Validator) -> Result<Catalog, BundleError> {
    let document: CatalogDocument = read_json(path)?;
    validated(path, validator, OscalModel::Catalog(&document.catalog))?;
    Ok(document.catalog)
}

/// # Errors
/// Returns [`BundleError::Io`] for unreadable files and
/// [`BundleError::Scope`] for malformed or invalid descriptors.
pub fn read_scope(path: &Path) -> Result<AssessmentScope, BundleError> {
    let body = fs::read_to_string(path)
        .map_err(|source| BundleError::Io { path: path.to_path_buf(), source })?;
    AssessmentScope::from_yaml(&body)
        .map_err(|source| BundleError::Scope { path: path.to_path_buf(), source })
}

/// # Errors
/// Returns [`BundleError`] when rendering or the write fails.
pub fn write_scope(path: &Path, scope: &AssessmentScope) -> Result<(), BundleError> {
    let body =
        scope.to_yaml().map_err(|source| BundleError::Scope { path: path.to_path_buf(), source })?;
    write_bytes(path, body.as_bytes())
}
