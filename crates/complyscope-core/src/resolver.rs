use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::oscal::{Catalog, ControlImplementationSet, OscalModel, Profile};

/// Locations the document collaborators read from.
pub trait ApplicationDirectory {
    fn app_dir(&self) -> &Path;
    fn bundle_dir(&self) -> &Path;
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("{model} failed validation: {reason}")]
pub struct ValidationError {
    pub model: &'static str,
    pub reason: String,
}

pub trait Validator {
    /// # Errors
    /// Returns [`ValidationError`] when the document is not acceptable.
    fn validate(&self, model: OscalModel<'_>) -> Result<(), ValidationError>;
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("failed to load {kind} from '{location}': {reason}")]
pub struct LoadError {
    pub kind: &'static str,
    pub location: String,
    pub reason: String,
}

pub trait ProfileLoader {
    /// # Errors
    /// Returns [`LoadError`] when the profile cannot be read or validated.
    fn load_profile(
        &self,
        app_dir: &dyn ApplicationDirectory,
        source: &str,
        validator: &dyn Validator,
    ) -> Result<Profile, LoadError>;

    /// # Errors
    /// Returns [`LoadError`] when the catalog cannot be read or validated.
    fn load_catalog_source(
        &self,
        app_dir: &dyn ApplicationDirectory,
        catalog_source: &str,
        validator: &dyn Validator,
    ) -> Result<Catalog, LoadError>;
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum TitleError {
    #[error("failed to load profile from source '{source_ref}': {cause}")]
    ProfileLoad { source_ref: String, cause: LoadError },
    #[error("profile '{0}' has no imports")]
    NoImports(String),
    #[error("title for control '{0}' not found in catalog")]
    NotFound(String),
    #[error("title resolution cancelled")]
    Cancelled,
}

/// Cooperative cancellation shared between the caller and a title resolver.
///
/// Clones observe the same flag. A signal built with a timeout also reports
/// cancelled once its deadline passes.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelSignal {
    #[must_use]
    pub fn never() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { cancelled: Arc::default(), deadline: Instant::now().checked_add(timeout) }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
            || self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// # Errors
    /// Returns [`TitleError::Cancelled`] once the signal has fired.
    pub fn check(&self) -> Result<(), TitleError> {
        if self.is_cancelled() {
            return Err(TitleError::Cancelled);
        }
        Ok(())
    }
}

/// Document context handed to a [`TitleResolver`] on every lookup.
#[derive(Clone)]
pub struct TitleLookup<'a> {
    pub app_dir: &'a dyn ApplicationDirectory,
    pub validator: &'a dyn Validator,
    pub cancel: CancelSignal,
}

/// Looks up the human-readable title of a control.
///
/// Failures are reported to the scope builder, which substitutes the control
/// id; an implementation never needs to supply its own fallback.
pub trait TitleResolver {
    /// # Errors
    /// Returns [`TitleError`] when no title can be determined.
    fn resolve_title(
        &self,
        control_id: &str,
        implementation: &ControlImplementationSet,
        lookup: &TitleLookup<'_>,
    ) -> Result<String, TitleError>;
}

impl<F> TitleResolver for F
where
    F: Fn(&str, &ControlImplementationSet, &TitleLookup<'_>) -> Result<String, TitleError>,
{
    fn resolve_title(
        &self,
        control_id: &str,
        implementation: &ControlImplementationSet,
        lookup: &TitleLookup<'_>,
    ) -> Result<String, TitleError> {
        self(control_id, implementation, lookup)
    }
}

/// Resolves titles through the implementation's source profile and the
/// catalogs it imports.
#[derive(Debug, Clone, Default)]
pub struct CatalogTitleResolver<L> {
    loader: L,
}

impl<L: ProfileLoader> CatalogTitleResolver<L> {
    #[must_use]
    pub fn new(loader: L) -> Self {
        Self { loader }
    }

    #[must_use]
    pub fn loader(&self) -> &L {
        &self.loader
    }
}

impl<L: ProfileLoader> TitleResolver for CatalogTitleResolver<L> {
    fn resolve_title(
        &self,
        control_id: &str,
        implementation: &ControlImplementationSet,
        lookup: &TitleLookup<'_>,
    ) -> Result<String, TitleError> {
        lookup.cancel.check()?;
        let profile = self
            .loader
            .load_profile(lookup.app_dir, &implementation.source, lookup.validator)
            .map_err(|cause| TitleError::ProfileLoad {
                source_ref: implementation.source.clone(),
                cause,
            })?;

        let Some(imports) = profile.imports else {
            return Err(TitleError::NoImports(implementation.source.clone()));
        };

        for import in &imports {
            lookup.cancel.check()?;
            let catalog = match self.loader.load_catalog_source(
                lookup.app_dir,
                &import.href,
                lookup.validator,
            ) {
                Ok(catalog) => catalog,
                Err(err) => {
                    tracing::debug!(href = %import.href, error = %err, "skipping unreadable catalog");
                    continue;
                }
            };
            if let Some(title) = catalog.control_title(control_id) {
                return Ok(title.to_string());
            }
        }

        Err(TitleError::NotFound(control_id.to_string()))
    }
}
