//! Scope resolution and plan narrowing for compliance assessments.
//!
//! [`ScopeBuilder`] turns component definitions into an [`AssessmentScope`];
//! [`AssessmentScope::apply`] narrows an [`oscal::AssessmentPlan`] to it.

mod apply;
mod builder;
mod control_set;
pub mod oscal;
mod resolver;
mod scope;

pub use apply::{filter_selection, PlanSummary};
pub use builder::{list_frameworks, FrameworkSummary, ScopeBuilder};
pub use control_set::ControlSetIndex;
pub use resolver::{
    ApplicationDirectory, CancelSignal, CatalogTitleResolver, LoadError, ProfileLoader,
    TitleError, TitleLookup, TitleResolver, ValidationError, Validator,
};
pub use scope::{default_rules, AssessmentScope, ControlEntry, ALL_RULES};

#[derive(Debug, thiserror::Error)]
pub enum ScopeError {
    #[error("no component definitions found")]
    EmptyInput,
    #[error("scope descriptor parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("scope validation error: {0}")]
    Validation(String),
}
