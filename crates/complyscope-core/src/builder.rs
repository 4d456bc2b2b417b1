use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::oscal::{ComponentDefinition, ControlImplementationSet};
use crate::{AssessmentScope, ControlEntry, ControlSetIndex, ScopeError, TitleLookup, TitleResolver};

/// Builds an [`AssessmentScope`] for one framework from component definitions.
pub struct ScopeBuilder<'a> {
    framework_id: String,
    titles: Option<(&'a dyn TitleResolver, TitleLookup<'a>)>,
}

impl<'a> ScopeBuilder<'a> {
    #[must_use]
    pub fn new(framework_id: impl Into<String>) -> Self {
        Self { framework_id: framework_id.into(), titles: None }
    }

    /// Resolve control titles through `resolver`. Without a resolver every
    /// title is the control id.
    #[must_use]
    pub fn with_titles(mut self, resolver: &'a dyn TitleResolver, lookup: TitleLookup<'a>) -> Self {
        self.titles = Some((resolver, lookup));
        self
    }

    /// Collect every control implemented for this framework across
    /// `component_definitions`, one entry per distinct control id, sorted by id.
    ///
    /// Absent components, implementations or requirement lists count as
    /// empty. Title resolution failures fall back to the control id.
    ///
    /// # Errors
    /// Returns [`ScopeError::EmptyInput`] when no definitions are supplied.
    pub fn build(
        &self,
        component_definitions: &[ComponentDefinition],
    ) -> Result<AssessmentScope, ScopeError> {
        if component_definitions.is_empty() {
            return Err(ScopeError::EmptyInput);
        }

        let mut controls = ControlSetIndex::new();
        let mut titles: HashMap<String, String> = HashMap::new();
        for implementation in framework_implementations(component_definitions, &self.framework_id)
        {
            for requirement in &implementation.implemented_requirements {
                let control_id = requirement.control_id.as_str();
                if control_id.is_empty() || !controls.insert(control_id) {
                    continue;
                }
                titles.insert(control_id.to_string(), self.resolve_title(control_id, implementation));
            }
        }

        tracing::debug!(
            framework_id = %self.framework_id,
            controls = controls.len(),
            "resolved assessment scope"
        );

        let mut include_controls = controls
            .into_sorted()
            .into_iter()
            .map(|control_id| {
                let title = titles.remove(&control_id).unwrap_or_else(|| control_id.clone());
                ControlEntry::new(control_id, title)
            })
            .collect::<Vec<_>>();
        include_controls.sort_by(|lhs, rhs| lhs.control_id.cmp(&rhs.control_id));

        Ok(AssessmentScope {
            framework_id: self.framework_id.clone(),
            include_controls,
            global_exclude_rules: Vec::new(),
        })
    }

    fn resolve_title(&self, control_id: &str, implementation: &ControlImplementationSet) -> String {
        let Some((resolver, lookup)) = &self.titles else {
            return control_id.to_string();
        };

        if lookup.cancel.is_cancelled() {
            tracing::debug!(control_id, "title lookup cancelled; using control id");
            return control_id.to_string();
        }

        match resolver.resolve_title(control_id, implementation, lookup) {
            Ok(title) if !title.trim().is_empty() => title,
            Ok(_) => control_id.to_string(),
            Err(err) => {
                tracing::debug!(control_id, error = %err, "title lookup failed; using control id");
                control_id.to_string()
            }
        }
    }
}

impl AssessmentScope {
    /// Shorthand for [`ScopeBuilder::build`] without title resolution.
    ///
    /// # Errors
    /// Returns [`ScopeError::EmptyInput`] when no definitions are supplied.
    pub fn from_component_definitions(
        framework_id: impl Into<String>,
        component_definitions: &[ComponentDefinition],
    ) -> Result<Self, ScopeError> {
        ScopeBuilder::new(framework_id).build(component_definitions)
    }
}

fn framework_implementations<'d>(
    component_definitions: &'d [ComponentDefinition],
    framework_id: &'d str,
) -> impl Iterator<Item = &'d ControlImplementationSet> + 'd {
    component_definitions
        .iter()
        .filter_map(|definition| definition.components.as_deref())
        .flatten()
        .filter_map(|component| component.control_implementations.as_deref())
        .flatten()
        .filter(move |implementation| implementation.framework_id() == Some(framework_id))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FrameworkSummary {
    pub framework_id: String,
    pub control_count: usize,
}

/// Frameworks tagged anywhere in `component_definitions`, ascending by id,
/// each with its number of distinct implemented controls.
#[must_use]
pub fn list_frameworks(component_definitions: &[ComponentDefinition]) -> Vec<FrameworkSummary> {
    let mut frameworks: BTreeMap<&str, ControlSetIndex> = BTreeMap::new();
    let implementations = component_definitions
        .iter()
        .filter_map(|definition| definition.components.as_deref())
        .flatten()
        .filter_map(|component| component.control_implementations.as_deref())
        .flatten();

    for implementation in implementations {
        let Some(framework_id) = implementation.framework_id() else {
            continue;
        };
        frameworks.entry(framework_id).or_default().extend(
            implementation
                .implemented_requirements
                .iter()
                .map(|requirement| requirement.control_id.as_str())
                .filter(|control_id| !control_id.is_empty()),
        );
    }

    frameworks
        .into_iter()
        .map(|(framework_id, controls)| FrameworkSummary {
            framework_id: framework_id.to_string(),
            control_count: controls.len(),
        })
        .collect()
}
