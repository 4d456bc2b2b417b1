use complyscope_core::oscal::{
    AssessmentPlan, Catalog, ComponentDefinition, Control, ControlSelection, Group, OscalModel,
    Profile,
};
use complyscope_core::{ValidationError, Validator};

/// Accepts every document.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopValidator;

impl Validator for NoopValidator {
    fn validate(&self, _model: OscalModel<'_>) -> Result<(), ValidationError> {
        Ok(())
    }
}

/// Checks the identifiers the scope engine relies on.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralValidator;

impl Validator for StructuralValidator {
    fn validate(&self, model: OscalModel<'_>) -> Result<(), ValidationError> {
        let kind = model.kind();
        let check = match model {
            OscalModel::ComponentDefinition(definition) => check_component_definition(definition),
            OscalModel::AssessmentPlan(plan) => check_assessment_plan(plan),
            OscalModel::Profile(profile) => check_profile(profile),
            OscalModel::Catalog(catalog) => check_catalog(catalog),
        };
        check.map_err(|reason| ValidationError { model: kind, reason })
    }
}

fn require_uuid(uuid: &str, what: &str) -> Result<(), String> {
    if uuid.trim().is_empty() {
        return Err(format!("{what} uuid must not be empty"));
    }
    Ok(())
}

fn check_component_definition(definition: &ComponentDefinition) -> Result<(), String> {
    require_uuid(&definition.uuid, "component-definition")?;
    for component in definition.components.iter().flatten() {
        for implementation in component.control_implementations.iter().flatten() {
            if implementation.source.trim().is_empty() {
                return Err(format!(
                    "control implementation in component '{}' has no source",
                    component.title
                ));
            }
            if let Some(requirement) = implementation
                .implemented_requirements
                .iter()
                .find(|requirement| requirement.control_id.trim().is_empty())
            {
                return Err(format!(
                    "implemented requirement '{}' has no control-id",
                    requirement.uuid
                ));
            }
        }
    }
    Ok(())
}

fn check_selections(selections: &[ControlSelection], owner: &str) -> Result<(), String> {
    let blank = selections
        .iter()
        .flat_map(|selection| {
            selection.include_controls.iter().flatten().chain(selection.exclude_controls.iter().flatten())
        })
        .any(|select| select.control_id.trim().is_empty());
    if blank {
        return Err(format!("control selection in {owner} has an empty control-id"));
    }
    Ok(())
}

fn check_assessment_plan(plan: &AssessmentPlan) -> Result<(), String> {
    require_uuid(&plan.uuid, "assessment-plan")?;
    check_selections(&plan.reviewed_controls.control_selections, "reviewed-controls")?;
    for activity in plan.local_definitions.iter().flat_map(|defs| defs.activities.iter().flatten()) {
        let owner = format!("activity '{}'", activity.uuid);
        if let Some(related) = &activity.related_controls {
            check_selections(&related.control_selections, &owner)?;
        }
        for step in activity.steps.iter().flatten() {
            if let Some(reviewed) = &step.reviewed_controls {
                check_selections(&reviewed.control_selections, &format!("step '{}'", step.uuid))?;
            }
        }
    }
    Ok(())
}

fn check_profile(profile: &Profile) -> Result<(), String> {
    require_uuid(&profile.uuid, "profile")?;
    if profile.imports.iter().flatten().any(|import| import.href.trim().is_empty()) {
        return Err("profile import has an empty href".to_string());
    }
    Ok(())
}

fn controls_have_ids(controls: Option<&[Control]>) -> bool {
    controls
        .unwrap_or_default()
        .iter()
        .all(|control| !control.id.trim().is_empty() && controls_have_ids(control.controls.as_deref()))
}

fn groups_have_ids(groups: Option<&[Group]>) -> bool {
    groups.unwrap_or_default().iter().all(|group| {
        controls_have_ids(group.controls.as_deref()) && groups_have_ids(group.groups.as_deref())
    })
}

fn check_catalog(catalog: &Catalog) -> Result<(), String> {
    require_uuid(&catalog.uuid, "catalog")?;
    if !groups_have_ids(catalog.groups.as_deref()) || !controls_have_ids(catalog.controls.as_deref()) {
        return Err("catalog control has an empty id".to_string());
    }
    Ok(())
}
