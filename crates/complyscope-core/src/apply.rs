use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::Dispatch;

use crate::oscal::{
    find_trestle_prop, Activity, AssessmentPlan, ControlSelection, Property, ReviewedControls,
    SelectControlById, Step, SKIPPED_PROP, TRESTLE_NAMESPACE,
};
use crate::{AssessmentScope, ControlSetIndex};

/// A plan node that owns control selections: the plan root, an activity, or
/// a step.
trait SelectionContainer {
    fn level(&self) -> &'static str;

    fn selections_mut(&mut self) -> Option<&mut Vec<ControlSelection>>;

    /// Drop the selection reference and tag the node as skipped. The plan
    /// root cannot be skipped and returns `false`.
    fn mark_skipped(&mut self) -> bool {
        false
    }
}

impl SelectionContainer for ReviewedControls {
    fn level(&self) -> &'static str {
        "plan"
    }

    fn selections_mut(&mut self) -> Option<&mut Vec<ControlSelection>> {
        Some(&mut self.control_selections)
    }
}

impl SelectionContainer for Activity {
    fn level(&self) -> &'static str {
        "activity"
    }

    fn selections_mut(&mut self) -> Option<&mut Vec<ControlSelection>> {
        self.related_controls.as_mut().map(|related| &mut related.control_selections)
    }

    fn mark_skipped(&mut self) -> bool {
        self.related_controls = None;
        set_skipped(&mut self.props);
        true
    }
}

impl SelectionContainer for Step {
    fn level(&self) -> &'static str {
        "step"
    }

    fn selections_mut(&mut self) -> Option<&mut Vec<ControlSelection>> {
        self.reviewed_controls.as_mut().map(|reviewed| &mut reviewed.control_selections)
    }

    fn mark_skipped(&mut self) -> bool {
        self.reviewed_controls = None;
        set_skipped(&mut self.props);
        true
    }
}

fn set_skipped(props: &mut Option<Vec<Property>>) {
    let props = props.get_or_insert_with(Vec::new);
    let existing = props
        .iter_mut()
        .find(|prop| prop.name == SKIPPED_PROP && prop.ns.as_deref() == Some(TRESTLE_NAMESPACE));
    match existing {
        Some(prop) => prop.value = "true".to_string(),
        None => props.push(Property::trestle(SKIPPED_PROP, "true")),
    }
}

fn for_each_container(plan: &mut AssessmentPlan, mut visit: impl FnMut(&mut dyn SelectionContainer)) {
    visit(&mut plan.reviewed_controls);

    let activities =
        plan.local_definitions.as_mut().and_then(|definitions| definitions.activities.as_mut());
    for activity in activities.into_iter().flatten() {
        visit(activity);
        for step in activity.steps.iter_mut().flatten() {
            visit(step);
        }
    }
}

/// Narrow one selection to `in_scope`.
///
/// An include-all marker is consumed and expands to the whole scope.
/// Otherwise only explicitly included controls that are also in scope
/// survive, keeping their original entries. When nothing survives,
/// `include_controls` becomes `None`. Exclusions are left untouched.
pub fn filter_selection(selection: &mut ControlSelection, in_scope: &ControlSetIndex) {
    let included_all = selection.include_all.take().is_some();

    let mut original: HashMap<String, SelectControlById> = HashMap::new();
    for select in selection.include_controls.take().into_iter().flatten() {
        original.entry(select.control_id.clone()).or_insert(select);
    }

    let kept = in_scope
        .sorted()
        .into_iter()
        .filter_map(|control_id| match original.remove(control_id) {
            Some(select) => Some(select),
            None if included_all => Some(SelectControlById::new(control_id)),
            None => None,
        })
        .collect::<Vec<_>>();

    selection.include_controls = if kept.is_empty() { None } else { Some(kept) };
}

impl AssessmentScope {
    /// Narrow every control selection in `plan` to this scope.
    ///
    /// Activities and steps whose selections end up empty lose their
    /// selection reference and gain a `skipped` property; they are never
    /// removed. Diagnostics go to `log` only.
    pub fn apply(&self, plan: &mut AssessmentPlan, log: &Dispatch) {
        tracing::dispatcher::with_default(log, || self.apply_control_scope(plan));
    }

    fn apply_control_scope(&self, plan: &mut AssessmentPlan) {
        let in_scope = self.control_ids();
        tracing::debug!(count = in_scope.len(), "found included controls");

        let mut filtered = 0_usize;
        let mut skipped = 0_usize;
        for_each_container(plan, |container| {
            let Some(selections) = container.selections_mut() else {
                return;
            };

            let mut emptied = false;
            for selection in selections.iter_mut() {
                filter_selection(selection, &in_scope);
                filtered += 1;
                emptied |= selection.include_controls.is_none();
            }

            if emptied && container.mark_skipped() {
                skipped += 1;
                tracing::debug!(node = container.level(), "no in-scope controls; marked skipped");
            }
        });

        tracing::info!(
            framework_id = %self.framework_id,
            selections = filtered,
            skipped,
            "applied assessment scope"
        );
    }
}

/// Counts describing a (typically already scoped) plan.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlanSummary {
    pub control_selections: usize,
    pub included_controls: Vec<String>,
    pub activities: usize,
    pub skipped_activities: usize,
    pub steps: usize,
    pub skipped_steps: usize,
}

impl PlanSummary {
    #[must_use]
    pub fn of(plan: &AssessmentPlan) -> Self {
        let mut summary = Self::default();
        let mut included = ControlSetIndex::new();
        let mut count = |selections: &[ControlSelection]| {
            summary.control_selections += selections.len();
            included.extend(selections.iter().flat_map(ControlSelection::included_ids));
        };

        count(&plan.reviewed_controls.control_selections);

        let mut activities = 0;
        let mut skipped_activities = 0;
        let mut steps = 0;
        let mut skipped_steps = 0;
        let all_activities = plan
            .local_definitions
            .as_ref()
            .and_then(|definitions| definitions.activities.as_deref())
            .unwrap_or_default();
        for activity in all_activities {
            activities += 1;
            skipped_activities += usize::from(is_skipped(activity.props.as_deref()));
            if let Some(related) = &activity.related_controls {
                count(&related.control_selections);
            }
            for step in activity.steps.iter().flatten() {
                steps += 1;
                skipped_steps += usize::from(is_skipped(step.props.as_deref()));
                if let Some(reviewed) = &step.reviewed_controls {
                    count(&reviewed.control_selections);
                }
            }
        }

        summary.included_controls = included.into_sorted();
        summary.activities = activities;
        summary.skipped_activities = skipped_activities;
        summary.steps = steps;
        summary.skipped_steps = skipped_steps;
        summary
    }
}

fn is_skipped(props: Option<&[Property]>) -> bool {
    props
        .and_then(|props| find_trestle_prop(SKIPPED_PROP, props))
        .is_some_and(|prop| prop.value == "true")
}
