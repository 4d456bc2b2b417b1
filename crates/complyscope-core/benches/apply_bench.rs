use complyscope_core::oscal::{
    Activity, AssessmentPlan, ComponentDefinition, ControlImplementationSet, ControlSelection,
    DefinedComponent, ImplementedRequirement, LocalDefinitions, Property, ReviewedControls, Step,
    FRAMEWORK_PROP,
};
use complyscope_core::{AssessmentScope, ScopeBuilder};
use criterion::{criterion_group, criterion_main, Criterion};
use tracing::Dispatch;

const CONTROLS: usize = 400;
const ACTIVITIES: usize = 200;

fn control_id(index: usize) -> String {
    format!("ctl-{index:04}")
}

fn mk_component_definition(index: usize) -> ComponentDefinition {
    let requirements = (0..CONTROLS)
        .filter(|control| control % 4 == index % 4)
        .map(|control| ImplementedRequirement::for_control(&control_id(control)))
        .collect();
    ComponentDefinition {
        components: Some(vec![DefinedComponent {
            title: format!("component-{index}"),
            control_implementations: Some(vec![ControlImplementationSet {
                source: "profile.json".to_string(),
                props: Some(vec![Property::trestle(FRAMEWORK_PROP, "bench")]),
                implemented_requirements: requirements,
                ..ControlImplementationSet::default()
            }]),
            ..DefinedComponent::default()
        }]),
        ..ComponentDefinition::default()
    }
}

fn reviewed(ids: &[String]) -> Option<ReviewedControls> {
    Some(ReviewedControls {
        control_selections: vec![ControlSelection::including(ids.iter().map(String::as_str))],
        ..ReviewedControls::default()
    })
}

fn mk_plan() -> AssessmentPlan {
    let activities = (0..ACTIVITIES)
        .map(|index| {
            let ids = vec![control_id(index * 2), control_id(index * 2 + 1)];
            Activity {
                uuid: format!("activity-{index}"),
                related_controls: reviewed(&ids),
                steps: Some(vec![Step {
                    uuid: format!("step-{index}"),
                    reviewed_controls: reviewed(&ids[..1]),
                    ..Step::default()
                }]),
                ..Activity::default()
            }
        })
        .collect();

    AssessmentPlan {
        reviewed_controls: ReviewedControls {
            control_selections: vec![ControlSelection::including_all()],
            ..ReviewedControls::default()
        },
        local_definitions: Some(LocalDefinitions {
            activities: Some(activities),
            ..LocalDefinitions::default()
        }),
        ..AssessmentPlan::default()
    }
}

fn bench_scope(c: &mut Criterion) {
    let definitions = (0..8).map(mk_component_definition).collect::<Vec<_>>();
    c.bench_function("build_scope_8_definitions", |b| {
        b.iter(|| ScopeBuilder::new("bench").build(&definitions));
    });

    let scope = AssessmentScope::from_component_definitions("bench", &definitions[..2])
        .unwrap_or_else(|err| panic!("bench scope should build: {err}"));
    let template = mk_plan();
    let log = Dispatch::none();
    c.bench_function("apply_scope_200_activities", |b| {
        b.iter(|| {
            let mut plan = template.clone();
            scope.apply(&mut plan, &log);
            plan
        });
    });
}

criterion_group!(benches, bench_scope);
criterion_main!(benches);
