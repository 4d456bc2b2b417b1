//! OSCAL document shapes consumed and produced by the scope engine.
//!
//! Only the fields the engine reads or rewrites are typed. Everything else a
//! document carries lands in the flattened `extra` map of the nearest typed
//! node. Optional text fields are omitted again when empty, so a load/write
//! cycle of a well-formed document reproduces it apart from the rewritten
//! control selections. Fields OSCAL requires (uuids, `metadata`,
//! `reviewed-controls`) are always written.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const TRESTLE_NAMESPACE: &str =
    "https://oscal-compass.github.io/compliance-trestle/schemas/oscal";
pub const FRAMEWORK_PROP: &str = "Framework_Short_Name";
pub const SKIPPED_PROP: &str = "skipped";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Property {
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ns: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}

impl Property {
    #[must_use]
    pub fn trestle(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
            ns: Some(TRESTLE_NAMESPACE.to_string()),
            class: None,
            remarks: None,
        }
    }
}

/// First property named `name` in the trestle namespace.
#[must_use]
pub fn find_trestle_prop<'a>(name: &str, props: &'a [Property]) -> Option<&'a Property> {
    props
        .iter()
        .find(|prop| prop.name == name && prop.ns.as_deref() == Some(TRESTLE_NAMESPACE))
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub props: Option<Vec<Property>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct ComponentDefinition {
    #[serde(default)]
    pub uuid: String,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<Vec<DefinedComponent>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct DefinedComponent {
    #[serde(default)]
    pub uuid: String,
    #[serde(rename = "type", default)]
    pub component_type: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub props: Option<Vec<Property>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_implementations: Option<Vec<ControlImplementationSet>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct ControlImplementationSet {
    #[serde(default)]
    pub uuid: String,
    #[serde(default)]
    pub source: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub props: Option<Vec<Property>>,
    #[serde(default)]
    pub implemented_requirements: Vec<ImplementedRequirement>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ControlImplementationSet {
    /// Framework this implementation is tagged for, if any.
    #[must_use]
    pub fn framework_id(&self) -> Option<&str> {
        let props = self.props.as_deref()?;
        find_trestle_prop(FRAMEWORK_PROP, props).map(|prop| prop.value.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct ImplementedRequirement {
    #[serde(default)]
    pub uuid: String,
    #[serde(default)]
    pub control_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub props: Option<Vec<Property>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ImplementedRequirement {
    #[must_use]
    pub fn for_control(control_id: &str) -> Self {
        Self { control_id: control_id.to_string(), ..Self::default() }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct AssessmentPlan {
    #[serde(default)]
    pub uuid: String,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_definitions: Option<LocalDefinitions>,
    #[serde(default)]
    pub reviewed_controls: ReviewedControls,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AssessmentPlan {
    /// Framework recorded in the plan metadata, if any.
    #[must_use]
    pub fn framework_id(&self) -> Option<&str> {
        let props = self.metadata.props.as_deref()?;
        find_trestle_prop(FRAMEWORK_PROP, props).map(|prop| prop.value.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct LocalDefinitions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activities: Option<Vec<Activity>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Activity {
    #[serde(default)]
    pub uuid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub props: Option<Vec<Property>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<Step>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_controls: Option<ReviewedControls>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Step {
    #[serde(default)]
    pub uuid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub props: Option<Vec<Property>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_controls: Option<ReviewedControls>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct ReviewedControls {
    #[serde(default)]
    pub control_selections: Vec<ControlSelection>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Marker object (`{}`) selecting every control in the referenced baseline.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IncludeAll {}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct ControlSelection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub props: Option<Vec<Property>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_all: Option<IncludeAll>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_controls: Option<Vec<SelectControlById>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_controls: Option<Vec<SelectControlById>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ControlSelection {
    #[must_use]
    pub fn including<'a>(control_ids: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            include_controls: Some(control_ids.into_iter().map(SelectControlById::new).collect()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn including_all() -> Self {
        Self { include_all: Some(IncludeAll {}), ..Self::default() }
    }

    /// Explicitly included control ids in document order.
    pub fn included_ids(&self) -> impl Iterator<Item = &str> {
        self.include_controls.iter().flatten().map(|select| select.control_id.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct SelectControlById {
    pub control_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statement_ids: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SelectControlById {
    #[must_use]
    pub fn new(control_id: &str) -> Self {
        Self { control_id: control_id.to_string(), statement_ids: None, extra: Map::new() }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Profile {
    #[serde(default)]
    pub uuid: String,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imports: Option<Vec<Import>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Import {
    pub href: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Catalog {
    #[serde(default)]
    pub uuid: String,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<Group>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controls: Option<Vec<Control>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Catalog {
    /// Title of `control_id`, searching groups (and nested groups), their
    /// controls and enhancements, then top-level controls. Empty titles do
    /// not count as a match.
    #[must_use]
    pub fn control_title(&self, control_id: &str) -> Option<&str> {
        self.groups
            .iter()
            .flatten()
            .find_map(|group| group.control_title(control_id))
            .or_else(|| find_in_controls(self.controls.as_deref(), control_id))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Group {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<Group>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controls: Option<Vec<Control>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Group {
    fn control_title(&self, control_id: &str) -> Option<&str> {
        find_in_controls(self.controls.as_deref(), control_id).or_else(|| {
            self.groups.iter().flatten().find_map(|group| group.control_title(control_id))
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Control {
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controls: Option<Vec<Control>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn find_in_controls<'a>(controls: Option<&'a [Control]>, control_id: &str) -> Option<&'a str> {
    for control in controls.unwrap_or_default() {
        if control.id == control_id && !control.title.is_empty() {
            return Some(control.title.as_str());
        }
        if let Some(title) = find_in_controls(control.controls.as_deref(), control_id) {
            return Some(title);
        }
    }
    None
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct ComponentDefinitionDocument {
    pub component_definition: ComponentDefinition,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct AssessmentPlanDocument {
    pub assessment_plan: AssessmentPlan,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProfileDocument {
    pub profile: Profile,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogDocument {
    pub catalog: Catalog,
}

/// Borrowed view of a loaded document, handed to a [`crate::Validator`].
#[derive(Debug, Clone, Copy)]
pub enum OscalModel<'a> {
    ComponentDefinition(&'a ComponentDefinition),
    AssessmentPlan(&'a AssessmentPlan),
    Profile(&'a Profile),
    Catalog(&'a Catalog),
}

impl OscalModel<'_> {
    #[must_use]
    pub fn kind(self) -> &'static str {
        match self {
            Self::ComponentDefinition(_) => "component-definition",
            Self::AssessmentPlan(_) => "assessment-plan",
            Self::Profile(_) => "profile",
            Self::Catalog(_) => "catalog",
        }
    }
}
