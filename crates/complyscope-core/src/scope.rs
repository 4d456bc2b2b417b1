use serde::{Deserialize, Deserializer, Serialize};

use crate::{ControlSetIndex, ScopeError};

pub const ALL_RULES: &str = "*";

#[must_use]
pub fn default_rules() -> Vec<String> {
    vec![ALL_RULES.to_string()]
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ControlEntry {
    pub control_id: String,
    #[serde(default)]
    pub control_title: String,
    #[serde(rename = "includeRules", default = "default_rules")]
    pub rules: Vec<String>,
    /// Carried through unchanged; rule-level exclusion is not evaluated.
    #[serde(default, skip_serializing_if = "Vec::is_empty", deserialize_with = "null_as_empty")]
    pub exclude_rules: Vec<String>,
}

impl ControlEntry {
    #[must_use]
    pub fn new(control_id: impl Into<String>, control_title: impl Into<String>) -> Self {
        Self {
            control_id: control_id.into(),
            control_title: control_title.into(),
            rules: default_rules(),
            exclude_rules: Vec::new(),
        }
    }
}

/// The persisted, user-editable set of controls an assessment run covers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentScope {
    pub framework_id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub include_controls: Vec<ControlEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty", deserialize_with = "null_as_empty")]
    pub global_exclude_rules: Vec<String>,
}

impl AssessmentScope {
    #[must_use]
    pub fn new(framework_id: impl Into<String>) -> Self {
        Self {
            framework_id: framework_id.into(),
            include_controls: Vec::new(),
            global_exclude_rules: Vec::new(),
        }
    }

    #[must_use]
    pub fn control_ids(&self) -> ControlSetIndex {
        self.include_controls.iter().map(|entry| entry.control_id.as_str()).collect()
    }

    /// Parse a hand-editable scope descriptor.
    ///
    /// # Errors
    /// Returns [`ScopeError::Yaml`] for malformed YAML and
    /// [`ScopeError::Validation`] when the descriptor breaks a scope invariant.
    pub fn from_yaml(yaml: &str) -> Result<Self, ScopeError> {
        let scope: Self = serde_yaml::from_str(yaml)?;
        scope.validate()?;
        Ok(scope)
    }

    /// Render the descriptor with controls in ascending id order.
    ///
    /// # Errors
    /// Returns [`ScopeError::Yaml`] if serialization fails.
    pub fn to_yaml(&self) -> Result<String, ScopeError> {
        let mut sorted = self.clone();
        sorted.include_controls.sort_by(|lhs, rhs| lhs.control_id.cmp(&rhs.control_id));
        Ok(serde_yaml::to_string(&sorted)?)
    }

    /// # Errors
    /// Returns [`ScopeError::Validation`] for an empty framework id, an empty
    /// control id, or a control id listed more than once.
    pub fn validate(&self) -> Result<(), ScopeError> {
        if self.framework_id.trim().is_empty() {
            return Err(ScopeError::Validation("frameworkId MUST be non-empty".to_string()));
        }

        let mut seen = ControlSetIndex::new();
        for entry in &self.include_controls {
            if entry.control_id.trim().is_empty() {
                return Err(ScopeError::Validation(
                    "includeControls entries MUST carry a controlId".to_string(),
                ));
            }
            if !seen.insert(&entry.control_id) {
                return Err(ScopeError::Validation(format!(
                    "controlId '{}' is listed more than once",
                    entry.control_id
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_validation_error_contains(yaml: &str, expected_substring: &str) {
        let err = match AssessmentScope::from_yaml(yaml) {
            Ok(scope) => panic!("expected validation error, parsed {scope:?}"),
            Err(err) => err,
        };
        assert!(
            err.to_string().contains(expected_substring),
            "error `{err}` did not contain `{expected_substring}`"
        );
    }

    #[test]
    fn missing_include_rules_default_to_all_rules() {
        let scope = AssessmentScope::from_yaml(
            r"
frameworkId: cis
includeControls:
  - controlId: ac-1
    controlTitle: Policy and Procedures
  - controlId: ac-2
    controlTitle: Account Management
    includeRules: [rule_a, rule_b]
",
        )
        .unwrap_or_else(|err| panic!("scope should parse: {err}"));

        assert_eq!(scope.framework_id, "cis");
        assert_eq!(scope.include_controls[0].rules, vec!["*".to_string()]);
        assert_eq!(
            scope.include_controls[1].rules,
            vec!["rule_a".to_string(), "rule_b".to_string()]
        );
    }

    #[test]
    fn empty_include_controls_value_reads_as_empty_list() {
        let scope = AssessmentScope::from_yaml("frameworkId: cis\nincludeControls:\n")
            .unwrap_or_else(|err| panic!("scope should parse: {err}"));
        assert!(scope.include_controls.is_empty());
    }

    #[test]
    fn rule_exclusions_are_carried_through() {
        let yaml = r"
frameworkId: cis
includeControls:
  - controlId: ac-1
    controlTitle: Policy
    includeRules: ['*']
    excludeRules: [rule_x]
globalExcludeRules: [rule_y]
";
        let scope =
            AssessmentScope::from_yaml(yaml).unwrap_or_else(|err| panic!("parse failed: {err}"));
        assert_eq!(scope.include_controls[0].exclude_rules, vec!["rule_x".to_string()]);
        assert_eq!(scope.global_exclude_rules, vec!["rule_y".to_string()]);

        let rendered = scope.to_yaml().unwrap_or_else(|err| panic!("render failed: {err}"));
        assert!(rendered.contains("excludeRules"));
        assert!(rendered.contains("globalExcludeRules"));
    }

    #[test]
    fn rendered_descriptor_uses_camel_case_and_sorted_controls() {
        let scope = AssessmentScope {
            framework_id: "cis".to_string(),
            include_controls: vec![
                ControlEntry::new("sc-7", "Boundary Protection"),
                ControlEntry::new("ac-1", "Policy and Procedures"),
            ],
            global_exclude_rules: Vec::new(),
        };
        let rendered = scope.to_yaml().unwrap_or_else(|err| panic!("render failed: {err}"));

        assert!(rendered.contains("frameworkId: cis"));
        assert!(rendered.contains("includeRules:"));
        assert!(!rendered.contains("excludeRules"));
        let ac = rendered.find("ac-1").unwrap_or(usize::MAX);
        let sc = rendered.find("sc-7").unwrap_or(0);
        assert!(ac < sc, "controls should render in ascending order:\n{rendered}");

        let reparsed = AssessmentScope::from_yaml(&rendered)
            .unwrap_or_else(|err| panic!("rendered scope should parse: {err}"));
        assert_eq!(reparsed.include_controls[0].control_id, "ac-1");
    }

    #[test]
    fn validate_rejects_missing_framework_id() {
        assert_validation_error_contains("frameworkId: ''\nincludeControls: []\n", "frameworkId");
    }

    #[test]
    fn validate_rejects_duplicate_control_ids() {
        assert_validation_error_contains(
            r"
frameworkId: cis
includeControls:
  - controlId: ac-1
  - controlId: ac-1
",
            "more than once",
        );
    }

    #[test]
    fn validate_rejects_blank_control_id() {
        assert_validation_error_contains(
            "frameworkId: cis\nincludeControls:\n  - controlId: ' '\n",
            "controlId",
        );
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        let err = AssessmentScope::from_yaml("frameworkId: [unterminated")
            .err()
            .unwrap_or_else(|| panic!("expected parse error"));
        assert!(matches!(err, ScopeError::Yaml(_)));
    }
}
