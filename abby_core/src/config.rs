//! Project configuration model.
//!
//! [`ProjectConfig`] is an immutable, environment-scoped snapshot of everything the
//! source-of-truth store knows about a project: A/B tests with their variants and
//! weights, and flag definitions with their rule sets. A snapshot is never mutated;
//! newer state is always a complete replacement.
//!
//! [`ConfigPayload`] is the public wire shape served to clients. Boolean-typed flags
//! are served under `flags`; Number/String/Json-typed ones under `remoteConfig`.
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::AttributeValue;

/// Environment-scoped snapshot of a project's configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    /// Globally unique project identifier.
    pub project_id: String,
    /// All environments the project defines.
    #[serde(default)]
    pub environments: Vec<String>,
    /// A/B tests by name.
    #[serde(default)]
    pub tests: HashMap<String, TestDefinition>,
    /// Feature flags and remote config values by name.
    #[serde(default)]
    pub flags: HashMap<String, FlagDefinition>,
}

/// An A/B test: named variants with relative probability weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestDefinition {
    /// Variant identifiers.
    pub variants: Vec<String>,
    /// Relative proportions; need not sum to 1.
    pub weights: Vec<f64>,
}

/// A feature flag or remote config value, with its rule set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagDefinition {
    /// Type of the flag's value.
    pub value_type: FlagType,
    /// The value served when no rule matches. For an environment-scoped
    /// snapshot this is the environment's current value.
    pub default_value: FlagValue,
    /// Ordered rules, evaluated first-match-wins against a [`UserContext`].
    ///
    /// [`UserContext`]: crate::UserContext
    #[serde(default)]
    pub rule_set: Vec<FlagRule>,
}

/// Type of a flag value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlagType {
    /// On/off flag; served under `flags` in the public payload.
    Boolean,
    /// Numeric remote config value.
    Number,
    /// String remote config value.
    String,
    /// Arbitrary JSON remote config value.
    Json,
}

impl FlagType {
    /// The type's zero value, served when a client requests a flag name the
    /// current configuration doesn't know. Callers must never crash on stale
    /// client-bundled definitions.
    pub fn zero_value(self) -> FlagValue {
        match self {
            FlagType::Boolean => FlagValue::Boolean(false),
            FlagType::Number => FlagValue::Number(0.0),
            FlagType::String => FlagValue::String(String::new()),
            FlagType::Json => FlagValue::Json(serde_json::Value::Null),
        }
    }
}

/// A flag's value.
///
/// Untagged on the wire: the JSON value alone carries the type, and
/// [`FlagType`] at the definition level disambiguates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagValue {
    /// A boolean value.
    Boolean(bool),
    /// A numeric value.
    Number(f64),
    /// A string value.
    String(String),
    /// Any other JSON value (object, array, null).
    Json(serde_json::Value),
}

impl FlagValue {
    /// String representation used for sticky persistence of flag decisions.
    pub fn to_stored_string(&self) -> String {
        match self {
            FlagValue::Boolean(b) => b.to_string(),
            FlagValue::Number(n) => n.to_string(),
            FlagValue::String(s) => s.clone(),
            FlagValue::Json(v) => v.to_string(),
        }
    }
}

/// A node in a flag's rule set: either a single condition or a nested group.
///
/// The tree shape is rebuilt on every edit, never mutated in place, so
/// evaluation always sees a consistent snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagRule {
    /// A single `property <operator> value -> thenValue` condition.
    Leaf(LeafRule),
    /// An AND/OR combination of nested rules.
    Group(GroupRule),
}

/// A single rule condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeafRule {
    /// Name of the user attribute the condition reads.
    pub property_name: String,
    /// Expected type of the attribute. A context value of a different type
    /// makes the leaf non-matching.
    pub property_type: AttributeKind,
    /// Comparison operator; type-scoped, see [`RuleOperator`].
    pub operator: RuleOperator,
    /// Value the attribute is compared against.
    pub value: AttributeValue,
    /// Value the flag resolves to when the condition holds.
    pub then_value: FlagValue,
}

/// An AND/OR group of nested rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupRule {
    /// How the sub-rules combine.
    pub operator: GroupOperator,
    /// Nested rules; may contain further groups.
    pub rules: Vec<FlagRule>,
}

/// How a [`GroupRule`]'s sub-rules combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GroupOperator {
    /// All sub-rules must hold.
    And,
    /// Any sub-rule must hold.
    Or,
}

/// Expected type of a rule's property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttributeKind {
    /// String attribute.
    String,
    /// Numeric attribute.
    Number,
    /// Boolean attribute.
    Boolean,
}

/// Comparison operators for leaf rules.
///
/// Operators are type-scoped: numeric attributes support
/// `eq`/`gt`/`lt`/`gte`/`lte`, strings `eq`/`contains`/`startsWith`, booleans
/// `eq`. Applying an operator to a mismatched type makes the leaf
/// non-matching, never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RuleOperator {
    /// Equality; valid for all attribute kinds.
    Eq,
    /// Numeric greater-than.
    Gt,
    /// Numeric less-than.
    Lt,
    /// Numeric greater-or-equal.
    Gte,
    /// Numeric less-or-equal.
    Lte,
    /// String containment.
    Contains,
    /// String prefix match.
    StartsWith,
}

/// Public config shape served to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigPayload {
    /// Tests with their weights.
    pub tests: Vec<TestEntry>,
    /// Boolean flags with their current values.
    pub flags: Vec<ValueEntry>,
    /// Typed remote config values.
    pub remote_config: Vec<ValueEntry>,
}

/// A test in the public payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestEntry {
    /// Test name.
    pub name: String,
    /// Relative variant weights.
    pub weights: Vec<f64>,
}

/// A named value in the public payload (flag or remote config).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueEntry {
    /// Flag name.
    pub name: String,
    /// Current value for the requested environment.
    pub value: FlagValue,
}

impl ConfigPayload {
    /// Assemble the public payload from a project snapshot.
    ///
    /// Entries are sorted by name so repeated assemblies of the same snapshot
    /// are byte-identical on the wire.
    pub fn from_config(config: &ProjectConfig) -> ConfigPayload {
        let mut tests: Vec<TestEntry> = config
            .tests
            .iter()
            .map(|(name, test)| TestEntry {
                name: name.clone(),
                weights: test.weights.clone(),
            })
            .collect();
        tests.sort_by(|a, b| a.name.cmp(&b.name));

        let mut flags = Vec::new();
        let mut remote_config = Vec::new();
        for (name, flag) in &config.flags {
            let entry = ValueEntry {
                name: name.clone(),
                value: flag.default_value.clone(),
            };
            match flag.value_type {
                FlagType::Boolean => flags.push(entry),
                _ => remote_config.push(entry),
            }
        }
        flags.sort_by(|a, b| a.name.cmp(&b.name));
        remote_config.sort_by(|a, b| a.name.cmp(&b.name));

        ConfigPayload {
            tests,
            flags,
            remote_config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> ProjectConfig {
        ProjectConfig {
            project_id: "p1".to_owned(),
            environments: vec!["prod".to_owned()],
            tests: HashMap::from([(
                "cta-button".to_owned(),
                TestDefinition {
                    variants: vec!["A".to_owned(), "B".to_owned()],
                    weights: vec![0.5, 0.5],
                },
            )]),
            flags: HashMap::from([
                (
                    "dark-mode".to_owned(),
                    FlagDefinition {
                        value_type: FlagType::Boolean,
                        default_value: FlagValue::Boolean(true),
                        rule_set: vec![],
                    },
                ),
                (
                    "banner-text".to_owned(),
                    FlagDefinition {
                        value_type: FlagType::String,
                        default_value: FlagValue::String("hello".to_owned()),
                        rule_set: vec![],
                    },
                ),
            ]),
        }
    }

    #[test]
    fn payload_splits_flags_and_remote_config() {
        let payload = ConfigPayload::from_config(&snapshot());
        assert_eq!(payload.tests.len(), 1);
        assert_eq!(payload.tests[0].name, "cta-button");
        assert_eq!(payload.flags.len(), 1);
        assert_eq!(payload.flags[0].name, "dark-mode");
        assert_eq!(payload.flags[0].value, FlagValue::Boolean(true));
        assert_eq!(payload.remote_config.len(), 1);
        assert_eq!(payload.remote_config[0].name, "banner-text");
    }

    #[test]
    fn payload_assembly_is_deterministic() {
        let config = snapshot();
        let a = serde_json::to_string(&ConfigPayload::from_config(&config)).unwrap();
        let b = serde_json::to_string(&ConfigPayload::from_config(&config)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn payload_serializes_camel_case() {
        let payload = ConfigPayload::from_config(&snapshot());
        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("remoteConfig").is_some());
    }

    #[test]
    fn flag_rule_deserializes_both_shapes() {
        let json = serde_json::json!([
            {
                "propertyName": "age",
                "propertyType": "NUMBER",
                "operator": "gt",
                "value": 18.0,
                "thenValue": "adult"
            },
            {
                "operator": "AND",
                "rules": [
                    {
                        "propertyName": "country",
                        "propertyType": "STRING",
                        "operator": "eq",
                        "value": "DE",
                        "thenValue": true
                    }
                ]
            }
        ]);
        let rules: Vec<FlagRule> = serde_json::from_value(json).unwrap();
        assert!(matches!(rules[0], FlagRule::Leaf(_)));
        assert!(matches!(rules[1], FlagRule::Group(_)));
    }

    #[test]
    fn zero_values() {
        assert_eq!(FlagType::Boolean.zero_value(), FlagValue::Boolean(false));
        assert_eq!(FlagType::Number.zero_value(), FlagValue::Number(0.0));
        assert_eq!(
            FlagType::String.zero_value(),
            FlagValue::String(String::new())
        );
        assert_eq!(
            FlagType::Json.zero_value(),
            FlagValue::Json(serde_json::Value::Null)
        );
    }
}
