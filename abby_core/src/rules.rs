//! Rule evaluation for flags and remote config values.
//!
//! Evaluation is a pure function of the rule set and the [`UserContext`]: no
//! I/O, no side effects, deterministic for a given input.
use crate::{
    config::{FlagRule, FlagValue, GroupOperator, GroupRule, LeafRule, RuleOperator},
    AttributeKind, AttributeValue, UserContext,
};

/// Evaluate a flag's rule set against user attributes.
///
/// Rules are walked in order and the first match wins: for a leaf whose
/// condition holds, its `then_value` is returned immediately and no further
/// rules are evaluated. For a group whose aggregate condition holds,
/// evaluation descends to the first matching leaf inside it. If no rule at any
/// depth matches, `default_value` is returned unchanged.
pub fn evaluate(
    rule_set: &[FlagRule],
    context: &UserContext,
    default_value: &FlagValue,
) -> FlagValue {
    first_match(rule_set, context)
        .cloned()
        .unwrap_or_else(|| default_value.clone())
}

fn first_match<'a>(rules: &'a [FlagRule], context: &UserContext) -> Option<&'a FlagValue> {
    for rule in rules {
        match rule {
            FlagRule::Leaf(leaf) => {
                if leaf.matches(context) {
                    return Some(&leaf.then_value);
                }
            }
            FlagRule::Group(group) => {
                if group.matches(context) {
                    // The aggregate holds; locate the first applicable leaf
                    // inside the group. An OR group may hold through a later
                    // leaf than the one walked first, so descend rather than
                    // assume.
                    if let Some(value) = first_match(&group.rules, context) {
                        return Some(value);
                    }
                }
            }
        }
    }
    None
}

impl LeafRule {
    pub(crate) fn matches(&self, context: &UserContext) -> bool {
        let attribute = context.get(&self.property_name);
        if !kind_matches(self.property_type, attribute) {
            return false;
        }
        self.operator
            .try_eval(attribute, &self.value)
            .unwrap_or(false)
    }
}

impl GroupRule {
    pub(crate) fn matches(&self, context: &UserContext) -> bool {
        match self.operator {
            GroupOperator::And => self.rules.iter().all(|rule| rule.matches(context)),
            GroupOperator::Or => self.rules.iter().any(|rule| rule.matches(context)),
        }
    }
}

impl FlagRule {
    fn matches(&self, context: &UserContext) -> bool {
        match self {
            FlagRule::Leaf(leaf) => leaf.matches(context),
            FlagRule::Group(group) => group.matches(context),
        }
    }
}

fn kind_matches(kind: AttributeKind, attribute: Option<&AttributeValue>) -> bool {
    match attribute {
        Some(AttributeValue::String(_)) => kind == AttributeKind::String,
        Some(AttributeValue::Number(_)) => kind == AttributeKind::Number,
        Some(AttributeValue::Boolean(_)) => kind == AttributeKind::Boolean,
        Some(AttributeValue::Null) | None => false,
    }
}

impl RuleOperator {
    /// Try applying the operator, returning `None` if it cannot be applied to
    /// the given types. A `None` (missing attribute, type mismatch,
    /// misconfigured rule) collapses to "leaf does not match" — it never
    /// surfaces to the caller.
    fn try_eval(
        &self,
        attribute: Option<&AttributeValue>,
        condition_value: &AttributeValue,
    ) -> Option<bool> {
        let attribute = attribute?;
        match self {
            Self::Eq => match (attribute, condition_value) {
                (AttributeValue::String(a), AttributeValue::String(b)) => Some(a == b),
                (AttributeValue::Number(a), AttributeValue::Number(b)) => Some(a == b),
                (AttributeValue::Boolean(a), AttributeValue::Boolean(b)) => Some(a == b),
                _ => None,
            },

            Self::Gt | Self::Gte | Self::Lt | Self::Lte => {
                let a = attribute.as_number()?;
                let b = condition_value.as_number()?;
                Some(match self {
                    Self::Gt => a > b,
                    Self::Gte => a >= b,
                    Self::Lt => a < b,
                    Self::Lte => a <= b,
                    _ => return None,
                })
            }

            Self::Contains | Self::StartsWith => {
                let a = attribute.as_str()?;
                let b = condition_value.as_str()?;
                Some(match self {
                    Self::Contains => a.contains(b),
                    Self::StartsWith => a.starts_with(b),
                    _ => return None,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::config::{FlagRule, GroupOperator, GroupRule, LeafRule, RuleOperator};

    fn leaf(
        property: &str,
        kind: AttributeKind,
        operator: RuleOperator,
        value: impl Into<AttributeValue>,
        then_value: impl Into<String>,
    ) -> FlagRule {
        FlagRule::Leaf(LeafRule {
            property_name: property.to_owned(),
            property_type: kind,
            operator,
            value: value.into(),
            then_value: FlagValue::String(then_value.into()),
        })
    }

    #[test]
    fn empty_rule_set_returns_default() {
        let default = FlagValue::String("default".to_owned());
        let result = evaluate(&[], &HashMap::new(), &default);
        assert_eq!(result, default);
    }

    #[test]
    fn first_match_wins() {
        let rules = vec![
            leaf("age", AttributeKind::Number, RuleOperator::Gt, 18.0, "adult"),
            leaf("age", AttributeKind::Number, RuleOperator::Lte, 18.0, "minor"),
        ];
        let default = FlagValue::String("default".to_owned());

        let adult = HashMap::from([("age".to_owned(), 25.0.into())]);
        assert_eq!(
            evaluate(&rules, &adult, &default),
            FlagValue::String("adult".to_owned())
        );

        let minor = HashMap::from([("age".to_owned(), 10.0.into())]);
        assert_eq!(
            evaluate(&rules, &minor, &default),
            FlagValue::String("minor".to_owned())
        );

        // Missing property falls through to the default.
        assert_eq!(evaluate(&rules, &HashMap::new(), &default), default);
    }

    #[test]
    fn string_operators() {
        let context = HashMap::from([("email".to_owned(), "alice@example.com".into())]);
        let default = FlagValue::String("none".to_owned());

        let contains = vec![leaf(
            "email",
            AttributeKind::String,
            RuleOperator::Contains,
            "@example",
            "internal",
        )];
        assert_eq!(
            evaluate(&contains, &context, &default),
            FlagValue::String("internal".to_owned())
        );

        let starts = vec![leaf(
            "email",
            AttributeKind::String,
            RuleOperator::StartsWith,
            "bob",
            "bob",
        )];
        assert_eq!(evaluate(&starts, &context, &default), default);
    }

    #[test]
    fn boolean_eq() {
        let rules = vec![leaf(
            "beta",
            AttributeKind::Boolean,
            RuleOperator::Eq,
            true,
            "beta-user",
        )];
        let default = FlagValue::String("regular".to_owned());

        let on = HashMap::from([("beta".to_owned(), true.into())]);
        assert_eq!(
            evaluate(&rules, &on, &default),
            FlagValue::String("beta-user".to_owned())
        );

        let off = HashMap::from([("beta".to_owned(), false.into())]);
        assert_eq!(evaluate(&rules, &off, &default), default);
    }

    #[test]
    fn type_mismatch_is_non_matching() {
        // Rule expects a number but the context supplies a string.
        let rules = vec![leaf("age", AttributeKind::Number, RuleOperator::Gt, 18.0, "adult")];
        let context = HashMap::from([("age".to_owned(), "twenty".into())]);
        let default = FlagValue::String("default".to_owned());
        assert_eq!(evaluate(&rules, &context, &default), default);
    }

    #[test]
    fn and_group_requires_all() {
        let group = FlagRule::Group(GroupRule {
            operator: GroupOperator::And,
            rules: vec![
                leaf("age", AttributeKind::Number, RuleOperator::Gte, 18.0, "grown"),
                leaf(
                    "country",
                    AttributeKind::String,
                    RuleOperator::Eq,
                    "DE",
                    "german",
                ),
            ],
        });
        let default = FlagValue::String("default".to_owned());

        let both = HashMap::from([
            ("age".to_owned(), 30.0.into()),
            ("country".to_owned(), "DE".into()),
        ]);
        // Aggregate holds; the first applicable leaf inside wins.
        assert_eq!(
            evaluate(std::slice::from_ref(&group), &both, &default),
            FlagValue::String("grown".to_owned())
        );

        let one = HashMap::from([("age".to_owned(), 30.0.into())]);
        assert_eq!(
            evaluate(std::slice::from_ref(&group), &one, &default),
            default
        );
    }

    #[test]
    fn or_group_descends_to_matching_leaf() {
        let group = FlagRule::Group(GroupRule {
            operator: GroupOperator::Or,
            rules: vec![
                leaf("plan", AttributeKind::String, RuleOperator::Eq, "pro", "pro"),
                leaf(
                    "plan",
                    AttributeKind::String,
                    RuleOperator::Eq,
                    "enterprise",
                    "enterprise",
                ),
            ],
        });
        let default = FlagValue::String("free".to_owned());

        let context = HashMap::from([("plan".to_owned(), "enterprise".into())]);
        // The first leaf doesn't match; the group still holds through the
        // second, and evaluation descends to it.
        assert_eq!(
            evaluate(std::slice::from_ref(&group), &context, &default),
            FlagValue::String("enterprise".to_owned())
        );
    }

    #[test]
    fn nested_groups() {
        let rules = vec![FlagRule::Group(GroupRule {
            operator: GroupOperator::And,
            rules: vec![
                leaf("age", AttributeKind::Number, RuleOperator::Gte, 18.0, "adult"),
                FlagRule::Group(GroupRule {
                    operator: GroupOperator::Or,
                    rules: vec![
                        leaf(
                            "country",
                            AttributeKind::String,
                            RuleOperator::Eq,
                            "DE",
                            "de-adult",
                        ),
                        leaf(
                            "country",
                            AttributeKind::String,
                            RuleOperator::Eq,
                            "AT",
                            "at-adult",
                        ),
                    ],
                }),
            ],
        })];
        let default = FlagValue::String("default".to_owned());

        let context = HashMap::from([
            ("age".to_owned(), 21.0.into()),
            ("country".to_owned(), "AT".into()),
        ]);
        assert_eq!(
            evaluate(&rules, &context, &default),
            FlagValue::String("adult".to_owned())
        );
    }
}
