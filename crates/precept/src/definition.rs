//! Declarative rule definitions, as stored in rule definition files.

use crate::registry::{Handler, RuleRegistry};
use crate::rules::{as_text, length_of, loose_eq};
use crate::traits::{AsyncRule, Rule, RuleCall, Verdict};
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// A rule described by data rather than code.
///
/// ```toml
/// [slug]
/// type = "pattern"
/// pattern = "^[a-z0-9-]+$"
///
/// [short_slug]
/// type = "alias"
/// rule = "shorter"
/// args = [10]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleDefinition {
    /// Text value matching a regular expression
    Pattern { pattern: String },
    /// String (in characters) or array length within inclusive bounds
    Length {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<usize>,
    },
    /// Number within inclusive bounds
    Range {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
    },
    /// Value equal to one of the listed values
    OneOf { values: Vec<Value> },
    /// Another registered rule with fixed leading arguments
    Alias {
        rule: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        args: Vec<Value>,
    },
}

impl RuleDefinition {
    /// Whether this definition refers to another rule.
    pub fn is_alias(&self) -> bool {
        matches!(self, RuleDefinition::Alias { .. })
    }

    pub(crate) fn build(self, registry: &RuleRegistry) -> Result<Handler, String> {
        let handler = match self {
            RuleDefinition::Pattern { pattern } => {
                let regex = Regex::new(&pattern)
                    .map_err(|e| format!("invalid pattern `{pattern}`: {e}"))?;
                Handler::Sync(Arc::new(PatternRule { regex }))
            }
            RuleDefinition::Length { min, max } => Handler::Sync(Arc::new(LengthRule { min, max })),
            RuleDefinition::Range { min, max } => Handler::Sync(Arc::new(RangeRule { min, max })),
            RuleDefinition::OneOf { values } => Handler::Sync(Arc::new(OneOfRule { values })),
            RuleDefinition::Alias { rule, args } => {
                let target = registry
                    .handler(&rule)
                    .cloned()
                    .ok_or_else(|| format!("{rule} is not defined."))?;
                Handler::Async(Arc::new(AliasRule { target, args }))
            }
        };
        Ok(handler)
    }
}

struct PatternRule {
    regex: Regex,
}

impl Rule for PatternRule {
    fn check(&self, call: &RuleCall) -> Verdict {
        Ok(as_text(&call.value).is_some_and(|text| self.regex.is_match(&text)))
    }
}

struct LengthRule {
    min: Option<usize>,
    max: Option<usize>,
}

impl Rule for LengthRule {
    fn check(&self, call: &RuleCall) -> Verdict {
        let Some(len) = length_of(&call.value) else {
            return Ok(false);
        };
        Ok(self.min.map_or(true, |min| len >= min) && self.max.map_or(true, |max| len <= max))
    }
}

struct RangeRule {
    min: Option<f64>,
    max: Option<f64>,
}

impl Rule for RangeRule {
    fn check(&self, call: &RuleCall) -> Verdict {
        let Some(n) = call.value.as_f64() else {
            return Ok(false);
        };
        Ok(self.min.map_or(true, |min| n >= min) && self.max.map_or(true, |max| n <= max))
    }
}

struct OneOfRule {
    values: Vec<Value>,
}

impl Rule for OneOfRule {
    fn check(&self, call: &RuleCall) -> Verdict {
        Ok(self.values.iter().any(|v| loose_eq(&call.value, v)))
    }
}

struct AliasRule {
    target: Handler,
    args: Vec<Value>,
}

#[async_trait]
impl AsyncRule for AliasRule {
    async fn check(&self, mut call: RuleCall) -> Verdict {
        let mut args = self.args.clone();
        args.append(&mut call.args);
        call.args = args;
        self.target.call(call).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::Record;
    use serde_json::json;

    fn call(value: Value, args: Vec<Value>) -> RuleCall {
        let mut record = Record::new();
        record.insert("field".to_string(), value);
        RuleCall::new(Arc::new(record), "field", args)
    }

    async fn run(definition: RuleDefinition, value: Value) -> bool {
        let registry = RuleRegistry::with_builtin();
        let handler = definition.build(&registry).unwrap();
        handler.call(call(value, vec![])).await.unwrap()
    }

    #[test]
    fn deserializes_tagged_definitions() {
        let def: RuleDefinition =
            serde_json::from_value(json!({"type": "length", "min": 2})).unwrap();
        assert_eq!(
            def,
            RuleDefinition::Length {
                min: Some(2),
                max: None
            }
        );

        let def: RuleDefinition = toml::from_str("type = \"alias\"\nrule = \"shorter\"\nargs = [5]").unwrap();
        assert!(def.is_alias());
    }

    #[tokio::test]
    async fn pattern_definition() {
        let def = RuleDefinition::Pattern {
            pattern: "^[a-z-]+$".to_string(),
        };
        assert!(run(def.clone(), json!("hello-world")).await);
        assert!(!run(def.clone(), json!("Hello")).await);
        assert!(!run(def, json!(["a"])).await);
    }

    #[tokio::test]
    async fn length_and_range_definitions() {
        let length = RuleDefinition::Length {
            min: Some(2),
            max: Some(4),
        };
        assert!(run(length.clone(), json!("abc")).await);
        assert!(run(length.clone(), json!([1, 2])).await);
        assert!(!run(length.clone(), json!("abcde")).await);
        assert!(!run(length, json!(3)).await);

        let range = RuleDefinition::Range {
            min: Some(18.0),
            max: None,
        };
        assert!(run(range.clone(), json!(18)).await);
        assert!(!run(range.clone(), json!(17.5)).await);
        assert!(!run(range, json!("20")).await);
    }

    #[tokio::test]
    async fn one_of_definition() {
        let def = RuleDefinition::OneOf {
            values: vec![json!("red"), json!(3)],
        };
        assert!(run(def.clone(), json!("red")).await);
        assert!(run(def.clone(), json!("3")).await);
        assert!(!run(def, json!("blue")).await);
    }

    #[tokio::test]
    async fn alias_prepends_fixed_arguments() {
        let def = RuleDefinition::Alias {
            rule: "shorter".to_string(),
            args: vec![json!(4)],
        };
        assert!(run(def.clone(), json!("abc")).await);
        assert!(!run(def, json!("abcdef")).await);
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        let registry = RuleRegistry::new();
        let def = RuleDefinition::Pattern {
            pattern: "([".to_string(),
        };
        assert!(def.build(&registry).is_err());
    }
}
