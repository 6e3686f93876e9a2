//! Rule specifications and their normalized invocation form.
//!
//! Rules are written either as compact strings (`"between: 4, 30"`) or as
//! arrays whose first element is the rule name (`["between", 4, 30]`). Both
//! normalize to a [`RuleInvocation`].

use crate::error::{Error, Result};
use serde::de::{self, SeqAccess, Visitor};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Symbol between the rule name and its arguments in string rules.
pub const METHOD_DELIMITER: char = ':';
/// Symbol between arguments in string rules.
pub const ARGUMENT_DELIMITER: char = ',';
/// Name prefix shared by the presence-conditioning pseudo-rules.
pub const REQUIRED_PREFIX: &str = "required";

/// Raw rules as supplied by callers, keyed by field.
pub type Rules = HashMap<String, Vec<RuleSpec>>;

/// Normalized rules, keyed by field. Invocation position is the correlation
/// id used when rendering error messages.
pub type RuleSet = HashMap<String, Vec<RuleInvocation>>;

/// One named rule with its parsed literal arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleInvocation {
    pub name: String,
    pub args: Vec<Value>,
}

impl RuleInvocation {
    /// Invocation of `name` with `args`.
    pub fn new(name: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// `required`, `requiredWith`, `requiredWithout` and anything else
    /// starting with `required`.
    pub fn is_required_family(&self) -> bool {
        self.name.starts_with(REQUIRED_PREFIX)
    }

    /// First argument read as a field name.
    pub(crate) fn key_arg(&self) -> Option<String> {
        match self.args.first()? {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

impl fmt::Display for RuleInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if self.args.is_empty() {
            return Ok(());
        }
        let args: Vec<String> = self
            .args
            .iter()
            .map(|arg| match arg {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect();
        write!(f, "{}{}", METHOD_DELIMITER, args.join(","))
    }
}

impl Serialize for RuleInvocation {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(self.args.len() + 1))?;
        seq.serialize_element(&self.name)?;
        for arg in &self.args {
            seq.serialize_element(arg)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for RuleInvocation {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct InvocationVisitor;

        impl<'de> Visitor<'de> for InvocationVisitor {
            type Value = RuleInvocation;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an array starting with a rule name")
            }

            fn visit_seq<A>(self, mut seq: A) -> std::result::Result<RuleInvocation, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let name: String = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;
                if name.trim().is_empty() {
                    return Err(de::Error::custom("rule name must not be empty"));
                }
                let mut args = Vec::new();
                while let Some(arg) = seq.next_element::<Value>()? {
                    args.push(arg);
                }
                Ok(RuleInvocation { name, args })
            }
        }

        deserializer.deserialize_seq(InvocationVisitor)
    }
}

/// A rule entry as written by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleSpec {
    /// Already normalized; passes through unchanged.
    Invocation(RuleInvocation),
    /// `name` or `name:arg1,arg2,...`
    Text(String),
}

impl RuleSpec {
    /// Resolve either shape into an invocation.
    pub fn normalize(&self) -> Result<RuleInvocation> {
        match self {
            RuleSpec::Invocation(invocation) => Ok(invocation.clone()),
            RuleSpec::Text(text) => parse_rule(text),
        }
    }
}

impl From<&str> for RuleSpec {
    fn from(text: &str) -> Self {
        RuleSpec::Text(text.to_string())
    }
}

impl From<String> for RuleSpec {
    fn from(text: String) -> Self {
        RuleSpec::Text(text)
    }
}

impl From<RuleInvocation> for RuleSpec {
    fn from(invocation: RuleInvocation) -> Self {
        RuleSpec::Invocation(invocation)
    }
}

/// Parse a string rule into an invocation.
///
/// The name is everything before the first `:`; arguments are split on every
/// `,` and each is parsed with [`parse_literal`].
pub fn parse_rule(rule: &str) -> Result<RuleInvocation> {
    let (name, args) = match rule.split_once(METHOD_DELIMITER) {
        None => (rule.trim(), Vec::new()),
        Some((name, rest)) => (
            name.trim(),
            rest.split(ARGUMENT_DELIMITER).map(parse_literal).collect(),
        ),
    };

    if name.is_empty() {
        return Err(Error::RuleDefinition(format!(
            "rule `{rule}` has an empty name"
        )));
    }

    Ok(RuleInvocation::new(name, args))
}

/// Best-effort literal parse of one argument.
///
/// Tries, in order: boolean, null, number, JSON string, JSON array/object.
/// Anything else is kept as the trimmed string.
pub fn parse_literal(raw: &str) -> Value {
    let arg = raw.trim();

    match arg {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        "null" => return Value::Null,
        _ => {}
    }

    let structured = match arg.as_bytes().first() {
        Some(b'-' | b'0'..=b'9') => serde_json::from_str::<serde_json::Number>(arg)
            .ok()
            .map(Value::Number),
        Some(b'"' | b'[' | b'{') => serde_json::from_str::<Value>(arg).ok(),
        _ => None,
    };

    structured.unwrap_or_else(|| Value::String(arg.to_string()))
}

/// Normalize every entry of a raw rule map.
pub fn normalize_rules(rules: &Rules) -> Result<RuleSet> {
    rules
        .iter()
        .map(|(key, specs)| {
            let invocations = specs
                .iter()
                .map(RuleSpec::normalize)
                .collect::<Result<Vec<_>>>()?;
            Ok((key.clone(), invocations))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_bare_name() {
        let rule = parse_rule("  required ").unwrap();
        assert_eq!(rule, RuleInvocation::new("required", vec![]));
    }

    #[test]
    fn parses_arguments_as_literals() {
        let rule = parse_rule("foo: 1, 2, true").unwrap();
        assert_eq!(rule.name, "foo");
        assert_eq!(rule.args, vec![json!(1), json!(2), json!(true)]);
    }

    #[test]
    fn only_first_colon_separates_name() {
        let rule = parse_rule("foo: 1, 2, a: b, true").unwrap();
        assert_eq!(
            serde_json::to_value(&rule).unwrap(),
            json!(["foo", 1, 2, "a: b", true])
        );
    }

    #[test]
    fn literal_parse_order() {
        assert_eq!(parse_literal(" false "), json!(false));
        assert_eq!(parse_literal("null"), Value::Null);
        assert_eq!(parse_literal("-4.5"), json!(-4.5));
        assert_eq!(parse_literal("\"quoted\""), json!("quoted"));
        assert_eq!(parse_literal("{\"a\":1}"), json!({"a": 1}));
        assert_eq!(parse_literal("abc"), json!("abc"));
        // Not valid JSON numbers, kept as text
        assert_eq!(parse_literal("1.2.3"), json!("1.2.3"));
        assert_eq!(parse_literal("[1"), json!("[1"));
        assert_eq!(parse_literal(""), json!(""));
    }

    #[test]
    fn empty_name_is_rejected() {
        assert!(matches!(parse_rule(": 1"), Err(Error::RuleDefinition(_))));
        assert!(matches!(parse_rule("   "), Err(Error::RuleDefinition(_))));
    }

    #[test]
    fn rule_entries_deserialize_from_string_or_array() {
        let specs: Vec<RuleSpec> =
            serde_json::from_value(json!(["required", ["foo", 1, "2"]])).unwrap();
        assert_eq!(specs[0], RuleSpec::Text("required".to_string()));
        assert_eq!(
            specs[1],
            RuleSpec::Invocation(RuleInvocation::new("foo", vec![json!(1), json!("2")]))
        );
    }

    #[test]
    fn normalizes_mixed_rules() {
        let rules: Rules = serde_json::from_value(json!({
            "a": ["foo: 1, 2, a: b, true"],
            "b": ["required", ["foo", 1, "2"]]
        }))
        .unwrap();

        let normalized = normalize_rules(&rules).unwrap();
        assert_eq!(
            serde_json::to_value(&normalized).unwrap(),
            json!({
                "a": [["foo", 1, 2, "a: b", true]],
                "b": [["required"], ["foo", 1, "2"]]
            })
        );
    }

    #[test]
    fn required_family_detection() {
        assert!(parse_rule("required").unwrap().is_required_family());
        assert!(parse_rule("requiredWith: other")
            .unwrap()
            .is_required_family());
        assert!(!parse_rule("between: 1, 2").unwrap().is_required_family());
    }

    #[test]
    fn display_round_trips_text_form() {
        let rule = parse_rule("between: 4, 30").unwrap();
        assert_eq!(rule.to_string(), "between:4,30");
        assert_eq!(parse_rule(&rule.to_string()).unwrap(), rule);
    }
}
