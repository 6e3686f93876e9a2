//! Predicate traits.
//!
//! A rule receives the field key, its value, the parsed arguments and the
//! whole record under validation, and answers with a verdict. `Ok(false)`
//! marks the value invalid; `Err` means the rule itself could not run.

use crate::error::PredicateError;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

/// The record under validation.
pub type Record = Map<String, Value>;

/// Outcome of a single predicate call.
pub type Verdict = Result<bool, PredicateError>;

/// Everything a predicate gets to see for one invocation.
#[derive(Debug, Clone)]
pub struct RuleCall {
    /// The whole record, for cross-field checks
    pub record: Arc<Record>,
    /// Field being checked
    pub key: String,
    /// Value of that field (`Null` if absent)
    pub value: Value,
    /// Parsed rule arguments
    pub args: Vec<Value>,
}

impl RuleCall {
    /// Call context for `key` within `record`.
    pub fn new(record: Arc<Record>, key: impl Into<String>, args: Vec<Value>) -> Self {
        let key = key.into();
        let value = record.get(&key).cloned().unwrap_or(Value::Null);
        Self {
            record,
            key,
            value,
            args,
        }
    }

    /// Argument at `index`, if given.
    pub fn arg(&self, index: usize) -> Option<&Value> {
        self.args.get(index)
    }

    /// Value of a sibling field.
    pub fn sibling(&self, key: &str) -> Option<&Value> {
        self.record.get(key)
    }
}

/// Synchronous rule.
///
/// ## Example
///
/// ```rust,ignore
/// struct Positive;
///
/// impl Rule for Positive {
///     fn check(&self, call: &RuleCall) -> Verdict {
///         Ok(call.value.as_f64().is_some_and(|n| n > 0.0))
///     }
///
///     fn name(&self) -> Option<&str> {
///         Some("positive")
///     }
/// }
/// ```
pub trait Rule: Send + Sync {
    fn check(&self, call: &RuleCall) -> Verdict;

    /// Declared name, used when the rule is registered without one.
    fn name(&self) -> Option<&str> {
        None
    }
}

/// Asynchronous rule, for checks that wait on I/O.
#[async_trait]
pub trait AsyncRule: Send + Sync {
    async fn check(&self, call: RuleCall) -> Verdict;

    /// Declared name, used when the rule is registered without one.
    fn name(&self) -> Option<&str> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn call_reads_value_from_record() {
        let record = Arc::new(json!({"foo": "bar", "other": 1}).as_object().cloned().unwrap());
        let call = RuleCall::new(record, "foo", vec![json!("grr")]);

        assert_eq!(call.value, json!("bar"));
        assert_eq!(call.arg(0), Some(&json!("grr")));
        assert_eq!(call.arg(1), None);
        assert_eq!(call.sibling("other"), Some(&json!(1)));
    }

    #[test]
    fn absent_value_is_null() {
        let call = RuleCall::new(Arc::new(Record::new()), "missing", vec![]);
        assert!(call.value.is_null());
    }
}
