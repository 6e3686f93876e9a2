//! Built-in rules.
//!
//! `basic` holds the type and size checks; `format` holds the fixed table of
//! string format checks.

mod basic;
mod format;

use crate::registry::RuleRegistry;
use crate::traits::{RuleCall, Verdict};
use serde_json::Value;
use std::borrow::Cow;

/// Signature shared by every built-in rule.
pub(crate) type BuiltinRule = fn(&RuleCall) -> Verdict;

pub(crate) fn register_builtin(registry: &mut RuleRegistry) {
    for (name, rule) in format::RULES.iter().chain(basic::RULES) {
        registry.register_fn(*name, *rule);
    }
}

/// Text form of a scalar value. Arrays and objects have none.
pub(crate) fn as_text(value: &Value) -> Option<Cow<'_, str>> {
    match value {
        Value::String(s) => Some(Cow::Borrowed(s.as_str())),
        Value::Number(n) => Some(Cow::Owned(n.to_string())),
        Value::Bool(b) => Some(Cow::Owned(b.to_string())),
        Value::Null => Some(Cow::Borrowed("")),
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// Character count of a string, or element count of an array.
pub(crate) fn length_of(value: &Value) -> Option<usize> {
    match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Array(items) => Some(items.len()),
        _ => None,
    }
}

/// Numeric reading of an argument; numeric strings count.
pub(crate) fn arg_f64(call: &RuleCall, index: usize) -> Option<f64> {
    match call.arg(index)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Text reading of an argument.
pub(crate) fn arg_text(call: &RuleCall, index: usize) -> Option<Cow<'_, str>> {
    call.arg(index).and_then(as_text)
}

/// Deep equality where scalars compare by value across types, so `3` equals
/// `"3"` and `true` equals `"true"`.
pub(crate) fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(x, y)| loose_eq(x, y))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(k, v)| y.get(k).is_some_and(|other| loose_eq(v, other)))
        }
        (Value::Array(_) | Value::Object(_), _) | (_, Value::Array(_) | Value::Object(_)) => false,
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Number(x), other) | (other, Value::Number(x)) => {
            let other = match other {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse().ok(),
                Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
                _ => None,
            };
            x.as_f64().zip(other).is_some_and(|(x, y)| x == y)
        }
        _ => as_text(a) == as_text(b),
    }
}
