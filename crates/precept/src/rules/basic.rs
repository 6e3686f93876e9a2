//! Type, size and comparison rules.

use super::{arg_f64, length_of, loose_eq, BuiltinRule};
use crate::traits::{RuleCall, Verdict};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

pub(super) const RULES: &[(&str, BuiltinRule)] = &[
    ("array", array),
    ("between", between),
    ("boolean", boolean),
    ("camelCase", camel_case),
    ("equal", equal),
    ("greaterThan", greater_than),
    ("in", one_of),
    ("lessThan", less_than),
    ("longer", longer),
    ("shorter", shorter),
    ("snakeCase", snake_case),
    ("string", string),
    ("studlyCase", studly_case),
    ("within", within),
];

static SNAKE_CASE: OnceLock<Regex> = OnceLock::new();
static STUDLY_CASE: OnceLock<Regex> = OnceLock::new();
static CAMEL_CASE: OnceLock<Regex> = OnceLock::new();

fn matches_case(cell: &'static OnceLock<Regex>, pattern: &str, value: &Value) -> bool {
    let regex = cell.get_or_init(|| Regex::new(pattern).unwrap());
    value.as_str().is_some_and(|s| regex.is_match(s))
}

fn array(call: &RuleCall) -> Verdict {
    Ok(call.value.is_array())
}

/// Length (strings, arrays) or value (numbers) strictly between two bounds.
fn between(call: &RuleCall) -> Verdict {
    let (Some(min), Some(max)) = (arg_f64(call, 0), arg_f64(call, 1)) else {
        return Ok(false);
    };
    let measured = match &call.value {
        Value::Number(n) => n.as_f64(),
        other => length_of(other).map(|len| len as f64),
    };
    Ok(measured.is_some_and(|m| m > min && m < max))
}

fn boolean(call: &RuleCall) -> Verdict {
    let Value::Bool(value) = call.value else {
        return Ok(false);
    };
    Ok(match call.arg(0) {
        None => true,
        Some(expected) => expected.as_bool() == Some(value),
    })
}

fn camel_case(call: &RuleCall) -> Verdict {
    Ok(matches_case(&CAMEL_CASE, r"^[a-z][a-zA-Z0-9]*$", &call.value))
}

fn equal(call: &RuleCall) -> Verdict {
    let expected = call.arg(0).unwrap_or(&Value::Null);
    Ok(loose_eq(&call.value, expected))
}

fn greater_than(call: &RuleCall) -> Verdict {
    Ok(call
        .value
        .as_f64()
        .zip(arg_f64(call, 0))
        .is_some_and(|(value, bound)| value > bound))
}

fn one_of(call: &RuleCall) -> Verdict {
    Ok(call.args.iter().any(|candidate| loose_eq(&call.value, candidate)))
}

fn less_than(call: &RuleCall) -> Verdict {
    Ok(call
        .value
        .as_f64()
        .zip(arg_f64(call, 0))
        .is_some_and(|(value, bound)| value < bound))
}

fn longer(call: &RuleCall) -> Verdict {
    Ok(text_len(&call.value)
        .zip(arg_f64(call, 0))
        .is_some_and(|(len, bound)| len as f64 > bound))
}

fn shorter(call: &RuleCall) -> Verdict {
    Ok(text_len(&call.value)
        .zip(arg_f64(call, 0))
        .is_some_and(|(len, bound)| (len as f64) < bound))
}

fn snake_case(call: &RuleCall) -> Verdict {
    Ok(matches_case(
        &SNAKE_CASE,
        r"^[a-z0-9]+(?:_[a-z0-9]+)*$",
        &call.value,
    ))
}

fn string(call: &RuleCall) -> Verdict {
    Ok(call.value.is_string())
}

fn studly_case(call: &RuleCall) -> Verdict {
    Ok(matches_case(&STUDLY_CASE, r"^[A-Z][a-zA-Z0-9]*$", &call.value))
}

/// Number within an inclusive range.
fn within(call: &RuleCall) -> Verdict {
    let (Some(value), Some(min), Some(max)) = (call.value.as_f64(), arg_f64(call, 0), arg_f64(call, 1))
    else {
        return Ok(false);
    };
    Ok(value >= min && value <= max)
}

fn text_len(value: &Value) -> Option<usize> {
    value.as_str().map(|s| s.chars().count())
}
