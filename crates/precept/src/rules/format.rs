//! String format checks.
//!
//! Values are read through [`as_text`], so numbers and booleans are checked in
//! their display form while arrays and objects always fail.

use super::{arg_f64, arg_text, as_text, BuiltinRule};
use crate::error::PredicateError;
use crate::traits::{RuleCall, Verdict};
use base64::Engine;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use serde_json::Value;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::OnceLock;

pub(super) const RULES: &[(&str, BuiltinRule)] = &[
    ("contains", contains),
    ("matches", matches),
    ("email", email),
    ("URL", url),
    ("FQDN", fqdn),
    ("IP", ip),
    ("alpha", alpha),
    ("numeric", numeric),
    ("alphanumeric", alphanumeric),
    ("base64", base64),
    ("hexadecimal", hexadecimal),
    ("hexColor", hex_color),
    ("lowercase", lowercase),
    ("uppercase", uppercase),
    ("int", int),
    ("float", float),
    ("divisibleBy", divisible_by),
    ("null", null),
    ("length", length),
    ("byteLength", byte_length),
    ("uUID", uuid),
    ("date", date),
    ("after", after),
    ("before", before),
    ("creditCard", credit_card),
    ("ISBN", isbn),
    ("JSON", json),
    ("ascii", ascii),
    ("variableWidth", variable_width),
    ("mongoId", mongo_id),
];

static EMAIL: OnceLock<Regex> = OnceLock::new();
static URL: OnceLock<Regex> = OnceLock::new();
static FQDN: OnceLock<Regex> = OnceLock::new();
static ALPHA: OnceLock<Regex> = OnceLock::new();
static NUMERIC: OnceLock<Regex> = OnceLock::new();
static ALPHANUMERIC: OnceLock<Regex> = OnceLock::new();
static HEXADECIMAL: OnceLock<Regex> = OnceLock::new();
static HEX_COLOR: OnceLock<Regex> = OnceLock::new();
static INT: OnceLock<Regex> = OnceLock::new();
static FLOAT: OnceLock<Regex> = OnceLock::new();
static FULL_WIDTH: OnceLock<Regex> = OnceLock::new();
static HALF_WIDTH: OnceLock<Regex> = OnceLock::new();

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).unwrap())
}

/// Run `check` against the text form of the value; non-scalars fail.
fn text(call: &RuleCall, check: impl FnOnce(&str) -> bool) -> Verdict {
    Ok(as_text(&call.value).is_some_and(|s| check(&s)))
}

fn pattern(call: &RuleCall, cell: &'static OnceLock<Regex>, source: &str) -> Verdict {
    let re = regex(cell, source);
    text(call, |s| re.is_match(s))
}

fn contains(call: &RuleCall) -> Verdict {
    let seed = arg_text(call, 0).unwrap_or_default();
    text(call, |s| s.contains(seed.as_ref()))
}

/// `matches: pattern[, modifiers]`; only the `i` modifier is honoured.
fn matches(call: &RuleCall) -> Verdict {
    let source = arg_text(call, 0)
        .ok_or_else(|| PredicateError::new("matches requires a pattern argument"))?;
    let insensitive = arg_text(call, 1).is_some_and(|m| m.contains('i'));
    let source = if insensitive {
        format!("(?i){source}")
    } else {
        source.into_owned()
    };
    let re = Regex::new(&source).map_err(|e| PredicateError::new(e.to_string()))?;
    text(call, |s| re.is_match(s))
}

fn email(call: &RuleCall) -> Verdict {
    pattern(
        call,
        &EMAIL,
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
}

fn url(call: &RuleCall) -> Verdict {
    pattern(call, &URL, r"^(https?|ftp)://[^\s/$.?#].[^\s]*$")
}

fn fqdn(call: &RuleCall) -> Verdict {
    pattern(
        call,
        &FQDN,
        r"^(?:[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?\.)+[a-zA-Z]{2,}$",
    )
}

/// Version selector in the first argument. `Some(None)` when the argument is
/// given but is not a whole number.
fn version_arg(call: &RuleCall) -> Option<Option<u64>> {
    let version = match call.arg(0)? {
        Value::Null => return None,
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    Some(version)
}

/// `IP[: 4|6]`
fn ip(call: &RuleCall) -> Verdict {
    let version = version_arg(call);
    text(call, |s| match version {
        Some(Some(4)) => s.parse::<Ipv4Addr>().is_ok(),
        Some(Some(6)) => s.parse::<Ipv6Addr>().is_ok(),
        Some(_) => false,
        None => s.parse::<IpAddr>().is_ok(),
    })
}

fn alpha(call: &RuleCall) -> Verdict {
    pattern(call, &ALPHA, r"^[a-zA-Z]+$")
}

fn numeric(call: &RuleCall) -> Verdict {
    pattern(call, &NUMERIC, r"^[-+]?[0-9]+$")
}

fn alphanumeric(call: &RuleCall) -> Verdict {
    pattern(call, &ALPHANUMERIC, r"^[a-zA-Z0-9]+$")
}

fn base64(call: &RuleCall) -> Verdict {
    text(call, |s| {
        !s.is_empty()
            && s.len() % 4 == 0
            && base64::engine::general_purpose::STANDARD.decode(s).is_ok()
    })
}

fn hexadecimal(call: &RuleCall) -> Verdict {
    pattern(call, &HEXADECIMAL, r"^[0-9a-fA-F]+$")
}

fn hex_color(call: &RuleCall) -> Verdict {
    pattern(call, &HEX_COLOR, r"^#?(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6})$")
}

fn lowercase(call: &RuleCall) -> Verdict {
    text(call, |s| s == s.to_lowercase())
}

fn uppercase(call: &RuleCall) -> Verdict {
    text(call, |s| s == s.to_uppercase())
}

fn int(call: &RuleCall) -> Verdict {
    pattern(call, &INT, r"^[-+]?(?:0|[1-9][0-9]*)$")
}

fn float(call: &RuleCall) -> Verdict {
    let re = regex(
        &FLOAT,
        r"^[-+]?(?:[0-9]+)?(?:\.[0-9]*)?(?:[eE][-+]?[0-9]+)?$",
    );
    text(call, |s| s.chars().any(|c| c.is_ascii_digit()) && re.is_match(s))
}

fn divisible_by(call: &RuleCall) -> Verdict {
    let Some(divisor) = arg_f64(call, 0).filter(|d| *d != 0.0) else {
        return Ok(false);
    };
    text(call, |s| {
        s.trim()
            .parse::<f64>()
            .is_ok_and(|n| n.is_finite() && n % divisor == 0.0)
    })
}

fn null(call: &RuleCall) -> Verdict {
    text(call, str::is_empty)
}

/// `length: min[, max]` in characters.
fn length(call: &RuleCall) -> Verdict {
    let min = arg_f64(call, 0).unwrap_or(0.0);
    let max = arg_f64(call, 1);
    text(call, |s| {
        let len = s.chars().count() as f64;
        len >= min && max.map_or(true, |max| len <= max)
    })
}

/// `byteLength: min[, max]` in UTF-8 bytes.
fn byte_length(call: &RuleCall) -> Verdict {
    let min = arg_f64(call, 0).unwrap_or(0.0);
    let max = arg_f64(call, 1);
    text(call, |s| {
        let len = s.len() as f64;
        len >= min && max.map_or(true, |max| len <= max)
    })
}

/// `uUID[: 3|4|5]`
fn uuid(call: &RuleCall) -> Verdict {
    let version = version_arg(call);
    text(call, |s| {
        uuid::Uuid::parse_str(s).is_ok_and(|id| match version {
            None => true,
            Some(v) => v == Some(id.get_version_num() as u64),
        })
    })
}

fn parse_date(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.naive_utc());
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt);
        }
    }
    ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"]
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(s, format).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Comparison date from the first argument, or now.
fn reference_date(call: &RuleCall) -> Result<NaiveDateTime, PredicateError> {
    match arg_text(call, 0) {
        None => Ok(Utc::now().naive_utc()),
        Some(raw) => parse_date(&raw)
            .ok_or_else(|| PredicateError::new(format!("`{raw}` is not a date"))),
    }
}

fn date(call: &RuleCall) -> Verdict {
    text(call, |s| parse_date(s).is_some())
}

fn after(call: &RuleCall) -> Verdict {
    let reference = reference_date(call)?;
    text(call, |s| parse_date(s).is_some_and(|d| d > reference))
}

fn before(call: &RuleCall) -> Verdict {
    let reference = reference_date(call)?;
    text(call, |s| parse_date(s).is_some_and(|d| d < reference))
}

fn credit_card(call: &RuleCall) -> Verdict {
    text(call, |s| {
        let digits: Vec<u32> = s
            .chars()
            .filter(|c| !matches!(c, ' ' | '-'))
            .map(|c| c.to_digit(10))
            .collect::<Option<_>>()
            .unwrap_or_default();
        if !(13..=19).contains(&digits.len()) {
            return false;
        }
        let sum: u32 = digits
            .iter()
            .rev()
            .enumerate()
            .map(|(i, &d)| {
                if i % 2 == 1 {
                    let doubled = d * 2;
                    if doubled > 9 {
                        doubled - 9
                    } else {
                        doubled
                    }
                } else {
                    d
                }
            })
            .sum();
        sum % 10 == 0
    })
}

fn isbn10(s: &str) -> bool {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() != 10 {
        return false;
    }
    let mut sum = 0;
    for (i, c) in chars.iter().enumerate() {
        let value = match (i, c) {
            (9, 'X' | 'x') => 10,
            (_, c) => match c.to_digit(10) {
                Some(d) => d,
                None => return false,
            },
        };
        sum += value * (10 - i as u32);
    }
    sum % 11 == 0
}

fn isbn13(s: &str) -> bool {
    let Some(digits) = s.chars().map(|c| c.to_digit(10)).collect::<Option<Vec<_>>>() else {
        return false;
    };
    if digits.len() != 13 {
        return false;
    }
    let sum: u32 = digits
        .iter()
        .enumerate()
        .map(|(i, d)| if i % 2 == 0 { *d } else { d * 3 })
        .sum();
    sum % 10 == 0
}

/// `ISBN[: 10|13]`
fn isbn(call: &RuleCall) -> Verdict {
    let version = version_arg(call);
    text(call, |s| {
        let cleaned: String = s.chars().filter(|c| !matches!(c, ' ' | '-')).collect();
        match version {
            Some(Some(10)) => isbn10(&cleaned),
            Some(Some(13)) => isbn13(&cleaned),
            Some(_) => false,
            None => isbn10(&cleaned) || isbn13(&cleaned),
        }
    })
}

fn json(call: &RuleCall) -> Verdict {
    text(call, |s| {
        serde_json::from_str::<serde_json::Value>(s)
            .is_ok_and(|v| v.is_object() || v.is_array())
    })
}

fn ascii(call: &RuleCall) -> Verdict {
    text(call, |s| !s.is_empty() && s.is_ascii())
}

fn variable_width(call: &RuleCall) -> Verdict {
    let full = regex(
        &FULL_WIDTH,
        r"[^\x{0020}-\x{007E}\x{FF61}-\x{FF9F}\x{FFA0}-\x{FFDC}\x{FFE8}-\x{FFEE}0-9a-zA-Z]",
    );
    let half = regex(
        &HALF_WIDTH,
        r"[\x{0020}-\x{007E}\x{FF61}-\x{FF9F}\x{FFA0}-\x{FFDC}\x{FFE8}-\x{FFEE}0-9a-zA-Z]",
    );
    text(call, |s| full.is_match(s) && half.is_match(s))
}

fn mongo_id(call: &RuleCall) -> Verdict {
    let re = regex(&HEXADECIMAL, r"^[0-9a-fA-F]+$");
    text(call, |s| s.len() == 24 && re.is_match(s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::Record;
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn check(rule: BuiltinRule, value: Value, args: Value) -> bool {
        let mut record = Record::new();
        record.insert("field".to_string(), value);
        let args = args.as_array().cloned().unwrap_or_default();
        rule(&RuleCall::new(Arc::new(record), "field", args)).unwrap()
    }

    #[test]
    fn alpha_without_args() {
        assert!(check(alpha, json!("asdf"), json!([])));
        assert!(!check(alpha, json!("asd123f"), json!([])));
    }

    #[test]
    fn ip_with_version_argument() {
        assert!(check(ip, json!("127.0.0.1"), json!([4])));
        assert!(!check(ip, json!("127.0.0.1"), json!([6])));
        assert!(check(ip, json!("::1"), json!([])));
        assert!(check(ip, json!("::1"), json!(["6"])));
    }

    #[test]
    fn version_arguments_must_be_whole_numbers() {
        assert!(!check(ip, json!("127.0.0.1"), json!([4.5])));
        assert!(!check(ip, json!("127.0.0.1"), json!([260])));
        assert!(!check(ip, json!("127.0.0.1"), json!([-4])));
        assert!(!check(
            uuid,
            json!("550e8400-e29b-41d4-a716-446655440000"),
            json!([4.9])
        ));
        assert!(check(
            uuid,
            json!("550e8400-e29b-41d4-a716-446655440000"),
            json!([4])
        ));
        assert!(!check(isbn, json!("9780306406157"), json!([13.2])));
        assert!(check(isbn, json!("9780306406157"), json!([13])));
    }

    #[test]
    fn email_and_url() {
        assert!(check(email, json!("user@example.com"), json!([])));
        assert!(!check(email, json!("not-an-email"), json!([])));
        assert!(check(url, json!("https://example.com/path"), json!([])));
        assert!(!check(url, json!("example"), json!([])));
    }

    #[test]
    fn numbers_are_checked_as_text() {
        assert!(check(numeric, json!(42), json!([])));
        assert!(check(int, json!("-17"), json!([])));
        assert!(!check(int, json!("017"), json!([])));
        assert!(check(float, json!("3.14"), json!([])));
        assert!(!check(float, json!("."), json!([])));
        assert!(check(divisible_by, json!(10), json!([5])));
        assert!(!check(divisible_by, json!(10), json!([0])));
        assert!(!check(alphanumeric, json!(["a"]), json!([])));
    }

    #[test]
    fn lengths() {
        assert!(check(length, json!("abc"), json!([2, 3])));
        assert!(!check(length, json!("abcd"), json!([2, 3])));
        assert!(check(byte_length, json!("é"), json!([2])));
        assert!(!check(byte_length, json!("é"), json!([3])));
    }

    #[test]
    fn identifiers() {
        assert!(check(uuid, json!("550e8400-e29b-41d4-a716-446655440000"), json!([])));
        assert!(check(uuid, json!("550e8400-e29b-41d4-a716-446655440000"), json!([4])));
        assert!(!check(uuid, json!("550e8400-e29b-41d4-a716-446655440000"), json!([3])));
        assert!(check(mongo_id, json!("507f1f77bcf86cd799439011"), json!([])));
        assert!(!check(mongo_id, json!("507f1f77bcf86cd79943901"), json!([])));
        assert!(check(credit_card, json!("4111 1111 1111 1111"), json!([])));
        assert!(!check(credit_card, json!("4111 1111 1111 1112"), json!([])));
        assert!(check(isbn, json!("978-3-16-148410-0"), json!([])));
        assert!(check(isbn, json!("0-306-40615-2"), json!([10])));
        assert!(!check(isbn, json!("0-306-40615-2"), json!([13])));
    }

    #[test]
    fn dates() {
        assert!(check(date, json!("2024-02-29"), json!([])));
        assert!(!check(date, json!("not a date"), json!([])));
        assert!(check(after, json!("2024-03-01"), json!(["2024-02-29"])));
        assert!(!check(after, json!("2024-01-01"), json!(["2024-02-29"])));
        assert!(check(before, json!("2000-01-01T00:00:00Z"), json!([])));
    }

    #[test]
    fn misc_formats() {
        assert!(check(hex_color, json!("#fff"), json!([])));
        assert!(!check(hex_color, json!("#ffff"), json!([])));
        assert!(check(base64, json!("aGVsbG8="), json!([])));
        assert!(!check(base64, json!("aGVsbG8"), json!([])));
        assert!(check(json, json!("{\"a\": 1}"), json!([])));
        assert!(!check(json, json!("1"), json!([])));
        assert!(check(lowercase, json!("abc"), json!([])));
        assert!(!check(uppercase, json!("aBC"), json!([])));
        assert!(check(contains, json!("foobar"), json!(["oba"])));
        assert!(check(matches, json!("ABC"), json!(["^abc$", "i"])));
        assert!(!check(matches, json!("ABC"), json!(["^abc$"])));
        assert!(check(variable_width, json!("ひらがなabc"), json!([])));
        assert!(!check(variable_width, json!("abc"), json!([])));
        assert!(check(null, json!(""), json!([])));
    }

    #[test]
    fn bad_match_pattern_is_an_error() {
        let mut record = Record::new();
        record.insert("field".to_string(), json!("x"));
        let call = RuleCall::new(Arc::new(record), "field", vec![json!("([")]);
        assert!(matches(&call).is_err());
    }
}
