//! Placeholder interpolation for message templates.
//!
//! Templates use `{name}` placeholders. A placeholder may be a dotted path
//! into arrays and objects (`{args.0}`); `{{` and `}}` produce literal braces.
//! The first segment must name a variable. A path that runs past the end of
//! a known variable renders empty, like `null`.

use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("No message template for `{0}` and no `$missing` fallback")]
    MissingTemplate(String),

    #[error("Unclosed placeholder at byte {0}")]
    Unclosed(usize),

    #[error("Unmatched `}}` at byte {0}")]
    UnmatchedClose(usize),

    #[error("Empty placeholder at byte {0}")]
    EmptyPlaceholder(usize),

    #[error("Unknown template variable `{0}`")]
    UnknownVariable(String),
}

/// Render `template` against `vars`.
pub fn render(template: &str, vars: &Map<String, Value>) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    let mut offset = 0;

    while let Some(pos) = rest.find(|c: char| c == '{' || c == '}') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if tail.starts_with("{{") {
            out.push('{');
            rest = &tail[2..];
            offset += pos + 2;
            continue;
        }
        if tail.starts_with("}}") {
            out.push('}');
            rest = &tail[2..];
            offset += pos + 2;
            continue;
        }
        if tail.starts_with('}') {
            return Err(TemplateError::UnmatchedClose(offset + pos));
        }

        let close = tail.find('}').ok_or(TemplateError::Unclosed(offset + pos))?;
        let path = tail[1..close].trim();
        if path.is_empty() {
            return Err(TemplateError::EmptyPlaceholder(offset + pos));
        }

        let value = lookup(vars, path)?;
        out.push_str(&display(value.unwrap_or(&Value::Null)));

        rest = &tail[close + 1..];
        offset += pos + close + 1;
    }

    out.push_str(rest);
    Ok(out)
}

/// Resolve a dotted path. An unknown root is an error; a missing step below
/// a known root is `None`.
fn lookup<'a>(
    vars: &'a Map<String, Value>,
    path: &str,
) -> Result<Option<&'a Value>, TemplateError> {
    let mut segments = path.split('.').map(str::trim);
    let root = segments.next().unwrap_or_default();
    let root = vars
        .get(root)
        .ok_or_else(|| TemplateError::UnknownVariable(path.to_string()))?;

    Ok(segments.try_fold(root, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => items.get(segment.parse::<usize>().ok()?),
        _ => None,
    }))
}

fn display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items.iter().map(display).collect::<Vec<_>>().join(", "),
        Value::Object(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vars(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn replaces_placeholders() {
        let out = render("Hello {who}!", &vars(json!({"who": "World"}))).unwrap();
        assert_eq!(out, "Hello World!");
    }

    #[test]
    fn resolves_paths_into_arrays() {
        let out = render(
            "The {key} must be between {args.0} and {args.1}.",
            &vars(json!({"key": "username", "args": [4, 30]})),
        )
        .unwrap();
        assert_eq!(out, "The username must be between 4 and 30.");
    }

    #[test]
    fn renders_scalars_and_collections() {
        let v = vars(json!({"n": null, "b": true, "list": ["a", "b"], "obj": {"x": 1}}));
        assert_eq!(render("[{n}]", &v).unwrap(), "[]");
        assert_eq!(render("{b}", &v).unwrap(), "true");
        assert_eq!(render("{list}", &v).unwrap(), "a, b");
        assert_eq!(render("{obj}", &v).unwrap(), "{\"x\":1}");
    }

    #[test]
    fn missing_paths_under_known_roots_render_empty() {
        let v = vars(json!({"args": [4], "value": {"x": 1}, "n": 3}));
        assert_eq!(render("{args.0}-{args.1}", &v).unwrap(), "4-");
        assert_eq!(render("[{args.nope}]", &v).unwrap(), "[]");
        assert_eq!(render("[{value.y}]", &v).unwrap(), "[]");
        assert_eq!(render("[{n.deep}]", &v).unwrap(), "[]");
        assert_eq!(
            render("{other.0}", &v),
            Err(TemplateError::UnknownVariable("other.0".to_string()))
        );
    }

    #[test]
    fn escaped_braces() {
        let out = render("{{literal}} {x}", &vars(json!({"x": 1}))).unwrap();
        assert_eq!(out, "{literal} 1");
    }

    #[test]
    fn malformed_templates_fail() {
        let v = Map::new();
        assert_eq!(render("oops {key", &v), Err(TemplateError::Unclosed(5)));
        assert_eq!(render("{ }", &v), Err(TemplateError::EmptyPlaceholder(0)));
        assert_eq!(render("a } b", &v), Err(TemplateError::UnmatchedClose(2)));
        assert_eq!(
            render("{nope}", &v),
            Err(TemplateError::UnknownVariable("nope".to_string()))
        );
    }
}
