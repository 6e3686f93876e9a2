//! Aggregated outcome of one validation call.

use crate::catalog::{MessageCatalog, MISSING_KEY};
use crate::error::ValidationError;
use crate::invocation::RuleSet;
use crate::template::TemplateError;
use crate::traits::Record;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::btree_map;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// Rendered error messages keyed by field, plus the pass/fail state.
///
/// Messages are rendered against the caller's original data and the
/// normalized rules, so `{value}` and `{args}` reflect what was submitted.
///
/// ## Example
///
/// ```rust,ignore
/// let response = validator.validate(&data, &rules).await?;
/// if response.failed() {
///     for (field, messages) in response.iter() {
///         eprintln!("{field}: {}", messages.join(" "));
///     }
/// }
/// ```
#[derive(Clone)]
pub struct Response {
    catalog: Arc<MessageCatalog>,
    data: Arc<Record>,
    rules: Arc<RuleSet>,
    errors: BTreeMap<String, Vec<String>>,
    has_errors: bool,
}

impl Response {
    /// Empty response rendering against the given snapshots.
    pub fn new(catalog: Arc<MessageCatalog>, data: Arc<Record>, rules: Arc<RuleSet>) -> Self {
        Self {
            catalog,
            data,
            rules,
            errors: BTreeMap::new(),
            has_errors: false,
        }
    }

    /// Record a failure of `rules[key][rule_index]`.
    ///
    /// The message is looked up by rule name and rendered with `key`,
    /// `value` (`null` when absent) and `args`. An index with no invocation
    /// renders the `$missing` template.
    pub fn add_error(&mut self, key: &str, rule_index: usize) -> Result<(), TemplateError> {
        let invocation = self.rules.get(key).and_then(|list| list.get(rule_index));
        let (name, args) = match invocation {
            Some(invocation) => (invocation.name.as_str(), invocation.args.clone()),
            None => (MISSING_KEY, Vec::new()),
        };

        let mut vars = Map::new();
        vars.insert("key".to_string(), Value::String(key.to_string()));
        vars.insert(
            "value".to_string(),
            self.data.get(key).cloned().unwrap_or(Value::Null),
        );
        vars.insert("args".to_string(), Value::Array(args));

        let message = self.catalog.resolve(name, &vars)?;
        self.errors.entry(key.to_string()).or_default().push(message);
        self.has_errors = true;
        Ok(())
    }

    /// `true` until the first error is recorded.
    pub fn passed(&self) -> bool {
        !self.has_errors
    }

    /// `true` once any error is recorded.
    pub fn failed(&self) -> bool {
        self.has_errors
    }

    /// The full error mapping.
    pub fn errors(&self) -> &BTreeMap<String, Vec<String>> {
        &self.errors
    }

    /// Messages recorded for one field.
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.errors.get(key).map(Vec::as_slice)
    }

    /// Whether `key` has any errors.
    pub fn has(&self, key: &str) -> bool {
        self.errors.contains_key(key)
    }

    /// Fields with at least one error, sorted.
    pub fn keys(&self) -> Vec<&str> {
        self.errors.keys().map(String::as_str).collect()
    }

    /// Message lists in key order.
    pub fn values(&self) -> Vec<&[String]> {
        self.errors.values().map(Vec::as_slice).collect()
    }

    /// `(field, messages)` pairs in key order.
    pub fn pairs(&self) -> Vec<(&str, &[String])> {
        self.iter().collect()
    }

    /// Message to field. A message shared by several fields maps to the last
    /// one in key order.
    pub fn invert(&self) -> HashMap<&str, &str> {
        self.errors
            .iter()
            .flat_map(|(key, messages)| messages.iter().map(move |m| (m.as_str(), key.as_str())))
            .collect()
    }

    /// Errors restricted to `keys`.
    pub fn pick<'a, I>(&self, keys: I) -> BTreeMap<String, Vec<String>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        keys.into_iter()
            .filter_map(|key| self.errors.get_key_value(key))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Errors without `keys`.
    pub fn omit<'a, I>(&self, keys: I) -> BTreeMap<String, Vec<String>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut errors = self.errors.clone();
        for key in keys {
            errors.remove(key);
        }
        errors
    }

    /// Iterate `(field, messages)` in key order.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            inner: self.errors.iter(),
        }
    }

    /// Total number of messages across all fields.
    pub fn len(&self) -> usize {
        self.errors.values().map(Vec::len).sum()
    }

    /// Whether no field has errors.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Strict-mode failure value carrying this response's fields.
    pub fn to_validation_error(&self) -> ValidationError {
        ValidationError::new(self.errors.clone(), self.passed(), self.failed())
    }

    /// Consume the response into a strict-mode error.
    pub fn into_validation_error(self) -> ValidationError {
        let passed = self.passed();
        let failed = self.failed();
        ValidationError::new(self.errors, passed, failed)
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("errors", &self.errors)
            .field("passed", &self.passed())
            .field("failed", &self.failed())
            .finish()
    }
}

impl Serialize for Response {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Response", 3)?;
        state.serialize_field("errors", &self.errors)?;
        state.serialize_field("passed", &self.passed())?;
        state.serialize_field("failed", &self.failed())?;
        state.end()
    }
}

/// Iterator over `(field, messages)` in key order.
pub struct Iter<'a> {
    inner: btree_map::Iter<'a, String, Vec<String>>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a str, &'a [String]);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .next()
            .map(|(key, messages)| (key.as_str(), messages.as_slice()))
    }
}

impl<'a> IntoIterator for &'a Response {
    type Item = (&'a str, &'a [String]);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
