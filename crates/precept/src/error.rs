//! Error types for the validation engine.

use crate::template::TemplateError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Structural failures of a validation call or of validator setup.
///
/// Per-field rule failures are never reported through this type in lenient
/// mode; they are recorded on the [`Response`](crate::Response). Only
/// [`Validator::validate_or_fail`](crate::Validator::validate_or_fail) turns
/// them into [`Error::Validation`].
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0} is not defined.")]
    RuleNotFound(String),

    #[error("Invalid rule definition: {0}")]
    RuleDefinition(String),

    #[error("Rule `{rule}` failed while checking `{key}`: {source}")]
    PredicateExecution {
        rule: String,
        key: String,
        #[source]
        source: PredicateError,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Message rendering error: {0}")]
    Template(#[from] TemplateError),

    #[error("Validation data must be an object, got {0}")]
    NotARecord(&'static str),

    #[error("Unknown built-in language: {0}")]
    UnknownLanguage(String),

    #[error("Failed to load rule file {}: {reason}", path.display())]
    RuleFile { path: PathBuf, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Error raised by a predicate that could not reach a verdict.
///
/// Predicates report an invalid value by returning `Ok(false)`. Returning
/// this error aborts the whole validation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredicateError {
    message: String,
}

impl PredicateError {
    /// Predicate failure carrying `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The failure message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for PredicateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for PredicateError {}

impl From<String> for PredicateError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for PredicateError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Failure value produced by strict validation.
///
/// Carries the same shape as a failed [`Response`](crate::Response):
///
/// ```json
/// {
///   "name": "ValidationError",
///   "errors": { "password": ["The password is required."] },
///   "passed": false,
///   "failed": true
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Always `"ValidationError"`
    pub name: String,
    /// Rendered messages keyed by field
    pub errors: BTreeMap<String, Vec<String>>,
    pub passed: bool,
    pub failed: bool,
}

impl ValidationError {
    pub const NAME: &'static str = "ValidationError";

    /// Create a validation error from the documented response fields.
    pub fn new(errors: BTreeMap<String, Vec<String>>, passed: bool, failed: bool) -> Self {
        Self {
            name: Self::NAME.to_string(),
            errors,
            passed,
            failed,
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
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Validation failed: {} error(s)", self.len())
    }
}

impl std::error::Error for ValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_not_found_message() {
        let err = Error::RuleNotFound("madeUpRule".to_string());
        assert_eq!(err.to_string(), "madeUpRule is not defined.");
    }

    #[test]
    fn validation_error_shape() {
        let mut errors = BTreeMap::new();
        errors.insert(
            "password".to_string(),
            vec!["The password is required.".to_string()],
        );
        let err = ValidationError::new(errors, false, true);

        assert_eq!(err.name, "ValidationError");
        assert_eq!(err.len(), 1);
        assert_eq!(err.to_string(), "Validation failed: 1 error(s)");

        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["name"], "ValidationError");
        assert_eq!(json["failed"], true);
        assert_eq!(json["errors"]["password"][0], "The password is required.");
    }

    #[test]
    fn predicate_error_source_is_kept() {
        let err = Error::PredicateExecution {
            rule: "remote".to_string(),
            key: "email".to_string(),
            source: PredicateError::new("connection refused"),
        };
        assert!(err.to_string().contains("connection refused"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
