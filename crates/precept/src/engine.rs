//! The validation engine.
//!
//! One call runs in fixed phases: copy the caller's data, normalize the
//! rules, settle the `required` family against absent fields, then dispatch
//! every remaining invocation concurrently and fold the verdicts into a
//! [`Response`].

use crate::catalog::{CatalogSource, MessageCatalog};
use crate::config::ValidatorConfig;
use crate::error::{Error, Result};
use crate::invocation::{normalize_rules, RuleInvocation, RuleSet, Rules};
use crate::registry::RuleRegistry;
use crate::response::Response;
use crate::template::TemplateError;
use crate::traits::Record;
use futures_util::stream::{FuturesUnordered, StreamExt};
use futures_util::FutureExt;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// An invocation paired with its position in the field's normalized list.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedRule {
    pub index: usize,
    pub invocation: RuleInvocation,
}

/// Invocations left to dispatch after the `required` family is settled.
pub type PendingRules = HashMap<String, Vec<IndexedRule>>;

/// Runs rule sets against records.
///
/// ## Example
///
/// ```rust,ignore
/// use precept::prelude::*;
/// use serde_json::json;
///
/// let validator = Validator::new();
/// let rules: Rules = serde_json::from_value(json!({
///     "username": ["required", "between: 4, 30", "alphanumeric"],
///     "password": ["required", "longer: 5"],
/// }))?;
///
/// let response = validator
///     .validate(&json!({ "username": "brendanashworth" }), &rules)
///     .await?;
/// assert!(response.failed());
/// ```
#[derive(Debug, Clone)]
pub struct Validator {
    rules: RuleRegistry,
    language: Arc<MessageCatalog>,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator {
    /// Validator with the built-in rules and the `en` dictionary.
    pub fn new() -> Self {
        let language = MessageCatalog::built_in("en").expect("embedded `en` dictionary is valid");
        Self {
            rules: RuleRegistry::with_builtin(),
            language: Arc::new(language),
        }
    }

    /// Validator with no rules and an empty dictionary.
    pub fn empty() -> Self {
        Self {
            rules: RuleRegistry::new(),
            language: Arc::new(MessageCatalog::new()),
        }
    }

    /// Build a validator from a configuration.
    pub fn with_config(config: ValidatorConfig) -> Result<Self> {
        let mut rules = if config.builtin_rules {
            RuleRegistry::with_builtin()
        } else {
            RuleRegistry::new()
        };
        for dir in &config.rule_dirs {
            rules.load_directory(dir)?;
        }

        let mut language = MessageCatalog::new();
        language.load(CatalogSource::BuiltIn(config.language))?;
        language.extend(config.messages);
        for (key, value) in config.globals {
            language.set_global(key, value);
        }

        debug!(
            rules = rules.len(),
            messages = language.len(),
            "Configured validator"
        );
        Ok(Self {
            rules,
            language: Arc::new(language),
        })
    }

    /// The registered rules.
    pub fn rules(&self) -> &RuleRegistry {
        &self.rules
    }

    /// Mutable access to the registered rules.
    pub fn rules_mut(&mut self) -> &mut RuleRegistry {
        &mut self.rules
    }

    /// The current dictionary.
    pub fn language(&self) -> &MessageCatalog {
        &self.language
    }

    /// Mutable access to the dictionary.
    ///
    /// Responses already handed out keep the dictionary they were built with.
    pub fn language_mut(&mut self) -> &mut MessageCatalog {
        Arc::make_mut(&mut self.language)
    }

    /// Validate `data` against `rules`.
    ///
    /// Resolves with a [`Response`] whether or not the data passed. Fails only
    /// on structural errors: data that is not an object, a malformed rule, an
    /// unknown rule, a predicate error or a message that cannot be rendered.
    pub async fn validate<T>(&self, data: &T, rules: &Rules) -> Result<Response>
    where
        T: Serialize + ?Sized,
    {
        let record = to_record(data)?;
        let rules = normalize_rules(rules)?;
        self.run(record, rules).await
    }

    /// Like [`validate`](Self::validate), but failing data becomes
    /// [`Error::Validation`].
    pub async fn validate_or_fail<T>(&self, data: &T, rules: &Rules) -> Result<Response>
    where
        T: Serialize + ?Sized,
    {
        let response = self.validate(data, rules).await?;
        if response.failed() {
            return Err(Error::Validation(response.into_validation_error()));
        }
        Ok(response)
    }

    async fn run(&self, record: Record, rules: RuleSet) -> Result<Response> {
        let original = Arc::new(record);
        let rules = Arc::new(rules);
        let mut response = Response::new(
            Arc::clone(&self.language),
            Arc::clone(&original),
            Arc::clone(&rules),
        );

        let mut working = (*original).clone();
        let pending = extract_required(&rules, &mut working, &mut response)?;
        let working = Arc::new(working);

        let mut tasks: FuturesUnordered<_> = pending
            .into_iter()
            .flat_map(|(key, list)| list.into_iter().map(move |rule| (key.clone(), rule)))
            .map(|(key, IndexedRule { index, invocation })| {
                trace!(key = %key, rule = %invocation, "Dispatching rule");
                self.rules
                    .invoke(Arc::clone(&working), &key, &invocation)
                    .map(move |outcome| (key, index, outcome))
            })
            .collect();
        debug!(tasks = tasks.len(), "Dispatched rule invocations");

        // Every task runs to completion; the first structural error wins.
        let mut failure: Option<Error> = None;
        while let Some((key, index, outcome)) = tasks.next().await {
            match outcome {
                Ok(true) => {}
                Ok(false) if failure.is_none() => {
                    if let Err(e) = response.add_error(&key, index) {
                        failure = Some(e.into());
                    }
                }
                Ok(false) => {}
                Err(e) => {
                    if failure.is_none() {
                        failure = Some(e);
                    }
                }
            }
        }

        if let Some(error) = failure {
            warn!(error = %error, "Validation aborted");
            return Err(error);
        }

        debug!(
            passed = response.passed(),
            errors = response.len(),
            "Validation finished"
        );
        Ok(response)
    }
}

/// Settle the `required` family.
///
/// For every field absent from `data` (missing or `null`), record an error
/// for each `required` invocation, each `requiredWith: other` whose `other`
/// is present, and each `requiredWithout: other` whose `other` is absent.
/// Absent fields are then dropped from `data` and get no further checks.
/// Present fields keep every invocation not named `required*`, with its
/// original index.
pub fn extract_required(
    rules: &RuleSet,
    data: &mut Record,
    response: &mut Response,
) -> std::result::Result<PendingRules, TemplateError> {
    let mut pending = PendingRules::new();
    let mut absent = Vec::new();

    for (key, invocations) in rules {
        if is_present(data, key) {
            let remaining = invocations
                .iter()
                .enumerate()
                .filter(|(_, invocation)| !invocation.is_required_family())
                .map(|(index, invocation)| IndexedRule {
                    index,
                    invocation: invocation.clone(),
                })
                .collect();
            pending.insert(key.clone(), remaining);
            continue;
        }

        for (index, invocation) in invocations.iter().enumerate() {
            let violated = match invocation.name.as_str() {
                "required" => true,
                "requiredWith" => other_present(data, invocation),
                "requiredWithout" => !other_present(data, invocation),
                _ => false,
            };
            if violated {
                response.add_error(key, index)?;
            }
        }
        absent.push(key.as_str());
    }

    for key in absent {
        data.remove(key);
    }
    Ok(pending)
}

/// Present means neither missing nor `null`.
fn is_present(data: &Record, key: &str) -> bool {
    data.get(key).is_some_and(|value| !value.is_null())
}

fn other_present(data: &Record, invocation: &RuleInvocation) -> bool {
    invocation
        .key_arg()
        .is_some_and(|other| is_present(data, &other))
}

fn to_record<T: Serialize + ?Sized>(data: &T) -> Result<Record> {
    match serde_json::to_value(data) {
        Ok(Value::Object(record)) => Ok(record),
        Ok(Value::Null) => Err(Error::NotARecord("null")),
        Ok(Value::Bool(_)) => Err(Error::NotARecord("a boolean")),
        Ok(Value::Number(_)) => Err(Error::NotARecord("a number")),
        Ok(Value::String(_)) => Err(Error::NotARecord("a string")),
        Ok(Value::Array(_)) => Err(Error::NotARecord("an array")),
        Err(_) => Err(Error::NotARecord("a value that cannot be serialized")),
    }
}
