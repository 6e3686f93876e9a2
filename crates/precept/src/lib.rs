//! # Precept
//!
//! Declarative, asynchronous validation of JSON-like records. Rules are
//! written per field as compact strings (`"between: 4, 30"`) or arrays
//! (`["between", 4, 30]`), run concurrently, and failures are rendered into
//! localized messages.
//!
//! ## Example
//!
//! ```rust,ignore
//! use precept::prelude::*;
//! use serde_json::json;
//!
//! let validator = Validator::new();
//! let rules: Rules = serde_json::from_value(json!({
//!     "username": ["required", "between: 4, 30", "alphanumeric"],
//!     "password": ["required", "longer: 5"],
//!     "acceptTOS": ["required", "boolean: true"],
//! }))?;
//!
//! let data = json!({ "username": "brendanashworth", "acceptTOS": false });
//! let response = validator.validate(&data, &rules).await?;
//!
//! assert!(response.failed());
//! assert_eq!(response.get("password").unwrap(), ["The password is required."]);
//! ```
//!
//! ## Rules
//!
//! - `required`, `requiredWith: other`, `requiredWithout: other` - presence
//!   checks, settled before anything else runs
//! - type and size checks: `string`, `array`, `boolean`, `between`, `within`,
//!   `longer`, `shorter`, `greaterThan`, `lessThan`, `equal`, `in`, ...
//! - format checks: `email`, `URL`, `IP`, `alpha`, `alphanumeric`, `uUID`,
//!   `date`, `matches`, ...
//!
//! Custom rules implement [`Rule`] or [`AsyncRule`], register as closures,
//! or are declared in `.json` / `.toml` files loaded with
//! [`RuleRegistry::load_directory`].
//!
//! ## Error Format
//!
//! A [`Response`] serializes as:
//!
//! ```json
//! {
//!   "errors": {
//!     "acceptTOS": ["The acceptTOS must be a boolean."],
//!     "password": ["The password is required."]
//!   },
//!   "passed": false,
//!   "failed": true
//! }
//! ```

mod catalog;
mod config;
mod definition;
mod engine;
mod error;
mod invocation;
mod registry;
mod response;
mod rules;
mod template;
mod traits;

pub use catalog::{CatalogSource, MessageCatalog, MISSING_KEY};
pub use config::ValidatorConfig;
pub use definition::RuleDefinition;
pub use engine::{extract_required, IndexedRule, PendingRules, Validator};
pub use error::{Error, PredicateError, Result, ValidationError};
pub use invocation::{
    normalize_rules, parse_literal, parse_rule, RuleInvocation, RuleSet, RuleSpec, Rules,
    ARGUMENT_DELIMITER, METHOD_DELIMITER, REQUIRED_PREFIX,
};
pub use registry::RuleRegistry;
pub use response::{Iter, Response};
pub use template::{render, TemplateError};
pub use traits::{AsyncRule, Record, Rule, RuleCall, Verdict};

/// Prelude module for validation
pub mod prelude {
    pub use crate::catalog::{CatalogSource, MessageCatalog};
    pub use crate::config::ValidatorConfig;
    pub use crate::engine::Validator;
    pub use crate::error::{Error, PredicateError, ValidationError};
    pub use crate::invocation::{RuleInvocation, RuleSpec, Rules};
    pub use crate::registry::RuleRegistry;
    pub use crate::response::Response;
    pub use crate::traits::{AsyncRule, Record, Rule, RuleCall, Verdict};
}
