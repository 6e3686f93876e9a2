//! Validator configuration.

use crate::error::{Error, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Configuration for building a [`Validator`](crate::Validator).
///
/// ```toml
/// language = "en-pr"
/// rule_dirs = ["rules"]
///
/// [messages]
/// slug = "The {key} must be a slug."
///
/// [globals]
/// app = "Acme"
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Built-in dictionary to start from
    pub language: String,
    /// Whether to register the built-in rules
    pub builtin_rules: bool,
    /// Rule definition directories, loaded in order
    pub rule_dirs: Vec<PathBuf>,
    /// Message overrides merged over the dictionary
    pub messages: HashMap<String, String>,
    /// Variables available to every message
    pub globals: Map<String, Value>,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            builtin_rules: true,
            rule_dirs: Vec::new(),
            messages: HashMap::new(),
            globals: Map::new(),
        }
    }
}

impl ValidatorConfig {
    /// Create a config for the given built-in language.
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            ..Default::default()
        }
    }

    /// Parse a TOML document.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| Error::Config(e.to_string()))
    }

    /// Read a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }

    /// Enable or disable the built-in rules
    pub fn builtin_rules(mut self, enabled: bool) -> Self {
        self.builtin_rules = enabled;
        self
    }

    /// Add a rule definition directory
    pub fn rule_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.rule_dirs.push(dir.into());
        self
    }

    /// Override one message
    pub fn message(mut self, key: impl Into<String>, template: impl Into<String>) -> Self {
        self.messages.insert(key.into(), template.into());
        self
    }

    /// Set a template global
    pub fn global(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.globals.insert(key.into(), value.into());
        self
    }
}
