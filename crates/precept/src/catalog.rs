//! Message catalog: rule name to message template.

use crate::error::{Error, Result};
use crate::template::{self, TemplateError};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Template used when a rule has no entry of its own.
pub const MISSING_KEY: &str = "$missing";

const BUILTIN_EN: &str = include_str!("../lang/en.json");
const BUILTIN_EN_PIRATE: &str = include_str!("../lang/en-pr.json");

/// Where a dictionary comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogSource {
    /// An in-memory dictionary
    Entries(HashMap<String, String>),
    /// A dictionary shipped with the crate (`en`, `en-pr`)
    BuiltIn(String),
    /// A `.json` or `.toml` dictionary on disk
    File(PathBuf),
}

impl CatalogSource {
    /// One of the dictionaries shipped with the crate.
    pub fn built_in(name: impl Into<String>) -> Self {
        CatalogSource::BuiltIn(name.into())
    }

    /// A dictionary file on disk.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        CatalogSource::File(path.into())
    }
}

impl From<HashMap<String, String>> for CatalogSource {
    fn from(entries: HashMap<String, String>) -> Self {
        CatalogSource::Entries(entries)
    }
}

/// Rule-name to template dictionary plus global template variables.
///
/// ## Example
///
/// ```rust,ignore
/// let mut catalog = MessageCatalog::new();
/// catalog.insert("greet", "Hello {who}");
/// catalog.set_global("who", "World");
/// assert_eq!(catalog.resolve("greet", &Map::new())?, "Hello World");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageCatalog {
    dictionary: HashMap<String, String>,
    globals: Map<String, Value>,
}

impl MessageCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a catalog holding one of the built-in dictionaries.
    pub fn built_in(name: &str) -> Result<Self> {
        let mut catalog = Self::new();
        catalog.load(CatalogSource::built_in(name))?;
        Ok(catalog)
    }

    /// Replace the dictionary wholesale. Globals are kept.
    pub fn load(&mut self, source: impl Into<CatalogSource>) -> Result<&mut Self> {
        self.dictionary = match source.into() {
            CatalogSource::Entries(entries) => entries,
            CatalogSource::BuiltIn(name) => {
                let raw = builtin_dictionary(&name).ok_or(Error::UnknownLanguage(name))?;
                serde_json::from_str(raw)
                    .map_err(|e| Error::Config(format!("built-in dictionary: {e}")))?
            }
            CatalogSource::File(path) => read_dictionary(&path)?,
        };
        debug!(entries = self.dictionary.len(), "Loaded message dictionary");
        Ok(self)
    }

    /// Merge entries over the existing dictionary.
    pub fn extend<K, V, I>(&mut self, entries: I) -> &mut Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        self.dictionary
            .extend(entries.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Set a single entry.
    pub fn insert(&mut self, key: impl Into<String>, template: impl Into<String>) -> &mut Self {
        self.dictionary.insert(key.into(), template.into());
        self
    }

    /// Register a variable available to every interpolation.
    pub fn set_global(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.globals.insert(key.into(), value.into());
        self
    }

    /// The raw template for `key`, if any.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.dictionary.get(key).map(String::as_str)
    }

    /// Whether `key` has a template of its own.
    pub fn contains(&self, key: &str) -> bool {
        self.dictionary.contains_key(key)
    }

    /// Number of dictionary entries.
    pub fn len(&self) -> usize {
        self.dictionary.len()
    }

    /// Whether the dictionary has no entries.
    pub fn is_empty(&self) -> bool {
        self.dictionary.is_empty()
    }

    /// Variables shared by every interpolation.
    pub fn globals(&self) -> &Map<String, Value> {
        &self.globals
    }

    /// Render the template for `key`, falling back to `$missing`.
    ///
    /// `data` is layered over the globals.
    pub fn resolve(
        &self,
        key: &str,
        data: &Map<String, Value>,
    ) -> std::result::Result<String, TemplateError> {
        let template = self
            .dictionary
            .get(key)
            .or_else(|| self.dictionary.get(MISSING_KEY))
            .ok_or_else(|| TemplateError::MissingTemplate(key.to_string()))?;

        let mut vars = self.globals.clone();
        vars.extend(data.iter().map(|(k, v)| (k.clone(), v.clone())));

        template::render(template, &vars)
    }
}

fn builtin_dictionary(name: &str) -> Option<&'static str> {
    match name {
        "en" => Some(BUILTIN_EN),
        "en-pr" => Some(BUILTIN_EN_PIRATE),
        _ => None,
    }
}

fn read_dictionary(path: &Path) -> Result<HashMap<String, String>> {
    let raw = std::fs::read_to_string(path)?;
    let is_toml = path.extension().is_some_and(|ext| ext == "toml");

    let parsed = if is_toml {
        toml::from_str(&raw).map_err(|e| e.to_string())
    } else {
        serde_json::from_str(&raw).map_err(|e| e.to_string())
    };

    parsed.map_err(|reason| Error::Config(format!("{}: {reason}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn loads_dictionary_from_entries() {
        let mut catalog = MessageCatalog::new();
        assert!(catalog.is_empty());

        catalog
            .load(HashMap::from([("foo".to_string(), "bar".to_string())]))
            .unwrap();
        assert_eq!(catalog.get("foo"), Some("bar"));
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn load_replaces_existing_entries() {
        let mut catalog = MessageCatalog::new();
        catalog.insert("old", "gone");
        catalog
            .load(HashMap::from([("new".to_string(), "here".to_string())]))
            .unwrap();
        assert!(!catalog.contains("old"));
        assert!(catalog.contains("new"));
    }

    #[test]
    fn extends_dictionary() {
        let mut catalog = MessageCatalog::new();
        catalog.insert("bar", "baz");
        catalog.extend([("fizz", "buzz")]);
        assert_eq!(catalog.get("bar"), Some("baz"));
        assert_eq!(catalog.get("fizz"), Some("buzz"));
    }

    #[test]
    fn resolves_with_data() {
        let mut catalog = MessageCatalog::new();
        catalog.insert("greet", "Hello {who}");
        let out = catalog.resolve("greet", &data(json!({"who": "World"})));
        assert_eq!(out.unwrap(), "Hello World");
    }

    #[test]
    fn resolves_with_globals() {
        let mut catalog = MessageCatalog::new();
        catalog.insert("greet", "Hello {who}");
        catalog.set_global("who", "World");
        assert_eq!(catalog.resolve("greet", &Map::new()).unwrap(), "Hello World");

        // call data wins over globals
        let out = catalog.resolve("greet", &data(json!({"who": "Rust"})));
        assert_eq!(out.unwrap(), "Hello Rust");
    }

    #[test]
    fn falls_back_to_missing_template() {
        let mut catalog = MessageCatalog::new();
        catalog.insert(MISSING_KEY, "No message for {key}");
        let out = catalog.resolve("unknown", &data(json!({"key": "field"})));
        assert_eq!(out.unwrap(), "No message for field");
    }

    #[test]
    fn missing_without_fallback_fails() {
        let catalog = MessageCatalog::new();
        assert_eq!(
            catalog.resolve("unknown", &Map::new()),
            Err(TemplateError::MissingTemplate("unknown".to_string()))
        );
    }

    #[test]
    fn resolve_renders_missing_arguments_empty() {
        let catalog = MessageCatalog::built_in("en").unwrap();
        let out = catalog.resolve(
            "between",
            &data(json!({"key": "name", "value": "xy", "args": [4]})),
        );
        assert_eq!(out.unwrap(), "The name must be between 4 and .");
    }

    #[test]
    fn loads_built_in_sets() {
        let catalog = MessageCatalog::built_in("en-pr").unwrap();
        assert_eq!(catalog.get("array"), Some("Arr! The {key} ain't an array."));

        let catalog = MessageCatalog::built_in("en").unwrap();
        let out = catalog.resolve("required", &data(json!({"key": "password"})));
        assert_eq!(out.unwrap(), "The password is required.");
    }

    #[test]
    fn unknown_built_in_fails() {
        assert!(matches!(
            MessageCatalog::built_in("xx"),
            Err(Error::UnknownLanguage(name)) if name == "xx"
        ));
    }

    #[test]
    fn loads_dictionary_files() {
        let dir = tempfile::tempdir().unwrap();
        let json_path = dir.path().join("dict.json");
        std::fs::write(&json_path, r#"{ "foo": "bar" }"#).unwrap();
        let toml_path = dir.path().join("dict.toml");
        std::fs::write(&toml_path, "fizz = \"buzz\"\n").unwrap();

        let mut catalog = MessageCatalog::new();
        catalog.load(CatalogSource::file(&json_path)).unwrap();
        assert_eq!(catalog.get("foo"), Some("bar"));

        catalog.load(CatalogSource::file(&toml_path)).unwrap();
        assert_eq!(catalog.get("fizz"), Some("buzz"));
        assert!(!catalog.contains("foo"));
    }

    #[test]
    fn malformed_dictionary_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        let mut catalog = MessageCatalog::new();
        assert!(matches!(
            catalog.load(CatalogSource::file(&path)),
            Err(Error::Config(_))
        ));
    }
}
