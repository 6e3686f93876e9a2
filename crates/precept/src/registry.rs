//! Rule registry - named predicates and their dispatch.

use crate::definition::RuleDefinition;
use crate::error::{Error, PredicateError, Result};
use crate::invocation::RuleInvocation;
use crate::rules;
use crate::traits::{AsyncRule, Record, Rule, RuleCall, Verdict};
use async_trait::async_trait;
use futures_util::future::{self, BoxFuture};
use futures_util::FutureExt;
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Extensions recognized by [`RuleRegistry::load_directory`].
const DEFINITION_EXTENSIONS: [&str; 2] = ["json", "toml"];

/// A type-erased registered rule.
#[derive(Clone)]
pub(crate) enum Handler {
    Sync(Arc<dyn Rule>),
    Async(Arc<dyn AsyncRule>),
}

impl Handler {
    /// Normalize both rule flavors into one boxed future.
    pub(crate) fn call(&self, call: RuleCall) -> BoxFuture<'static, Verdict> {
        match self {
            Handler::Sync(rule) => {
                let rule = Arc::clone(rule);
                async move { rule.check(&call) }.boxed()
            }
            Handler::Async(rule) => {
                let rule = Arc::clone(rule);
                async move { rule.check(call).await }.boxed()
            }
        }
    }
}

/// Adapter for synchronous closures.
struct FnRule<F>(F);

impl<F> Rule for FnRule<F>
where
    F: Fn(&RuleCall) -> Verdict + Send + Sync,
{
    fn check(&self, call: &RuleCall) -> Verdict {
        (self.0)(call)
    }
}

/// Adapter for closures returning a future.
struct AsyncFnRule<F>(F);

#[async_trait]
impl<F, Fut> AsyncRule for AsyncFnRule<F>
where
    F: Fn(RuleCall) -> Fut + Send + Sync,
    Fut: Future<Output = Verdict> + Send + 'static,
{
    async fn check(&self, call: RuleCall) -> Verdict {
        (self.0)(call).await
    }
}

/// Registry of named rules.
///
/// ## Example
///
/// ```rust,ignore
/// let mut registry = RuleRegistry::with_builtin();
/// registry.register_fn("even", |call| {
///     Ok(call.value.as_i64().is_some_and(|n| n % 2 == 0))
/// });
/// registry.load_directory("rules/")?;
/// ```
#[derive(Clone, Default)]
pub struct RuleRegistry {
    rules: HashMap<String, Handler>,
}

impl RuleRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding every built-in rule.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        rules::register_builtin(&mut registry);
        debug!(count = registry.len(), "Registered built-in rules");
        registry
    }

    /// Register a rule under its declared name.
    ///
    /// Fails with [`Error::RuleDefinition`] when the rule declares no name.
    pub fn register<R: Rule + 'static>(&mut self, rule: R) -> Result<&mut Self> {
        let name = declared_name(rule.name())?;
        Ok(self.insert(name, Handler::Sync(Arc::new(rule))))
    }

    /// Register a rule under an explicit name.
    pub fn register_as<R: Rule + 'static>(&mut self, name: impl Into<String>, rule: R) -> &mut Self {
        self.insert(name.into(), Handler::Sync(Arc::new(rule)))
    }

    /// Register an async rule under its declared name.
    pub fn register_async<R: AsyncRule + 'static>(&mut self, rule: R) -> Result<&mut Self> {
        let name = declared_name(rule.name())?;
        Ok(self.insert(name, Handler::Async(Arc::new(rule))))
    }

    /// Register an async rule under an explicit name.
    pub fn register_async_as<R: AsyncRule + 'static>(
        &mut self,
        name: impl Into<String>,
        rule: R,
    ) -> &mut Self {
        self.insert(name.into(), Handler::Async(Arc::new(rule)))
    }

    /// Register a closure. Closures have no declared name, so one is required.
    pub fn register_fn<F>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(&RuleCall) -> Verdict + Send + Sync + 'static,
    {
        self.register_as(name, FnRule(f))
    }

    /// Register a closure returning a future.
    pub fn register_async_fn<F, Fut>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(RuleCall) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Verdict> + Send + 'static,
    {
        self.register_async_as(name, AsyncFnRule(f))
    }

    /// Register a declarative definition under `name`.
    pub fn define(&mut self, name: impl Into<String>, definition: RuleDefinition) -> Result<&mut Self> {
        let name = name.into();
        let handler = definition
            .build(self)
            .map_err(|reason| Error::RuleDefinition(format!("{name}: {reason}")))?;
        Ok(self.insert(name, handler))
    }

    /// Load every `.json` / `.toml` rule definition file in `dir`.
    ///
    /// A file holding a single definition is registered under its file stem;
    /// a file holding a table of definitions registers every entry by name.
    /// Existing rules with the same name are replaced. Returns the number of
    /// rules registered.
    pub fn load_directory(&mut self, dir: impl AsRef<Path>) -> Result<usize> {
        let dir = dir.as_ref();
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && is_definition_file(path))
            .collect();
        paths.sort();

        let mut loaded = 0;
        for path in &paths {
            loaded += self.load_file(path)?;
        }

        debug!(dir = %dir.display(), files = paths.len(), rules = loaded, "Loaded rule directory");
        Ok(loaded)
    }

    fn load_file(&mut self, path: &Path) -> Result<usize> {
        let file_error = |reason: String| Error::RuleFile {
            path: path.to_path_buf(),
            reason,
        };

        let raw = std::fs::read_to_string(path)?;
        let unit: Value = if path.extension().is_some_and(|ext| ext == "toml") {
            toml::from_str(&raw).map_err(|e| file_error(e.to_string()))?
        } else {
            serde_json::from_str(&raw).map_err(|e| file_error(e.to_string()))?
        };

        let mut definitions: Vec<(String, RuleDefinition)> = if unit.get("type").is_some() {
            let name = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .ok_or_else(|| file_error("file name is not valid UTF-8".to_string()))?
                .to_string();
            let definition = serde_json::from_value(unit).map_err(|e| file_error(e.to_string()))?;
            vec![(name, definition)]
        } else {
            let table: HashMap<String, RuleDefinition> =
                serde_json::from_value(unit).map_err(|e| file_error(e.to_string()))?;
            table.into_iter().collect()
        };

        // Aliases may point at rules defined in the same file.
        definitions.sort_by(|(a_name, a), (b_name, b)| {
            a.is_alias().cmp(&b.is_alias()).then_with(|| a_name.cmp(b_name))
        });

        let count = definitions.len();
        for (name, definition) in definitions {
            let handler = definition
                .build(self)
                .map_err(|reason| file_error(format!("{name}: {reason}")))?;
            self.insert(name, handler);
        }
        Ok(count)
    }

    fn insert(&mut self, name: String, handler: Handler) -> &mut Self {
        debug!(rule = %name, "Registering rule");
        self.rules.insert(name, handler);
        self
    }

    pub(crate) fn handler(&self, name: &str) -> Option<&Handler> {
        self.rules.get(name)
    }

    /// Whether a rule named `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    /// Remove a rule, returning whether it existed.
    pub fn remove(&mut self, name: &str) -> bool {
        self.rules.remove(name).is_some()
    }

    /// Registered rule names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.rules.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether no rules are registered.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Run one invocation against `record[key]`.
    ///
    /// Unknown rules resolve to [`Error::RuleNotFound`]. A rule returning an
    /// error or panicking resolves to [`Error::PredicateExecution`].
    pub fn invoke(
        &self,
        record: Arc<Record>,
        key: &str,
        invocation: &RuleInvocation,
    ) -> BoxFuture<'static, Result<bool>> {
        let rule = invocation.name.clone();
        let Some(handler) = self.rules.get(&rule) else {
            return future::ready(Err(Error::RuleNotFound(rule))).boxed();
        };

        let call = RuleCall::new(record, key, invocation.args.clone());
        let key = call.key.clone();
        let pending = handler.call(call);

        async move {
            match AssertUnwindSafe(pending).catch_unwind().await {
                Ok(Ok(passed)) => Ok(passed),
                Ok(Err(source)) => Err(Error::PredicateExecution { rule, key, source }),
                Err(panic) => {
                    let message = panic_message(&*panic);
                    warn!(rule = %rule, key = %key, "Rule panicked: {}", message);
                    Err(Error::PredicateExecution {
                        rule,
                        key,
                        source: PredicateError::new(format!("panicked: {message}")),
                    })
                }
            }
        }
        .boxed()
    }
}

impl fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleRegistry")
            .field("rules", &self.names())
            .finish()
    }
}

fn declared_name(name: Option<&str>) -> Result<String> {
    match name {
        Some(name) if !name.trim().is_empty() => Ok(name.to_string()),
        _ => Err(Error::RuleDefinition(
            "Cannot register an anonymous rule. Please pass a name explicitly".to_string(),
        )),
    }
}

fn is_definition_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| DEFINITION_EXTENSIONS.contains(&ext))
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
