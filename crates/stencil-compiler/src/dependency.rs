//! Named dependency values injectable into route metadata.

use std::fmt;

use serde_json::Value;
use stencil_model::DependencyEntry;

use crate::error::CompileError;

/// Insertion-ordered table of dependency names to resolved text values.
///
/// Owned by the application assembly step and passed by reference into
/// compilation. Re-registering a name overwrites its value; entries are never
/// removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyRegistry {
    entries: Vec<(String, String)>,
}

impl DependencyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a value, returning the previous one.
    pub fn register(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.entries.push((name, value));
                None
            }
        }
    }

    /// Look up a registered value.
    pub fn resolve(&self, name: &str) -> Result<&str, CompileError> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
            .ok_or_else(|| CompileError::DependencyNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    /// Entries in first-registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Snapshot in the shape shipped to the engine.
    pub fn entries(&self) -> Vec<DependencyEntry> {
        self.entries
            .iter()
            .map(|(name, value)| DependencyEntry {
                name: name.clone(),
                value: value.clone(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Validate a route's dependency against the registry.
    ///
    /// A named dependency must already be registered. A provider is invoked
    /// immediately; a textual result is registered under the provider's
    /// name. Returns the name to record on the route, or `None` when the
    /// provider produced a non-textual value.
    pub fn attach(
        &mut self,
        dependency: &Dependency,
        route: &str,
    ) -> Result<Option<String>, CompileError> {
        match dependency {
            Dependency::Named(name) => {
                if self.contains(name) {
                    Ok(Some(name.clone()))
                } else {
                    Err(CompileError::UnresolvedDependency {
                        route: route.to_string(),
                        name: name.clone(),
                    })
                }
            }
            Dependency::Provided(provider) => {
                let value = provider
                    .produce()
                    .map_err(|e| CompileError::DependencyFailed {
                        route: route.to_string(),
                        name: provider.name().to_string(),
                        source: e.into(),
                    })?;
                match value {
                    DependencyValue::Text(text) => {
                        self.register(provider.name(), text);
                        Ok(Some(provider.name().to_string()))
                    }
                    DependencyValue::Other(_) => Ok(None),
                }
            }
        }
    }
}

/// What a dependency provider yields.
#[derive(Debug, Clone, PartialEq)]
pub enum DependencyValue {
    /// Registered and forwarded to the engine.
    Text(String),
    /// Kept local; the engine only stores text.
    Other(Value),
}

impl From<String> for DependencyValue {
    fn from(s: String) -> Self {
        DependencyValue::Text(s)
    }
}

impl From<&str> for DependencyValue {
    fn from(s: &str) -> Self {
        DependencyValue::Text(s.to_string())
    }
}

impl From<Value> for DependencyValue {
    fn from(v: Value) -> Self {
        match v {
            Value::String(s) => DependencyValue::Text(s),
            other => DependencyValue::Other(other),
        }
    }
}

type ProduceFn = dyn Fn() -> anyhow::Result<DependencyValue>;

/// A zero-argument producer identified by name.
pub struct Provider {
    name: String,
    produce: Box<ProduceFn>,
}

impl Provider {
    pub fn new<F>(name: impl Into<String>, produce: F) -> Self
    where
        F: Fn() -> anyhow::Result<DependencyValue> + 'static,
    {
        Self {
            name: name.into(),
            produce: Box::new(produce),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn produce(&self) -> anyhow::Result<DependencyValue> {
        (self.produce)()
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// A dependency attached to a route.
#[derive(Debug)]
pub enum Dependency {
    /// Reference to an already registered name.
    Named(String),
    /// Producer invoked when the route is compiled.
    Provided(Provider),
}

impl Dependency {
    pub fn named(name: impl Into<String>) -> Self {
        Dependency::Named(name.into())
    }

    pub fn provided<F>(name: impl Into<String>, produce: F) -> Self
    where
        F: Fn() -> anyhow::Result<DependencyValue> + 'static,
    {
        Dependency::Provided(Provider::new(name, produce))
    }
}

impl From<&str> for Dependency {
    fn from(name: &str) -> Self {
        Dependency::named(name)
    }
}

impl From<String> for Dependency {
    fn from(name: String) -> Self {
        Dependency::Named(name)
    }
}

impl From<Provider> for Dependency {
    fn from(provider: Provider) -> Self {
        Dependency::Provided(provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn register_then_resolve() {
        let mut registry = DependencyRegistry::new();
        assert_eq!(registry.register("db", "conn-string"), None);
        assert_eq!(registry.resolve("db").unwrap(), "conn-string");
    }

    #[test]
    fn resolve_unknown_fails() {
        let registry = DependencyRegistry::new();
        let err = registry.resolve("cache").unwrap_err();
        assert!(matches!(err, CompileError::DependencyNotFound(ref n) if n == "cache"));
    }

    #[test]
    fn reregistration_overwrites_in_place() {
        let mut registry = DependencyRegistry::new();
        registry.register("db", "a");
        registry.register("auth", "token");
        assert_eq!(registry.register("db", "b"), Some("a".to_string()));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.resolve("db").unwrap(), "b");
        let names: Vec<_> = registry.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["db", "auth"]);
    }

    #[test]
    fn attach_named_requires_registration() {
        let mut registry = DependencyRegistry::new();
        let err = registry
            .attach(&Dependency::named("db"), "GET /users")
            .unwrap_err();
        assert!(matches!(err, CompileError::UnresolvedDependency { .. }));
        assert!(err.to_string().contains("GET /users"));

        registry.register("db", "conn");
        assert_eq!(
            registry.attach(&"db".into(), "GET /users").unwrap(),
            Some("db".to_string())
        );
    }

    #[test]
    fn attach_provider_registers_text_value() {
        let mut registry = DependencyRegistry::new();
        let dep = Dependency::provided("get_db", || Ok("postgres://localhost".into()));

        assert_eq!(
            registry.attach(&dep, "GET /items").unwrap(),
            Some("get_db".to_string())
        );
        assert_eq!(registry.resolve("get_db").unwrap(), "postgres://localhost");
    }

    #[test]
    fn attach_provider_with_structured_value_is_not_registered() {
        let mut registry = DependencyRegistry::new();
        let dep = Dependency::provided("settings", || Ok(json!({ "pool": 4 }).into()));

        assert_eq!(registry.attach(&dep, "GET /items").unwrap(), None);
        assert!(!registry.contains("settings"));
    }

    #[test]
    fn attach_provider_failure_is_reported() {
        let mut registry = DependencyRegistry::new();
        let dep = Dependency::provided("flaky", || anyhow::bail!("no connection"));

        let err = registry.attach(&dep, "GET /items").unwrap_err();
        assert!(matches!(err, CompileError::DependencyFailed { .. }));
        assert!(err.to_string().contains("no connection"));
    }
}
