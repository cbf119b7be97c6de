//! Factory system for test data generation
//!
//! A factory declares default attributes; `build` merges those defaults with
//! caller overrides and resolves sequenced attributes through the shared
//! `Sequences` store. Overridden attributes are never resolved, so their
//! sequences do not advance.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value as JsonValue;

use crate::sequences::Sequences;
use crate::{TestError, TestResult};

/// A declared default attribute
#[derive(Clone)]
enum Attribute {
    /// Fixed value
    Value(JsonValue),
    /// Name of a registered sequence, resolved at build time
    Sequence(String),
    /// Computed fresh on every build
    Lazy(Arc<dyn Fn() -> JsonValue + Send + Sync>),
}

/// Default attributes of one factory, in declaration order
#[derive(Clone, Default)]
struct FactoryDefinition {
    attributes: Vec<(String, Attribute)>,
}

/// Declaration block passed to `Factories::define`
pub struct DefinitionBuilder<'a> {
    factory_name: &'a str,
    sequences: &'a Sequences,
    attributes: Vec<(String, Attribute)>,
}

impl DefinitionBuilder<'_> {
    /// Declare a fixed default value
    pub fn set(&mut self, name: &str, value: JsonValue) -> &mut Self {
        self.attributes
            .push((name.to_string(), Attribute::Value(value)));
        self
    }

    /// Declare a sequenced attribute; the counter is scoped to this factory
    pub fn sequence<F>(&mut self, name: &str, template: F) -> &mut Self
    where
        F: Fn(u64) -> JsonValue + Send + Sync + 'static,
    {
        let key = format!("{}.{}", self.factory_name, name);
        self.sequences.register(&key, template);
        self.attributes
            .push((name.to_string(), Attribute::Sequence(key)));
        self
    }

    /// Declare an attribute computed fresh on every build
    pub fn lazy<F>(&mut self, name: &str, value: F) -> &mut Self
    where
        F: Fn() -> JsonValue + Send + Sync + 'static,
    {
        self.attributes
            .push((name.to_string(), Attribute::Lazy(Arc::new(value))));
        self
    }
}

/// The attribute map a factory build produces
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes {
    values: HashMap<String, JsonValue>,
}

impl Attributes {
    pub fn get(&self, name: &str) -> Option<&JsonValue> {
        self.values.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(|v| v.as_str())
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.values.get(name).and_then(|v| v.as_i64())
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.values.get(name).and_then(|v| v.as_bool())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_inner(self) -> HashMap<String, JsonValue> {
        self.values
    }
}

/// Registry of named factories sharing one sequence store
pub struct Factories {
    sequences: Arc<Sequences>,
    definitions: Mutex<HashMap<String, FactoryDefinition>>,
}

impl Factories {
    pub fn new() -> Self {
        Self::with_sequences(Arc::new(Sequences::new()))
    }

    /// Share an existing sequence store, e.g. one owned by the test harness
    pub fn with_sequences(sequences: Arc<Sequences>) -> Self {
        Self {
            sequences,
            definitions: Mutex::new(HashMap::new()),
        }
    }

    pub fn sequences(&self) -> &Sequences {
        self.sequences.as_ref()
    }

    /// Lock the definitions.
    ///
    /// # Panics
    /// Panics if the lock is poisoned.
    fn definitions(&self) -> MutexGuard<'_, HashMap<String, FactoryDefinition>> {
        self.definitions.lock().unwrap()
    }

    /// Declare a factory. Redefining a name replaces its attributes.
    pub fn define<F>(&self, name: &str, callback: F)
    where
        F: FnOnce(&mut DefinitionBuilder),
    {
        let mut builder = DefinitionBuilder {
            factory_name: name,
            sequences: self.sequences.as_ref(),
            attributes: Vec::new(),
        };
        callback(&mut builder);

        self.definitions().insert(
            name.to_string(),
            FactoryDefinition {
                attributes: builder.attributes,
            },
        );
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.definitions().contains_key(name)
    }

    /// Build an attribute map: declared defaults merged with `overrides`
    ///
    /// Overrides win; a default that is overridden is not resolved at all, so
    /// sequenced attributes only advance when they actually produce a value.
    pub fn build(
        &self,
        name: &str,
        overrides: HashMap<String, JsonValue>,
    ) -> TestResult<Attributes> {
        let definition = self
            .definitions()
            .get(name)
            .cloned()
            .ok_or_else(|| TestError::UnknownFactory(name.to_string()))?;

        tracing::debug!(factory = name, overrides = overrides.len(), "building attributes");

        let mut values = HashMap::with_capacity(definition.attributes.len() + overrides.len());
        for (attr_name, attribute) in &definition.attributes {
            if overrides.contains_key(attr_name) {
                continue;
            }
            let value = match attribute {
                Attribute::Value(value) => value.clone(),
                Attribute::Sequence(key) => self.sequences.next(key)?,
                Attribute::Lazy(compute) => compute(),
            };
            values.insert(attr_name.clone(), value);
        }
        values.extend(overrides);

        Ok(Attributes { values })
    }

    /// Fluent override builder for a named factory
    pub fn builder(&self, name: &str) -> FactoryBuilder<'_> {
        FactoryBuilder {
            factories: self,
            name: name.to_string(),
            overrides: HashMap::new(),
        }
    }
}

impl Default for Factories {
    fn default() -> Self {
        Self::new()
    }
}

/// Fluent override layer over `Factories::build`
pub struct FactoryBuilder<'a> {
    factories: &'a Factories,
    name: String,
    overrides: HashMap<String, JsonValue>,
}

impl FactoryBuilder<'_> {
    /// Override an attribute value
    pub fn with<V: serde::Serialize>(mut self, key: &str, value: V) -> Self {
        if let Ok(json_value) = serde_json::to_value(value) {
            self.overrides.insert(key.to_string(), json_value);
        }
        self
    }

    /// Build a single attribute map
    pub fn build(self) -> TestResult<Attributes> {
        self.factories.build(&self.name, self.overrides)
    }

    /// Build several attribute maps, each resolving sequences independently
    pub fn build_many(self, count: usize) -> TestResult<Vec<Attributes>> {
        let mut results = Vec::with_capacity(count);
        for _ in 0..count {
            results.push(
                self.factories
                    .build(&self.name, self.overrides.clone())?,
            );
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dummy_factories() -> Factories {
        let factories = Factories::new();
        factories.define("dummy", |f| {
            f.set("name", json!("MyString"));
            f.set("age", json!(1));
            f.set("dob", json!("2023-05-16 15:51:47"));
            f.sequence("email", |n| json!(format!("my-{}@email.com", n)));
        });
        factories
    }

    #[test]
    fn test_build_applies_defaults() {
        let factories = dummy_factories();
        let dummy = factories.build("dummy", HashMap::new()).unwrap();

        assert_eq!(dummy.get_str("name"), Some("MyString"));
        assert_eq!(dummy.get_i64("age"), Some(1));
        assert_eq!(dummy.get_str("email"), Some("my-1@email.com"));
    }

    #[test]
    fn test_overrides_win_over_defaults() {
        let factories = dummy_factories();
        let dummy = factories.builder("dummy").with("age", 22).build().unwrap();

        assert_eq!(dummy.get_i64("age"), Some(22));
        assert_eq!(dummy.get_str("name"), Some("MyString"));
    }

    #[test]
    fn test_overridden_sequence_does_not_advance() {
        let factories = dummy_factories();
        factories
            .builder("dummy")
            .with("email", "fixed@email.com")
            .build()
            .unwrap();

        let dummy = factories.build("dummy", HashMap::new()).unwrap();
        assert_eq!(dummy.get_str("email"), Some("my-1@email.com"));
    }

    #[test]
    fn test_extra_override_keys_are_kept() {
        let factories = dummy_factories();
        let dummy = factories
            .builder("dummy")
            .with("nickname", "dum")
            .build()
            .unwrap();
        assert_eq!(dummy.get_str("nickname"), Some("dum"));
    }

    #[test]
    fn test_unknown_factory_fails_fast() {
        let factories = dummy_factories();
        let err = factories.build("ghost", HashMap::new()).unwrap_err();
        assert!(matches!(err, TestError::UnknownFactory(name) if name == "ghost"));
    }

    #[test]
    fn test_lazy_attributes_compute_per_build() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let calls = Arc::new(AtomicUsize::new(0));
        let factories = Factories::new();
        let counter = Arc::clone(&calls);
        factories.define("event", |f| {
            f.lazy("payload", move || {
                counter.fetch_add(1, Ordering::SeqCst);
                json!({"kind": "test"})
            });
        });

        factories.build("event", HashMap::new()).unwrap();
        factories.build("event", HashMap::new()).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
