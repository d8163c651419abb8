//! Kind-keyed source factories.

use std::collections::BTreeMap;

use crate::error::{RegistryError, SourceError};
use crate::source::SourceConfig;
use crate::{documents, postgres, redis, sqlite};

/// Decodes the configuration node of one source kind.
pub type SourceFactory =
    fn(name: &str, node: serde_yaml::Value) -> Result<Box<dyn SourceConfig>, serde_yaml::Error>;

/// Maps source kinds to their configuration factories.
///
/// Built once at startup and read-only afterwards.
#[derive(Debug, Default, Clone)]
pub struct SourceRegistry {
    factories: BTreeMap<String, SourceFactory>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in source kind.
    pub fn builtin() -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        register_builtin(&mut registry)?;
        Ok(registry)
    }

    /// Register a factory. Returns `false` and keeps the existing factory if
    /// the kind is already registered.
    pub fn register(&mut self, kind: &str, factory: SourceFactory) -> bool {
        if self.factories.contains_key(kind) {
            return false;
        }
        self.factories.insert(kind.to_string(), factory);
        true
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Decode the configuration of source `name` using the factory for `kind`.
    pub fn decode_config(
        &self,
        kind: &str,
        name: &str,
        node: serde_yaml::Value,
    ) -> Result<Box<dyn SourceConfig>, SourceError> {
        let factory = self
            .factories
            .get(kind)
            .ok_or_else(|| SourceError::UnknownKind {
                kind: kind.to_string(),
            })?;
        factory(name, node).map_err(|source| SourceError::Decode {
            name: name.to_string(),
            kind: kind.to_string(),
            source,
        })
    }
}

/// Register every built-in source kind. A duplicate kind aborts startup.
pub fn register_builtin(registry: &mut SourceRegistry) -> Result<(), RegistryError> {
    let builtin: [(&str, SourceFactory); 4] = [
        (postgres::KIND, postgres::decode),
        (sqlite::KIND, sqlite::decode),
        (documents::KIND, documents::decode),
        (redis::KIND, redis::decode),
    ];
    for (kind, factory) in builtin {
        if !registry.register(kind, factory) {
            return Err(RegistryError::DuplicateKind {
                registry: "source",
                kind: kind.to_string(),
            });
        }
    }
    Ok(())
}
