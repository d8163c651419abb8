//! Kind-keyed tool factories.

use conduit_sources::RegistryError;
use std::collections::BTreeMap;

use crate::error::ToolError;
use crate::tool::ToolConfig;
use crate::{documents, redis, sql};

/// Decodes the configuration node of one tool kind.
pub type ToolFactory =
    fn(name: &str, node: serde_yaml::Value) -> Result<Box<dyn ToolConfig>, serde_yaml::Error>;

/// Maps tool kinds to their configuration factories.
#[derive(Debug, Default, Clone)]
pub struct ToolRegistry {
    factories: BTreeMap<String, ToolFactory>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in tool kind.
    pub fn builtin() -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        register_builtin(&mut registry)?;
        Ok(registry)
    }

    /// Register a factory. Returns `false` and keeps the existing factory if
    /// the kind is already registered.
    pub fn register(&mut self, kind: &str, factory: ToolFactory) -> bool {
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

    /// Decode the configuration of tool `name` using the factory for `kind`.
    pub fn decode_config(
        &self,
        kind: &str,
        name: &str,
        node: serde_yaml::Value,
    ) -> Result<Box<dyn ToolConfig>, ToolError> {
        let factory = self
            .factories
            .get(kind)
            .ok_or_else(|| ToolError::UnknownKind {
                kind: kind.to_string(),
            })?;
        factory(name, node).map_err(|source| ToolError::Decode {
            name: name.to_string(),
            kind: kind.to_string(),
            source,
        })
    }
}

/// Register every built-in tool kind. A duplicate kind aborts startup.
pub fn register_builtin(registry: &mut ToolRegistry) -> Result<(), RegistryError> {
    let builtin: [(&str, ToolFactory); 7] = [
        (sql::POSTGRES_SQL, sql::decode_postgres_sql),
        (sql::POSTGRES_EXECUTE_SQL, sql::decode_postgres_execute_sql),
        (sql::SQLITE_SQL, sql::decode_sqlite_sql),
        (sql::SQLITE_EXECUTE_SQL, sql::decode_sqlite_execute_sql),
        (documents::GET_KIND, documents::decode_get),
        (documents::DELETE_KIND, documents::decode_delete),
        (redis::KIND, redis::decode),
    ];
    for (kind, factory) in builtin {
        if !registry.register(kind, factory) {
            return Err(RegistryError::DuplicateKind {
                registry: "tool",
                kind: kind.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_duplicate_returns_false() {
        let mut registry = ToolRegistry::new();
        assert!(registry.register(redis::KIND, redis::decode));
        assert!(!registry.register(redis::KIND, documents::decode_get));
        assert_eq!(registry.kinds().count(), 1);
    }

    #[test]
    fn test_builtin_registers_all_kinds() {
        let registry = ToolRegistry::builtin().unwrap();
        for kind in [
            "postgres-sql",
            "postgres-execute-sql",
            "sqlite-sql",
            "sqlite-execute-sql",
            "local-documents-get",
            "local-documents-delete",
            "redis",
        ] {
            assert!(registry.contains(kind), "{kind} missing");
        }
    }

    #[test]
    fn test_unknown_kind() {
        let registry = ToolRegistry::builtin().unwrap();
        let node: serde_yaml::Value = serde_yaml::from_str("kind: http\n").unwrap();
        let err = registry.decode_config("http", "t", node).unwrap_err();
        assert_eq!(err.to_string(), "unknown tool kind: \"http\"");
    }

    #[test]
    fn test_decode_error_names_tool_and_kind() {
        let registry = ToolRegistry::builtin().unwrap();
        let node: serde_yaml::Value =
            serde_yaml::from_str("kind: sqlite-sql\nsource: db\ndescription: d\n").unwrap();
        let err = registry.decode_config("sqlite-sql", "search", node).unwrap_err();
        assert!(
            err.to_string()
                .starts_with("unable to parse tool \"search\" as kind \"sqlite-sql\":")
        );
    }
}
