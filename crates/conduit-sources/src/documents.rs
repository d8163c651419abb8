//! Local document store: JSON documents kept as files under a root directory.
//!
//! A document path such as `users/alice` is stored at `<root>/users/alice.json`.
//! Paths are relative, `/`-separated, and may not contain empty, `.` or `..`
//! segments.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::DocumentError;
use crate::source::{Source, SourceConfig};

pub const KIND: &str = "local-documents";

/// Configuration of a `local-documents` source.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct DocumentsConfig {
    #[serde(skip)]
    pub name: String,

    pub kind: String,

    /// Directory holding the documents.
    pub root: PathBuf,

    /// Create `root` if it does not exist.
    #[serde(default)]
    pub create: bool,
}

pub fn decode(
    name: &str,
    node: serde_yaml::Value,
) -> Result<Box<dyn SourceConfig>, serde_yaml::Error> {
    let mut config: DocumentsConfig = serde_yaml::from_value(node)?;
    config.name = name.to_string();
    Ok(Box::new(config))
}

#[async_trait]
impl SourceConfig for DocumentsConfig {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        KIND
    }

    async fn initialize(&self) -> anyhow::Result<Arc<dyn Source>> {
        match tokio::fs::metadata(&self.root).await {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => anyhow::bail!("root {} is not a directory", self.root.display()),
            Err(e) if e.kind() == ErrorKind::NotFound && self.create => {
                tokio::fs::create_dir_all(&self.root).await?;
            }
            Err(e) => {
                return Err(anyhow::anyhow!(e)
                    .context(format!("cannot open root {}", self.root.display())));
            }
        }

        tracing::debug!(source = %self.name, root = %self.root.display(), "opened document store");
        Ok(Arc::new(DocumentsSource {
            name: self.name.clone(),
            store: DocumentStore::new(self.root.clone()),
        }))
    }
}

/// JSON documents stored as files.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    root: PathBuf,
}

impl DocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, DocumentError> {
        let invalid = |reason| DocumentError::InvalidPath {
            path: path.to_string(),
            reason,
        };
        if path.is_empty() {
            return Err(invalid("path is empty"));
        }
        if path.starts_with('/') {
            return Err(invalid("path must be relative"));
        }
        if path.contains('\\') {
            return Err(invalid("path must use '/' separators"));
        }

        let mut file = self.root.clone();
        for segment in path.split('/') {
            match segment {
                "" => return Err(invalid("path contains an empty segment")),
                "." | ".." => return Err(invalid("path may not contain '.' or '..'")),
                _ => file.push(segment),
            }
        }
        let mut file = file.into_os_string();
        file.push(".json");
        Ok(file.into())
    }

    /// Read a document. `None` if it does not exist.
    pub async fn get(&self, path: &str) -> Result<Option<Value>, DocumentError> {
        let file = self.resolve(path)?;
        let raw = match tokio::fs::read(&file).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(DocumentError::Io {
                    path: path.to_string(),
                    source,
                });
            }
        };
        serde_json::from_slice(&raw)
            .map(Some)
            .map_err(|source| DocumentError::Json {
                path: path.to_string(),
                source,
            })
    }

    /// Create or replace a document.
    pub async fn put(&self, path: &str, document: &Value) -> Result<(), DocumentError> {
        let file = self.resolve(path)?;
        let io_err = |source| DocumentError::Io {
            path: path.to_string(),
            source,
        };
        if let Some(parent) = file.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        let raw = serde_json::to_vec_pretty(document).map_err(|source| DocumentError::Json {
            path: path.to_string(),
            source,
        })?;
        tokio::fs::write(&file, raw).await.map_err(io_err)
    }

    /// Delete a document. Deleting a missing document succeeds.
    pub async fn delete(&self, path: &str) -> Result<(), DocumentError> {
        let file = self.resolve(path)?;
        match tokio::fs::remove_file(&file).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(DocumentError::Io {
                path: path.to_string(),
                source,
            }),
        }
    }
}

/// An initialized `local-documents` source.
#[derive(Debug, Clone)]
pub struct DocumentsSource {
    name: String,
    store: DocumentStore,
}

impl DocumentsSource {
    pub fn new(name: &str, store: DocumentStore) -> Self {
        Self {
            name: name.to_string(),
            store,
        }
    }
}

impl Source for DocumentsSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        KIND
    }

    fn document_store(&self) -> Option<&DocumentStore> {
        Some(&self.store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_put_get_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::new(dir.path());

        store
            .put("users/alice", &json!({"name": "Alice"}))
            .await
            .unwrap();
        assert!(dir.path().join("users").join("alice.json").exists());
        assert_eq!(
            store.get("users/alice").await.unwrap(),
            Some(json!({"name": "Alice"}))
        );

        store.delete("users/alice").await.unwrap();
        assert_eq!(store.get("users/alice").await.unwrap(), None);
        // Deleting again is not an error.
        store.delete("users/alice").await.unwrap();
    }

    #[tokio::test]
    async fn test_rejects_unsafe_paths() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::new(dir.path());

        for path in ["", "/etc/passwd", "users/../secret", "users//alice", "a\\b"] {
            let err = store.get(path).await.unwrap_err();
            assert!(
                matches!(err, DocumentError::InvalidPath { .. }),
                "{path} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_invalid_json_document() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.json"), "{not json").unwrap();
        let store = DocumentStore::new(dir.path());
        assert!(matches!(
            store.get("broken").await.unwrap_err(),
            DocumentError::Json { .. }
        ));
    }

    #[tokio::test]
    async fn test_initialize_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("docs");

        let mut config = DocumentsConfig {
            name: "docs".to_string(),
            kind: KIND.to_string(),
            root: root.clone(),
            create: false,
        };
        assert!(config.initialize().await.is_err());

        config.create = true;
        let source = config.initialize().await.unwrap();
        assert!(root.is_dir());
        assert!(source.document_store().is_some());
        assert!(source.redis_store().is_none());
    }
}
