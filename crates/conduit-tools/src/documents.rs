//! Tools reading and deleting documents in a local document store.
//!
//! Both take a `documentPaths` string array and report one result per path,
//! in request order. A failing path does not stop the others.

use async_trait::async_trait;
use conduit_core::{ParamValues, Parameter, Parameters, non_empty_string_array};
use conduit_sources::{DocumentStore, SourceMap};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::error::ToolError;
use crate::tool::{Tool, ToolConfig, ToolMetadata, resolve_source};

pub const GET_KIND: &str = "local-documents-get";
pub const DELETE_KIND: &str = "local-documents-delete";

const DOCUMENT_PATHS: &str = "documentPaths";

const COMPATIBLE_SOURCES: &[&str] = &[conduit_sources::documents::KIND];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Operation {
    #[default]
    Get,
    Delete,
}

impl Operation {
    fn kind(&self) -> &'static str {
        match self {
            Operation::Get => GET_KIND,
            Operation::Delete => DELETE_KIND,
        }
    }

    fn paths_description(&self) -> &'static str {
        match self {
            Operation::Get => {
                "Array of relative document paths to retrieve (e.g. 'users/alice')."
            }
            Operation::Delete => {
                "Array of relative document paths to delete (e.g. 'users/alice')."
            }
        }
    }
}

/// Configuration of a `local-documents-get` or `local-documents-delete` tool.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct DocumentsToolConfig {
    #[serde(skip)]
    pub name: String,

    #[serde(skip)]
    pub operation: Operation,

    pub kind: String,

    pub source: String,

    pub description: String,

    #[serde(default)]
    pub auth_required: Vec<String>,
}

fn decode(
    name: &str,
    node: serde_yaml::Value,
    operation: Operation,
) -> Result<Box<dyn ToolConfig>, serde_yaml::Error> {
    let mut config: DocumentsToolConfig = serde_yaml::from_value(node)?;
    config.name = name.to_string();
    config.operation = operation;
    Ok(Box::new(config))
}

pub fn decode_get(
    name: &str,
    node: serde_yaml::Value,
) -> Result<Box<dyn ToolConfig>, serde_yaml::Error> {
    decode(name, node, Operation::Get)
}

pub fn decode_delete(
    name: &str,
    node: serde_yaml::Value,
) -> Result<Box<dyn ToolConfig>, serde_yaml::Error> {
    decode(name, node, Operation::Delete)
}

impl ToolConfig for DocumentsToolConfig {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        self.operation.kind()
    }

    fn initialize(&self, sources: &SourceMap) -> Result<Arc<dyn Tool>, ToolError> {
        let source = resolve_source(sources, &self.source)?;
        let store = source
            .document_store()
            .cloned()
            .ok_or_else(|| ToolError::incompatible(self.kind(), COMPATIBLE_SOURCES))?;

        let parameters = Parameters::new(vec![Parameter::array(
            DOCUMENT_PATHS,
            self.operation.paths_description(),
            Parameter::string("item", "Relative document path"),
        )])?;
        let metadata =
            ToolMetadata::new(&self.name, &self.description, &self.auth_required, parameters);

        tracing::debug!(
            tool = %self.name,
            kind = self.kind(),
            source = %self.source,
            "initialized tool"
        );
        Ok(Arc::new(DocumentsTool {
            metadata,
            operation: self.operation,
            store,
        }))
    }
}

/// Result of reading one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GetResult {
    pub path: String,
    pub exists: bool,
    pub data: Value,
}

/// Result of deleting one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeleteResult {
    pub path: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug)]
pub struct DocumentsTool {
    metadata: ToolMetadata,
    operation: Operation,
    store: DocumentStore,
}

impl DocumentsTool {
    async fn get(&self, paths: &[String]) -> Result<Value, ToolError> {
        let mut results = Vec::with_capacity(paths.len());
        for path in paths {
            let document = self
                .store
                .get(path)
                .await
                .map_err(|e| ToolError::backend(&self.metadata.name, "get document", e))?;
            results.push(GetResult {
                path: path.clone(),
                exists: document.is_some(),
                data: document.unwrap_or(Value::Null),
            });
        }
        serde_json::to_value(results)
            .map_err(|e| ToolError::backend(&self.metadata.name, "encode results", e))
    }

    async fn delete(&self, paths: &[String]) -> Result<Value, ToolError> {
        let mut results = Vec::with_capacity(paths.len());
        for path in paths {
            let result = match self.store.delete(path).await {
                Ok(()) => DeleteResult {
                    path: path.clone(),
                    success: true,
                    error: None,
                },
                Err(e) => {
                    tracing::warn!(
                        tool = %self.metadata.name,
                        %path,
                        error = %e,
                        "document delete failed"
                    );
                    DeleteResult {
                        path: path.clone(),
                        success: false,
                        error: Some(e.to_string()),
                    }
                }
            };
            results.push(result);
        }
        serde_json::to_value(results)
            .map_err(|e| ToolError::backend(&self.metadata.name, "encode results", e))
    }
}

#[async_trait]
impl Tool for DocumentsTool {
    fn metadata(&self) -> &ToolMetadata {
        &self.metadata
    }

    fn kind(&self) -> &'static str {
        self.operation.kind()
    }

    async fn invoke(&self, params: ParamValues) -> Result<Value, ToolError> {
        let paths = non_empty_string_array(DOCUMENT_PATHS, params.get(DOCUMENT_PATHS))?;
        match self.operation {
            Operation::Get => self.get(&paths).await,
            Operation::Delete => self.delete(&paths).await,
        }
    }
}
