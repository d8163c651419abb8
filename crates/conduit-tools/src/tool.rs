//! The tool configuration and invocation traits.

use async_trait::async_trait;
use conduit_core::{
    Claims, Manifest, McpManifest, McpToolsSchema, ParamValues, ParameterError,
    ParameterManifest, Parameters, is_authorized, parse_params,
};
use conduit_sources::{Source, SourceMap};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::ToolError;

/// Initialized tools by name.
pub type ToolMap = HashMap<String, Arc<dyn Tool>>;

/// A decoded, not yet initialized tool configuration.
pub trait ToolConfig: Send + Sync + fmt::Debug {
    /// Tool name (the key under `tools`).
    fn name(&self) -> &str;

    fn kind(&self) -> &'static str;

    /// Bind the tool to its source. Performs no I/O.
    fn initialize(&self, sources: &SourceMap) -> Result<Arc<dyn Tool>, ToolError>;
}

/// A ready-to-invoke tool. Immutable after initialization.
#[async_trait]
pub trait Tool: Send + Sync + fmt::Debug {
    fn metadata(&self) -> &ToolMetadata;

    fn kind(&self) -> &'static str;

    /// Run the tool with parsed parameters.
    async fn invoke(&self, params: ParamValues) -> Result<Value, ToolError>;

    fn name(&self) -> &str {
        &self.metadata().name
    }

    /// Parse request arguments against the tool's parameters.
    fn parse_params(
        &self,
        data: &Map<String, Value>,
        claims: &Claims,
    ) -> Result<ParamValues, ParameterError> {
        parse_params(&self.metadata().parameters, data, claims)
    }

    fn manifest(&self) -> &Manifest {
        &self.metadata().manifest
    }

    fn mcp_manifest(&self) -> &McpManifest {
        &self.metadata().mcp_manifest
    }

    /// Whether a caller with the given verified auth services may invoke the tool.
    fn authorized(&self, verified_auth_services: &[String]) -> bool {
        is_authorized(&self.metadata().auth_required, verified_auth_services)
    }
}

/// Name, parameters and manifests shared by every tool kind.
#[derive(Debug, Clone)]
pub struct ToolMetadata {
    pub name: String,
    pub description: String,
    pub auth_required: Vec<String>,
    /// Every parameter the tool parses, in binding order.
    pub parameters: Parameters,
    pub manifest: Manifest,
    pub mcp_manifest: McpManifest,
}

impl ToolMetadata {
    /// Metadata whose manifests are derived directly from `parameters`.
    pub fn new(
        name: &str,
        description: &str,
        auth_required: &[String],
        parameters: Parameters,
    ) -> Self {
        let manifest = parameters.manifest();
        let schema = parameters.mcp_manifest();
        Self::with_manifests(name, description, auth_required, parameters, manifest, schema)
    }

    /// Metadata with precomputed manifests, e.g. from `process_parameters`.
    pub fn with_manifests(
        name: &str,
        description: &str,
        auth_required: &[String],
        parameters: Parameters,
        parameter_manifest: Vec<ParameterManifest>,
        mcp_schema: McpToolsSchema,
    ) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            auth_required: auth_required.to_vec(),
            parameters,
            manifest: Manifest::new(description, parameter_manifest, auth_required),
            mcp_manifest: McpManifest::new(name, description, mcp_schema),
        }
    }
}

/// Look up the source a tool is bound to.
pub fn resolve_source<'a>(
    sources: &'a SourceMap,
    source_name: &str,
) -> Result<&'a Arc<dyn Source>, ToolError> {
    sources.get(source_name).ok_or_else(|| ToolError::NoSuchSource {
        source_name: source_name.to_string(),
    })
}
