//! The initialized gateway and its request path.

use conduit_core::{Claims, McpManifest, ParameterError};
use conduit_sources::{SourceMap, initialize_source};
use conduit_tools::{Tool, ToolError, ToolMap, Toolset, ToolsetConfig, default_toolset_config};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

use crate::config::{ConfigError, ToolsFile};

/// Errors raised on the request path.
#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("tool \"{0}\" not found")]
    ToolNotFound(String),

    #[error("tool invocation not authorized. Please make sure you specify correct auth headers")]
    Unauthorized,

    #[error("provided parameters were invalid: {0}")]
    Parameters(#[source] ParameterError),

    #[error("error while invoking tool: {0}")]
    Tool(#[source] ToolError),
}

/// Sources, tools and toolsets ready to serve requests.
#[derive(Debug)]
pub struct Gateway {
    version: String,
    sources: SourceMap,
    tools: ToolMap,
    toolsets: BTreeMap<String, Toolset>,
}

impl Gateway {
    /// Initialize every source, then every tool, then every toolset.
    ///
    /// Any failure aborts initialization.
    pub async fn initialize(tools_file: &ToolsFile, version: &str) -> Result<Self, ConfigError> {
        let mut sources = SourceMap::new();
        for (name, config) in &tools_file.sources {
            let source = initialize_source(config.as_ref()).await?;
            sources.insert(name.clone(), source);
        }

        let mut tools = ToolMap::new();
        for (name, config) in &tools_file.tools {
            let tool = config.initialize(&sources)?;
            tools.insert(name.clone(), tool);
        }

        let mut toolsets = BTreeMap::new();
        let default = default_toolset_config(&tools);
        toolsets.insert(default.name.clone(), default.initialize(version, &tools)?);
        for (name, tool_names) in &tools_file.toolsets {
            let config = ToolsetConfig::new(name.as_str(), tool_names.clone());
            toolsets.insert(name.clone(), config.initialize(version, &tools)?);
        }

        tracing::info!(
            sources = sources.len(),
            tools = tools.len(),
            toolsets = toolsets.len(),
            "gateway initialized"
        );
        Ok(Self {
            version: version.to_string(),
            sources,
            tools,
            toolsets,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn sources(&self) -> &SourceMap {
        &self.sources
    }

    pub fn tool(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    /// Tool names in sorted order.
    pub fn tool_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// A toolset by name; `""` is the toolset holding every tool.
    pub fn toolset(&self, name: &str) -> Option<&Toolset> {
        self.toolsets.get(name)
    }

    /// MCP manifests of a toolset's tools, sorted by tool name.
    pub fn mcp_tools(&self, toolset: &str) -> Option<Vec<McpManifest>> {
        let toolset = self.toolsets.get(toolset)?;
        let mut manifests: Vec<McpManifest> = toolset
            .tools
            .iter()
            .map(|tool| tool.mcp_manifest().clone())
            .collect();
        manifests.sort_by(|a, b| a.name.cmp(&b.name));
        Some(manifests)
    }

    /// Look up, authorize, parse and invoke a tool.
    pub async fn invoke(
        &self,
        tool_name: &str,
        data: &Map<String, Value>,
        claims: &Claims,
        verified_auth_services: &[String],
    ) -> Result<Value, InvokeError> {
        let tool = self
            .tools
            .get(tool_name)
            .ok_or_else(|| InvokeError::ToolNotFound(tool_name.to_string()))?;

        if !tool.authorized(verified_auth_services) {
            tracing::debug!(tool = tool_name, "tool invocation not authorized");
            return Err(InvokeError::Unauthorized);
        }

        let params = tool
            .parse_params(data, claims)
            .map_err(InvokeError::Parameters)?;
        tracing::debug!(tool = tool_name, params = params.len(), "invoking tool");

        tool.invoke(params).await.map_err(|e| match e {
            ToolError::Parameter(e) => InvokeError::Parameters(e),
            other => InvokeError::Tool(other),
        })
    }
}
