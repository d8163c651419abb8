//! Named groups of tools and their manifests.

use conduit_core::{Manifest, is_valid_name};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

use crate::tool::{Tool, ToolMap};

/// Errors raised while building toolsets.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolsetError {
    #[error("invalid toolset name: \"{name}\"")]
    InvalidName { name: String },

    #[error("toolset \"{toolset}\" references unknown tool \"{tool}\"")]
    UnknownTool { toolset: String, tool: String },
}

/// Manifest served for a toolset.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolsetManifest {
    pub server_version: String,
    pub tools: BTreeMap<String, Manifest>,
}

/// A named list of tool names from the tools file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolsetConfig {
    pub name: String,
    pub tool_names: Vec<String>,
}

impl ToolsetConfig {
    pub fn new(name: impl Into<String>, tool_names: Vec<String>) -> Self {
        Self {
            name: name.into(),
            tool_names,
        }
    }

    /// Resolve every tool name against the initialized tools.
    pub fn initialize(
        &self,
        server_version: &str,
        tools: &ToolMap,
    ) -> Result<Toolset, ToolsetError> {
        if !is_valid_name(&self.name) {
            return Err(ToolsetError::InvalidName {
                name: self.name.clone(),
            });
        }

        let mut members = Vec::with_capacity(self.tool_names.len());
        let mut manifests = BTreeMap::new();
        for tool_name in &self.tool_names {
            let tool = tools.get(tool_name).ok_or_else(|| ToolsetError::UnknownTool {
                toolset: self.name.clone(),
                tool: tool_name.clone(),
            })?;
            manifests.insert(tool_name.clone(), tool.manifest().clone());
            members.push(Arc::clone(tool));
        }

        Ok(Toolset {
            name: self.name.clone(),
            tools: members,
            manifest: ToolsetManifest {
                server_version: server_version.to_string(),
                tools: manifests,
            },
        })
    }
}

/// An initialized toolset.
#[derive(Debug, Clone)]
pub struct Toolset {
    pub name: String,
    pub tools: Vec<Arc<dyn Tool>>,
    pub manifest: ToolsetManifest,
}

/// The toolset named `""` that every server exposes, holding all tools.
pub fn default_toolset_config(tools: &ToolMap) -> ToolsetConfig {
    let mut names: Vec<String> = tools.keys().cloned().collect();
    names.sort();
    ToolsetConfig::new("", names)
}
