//! `conduit validate` command implementation.
//!
//! Without a gateway only decoding and cross-references are checked. With
//! one, every tool's MCP input schema is also compiled as JSON Schema.

use anyhow::{Result, bail};
use conduit_runtime::{Gateway, ToolsFile};

/// A problem found in the loaded tools files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub location: String,
    pub message: String,
}

impl Finding {
    fn new(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            message: message.into(),
        }
    }
}

/// Cross-reference checks that need no backend.
pub fn check_references(tools_file: &ToolsFile) -> Vec<Finding> {
    let mut findings = Vec::new();
    for (toolset, tool_names) in &tools_file.toolsets {
        for tool in tool_names {
            if !tools_file.tools.contains_key(tool) {
                findings.push(Finding::new(
                    format!("toolsets.{toolset}"),
                    format!("tool \"{tool}\" does not exist"),
                ));
            }
        }
    }
    findings
}

/// Compile every tool's MCP input schema.
pub fn check_schemas(gateway: &Gateway) -> Vec<Finding> {
    let mut findings = Vec::new();
    let Some(tools) = gateway.mcp_tools("") else {
        return findings;
    };
    for tool in tools {
        let schema = match serde_json::to_value(&tool.input_schema) {
            Ok(schema) => schema,
            Err(e) => {
                findings.push(Finding::new(format!("tools.{}", tool.name), e.to_string()));
                continue;
            }
        };
        if let Err(e) = jsonschema::validator_for(&schema) {
            findings.push(Finding::new(
                format!("tools.{}", tool.name),
                format!("invalid input schema: {e}"),
            ));
        }
    }
    findings
}

pub fn run(tools_file: &ToolsFile, gateway: Option<&Gateway>) -> Result<()> {
    let mut findings = check_references(tools_file);
    if let Some(gateway) = gateway {
        findings.extend(check_schemas(gateway));
    }

    if !findings.is_empty() {
        for finding in &findings {
            eprintln!("{}: {}", finding.location, finding.message);
        }
        bail!("{} problem(s) found", findings.len());
    }

    println!(
        "ok: {} source(s), {} tool(s), {} toolset(s)",
        tools_file.sources.len(),
        tools_file.tools.len(),
        tools_file.toolsets.len()
    );
    Ok(())
}
