//! `conduit list` and `conduit mcp-list`.

use anyhow::{Result, anyhow};
use conduit_runtime::Gateway;
use serde_json::json;

fn unknown_toolset(name: &str) -> anyhow::Error {
    anyhow!("toolset \"{name}\" does not exist")
}

/// Print the toolset manifest: `{serverVersion, tools: {name: manifest}}`.
pub fn run_manifest(gateway: &Gateway, toolset: &str) -> Result<()> {
    let toolset = gateway
        .toolset(toolset)
        .ok_or_else(|| unknown_toolset(toolset))?;
    println!("{}", serde_json::to_string_pretty(&toolset.manifest)?);
    Ok(())
}

/// Print the MCP `tools/list` result for a toolset.
pub fn run_mcp(gateway: &Gateway, toolset: &str) -> Result<()> {
    let tools = gateway
        .mcp_tools(toolset)
        .ok_or_else(|| unknown_toolset(toolset))?;
    println!("{}", serde_json::to_string_pretty(&json!({ "tools": tools }))?);
    Ok(())
}
