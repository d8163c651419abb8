//! `redis`: sends a fixed list of commands to a redis source with parameters
//! substituted into them.
//!
//! ```yaml
//! tools:
//!   tag-user:
//!     kind: redis
//!     source: cache
//!     description: Store tags for a user.
//!     commands:
//!       - [SET, $user, seen]
//!       - [RPUSH, tags, $tags]
//!     parameters:
//!       - name: user
//!         type: string
//!         description: User id
//!       - name: tags
//!         type: array
//!         description: Tags to append
//!         items:
//!           type: string
//! ```
//!
//! A command part equal to `$<name>` is replaced by the parameter's value;
//! an array value expands into one part per element. Each command is
//! attempted; a failing command leaves its error message in its slot.

use async_trait::async_trait;
use conduit_core::{ParamValues, Parameters};
use conduit_sources::{RedisStore, SourceMap};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::error::ToolError;
use crate::tool::{Tool, ToolConfig, ToolMetadata, resolve_source};

pub const KIND: &str = "redis";

const COMPATIBLE_SOURCES: &[&str] = &[conduit_sources::redis::KIND];

/// Configuration of a `redis` tool.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct RedisToolConfig {
    #[serde(skip)]
    pub name: String,

    pub kind: String,

    pub source: String,

    pub description: String,

    pub commands: Vec<Vec<String>>,

    #[serde(default)]
    pub parameters: Parameters,

    #[serde(default)]
    pub auth_required: Vec<String>,
}

pub fn decode(
    name: &str,
    node: serde_yaml::Value,
) -> Result<Box<dyn ToolConfig>, serde_yaml::Error> {
    let mut config: RedisToolConfig = serde_yaml::from_value(node)?;
    config.name = name.to_string();
    Ok(Box::new(config))
}

impl ToolConfig for RedisToolConfig {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        KIND
    }

    fn initialize(&self, sources: &SourceMap) -> Result<Arc<dyn Tool>, ToolError> {
        let store = resolve_source(sources, &self.source)?
            .redis_store()
            .ok_or_else(|| ToolError::incompatible(KIND, COMPATIBLE_SOURCES))?
            .clone();
        if let Some(index) = self.commands.iter().position(Vec::is_empty) {
            return Err(ToolError::InvalidConfig {
                name: self.name.clone(),
                reason: format!("command at index {index} is empty"),
            });
        }

        let metadata = ToolMetadata::new(
            &self.name,
            &self.description,
            &self.auth_required,
            self.parameters.clone(),
        );

        tracing::debug!(
            tool = %self.name,
            kind = KIND,
            source = %self.source,
            "initialized tool"
        );
        Ok(Arc::new(RedisTool {
            metadata,
            store,
            commands: self.commands.clone(),
        }))
    }
}

#[derive(Debug)]
pub struct RedisTool {
    metadata: ToolMetadata,
    store: RedisStore,
    commands: Vec<Vec<String>>,
}

/// Render a parameter value as a single command part.
fn as_part(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Substitute `$name` placeholders in every command.
fn replace_command_params(
    commands: &[Vec<String>],
    values: &Map<String, Value>,
) -> Vec<Vec<String>> {
    commands
        .iter()
        .map(|command| {
            let mut parts = Vec::with_capacity(command.len());
            for part in command {
                match values.get(part) {
                    Some(Value::Array(items)) => parts.extend(items.iter().map(as_part)),
                    Some(value) => parts.push(as_part(value)),
                    None => parts.push(part.clone()),
                }
            }
            parts
        })
        .collect()
}

#[async_trait]
impl Tool for RedisTool {
    fn metadata(&self) -> &ToolMetadata {
        &self.metadata
    }

    fn kind(&self) -> &'static str {
        KIND
    }

    async fn invoke(&self, params: ParamValues) -> Result<Value, ToolError> {
        let commands = replace_command_params(&self.commands, &params.as_map_with_dollar_prefix());

        let mut results = Vec::with_capacity(commands.len());
        for (index, command) in commands.iter().enumerate() {
            match self.store.execute(command).await {
                Ok(reply) => results.push(reply),
                Err(e) => {
                    tracing::debug!(
                        tool = %self.metadata.name,
                        index,
                        error = %e,
                        "command failed"
                    );
                    results.push(Value::from(format!(
                        "error from executing command at index {index}: {e}"
                    )));
                }
            }
        }
        Ok(Value::Array(results))
    }
}
