//! Statement templates and combined parameter lists.
//!
//! Template parameters are substituted into the statement text before the
//! remaining parameters are bound by the driver. Only two actions exist:
//!
//! - `{{.name}}` inserts the value of a scalar template parameter
//! - `{{array .name}}` inserts a string array joined with `", "`

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

use crate::convert::convert_array_param_to_string;
use crate::error::ParameterError;
use crate::manifest::{McpToolsSchema, ParameterManifest};
use crate::parameters::Parameters;
use crate::values::get_params;

fn action_regex() -> &'static Regex {
    static ACTION: OnceLock<Regex> = OnceLock::new();
    ACTION.get_or_init(|| {
        Regex::new(r"^\s*(?:(array)\s+)?\.([A-Za-z0-9_]+)\s*$").expect("action pattern is valid")
    })
}

/// Substitute template parameter values into `statement`.
///
/// Every declared template parameter must have a value in `values`, and every
/// action must reference a declared template parameter.
pub fn resolve_template_params(
    template_params: &Parameters,
    statement: &str,
    values: &Map<String, Value>,
) -> Result<String, ParameterError> {
    let template_values = get_params(template_params, values)?.as_map();

    let mut resolved = String::with_capacity(statement.len());
    let mut rest = statement;
    while let Some(start) = rest.find("{{") {
        resolved.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];
        let Some(end) = after_open.find("}}") else {
            return Err(ParameterError::InvalidTemplate {
                reason: "unclosed action".to_string(),
            });
        };
        let action = &after_open[..end];
        resolved.push_str(&render_action(action, &template_values)?);
        rest = &after_open[end + 2..];
    }
    resolved.push_str(rest);

    tracing::debug!(statement = %resolved, "resolved statement template");
    Ok(resolved)
}

fn render_action(action: &str, values: &Map<String, Value>) -> Result<String, ParameterError> {
    let captures = action_regex()
        .captures(action)
        .ok_or_else(|| ParameterError::InvalidTemplate {
            reason: format!("unsupported action \"{{{{{action}}}}}\""),
        })?;
    let is_array = captures.get(1).is_some();
    let name = &captures[2];

    let value = values
        .get(name)
        .ok_or_else(|| ParameterError::UndeclaredTemplateParameter {
            name: name.to_string(),
        })?;

    if is_array {
        return convert_array_param_to_string(value)
            .map_err(|e| ParameterError::for_parameter(name, e));
    }

    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok(String::new()),
        Value::Array(_) => Err(ParameterError::InvalidTemplate {
            reason: format!("array parameter \"{name}\" must be used as {{{{array .{name}}}}}"),
        }),
        Value::Object(_) => Err(ParameterError::InvalidTemplate {
            reason: format!("map parameter \"{name}\" cannot be used in a template"),
        }),
    }
}

/// Parameters, manifest and MCP schema of a tool that declares both bound
/// and template parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedParameters {
    /// Bound parameters followed by template parameters.
    pub parameters: Parameters,
    pub manifest: Vec<ParameterManifest>,
    pub mcp_schema: McpToolsSchema,
}

/// Concatenate `params` and `template_params`, rejecting duplicate names.
pub fn process_parameters(
    template_params: &Parameters,
    params: &Parameters,
) -> Result<ProcessedParameters, ParameterError> {
    let all: Vec<_> = params
        .iter()
        .chain(template_params.iter())
        .cloned()
        .collect();
    let parameters = Parameters::new(all)?;

    Ok(ProcessedParameters {
        manifest: parameters.manifest(),
        mcp_schema: parameters.mcp_manifest(),
        parameters,
    })
}
