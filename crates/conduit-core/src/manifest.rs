//! Client and MCP manifests derived from parameter definitions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::parameters::{Parameter, ParameterType, Parameters, ScalarType};

/// `additionalProperties` of an object schema: either "anything" or a value schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AdditionalProperties<T> {
    Any(bool),
    Schema(Box<T>),
}

/// Client-facing description of a parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterManifest {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    pub required: bool,
    pub description: String,
    /// Names of the auth services the value is read from.
    #[serde(rename = "authSources")]
    pub auth_services: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<ParameterManifest>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<AdditionalProperties<ParameterManifest>>,
}

/// JSON-Schema fragment describing a parameter for MCP clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterMcpManifest {
    #[serde(rename = "type")]
    pub ty: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<ParameterMcpManifest>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<AdditionalProperties<ParameterMcpManifest>>,
}

/// The MCP `inputSchema` of a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpToolsSchema {
    #[serde(rename = "type")]
    pub ty: String,
    pub properties: BTreeMap<String, ParameterMcpManifest>,
    pub required: Vec<String>,
}

impl Default for McpToolsSchema {
    fn default() -> Self {
        Self {
            ty: "object".to_string(),
            properties: BTreeMap::new(),
            required: Vec::new(),
        }
    }
}

/// Client manifest of a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub description: String,
    pub parameters: Vec<ParameterManifest>,
    pub auth_required: Vec<String>,
}

/// MCP manifest of a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpManifest {
    pub name: String,
    pub description: String,
    pub input_schema: McpToolsSchema,
}

/// Unnamed scalar parameter describing the values of a typed map.
fn scalar_prototype(ty: ScalarType) -> Parameter {
    match ty {
        ScalarType::String => Parameter::string("", ""),
        ScalarType::Integer => Parameter::integer("", ""),
        ScalarType::Float => Parameter::float("", ""),
        ScalarType::Boolean => Parameter::boolean("", ""),
    }
}

impl Parameter {
    /// The client manifest of this parameter.
    pub fn manifest(&self) -> ParameterManifest {
        let required = self.is_required();
        let (ty, items, additional_properties) = match self.parameter_type() {
            ParameterType::Array(items) => {
                let mut items = items.manifest();
                items.required = required;
                ("array".to_string(), Some(Box::new(items)), None)
            }
            ParameterType::Map(value_type) => {
                let additional = match value_type {
                    Some(ty) => AdditionalProperties::Schema(Box::new(
                        scalar_prototype(*ty).manifest(),
                    )),
                    None => AdditionalProperties::Any(true),
                };
                ("object".to_string(), None, Some(additional))
            }
            other => (other.name().to_string(), None, None),
        };

        ParameterManifest {
            name: self.name().to_string(),
            ty,
            required,
            description: self.description().to_string(),
            auth_services: self
                .auth_services()
                .iter()
                .map(|a| a.name.clone())
                .collect(),
            items,
            additional_properties,
        }
    }

    /// The MCP schema fragment of this parameter. `float` maps to `number`.
    pub fn mcp_manifest(&self) -> ParameterMcpManifest {
        let (ty, items, additional_properties) = match self.parameter_type() {
            ParameterType::Float => ("number", None, None),
            ParameterType::Array(items) => ("array", Some(Box::new(items.mcp_manifest())), None),
            ParameterType::Map(value_type) => {
                let additional = match value_type {
                    Some(ty) => AdditionalProperties::Schema(Box::new(
                        scalar_prototype(*ty).mcp_manifest(),
                    )),
                    None => AdditionalProperties::Any(true),
                };
                ("object", None, Some(additional))
            }
            other => (other.name(), None, None),
        };

        ParameterMcpManifest {
            ty: ty.to_string(),
            description: self.description().to_string(),
            items,
            additional_properties,
        }
    }
}

impl Parameters {
    pub fn manifest(&self) -> Vec<ParameterManifest> {
        self.iter().map(Parameter::manifest).collect()
    }

    /// The MCP `inputSchema`.
    pub fn mcp_manifest(&self) -> McpToolsSchema {
        let mut schema = McpToolsSchema::default();
        for param in self.iter() {
            schema
                .properties
                .insert(param.name().to_string(), param.mcp_manifest());
            if param.is_required() {
                schema.required.push(param.name().to_string());
            }
        }
        schema
    }
}

impl Manifest {
    pub fn new(
        description: &str,
        parameters: Vec<ParameterManifest>,
        auth_required: &[String],
    ) -> Self {
        Self {
            description: description.to_string(),
            parameters,
            auth_required: auth_required.to_vec(),
        }
    }
}

impl McpManifest {
    pub fn new(name: &str, description: &str, input_schema: McpToolsSchema) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            input_schema,
        }
    }
}
