//! # conduit-core
//!
//! The backend-independent half of Conduit: everything a connector needs to
//! describe, validate and receive its parameters.
//!
//! - **Parameters**: a closed set of typed parameter variants (string, integer,
//!   float, boolean, array, map) decoded from tools-file YAML
//! - **Values**: the ordered [`ParamValues`] carrier produced by
//!   [`parse_params`] and the views drivers consume
//! - **Templates**: `{{.name}}` substitution of template parameters into a
//!   statement before bound parameters are applied
//! - **Manifests**: the client manifest and the MCP `inputSchema`, both derived
//!   from the same [`Parameters`]
//!
//! ## Request flow
//!
//! ```text
//! JSON arguments ──► parse_params(Parameters) ──► ParamValues
//!                                                  │
//!                    resolve_template_params ◄─────┤ (template parameters)
//!                    get_params ◄──────────────────┘ (bound parameters)
//! ```

pub mod auth;
pub mod convert;
pub mod error;
pub mod manifest;
pub mod parameters;
pub mod template;
pub mod values;

pub use auth::is_authorized;
pub use convert::{
    TypedSlice, convert_any_slice_to_typed, convert_array_param_to_string, non_empty_string_array,
};
pub use error::{ParameterError, ParseTypeError};
pub use manifest::{
    AdditionalProperties, Manifest, McpManifest, McpToolsSchema, ParameterManifest,
    ParameterMcpManifest,
};
pub use parameters::{ParamAuthService, Parameter, ParameterType, Parameters, ScalarType};
pub use template::{ProcessedParameters, process_parameters, resolve_template_params};
pub use values::{Claims, ParamValue, ParamValues, get_params, parse_params};

/// Check that a tool or toolset name only uses `[a-zA-Z0-9_-]`.
pub fn is_valid_name(name: &str) -> bool {
    name.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
