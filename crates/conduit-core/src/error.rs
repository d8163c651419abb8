//! Error types for parameter decoding, parsing and resolution.

use serde_json::Value;
use thiserror::Error;

/// A value did not have the type its parameter declares.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{value} not type \"{expected}\"")]
pub struct ParseTypeError {
    /// Name of the parameter being parsed.
    pub name: String,
    /// The declared parameter type.
    pub expected: String,
    /// The offending value.
    pub value: Value,
}

/// Errors raised while decoding parameter definitions or binding request values.
///
/// Everything except [`ParameterError::Decode`] is request-level: the caller
/// can fix the input and retry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParameterError {
    /// A parameter definition could not be decoded.
    #[error("unable to decode parameter \"{name}\": {reason}")]
    Decode { name: String, reason: String },

    /// Two parameters share a name.
    #[error("parameter name \"{name}\" is declared more than once")]
    DuplicateName { name: String },

    /// A required parameter without default was not supplied.
    #[error("parameter \"{name}\" is required")]
    Required { name: String },

    /// A value did not match its declared type.
    #[error(transparent)]
    TypeMismatch(#[from] ParseTypeError),

    /// A supplied value failed to parse.
    #[error("unable to parse value for \"{name}\": {source}")]
    InvalidValue {
        name: String,
        #[source]
        source: Box<ParameterError>,
    },

    /// An array element failed to parse.
    #[error("unable to parse element #{index}: {source}")]
    Element {
        index: usize,
        #[source]
        source: Box<ParameterError>,
    },

    /// A map value failed to parse.
    #[error("unable to parse value for key \"{key}\": {source}")]
    MapValue {
        key: String,
        #[source]
        source: Box<ParameterError>,
    },

    /// An auth-sourced parameter could not be read from the verified claims.
    #[error("error parsing authenticated parameter \"{name}\": {reason}")]
    AuthParameter { name: String, reason: String },

    /// A declared parameter has no value in the parsed values.
    #[error("missing parameter {name}")]
    Missing { name: String },

    /// An array parameter that must not be empty was empty.
    #[error("'{name}' parameter cannot be empty")]
    Empty { name: String },

    /// A parameter value was not an array where one was required.
    #[error("invalid or missing '{name}' parameter; expected an array")]
    NotAnArray { name: String },

    /// A generic array could not be converted to a typed slice.
    #[error("expected item at index {index} to be {expected}, got {actual}")]
    Conversion {
        index: usize,
        expected: String,
        actual: String,
    },

    /// The statement template references a name that is not a template parameter.
    #[error("template parameter \"{name}\" is not declared")]
    UndeclaredTemplateParameter { name: String },

    /// The statement template is malformed or uses an unsupported action.
    #[error("invalid statement template: {reason}")]
    InvalidTemplate { reason: String },
}

impl ParameterError {
    /// Wrap an error with the name of the parameter it belongs to.
    pub fn for_parameter(name: &str, source: ParameterError) -> Self {
        Self::InvalidValue {
            name: name.to_string(),
            source: Box::new(source),
        }
    }

    /// Create a decode error for a parameter definition.
    pub fn decode(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Decode {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Short JSON type name used in conversion errors.
pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_type_error_message() {
        let err = ParseTypeError {
            name: "id".to_string(),
            expected: "integer".to_string(),
            value: json!("abc"),
        };
        assert_eq!(err.to_string(), "\"abc\" not type \"integer\"");
    }

    #[test]
    fn test_nested_error_message() {
        let err = ParameterError::for_parameter(
            "ids",
            ParameterError::Element {
                index: 1,
                source: Box::new(
                    ParseTypeError {
                        name: String::new(),
                        expected: "integer".to_string(),
                        value: json!(true),
                    }
                    .into(),
                ),
            },
        );
        assert_eq!(
            err.to_string(),
            "unable to parse value for \"ids\": unable to parse element #1: true not type \"integer\""
        );
    }

    #[test]
    fn test_json_type_name() {
        assert_eq!(json_type_name(&json!(1)), "integer");
        assert_eq!(json_type_name(&json!(1.5)), "float");
        assert_eq!(json_type_name(&json!(null)), "null");
    }
}
