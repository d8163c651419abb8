//! Typed parameter definitions.
//!
//! A [`Parameter`] is one of a closed set of variants selected by the `type`
//! field of its YAML definition:
//!
//! ```yaml
//! parameters:
//!   - name: id
//!     type: integer
//!     description: Hotel identifier
//!   - name: tags
//!     type: array
//!     description: Tags to match
//!     items:
//!       type: string
//!   - name: user_email
//!     type: string
//!     description: Email of the caller
//!     authServices:
//!       - name: my-google-auth
//!         field: email
//! ```
//!
//! Parsing is strict: nothing is coerced across types, except that a `float`
//! parameter accepts any JSON number.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;

use crate::error::{ParameterError, ParseTypeError};

/// Element type of a typed map parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    String,
    Integer,
    Float,
    Boolean,
}

impl ScalarType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScalarType::String => "string",
            ScalarType::Integer => "integer",
            ScalarType::Float => "float",
            ScalarType::Boolean => "boolean",
        }
    }

    /// Parse a type name used by `valueType`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "string" => Some(ScalarType::String),
            "integer" => Some(ScalarType::Integer),
            "float" => Some(ScalarType::Float),
            "boolean" => Some(ScalarType::Boolean),
            _ => None,
        }
    }

    /// Parse a single value as this scalar type.
    pub fn parse(&self, name: &str, value: &Value) -> Result<Value, ParameterError> {
        let mismatch = || ParseTypeError {
            name: name.to_string(),
            expected: self.as_str().to_string(),
            value: value.clone(),
        };

        match self {
            ScalarType::String => match value {
                Value::String(_) => Ok(value.clone()),
                _ => Err(mismatch().into()),
            },
            ScalarType::Integer => value
                .as_i64()
                .map(Value::from)
                .ok_or_else(|| mismatch().into()),
            ScalarType::Float => value
                .as_f64()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| mismatch().into()),
            ScalarType::Boolean => match value {
                Value::Bool(_) => Ok(value.clone()),
                _ => Err(mismatch().into()),
            },
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Binds a parameter to a claim of a verified auth service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParamAuthService {
    /// Name of the auth service.
    pub name: String,
    /// Claim field the value is read from.
    pub field: String,
}

impl ParamAuthService {
    pub fn new(name: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field: field.into(),
        }
    }
}

/// The variant of a parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterType {
    String,
    Integer,
    Float,
    Boolean,
    /// Homogeneous array; every element is parsed with the item schema.
    Array(Box<Parameter>),
    /// JSON object; with a value type every value is parsed as that scalar.
    Map(Option<ScalarType>),
}

impl ParameterType {
    /// The type name used in tools files and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            ParameterType::String => "string",
            ParameterType::Integer => "integer",
            ParameterType::Float => "float",
            ParameterType::Boolean => "boolean",
            ParameterType::Array(_) => "array",
            ParameterType::Map(_) => "map",
        }
    }

    fn scalar(&self) -> Option<ScalarType> {
        match self {
            ParameterType::String => Some(ScalarType::String),
            ParameterType::Integer => Some(ScalarType::Integer),
            ParameterType::Float => Some(ScalarType::Float),
            ParameterType::Boolean => Some(ScalarType::Boolean),
            _ => None,
        }
    }
}

/// A single typed parameter of a tool.
///
/// Fields are private so the type cannot change after construction and a
/// default always matches the declared type.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    name: String,
    description: String,
    required: Option<bool>,
    default: Option<Value>,
    auth_services: Vec<ParamAuthService>,
    ty: ParameterType,
}

impl Parameter {
    fn new(name: impl Into<String>, description: impl Into<String>, ty: ParameterType) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required: None,
            default: None,
            auth_services: Vec::new(),
            ty,
        }
    }

    pub fn string(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, description, ParameterType::String)
    }

    pub fn integer(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, description, ParameterType::Integer)
    }

    pub fn float(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, description, ParameterType::Float)
    }

    pub fn boolean(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, description, ParameterType::Boolean)
    }

    pub fn array(
        name: impl Into<String>,
        description: impl Into<String>,
        items: Parameter,
    ) -> Self {
        Self::new(name, description, ParameterType::Array(Box::new(items)))
    }

    pub fn map(
        name: impl Into<String>,
        description: impl Into<String>,
        value_type: Option<ScalarType>,
    ) -> Self {
        Self::new(name, description, ParameterType::Map(value_type))
    }

    /// Attach a default value. Fails if the value does not match the type.
    pub fn with_default(mut self, default: Value) -> Result<Self, ParameterError> {
        let parsed = self.parse(&default)?;
        self.default = Some(parsed);
        Ok(self)
    }

    pub fn with_required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    pub fn with_auth_services(mut self, auth_services: Vec<ParamAuthService>) -> Self {
        self.auth_services = auth_services;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_name(&self) -> &'static str {
        self.ty.name()
    }

    pub fn parameter_type(&self) -> &ParameterType {
        &self.ty
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// The declared `required` flag (defaults to `true`).
    pub fn required(&self) -> bool {
        self.required.unwrap_or(true)
    }

    /// Whether a value must be supplied: required and without default.
    pub fn is_required(&self) -> bool {
        self.required() && self.default.is_none()
    }

    pub fn auth_services(&self) -> &[ParamAuthService] {
        &self.auth_services
    }

    /// The item schema of an array parameter.
    pub fn items(&self) -> Option<&Parameter> {
        match &self.ty {
            ParameterType::Array(items) => Some(items),
            _ => None,
        }
    }

    /// The scalar type of a string, integer, float or boolean parameter.
    pub fn scalar_type(&self) -> Option<ScalarType> {
        self.ty.scalar()
    }

    /// The value type of a map parameter.
    pub fn value_type(&self) -> Option<ScalarType> {
        match &self.ty {
            ParameterType::Map(value_type) => *value_type,
            _ => None,
        }
    }

    /// Parse a JSON value against this parameter's type.
    pub fn parse(&self, value: &Value) -> Result<Value, ParameterError> {
        if let Some(scalar) = self.ty.scalar() {
            return scalar.parse(&self.name, value);
        }

        match &self.ty {
            ParameterType::Array(items) => {
                let Value::Array(elements) = value else {
                    return Err(self.type_error(value));
                };
                let mut parsed = Vec::with_capacity(elements.len());
                for (index, element) in elements.iter().enumerate() {
                    let element = items.parse(element).map_err(|e| ParameterError::Element {
                        index,
                        source: Box::new(e),
                    })?;
                    parsed.push(element);
                }
                Ok(Value::Array(parsed))
            }
            ParameterType::Map(value_type) => {
                let Value::Object(object) = value else {
                    return Err(self.type_error(value));
                };
                let Some(value_type) = value_type else {
                    return Ok(value.clone());
                };
                let mut parsed = Map::with_capacity(object.len());
                for (key, entry) in object {
                    let entry =
                        value_type
                            .parse("", entry)
                            .map_err(|e| ParameterError::MapValue {
                                key: key.clone(),
                                source: Box::new(e),
                            })?;
                    parsed.insert(key.clone(), entry);
                }
                Ok(Value::Object(parsed))
            }
            _ => Err(self.type_error(value)),
        }
    }

    fn type_error(&self, value: &Value) -> ParameterError {
        ParseTypeError {
            name: self.name.clone(),
            expected: self.type_name().to_string(),
            value: value.clone(),
        }
        .into()
    }

    /// Decode a parameter definition from its generic representation.
    pub fn from_value(value: &Value) -> Result<Self, ParameterError> {
        decode_parameter(value, false)
    }
}

/// Raw shape of a parameter definition, shared by all variants.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct RawParameter {
    #[serde(default)]
    name: Option<String>,
    #[serde(rename = "type")]
    ty: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    required: Option<bool>,
    #[serde(default)]
    default: Option<Value>,
    #[serde(default)]
    auth_services: Vec<ParamAuthService>,
    /// Deprecated alias of `authServices`.
    #[serde(default)]
    auth_sources: Vec<ParamAuthService>,
    #[serde(default)]
    items: Option<Value>,
    #[serde(default)]
    value_type: Option<String>,
}

fn decode_parameter(value: &Value, is_item: bool) -> Result<Parameter, ParameterError> {
    // Peek at the name first so every later error can mention it.
    let peeked_name = value
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or(if is_item { "items" } else { "<unnamed>" })
        .to_string();

    if !value.is_object() {
        return Err(ParameterError::decode(
            peeked_name,
            "parameter definition must be a mapping",
        ));
    }
    if value.get("type").is_none() {
        return Err(ParameterError::decode(peeked_name, "missing field `type`"));
    }

    let raw: RawParameter = serde_json::from_value(value.clone())
        .map_err(|e| ParameterError::decode(&peeked_name, e.to_string()))?;

    let name = match raw.name {
        Some(name) => name,
        None if is_item => String::new(),
        None => return Err(ParameterError::decode(peeked_name, "missing field `name`")),
    };

    if raw.items.is_some() && raw.ty != "array" {
        return Err(ParameterError::decode(
            &name,
            format!("`items` is not valid for a {} parameter", raw.ty),
        ));
    }
    if raw.value_type.is_some() && raw.ty != "map" {
        return Err(ParameterError::decode(
            &name,
            format!("`valueType` is not valid for a {} parameter", raw.ty),
        ));
    }

    let ty = match raw.ty.as_str() {
        "string" => ParameterType::String,
        "integer" => ParameterType::Integer,
        "float" => ParameterType::Float,
        "boolean" => ParameterType::Boolean,
        "array" => {
            let items = raw.items.ok_or_else(|| {
                ParameterError::decode(&name, "array parameter is missing `items`")
            })?;
            let items = decode_parameter(&items, true)
                .map_err(|e| ParameterError::decode(&name, format!("invalid items: {e}")))?;
            if !items.auth_services.is_empty() {
                return Err(ParameterError::decode(
                    &name,
                    "array items cannot declare auth services",
                ));
            }
            ParameterType::Array(Box::new(items))
        }
        "map" => match raw.value_type.as_deref() {
            None | Some("") => ParameterType::Map(None),
            Some(value_type) => match ScalarType::from_name(value_type) {
                Some(scalar) => ParameterType::Map(Some(scalar)),
                None => {
                    return Err(ParameterError::decode(
                        &name,
                        format!("unsupported valueType \"{value_type}\" for map parameter"),
                    ));
                }
            },
        },
        other => {
            return Err(ParameterError::decode(
                &name,
                format!("unknown parameter type \"{other}\""),
            ));
        }
    };

    let mut auth_services = raw.auth_services;
    if !raw.auth_sources.is_empty() {
        tracing::warn!(
            parameter = %name,
            "`authSources` is deprecated, use `authServices` instead"
        );
        auth_services.extend(raw.auth_sources);
    }

    let parameter = Parameter {
        name,
        description: raw.description,
        required: raw.required,
        default: None,
        auth_services,
        ty,
    };

    match raw.default {
        Some(default) => {
            let name = parameter.name.clone();
            parameter
                .with_default(default)
                .map_err(|e| ParameterError::decode(name, format!("invalid default: {e}")))
        }
        None => Ok(parameter),
    }
}

impl<'de> Deserialize<'de> for Parameter {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Parameter::from_value(&value).map_err(serde::de::Error::custom)
    }
}

/// An ordered list of parameters with unique names.
///
/// Order is the positional binding order used by drivers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parameters(Vec<Parameter>);

impl Parameters {
    /// Build a parameter list, rejecting duplicate names.
    pub fn new(parameters: Vec<Parameter>) -> Result<Self, ParameterError> {
        let mut seen = HashSet::new();
        for parameter in &parameters {
            if !seen.insert(parameter.name()) {
                return Err(ParameterError::DuplicateName {
                    name: parameter.name().to_string(),
                });
            }
        }
        Ok(Self(parameters))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Parameter> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.0.iter().find(|p| p.name() == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(Parameter::name)
    }

    pub fn as_slice(&self) -> &[Parameter] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<Parameter> {
        self.0
    }

    /// Decode a YAML/JSON list of parameter definitions.
    pub fn from_value(value: &Value) -> Result<Self, ParameterError> {
        let Value::Array(definitions) = value else {
            return Err(ParameterError::decode(
                "<parameters>",
                "parameters must be a list",
            ));
        };
        let parameters = definitions
            .iter()
            .map(Parameter::from_value)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(parameters)
    }
}

impl<'a> IntoIterator for &'a Parameters {
    type Item = &'a Parameter;
    type IntoIter = std::slice::Iter<'a, Parameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<'de> Deserialize<'de> for Parameters {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        if value.is_null() {
            return Ok(Self::default());
        }
        Parameters::from_value(&value).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn from_yaml(yaml: &str) -> Result<Parameters, ParameterError> {
        let value: Value = serde_yaml::from_str(yaml).expect("valid yaml");
        Parameters::from_value(&value)
    }

    #[test]
    fn test_scalar_parse_is_strict() {
        let p = Parameter::integer("id", "");
        assert_eq!(p.parse(&json!(42)).unwrap(), json!(42));
        assert!(p.parse(&json!("42")).is_err());
        assert!(p.parse(&json!(4.2)).is_err());

        let p = Parameter::string("name", "");
        let err = p.parse(&json!(4)).unwrap_err();
        assert_eq!(
            err,
            ParameterError::TypeMismatch(ParseTypeError {
                name: "name".to_string(),
                expected: "string".to_string(),
                value: json!(4),
            })
        );

        let p = Parameter::boolean("flag", "");
        assert!(p.parse(&json!("true")).is_err());
        assert_eq!(p.parse(&json!(false)).unwrap(), json!(false));
    }

    #[test]
    fn test_float_accepts_any_number() {
        let p = Parameter::float("price", "");
        assert_eq!(p.parse(&json!(2)).unwrap(), json!(2.0));
        assert_eq!(p.parse(&json!(2.5)).unwrap(), json!(2.5));
        assert!(p.parse(&json!("2.5")).is_err());
    }

    #[test]
    fn test_array_parse_reports_failing_index() {
        let p = Parameter::array("ids", "", Parameter::integer("id", ""));
        assert_eq!(p.parse(&json!([1, 2, 3])).unwrap(), json!([1, 2, 3]));

        let err = p.parse(&json!([1, "two", 3])).unwrap_err();
        match err {
            ParameterError::Element { index, .. } => assert_eq!(index, 1),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(p.parse(&json!({"a": 1})).is_err());
    }

    #[test]
    fn test_map_parse() {
        let untyped = Parameter::map("filter", "", None);
        let value = json!({"a": 1, "b": "x", "c": [true]});
        assert_eq!(untyped.parse(&value).unwrap(), value);
        assert!(untyped.parse(&json!([1])).is_err());

        let typed = Parameter::map("counts", "", Some(ScalarType::Integer));
        assert_eq!(
            typed.parse(&json!({"a": 1, "b": 2})).unwrap(),
            json!({"a": 1, "b": 2})
        );
        let err = typed.parse(&json!({"a": 1, "b": "2"})).unwrap_err();
        assert!(err.to_string().contains("unable to parse value for key \"b\""));
    }

    #[test]
    fn test_with_default_type_checks() {
        assert!(Parameter::integer("limit", "").with_default(json!(10)).is_ok());
        assert!(Parameter::integer("limit", "").with_default(json!("10")).is_err());
    }

    #[test]
    fn test_effective_required() {
        let p = Parameter::string("a", "");
        assert!(p.is_required());

        let p = Parameter::string("a", "").with_required(false);
        assert!(!p.is_required());

        let p = Parameter::string("a", "").with_default(json!("x")).unwrap();
        assert!(p.required());
        assert!(!p.is_required());
    }

    #[test]
    fn test_decode_parameters() {
        let params = from_yaml(
            r#"
- name: id
  type: integer
  description: identifier
- name: tags
  type: array
  description: tags
  items:
    name: tag
    type: string
    description: a tag
- name: counts
  type: map
  description: counts
  valueType: integer
- name: limit
  type: integer
  description: max rows
  default: 10
- name: email
  type: string
  description: caller
  authServices:
    - name: google
      field: email
"#,
        )
        .unwrap();

        let names: Vec<_> = params.names().collect();
        assert_eq!(names, vec!["id", "tags", "counts", "limit", "email"]);
        assert_eq!(params.get("tags").unwrap().items().unwrap().type_name(), "string");
        assert_eq!(
            params.get("counts").unwrap().value_type(),
            Some(ScalarType::Integer)
        );
        assert_eq!(params.get("limit").unwrap().default_value(), Some(&json!(10)));
        assert_eq!(
            params.get("email").unwrap().auth_services(),
            &[ParamAuthService::new("google", "email")]
        );
    }

    #[test]
    fn test_decode_items_without_name() {
        let params = from_yaml(
            r#"
- name: ids
  type: array
  description: ids
  items:
    type: integer
"#,
        )
        .unwrap();
        assert_eq!(params.get("ids").unwrap().items().unwrap().name(), "");
    }

    #[test]
    fn test_decode_errors_name_the_parameter() {
        let err = from_yaml("- name: id\n  type: uuid\n").unwrap_err();
        assert!(err.to_string().contains("\"id\""));
        assert!(err.to_string().contains("unknown parameter type \"uuid\""));

        let err = from_yaml("- name: id\n  description: x\n").unwrap_err();
        assert!(err.to_string().contains("missing field `type`"));

        let err = from_yaml("- name: id\n  type: integer\n  colour: red\n").unwrap_err();
        assert!(err.to_string().contains("\"id\""));

        let err = from_yaml("- name: id\n  type: integer\n  default: abc\n").unwrap_err();
        assert!(err.to_string().contains("invalid default"));

        let err = from_yaml("- name: m\n  type: map\n  valueType: array\n").unwrap_err();
        assert!(
            err.to_string()
                .contains("unsupported valueType \"array\" for map parameter")
        );
    }

    #[test]
    fn test_decode_rejects_auth_on_items() {
        let err = from_yaml(
            r#"
- name: ids
  type: array
  description: ids
  items:
    type: string
    authServices:
      - name: google
        field: sub
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("cannot declare auth services"));
    }

    #[test]
    fn test_deprecated_auth_sources_are_merged() {
        let params = from_yaml(
            r#"
- name: email
  type: string
  description: caller
  authSources:
    - name: google
      field: email
"#,
        )
        .unwrap();
        assert_eq!(params.get("email").unwrap().auth_services().len(), 1);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let err = Parameters::new(vec![
            Parameter::string("a", ""),
            Parameter::integer("a", ""),
        ])
        .unwrap_err();
        assert_eq!(err, ParameterError::DuplicateName { name: "a".to_string() });
    }
}
