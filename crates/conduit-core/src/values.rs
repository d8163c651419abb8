//! Parsed parameter values and the views drivers consume.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::error::ParameterError;
use crate::parameters::{ParamAuthService, Parameters};

/// Claims of every verified auth service, keyed by service name.
pub type Claims = HashMap<String, Map<String, Value>>;

/// A single named value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamValue {
    pub name: String,
    pub value: Value,
}

impl ParamValue {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Ordered `(name, value)` pairs in parameter declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ParamValues(Vec<ParamValue>);

impl ParamValues {
    pub fn new(values: Vec<ParamValue>) -> Self {
        Self(values)
    }

    pub fn push(&mut self, name: impl Into<String>, value: Value) {
        self.0.push(ParamValue::new(name, value));
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ParamValue> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.iter().rev().find(|p| p.name == name).map(|p| &p.value)
    }

    /// Values in positional order.
    pub fn as_slice(&self) -> Vec<Value> {
        self.0.iter().map(|p| p.value.clone()).collect()
    }

    /// Name to value. The last value wins on duplicate names.
    pub fn as_map(&self) -> Map<String, Value> {
        self.0
            .iter()
            .map(|p| (p.name.clone(), p.value.clone()))
            .collect()
    }

    /// Value to name, keyed by the value's canonical JSON text.
    pub fn as_reversed_map(&self) -> HashMap<String, String> {
        self.0
            .iter()
            .map(|p| (p.value.to_string(), p.name.clone()))
            .collect()
    }

    /// `$name` to value. Names that already start with `$` are kept as-is.
    pub fn as_map_with_dollar_prefix(&self) -> Map<String, Value> {
        self.0
            .iter()
            .map(|p| {
                let key = if p.name.starts_with('$') {
                    p.name.clone()
                } else {
                    format!("${}", p.name)
                };
                (key, p.value.clone())
            })
            .collect()
    }

    /// `p1`, `p2`, ... to value, for drivers that only accept positional names.
    pub fn as_map_by_ordered_keys(&self) -> Map<String, Value> {
        self.0
            .iter()
            .enumerate()
            .map(|(i, p)| (format!("p{}", i + 1), p.value.clone()))
            .collect()
    }
}

impl IntoIterator for ParamValues {
    type Item = ParamValue;
    type IntoIter = std::vec::IntoIter<ParamValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ParamValues {
    type Item = &'a ParamValue;
    type IntoIter = std::slice::Iter<'a, ParamValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<ParamValue> for ParamValues {
    fn from_iter<I: IntoIterator<Item = ParamValue>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn value_from_claims(services: &[ParamAuthService], claims: &Claims) -> Result<Value, String> {
    // The first listed service that was verified decides.
    for service in services {
        let Some(service_claims) = claims.get(&service.name) else {
            continue;
        };
        return service_claims
            .get(&service.field)
            .cloned()
            .ok_or_else(|| format!("no field named {} in claims", service.field));
    }
    Err("missing or invalid authentication header".to_string())
}

/// Parse request arguments against declared parameters.
///
/// Auth-sourced parameters ignore `data` and read from `claims`. Absent
/// values (or JSON `null`) fall back to the default; optional parameters
/// without value are bound as `null`.
pub fn parse_params(
    params: &Parameters,
    data: &Map<String, Value>,
    claims: &Claims,
) -> Result<ParamValues, ParameterError> {
    let mut values = ParamValues::default();

    for param in params {
        let name = param.name();
        let raw = if param.auth_services().is_empty() {
            match data.get(name).filter(|v| !v.is_null()) {
                Some(v) => Some(v.clone()),
                None => {
                    if param.is_required() {
                        return Err(ParameterError::Required {
                            name: name.to_string(),
                        });
                    }
                    param.default_value().cloned()
                }
            }
        } else {
            let v = value_from_claims(param.auth_services(), claims).map_err(|reason| {
                ParameterError::AuthParameter {
                    name: name.to_string(),
                    reason,
                }
            })?;
            Some(v)
        };

        let value = match raw {
            Some(v) => param
                .parse(&v)
                .map_err(|e| ParameterError::for_parameter(name, e))?,
            None => Value::Null,
        };
        values.push(name, value);
    }

    tracing::trace!(count = values.len(), "parsed parameters");
    Ok(values)
}

/// Select the values of `params` from a name-to-value map, in declaration order.
pub fn get_params(
    params: &Parameters,
    values: &Map<String, Value>,
) -> Result<ParamValues, ParameterError> {
    params
        .iter()
        .map(|p| {
            values
                .get(p.name())
                .map(|v| ParamValue::new(p.name(), v.clone()))
                .ok_or_else(|| ParameterError::Missing {
                    name: p.name().to_string(),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::Parameter;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    fn sample_params() -> Parameters {
        Parameters::new(vec![
            Parameter::string("name", ""),
            Parameter::integer("limit", "")
                .with_default(json!(10))
                .unwrap(),
            Parameter::boolean("verbose", "").with_required(false),
        ])
        .unwrap()
    }

    #[test]
    fn test_parse_params_preserves_declaration_order() {
        let data = object(json!({"verbose": true, "limit": 3, "name": "Sid"}));
        let values = parse_params(&sample_params(), &data, &Claims::new()).unwrap();
        let names: Vec<_> = values.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["name", "limit", "verbose"]);
        assert_eq!(values.as_slice(), vec![json!("Sid"), json!(3), json!(true)]);
    }

    #[test]
    fn test_parse_params_defaults_and_optional() {
        let data = object(json!({"name": "Sid", "limit": null}));
        let values = parse_params(&sample_params(), &data, &Claims::new()).unwrap();
        assert_eq!(values.get("limit"), Some(&json!(10)));
        assert_eq!(values.get("verbose"), Some(&Value::Null));
    }

    #[test]
    fn test_parse_params_required() {
        let data = object(json!({"limit": 3}));
        let err = parse_params(&sample_params(), &data, &Claims::new()).unwrap_err();
        assert_eq!(err.to_string(), "parameter \"name\" is required");
    }

    #[test]
    fn test_parse_params_wraps_type_errors() {
        let data = object(json!({"name": 5}));
        let err = parse_params(&sample_params(), &data, &Claims::new()).unwrap_err();
        assert!(
            err.to_string()
                .starts_with("unable to parse value for \"name\"")
        );
    }

    #[test]
    fn test_parse_params_from_claims() {
        let params = Parameters::new(vec![
            Parameter::string("email", "").with_auth_services(vec![
                ParamAuthService::new("github", "email"),
                ParamAuthService::new("google", "email"),
            ]),
        ])
        .unwrap();

        let mut claims = Claims::new();
        claims.insert(
            "google".to_string(),
            object(json!({"email": "sid@example.com"})),
        );

        // A caller-supplied value is ignored for auth-sourced parameters.
        let data = object(json!({"email": "mallory@example.com"}));
        let values = parse_params(&params, &data, &claims).unwrap();
        assert_eq!(values.get("email"), Some(&json!("sid@example.com")));

        let err = parse_params(&params, &data, &Claims::new()).unwrap_err();
        assert!(
            err.to_string()
                .contains("missing or invalid authentication header")
        );

        claims.insert("github".to_string(), object(json!({"login": "sid"})));
        let err = parse_params(&params, &data, &claims).unwrap_err();
        assert!(err.to_string().contains("no field named email in claims"));
    }

    #[test]
    fn test_views() {
        let values = ParamValues::new(vec![
            ParamValue::new("role", json!("admin")),
            ParamValue::new("$age", json!(30)),
        ]);

        assert_eq!(
            values.as_map_with_dollar_prefix(),
            object(json!({"$role": "admin", "$age": 30}))
        );
        assert_eq!(
            values.as_map_by_ordered_keys(),
            object(json!({"p1": "admin", "p2": 30}))
        );
        let reversed = values.as_reversed_map();
        assert_eq!(reversed.get("\"admin\""), Some(&"role".to_string()));
        assert_eq!(reversed.get("30"), Some(&"$age".to_string()));
    }

    #[test]
    fn test_as_map_last_wins() {
        let values = ParamValues::new(vec![
            ParamValue::new("a", json!(1)),
            ParamValue::new("a", json!(2)),
        ]);
        assert_eq!(values.as_map(), object(json!({"a": 2})));
        assert_eq!(values.get("a"), Some(&json!(2)));
    }

    #[test]
    fn test_get_params() {
        let params = Parameters::new(vec![Parameter::string("table", "")]).unwrap();
        let found = get_params(&params, &object(json!({"table": "users", "x": 1}))).unwrap();
        assert_eq!(found.as_slice(), vec![json!("users")]);

        let err = get_params(&params, &Map::new()).unwrap_err();
        assert_eq!(err.to_string(), "missing parameter table");
    }
}
