//! Conversions from generic JSON arrays to typed slices.

use serde_json::Value;

use crate::error::{ParameterError, json_type_name};
use crate::parameters::ScalarType;

/// A homogeneous array, as needed by drivers that bind typed arrays.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedSlice {
    Strings(Vec<String>),
    Integers(Vec<i64>),
    Floats(Vec<f64>),
    Booleans(Vec<bool>),
}

impl TypedSlice {
    pub fn len(&self) -> usize {
        match self {
            TypedSlice::Strings(v) => v.len(),
            TypedSlice::Integers(v) => v.len(),
            TypedSlice::Floats(v) => v.len(),
            TypedSlice::Booleans(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Convert a generic array into a typed slice of `item_type`.
///
/// Fails on the first element of a different runtime type, naming its index.
pub fn convert_any_slice_to_typed(
    items: &[Value],
    item_type: ScalarType,
) -> Result<TypedSlice, ParameterError> {
    fn collect<T>(
        items: &[Value],
        expected: ScalarType,
        extract: impl Fn(&Value) -> Option<T>,
    ) -> Result<Vec<T>, ParameterError> {
        items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                extract(item).ok_or_else(|| ParameterError::Conversion {
                    index,
                    expected: expected.to_string(),
                    actual: json_type_name(item).to_string(),
                })
            })
            .collect()
    }

    Ok(match item_type {
        ScalarType::String => TypedSlice::Strings(collect(items, item_type, |v| {
            v.as_str().map(str::to_string)
        })?),
        ScalarType::Integer => TypedSlice::Integers(collect(items, item_type, Value::as_i64)?),
        ScalarType::Float => TypedSlice::Floats(collect(items, item_type, Value::as_f64)?),
        ScalarType::Boolean => TypedSlice::Booleans(collect(items, item_type, Value::as_bool)?),
    })
}

/// Join a string array with `", "` for `{{array .name}}` template actions.
pub fn convert_array_param_to_string(value: &Value) -> Result<String, ParameterError> {
    let Value::Array(items) = value else {
        return Err(ParameterError::InvalidTemplate {
            reason: "invalid parameter type, expected array of type string".to_string(),
        });
    };
    let strings = items
        .iter()
        .map(|item| {
            item.as_str().ok_or_else(|| ParameterError::InvalidTemplate {
                reason: "template parameters only support string arrays".to_string(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(strings.join(", "))
}

/// Read a non-empty string array parameter, such as a list of document paths.
pub fn non_empty_string_array(
    name: &str,
    value: Option<&Value>,
) -> Result<Vec<String>, ParameterError> {
    let Some(Value::Array(items)) = value else {
        return Err(ParameterError::NotAnArray {
            name: name.to_string(),
        });
    };
    if items.is_empty() {
        return Err(ParameterError::Empty {
            name: name.to_string(),
        });
    }
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            item.as_str().map(str::to_string).ok_or_else(|| {
                ParameterError::for_parameter(
                    name,
                    ParameterError::Conversion {
                        index,
                        expected: ScalarType::String.to_string(),
                        actual: json_type_name(item).to_string(),
                    },
                )
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_convert_typed() {
        let items = vec![json!("a"), json!("b")];
        assert_eq!(
            convert_any_slice_to_typed(&items, ScalarType::String).unwrap(),
            TypedSlice::Strings(vec!["a".to_string(), "b".to_string()])
        );

        let items = vec![json!(1), json!(2.5)];
        assert_eq!(
            convert_any_slice_to_typed(&items, ScalarType::Float).unwrap(),
            TypedSlice::Floats(vec![1.0, 2.5])
        );
    }

    #[test]
    fn test_convert_reports_index() {
        let items = vec![json!("a"), json!(2)];
        let err = convert_any_slice_to_typed(&items, ScalarType::String).unwrap_err();
        assert_eq!(
            err.to_string(),
            "expected item at index 1 to be string, got integer"
        );
    }

    #[test]
    fn test_array_to_string() {
        assert_eq!(
            convert_array_param_to_string(&json!(["id", "name"])).unwrap(),
            "id, name"
        );
        assert!(convert_array_param_to_string(&json!([1])).is_err());
        assert!(convert_array_param_to_string(&json!("id")).is_err());
    }

    #[test]
    fn test_non_empty_string_array() {
        let err = non_empty_string_array("documentPaths", Some(&json!([]))).unwrap_err();
        assert_eq!(err.to_string(), "'documentPaths' parameter cannot be empty");

        let err = non_empty_string_array("documentPaths", None).unwrap_err();
        assert!(matches!(err, ParameterError::NotAnArray { .. }));

        assert_eq!(
            non_empty_string_array("documentPaths", Some(&json!(["a/b"]))).unwrap(),
            vec!["a/b".to_string()]
        );
    }
}
