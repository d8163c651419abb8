use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use conduit_core::{Parameter, ScalarType, TypedSlice, convert_any_slice_to_typed};
use serde_json::{Map, Value};
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::types::Json;
use sqlx::{Arguments, Column, PgPool, Postgres, Row, TypeInfo};
use std::str::FromStr;

fn args_add<T>(args: &mut PgArguments, v: T) -> anyhow::Result<()>
where
    T: Send + Sync + 'static,
    for<'q> T: sqlx::Encode<'q, Postgres> + sqlx::Type<Postgres>,
{
    args.add(v).map_err(|e| anyhow::anyhow!(e))
}

/// Postgres type a NULL argument is sent as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NullType {
    Scalar(ScalarType),
    Array(ScalarType),
    Json,
}

fn null_type(parameter: &Parameter) -> NullType {
    if let Some(scalar) = parameter.scalar_type() {
        return NullType::Scalar(scalar);
    }
    match parameter.items().and_then(Parameter::scalar_type) {
        Some(item) => NullType::Array(item),
        None => NullType::Json,
    }
}

fn bind_null(args: &mut PgArguments, parameter: &Parameter) -> anyhow::Result<()> {
    match null_type(parameter) {
        NullType::Scalar(ScalarType::String) => args_add(args, None::<String>),
        NullType::Scalar(ScalarType::Integer) => args_add(args, None::<i64>),
        NullType::Scalar(ScalarType::Float) => args_add(args, None::<f64>),
        NullType::Scalar(ScalarType::Boolean) => args_add(args, None::<bool>),
        NullType::Array(ScalarType::String) => args_add(args, None::<Vec<String>>),
        NullType::Array(ScalarType::Integer) => args_add(args, None::<Vec<i64>>),
        NullType::Array(ScalarType::Float) => args_add(args, None::<Vec<f64>>),
        NullType::Array(ScalarType::Boolean) => args_add(args, None::<Vec<bool>>),
        NullType::Json => args_add(args, None::<Json<Value>>),
    }
}

fn bind(args: &mut PgArguments, parameter: &Parameter, value: &Value) -> anyhow::Result<()> {
    match value {
        Value::Null => bind_null(args, parameter),
        Value::Bool(b) => args_add(args, *b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => args_add(args, i),
            None => args_add(args, n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => args_add(args, s.clone()),
        Value::Array(items) => {
            let item_type = parameter.items().and_then(Parameter::scalar_type);
            let Some(item_type) = item_type else {
                // Nested arrays and arrays of maps travel as JSON.
                return args_add(args, Json(value.clone()));
            };
            match convert_any_slice_to_typed(items, item_type)? {
                TypedSlice::Strings(v) => args_add(args, v),
                TypedSlice::Integers(v) => args_add(args, v),
                TypedSlice::Floats(v) => args_add(args, v),
                TypedSlice::Booleans(v) => args_add(args, v),
            }
        }
        Value::Object(_) => args_add(args, Json(value.clone())),
    }
}

pub(super) async fn query(
    pool: &PgPool,
    statement: &str,
    bound: &[(&Parameter, &Value)],
) -> anyhow::Result<Vec<Value>> {
    let mut args = PgArguments::default();
    for (parameter, value) in bound {
        bind(&mut args, parameter, value)?;
    }
    let rows = sqlx::query_with(statement, args).fetch_all(pool).await?;
    rows.iter().map(row_to_json).collect()
}

pub(super) async fn execute(pool: &PgPool, sql: &str) -> anyhow::Result<Vec<Value>> {
    let rows = sqlx::raw_sql(sql).fetch_all(pool).await?;
    rows.iter().map(row_to_json).collect()
}

fn get<'r, T>(
    row: &'r PgRow,
    index: usize,
    into: impl FnOnce(T) -> Value,
) -> anyhow::Result<Value>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    Ok(row
        .try_get::<Option<T>, _>(index)?
        .map_or(Value::Null, into))
}

/// NUMERIC values become JSON numbers when they fit, strings otherwise.
fn numeric(value: BigDecimal) -> Value {
    let text = value.to_string();
    serde_json::Number::from_str(&text)
        .map(Value::Number)
        .unwrap_or(Value::String(text))
}

fn column_value(row: &PgRow, index: usize, type_name: &str) -> anyhow::Result<Value> {
    match type_name {
        "BOOL" => get::<bool>(row, index, Value::from),
        "INT2" => get::<i16>(row, index, Value::from),
        "INT4" => get::<i32>(row, index, Value::from),
        "INT8" => get::<i64>(row, index, Value::from),
        "FLOAT4" => get::<f32>(row, index, Value::from),
        "FLOAT8" => get::<f64>(row, index, Value::from),
        "NUMERIC" => get::<BigDecimal>(row, index, numeric),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => get::<String>(row, index, Value::from),
        "UUID" => get::<uuid::Uuid>(row, index, |v| Value::from(v.to_string())),
        "TIMESTAMPTZ" => get::<DateTime<Utc>>(row, index, |v| Value::from(v.to_rfc3339())),
        "TIMESTAMP" => get::<NaiveDateTime>(row, index, |v| {
            Value::from(v.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
        }),
        "DATE" => get::<NaiveDate>(row, index, |v| Value::from(v.to_string())),
        "TIME" => get::<NaiveTime>(row, index, |v| Value::from(v.to_string())),
        "JSON" | "JSONB" => get::<Value>(row, index, |v| v),
        "BYTEA" => get::<Vec<u8>>(row, index, Value::from),
        "TEXT[]" | "VARCHAR[]" => get::<Vec<String>>(row, index, Value::from),
        "INT4[]" => get::<Vec<i32>>(row, index, Value::from),
        "INT8[]" => get::<Vec<i64>>(row, index, Value::from),
        "FLOAT8[]" => get::<Vec<f64>>(row, index, Value::from),
        "BOOL[]" => get::<Vec<bool>>(row, index, Value::from),
        other => {
            // Types without a JSON mapping are returned as text when possible.
            match row.try_get_unchecked::<Option<String>, _>(index) {
                Ok(v) => Ok(v.map_or(Value::Null, Value::from)),
                Err(e) => {
                    tracing::debug!(column_type = other, error = %e, "unsupported column type");
                    Ok(Value::Null)
                }
            }
        }
    }
}

/// Convert a row into an object keyed by column name, in column order.
fn row_to_json(row: &PgRow) -> anyhow::Result<Value> {
    let mut object = Map::new();
    for column in row.columns() {
        let value = column_value(row, column.ordinal(), column.type_info().name())?;
        object.insert(column.name().to_string(), value);
    }
    Ok(Value::Object(object))
}
