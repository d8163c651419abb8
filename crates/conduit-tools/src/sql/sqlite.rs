use conduit_core::Parameter;
use serde_json::{Map, Value};
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Arguments, Column, Row, Sqlite, SqlitePool, TypeInfo, ValueRef};

fn args_add<'q, T>(args: &mut SqliteArguments<'q>, v: T) -> anyhow::Result<()>
where
    T: sqlx::Encode<'q, Sqlite> + sqlx::Type<Sqlite> + Send + 'q,
{
    args.add(v).map_err(|e| anyhow::anyhow!(e))
}

/// SQLite has no array or object type: both are bound as JSON text.
fn bind(args: &mut SqliteArguments<'_>, value: &Value) -> anyhow::Result<()> {
    match value {
        Value::Null => args_add(args, None::<String>),
        Value::Bool(b) => args_add(args, *b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => args_add(args, i),
            None => args_add(args, n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => args_add(args, s.clone()),
        Value::Array(_) | Value::Object(_) => args_add(args, value.to_string()),
    }
}

pub(super) async fn query(
    pool: &SqlitePool,
    statement: &str,
    bound: &[(&Parameter, &Value)],
) -> anyhow::Result<Vec<Value>> {
    let mut args = SqliteArguments::default();
    for (_, value) in bound {
        bind(&mut args, value)?;
    }
    let rows = sqlx::query_with(statement, args).fetch_all(pool).await?;
    rows.iter().map(row_to_json).collect()
}

pub(super) async fn execute(pool: &SqlitePool, sql: &str) -> anyhow::Result<Vec<Value>> {
    let rows = sqlx::raw_sql(sql).fetch_all(pool).await?;
    rows.iter().map(row_to_json).collect()
}

/// Decode by the storage class of the value itself, since SQLite columns
/// are dynamically typed.
fn column_value(row: &SqliteRow, index: usize) -> anyhow::Result<Value> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let storage_class = raw.type_info().name().to_string();

    Ok(match storage_class.as_str() {
        "INTEGER" => Value::from(row.try_get::<i64, _>(index)?),
        "REAL" => Value::from(row.try_get::<f64, _>(index)?),
        "BLOB" => Value::from(row.try_get::<Vec<u8>, _>(index)?),
        _ => Value::from(row.try_get::<String, _>(index)?),
    })
}

/// Convert a row into an object keyed by column name, in column order.
fn row_to_json(row: &SqliteRow) -> anyhow::Result<Value> {
    let mut object = Map::new();
    for column in row.columns() {
        object.insert(column.name().to_string(), column_value(row, column.ordinal())?);
    }
    Ok(Value::Object(object))
}
