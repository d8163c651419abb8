//! SQL tools for Postgres and SQLite sources.
//!
//! Two shapes exist per dialect:
//!
//! - `<dialect>-sql` runs a fixed `statement`. Template parameters are
//!   substituted into the text first, then declared parameters are bound
//!   positionally (`$1`, `$2`, ... for Postgres, `?` for SQLite).
//! - `<dialect>-execute-sql` runs whatever SQL the caller passes in `sql`.
//!
//! Both return an array of row objects with columns in select order.

mod postgres;
mod sqlite;

use async_trait::async_trait;
use conduit_core::{
    ParamValues, Parameter, Parameters, get_params, process_parameters, resolve_template_params,
};
use conduit_sources::{Source, SourceMap};
use serde::Deserialize;
use serde_json::Value;
use sqlx::{PgPool, SqlitePool};
use std::sync::Arc;

use crate::error::ToolError;
use crate::tool::{Tool, ToolConfig, ToolMetadata, resolve_source};

pub const POSTGRES_SQL: &str = "postgres-sql";
pub const POSTGRES_EXECUTE_SQL: &str = "postgres-execute-sql";
pub const SQLITE_SQL: &str = "sqlite-sql";
pub const SQLITE_EXECUTE_SQL: &str = "sqlite-execute-sql";

/// The SQL engine a tool targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    #[default]
    Postgres,
    Sqlite,
}

impl Dialect {
    fn statement_kind(&self) -> &'static str {
        match self {
            Dialect::Postgres => POSTGRES_SQL,
            Dialect::Sqlite => SQLITE_SQL,
        }
    }

    fn execute_kind(&self) -> &'static str {
        match self {
            Dialect::Postgres => POSTGRES_EXECUTE_SQL,
            Dialect::Sqlite => SQLITE_EXECUTE_SQL,
        }
    }

    fn compatible_sources(&self) -> &'static [&'static str] {
        match self {
            Dialect::Postgres => &[conduit_sources::postgres::KIND],
            Dialect::Sqlite => &[conduit_sources::sqlite::KIND],
        }
    }

    /// The pool this dialect needs, if the source can provide it.
    fn pool(&self, source: &dyn Source) -> Option<SqlPool> {
        match self {
            Dialect::Postgres => source.postgres_pool().cloned().map(SqlPool::Postgres),
            Dialect::Sqlite => source.sqlite_pool().cloned().map(SqlPool::Sqlite),
        }
    }

    fn resolve_pool(
        &self,
        kind: &str,
        sources: &SourceMap,
        source_name: &str,
    ) -> Result<SqlPool, ToolError> {
        let source = resolve_source(sources, source_name)?;
        self.pool(source.as_ref())
            .ok_or_else(|| ToolError::incompatible(kind, self.compatible_sources()))
    }
}

/// A connection pool of either dialect.
#[derive(Debug, Clone)]
enum SqlPool {
    Postgres(PgPool),
    Sqlite(SqlitePool),
}

impl SqlPool {
    /// Run a prepared statement with positionally bound values.
    async fn query(
        &self,
        statement: &str,
        parameters: &Parameters,
        values: &ParamValues,
    ) -> anyhow::Result<Vec<Value>> {
        let bound: Vec<(&Parameter, &Value)> = parameters
            .iter()
            .zip(values.iter().map(|p| &p.value))
            .collect();
        match self {
            SqlPool::Postgres(pool) => postgres::query(pool, statement, &bound).await,
            SqlPool::Sqlite(pool) => sqlite::query(pool, statement, &bound).await,
        }
    }

    /// Run caller-supplied SQL without binding. May contain several statements.
    async fn execute(&self, sql: &str) -> anyhow::Result<Vec<Value>> {
        match self {
            SqlPool::Postgres(pool) => postgres::execute(pool, sql).await,
            SqlPool::Sqlite(pool) => sqlite::execute(pool, sql).await,
        }
    }
}

/// Configuration of a `postgres-sql` or `sqlite-sql` tool.
///
/// ```yaml
/// tools:
///   search-hotels:
///     kind: sqlite-sql
///     source: hotels-db
///     description: Search hotels by id or name.
///     statement: SELECT * FROM {{.tableName}} WHERE id = ? OR name = ?
///     parameters:
///       - name: id
///         type: string
///         description: Hotel id
///       - name: name
///         type: string
///         description: Hotel name
///     templateParameters:
///       - name: tableName
///         type: string
///         description: Table to search
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct SqlConfig {
    #[serde(skip)]
    pub name: String,

    #[serde(skip)]
    pub dialect: Dialect,

    pub kind: String,

    pub source: String,

    pub description: String,

    pub statement: String,

    #[serde(default)]
    pub parameters: Parameters,

    #[serde(default)]
    pub template_parameters: Parameters,

    #[serde(default)]
    pub auth_required: Vec<String>,
}

fn decode_sql(
    name: &str,
    node: serde_yaml::Value,
    dialect: Dialect,
) -> Result<Box<dyn ToolConfig>, serde_yaml::Error> {
    let mut config: SqlConfig = serde_yaml::from_value(node)?;
    config.name = name.to_string();
    config.dialect = dialect;
    Ok(Box::new(config))
}

pub fn decode_postgres_sql(
    name: &str,
    node: serde_yaml::Value,
) -> Result<Box<dyn ToolConfig>, serde_yaml::Error> {
    decode_sql(name, node, Dialect::Postgres)
}

pub fn decode_sqlite_sql(
    name: &str,
    node: serde_yaml::Value,
) -> Result<Box<dyn ToolConfig>, serde_yaml::Error> {
    decode_sql(name, node, Dialect::Sqlite)
}

impl ToolConfig for SqlConfig {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        self.dialect.statement_kind()
    }

    fn initialize(&self, sources: &SourceMap) -> Result<Arc<dyn Tool>, ToolError> {
        let kind = self.kind();
        let pool = self.dialect.resolve_pool(kind, sources, &self.source)?;

        let processed = process_parameters(&self.template_parameters, &self.parameters)?;
        let metadata = ToolMetadata::with_manifests(
            &self.name,
            &self.description,
            &self.auth_required,
            processed.parameters,
            processed.manifest,
            processed.mcp_schema,
        );

        tracing::debug!(tool = %self.name, kind, source = %self.source, "initialized tool");
        Ok(Arc::new(SqlTool {
            metadata,
            kind,
            pool,
            statement: self.statement.clone(),
            parameters: self.parameters.clone(),
            template_parameters: self.template_parameters.clone(),
        }))
    }
}

/// A tool running a fixed statement.
#[derive(Debug)]
pub struct SqlTool {
    metadata: ToolMetadata,
    kind: &'static str,
    pool: SqlPool,
    statement: String,
    parameters: Parameters,
    template_parameters: Parameters,
}

#[async_trait]
impl Tool for SqlTool {
    fn metadata(&self) -> &ToolMetadata {
        &self.metadata
    }

    fn kind(&self) -> &'static str {
        self.kind
    }

    async fn invoke(&self, params: ParamValues) -> Result<Value, ToolError> {
        let values = params.as_map();
        let statement =
            resolve_template_params(&self.template_parameters, &self.statement, &values)?;
        let bound = get_params(&self.parameters, &values)?;

        tracing::debug!(tool = %self.metadata.name, %statement, "running statement");
        let rows = self
            .pool
            .query(&statement, &self.parameters, &bound)
            .await
            .map_err(|e| ToolError::backend(&self.metadata.name, "run statement", e))?;
        Ok(Value::Array(rows))
    }
}

/// Configuration of a `postgres-execute-sql` or `sqlite-execute-sql` tool.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ExecuteSqlConfig {
    #[serde(skip)]
    pub name: String,

    #[serde(skip)]
    pub dialect: Dialect,

    pub kind: String,

    pub source: String,

    pub description: String,

    #[serde(default)]
    pub auth_required: Vec<String>,
}

fn decode_execute_sql(
    name: &str,
    node: serde_yaml::Value,
    dialect: Dialect,
) -> Result<Box<dyn ToolConfig>, serde_yaml::Error> {
    let mut config: ExecuteSqlConfig = serde_yaml::from_value(node)?;
    config.name = name.to_string();
    config.dialect = dialect;
    Ok(Box::new(config))
}

pub fn decode_postgres_execute_sql(
    name: &str,
    node: serde_yaml::Value,
) -> Result<Box<dyn ToolConfig>, serde_yaml::Error> {
    decode_execute_sql(name, node, Dialect::Postgres)
}

pub fn decode_sqlite_execute_sql(
    name: &str,
    node: serde_yaml::Value,
) -> Result<Box<dyn ToolConfig>, serde_yaml::Error> {
    decode_execute_sql(name, node, Dialect::Sqlite)
}

const SQL_PARAMETER: &str = "sql";

impl ToolConfig for ExecuteSqlConfig {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        self.dialect.execute_kind()
    }

    fn initialize(&self, sources: &SourceMap) -> Result<Arc<dyn Tool>, ToolError> {
        let kind = self.kind();
        let pool = self.dialect.resolve_pool(kind, sources, &self.source)?;

        let parameters = Parameters::new(vec![Parameter::string(
            SQL_PARAMETER,
            "The sql to execute.",
        )])?;
        let metadata =
            ToolMetadata::new(&self.name, &self.description, &self.auth_required, parameters);

        tracing::debug!(tool = %self.name, kind, source = %self.source, "initialized tool");
        Ok(Arc::new(ExecuteSqlTool {
            metadata,
            kind,
            pool,
        }))
    }
}

/// A tool running arbitrary caller-supplied SQL.
#[derive(Debug)]
pub struct ExecuteSqlTool {
    metadata: ToolMetadata,
    kind: &'static str,
    pool: SqlPool,
}

#[async_trait]
impl Tool for ExecuteSqlTool {
    fn metadata(&self) -> &ToolMetadata {
        &self.metadata
    }

    fn kind(&self) -> &'static str {
        self.kind
    }

    async fn invoke(&self, params: ParamValues) -> Result<Value, ToolError> {
        let sql = params
            .get(SQL_PARAMETER)
            .and_then(Value::as_str)
            .ok_or_else(|| conduit_core::ParameterError::Required {
                name: SQL_PARAMETER.to_string(),
            })?;

        tracing::debug!(tool = %self.metadata.name, %sql, "executing sql");
        let rows = self
            .pool
            .execute(sql)
            .await
            .map_err(|e| ToolError::backend(&self.metadata.name, "execute sql", e))?;
        Ok(Value::Array(rows))
    }
}
