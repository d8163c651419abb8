//! SQLite source backed by a single-connection sqlx pool.

use async_trait::async_trait;
use serde::Deserialize;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use crate::source::{Source, SourceConfig};

pub const KIND: &str = "sqlite";

const IN_MEMORY: &str = ":memory:";

/// Configuration of a `sqlite` source.
///
/// `database` is a file path (created if missing) or `:memory:`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct SqliteConfig {
    #[serde(skip)]
    pub name: String,

    pub kind: String,

    pub database: String,
}

pub fn decode(
    name: &str,
    node: serde_yaml::Value,
) -> Result<Box<dyn SourceConfig>, serde_yaml::Error> {
    let mut config: SqliteConfig = serde_yaml::from_value(node)?;
    config.name = name.to_string();
    Ok(Box::new(config))
}

impl SqliteConfig {
    async fn connect_options(&self) -> anyhow::Result<SqliteConnectOptions> {
        if self.database == IN_MEMORY {
            return Ok(SqliteConnectOptions::from_str("sqlite::memory:")?);
        }
        ensure_parent_dir(&self.database).await?;
        Ok(SqliteConnectOptions::new()
            .filename(&self.database)
            .create_if_missing(true))
    }
}

async fn ensure_parent_dir(file_path: &str) -> anyhow::Result<()> {
    match Path::new(file_path).parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            tokio::fs::create_dir_all(parent).await?;
            Ok(())
        }
        _ => Ok(()),
    }
}

#[async_trait]
impl SourceConfig for SqliteConfig {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        KIND
    }

    async fn initialize(&self) -> anyhow::Result<Arc<dyn Source>> {
        // One connection: SQLite allows a single writer, and an in-memory
        // database only lives as long as its connection.
        let options = self.connect_options().await?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        sqlx::query("SELECT 1").execute(&pool).await?;

        tracing::debug!(source = %self.name, database = %self.database, "opened sqlite database");
        Ok(Arc::new(SqliteSource::from_pool(&self.name, pool)))
    }
}

/// An initialized `sqlite` source.
#[derive(Debug, Clone)]
pub struct SqliteSource {
    name: String,
    pool: SqlitePool,
}

impl SqliteSource {
    pub fn from_pool(name: &str, pool: SqlitePool) -> Self {
        Self {
            name: name.to_string(),
            pool,
        }
    }
}

impl Source for SqliteSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        KIND
    }

    fn sqlite_pool(&self) -> Option<&SqlitePool> {
        Some(&self.pool)
    }
}
