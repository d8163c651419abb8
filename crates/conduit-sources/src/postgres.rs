//! PostgreSQL source backed by a sqlx connection pool.

use async_trait::async_trait;
use serde::Deserialize;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::PgPool;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::source::{Source, SourceConfig};

pub const KIND: &str = "postgres";

/// Configuration of a `postgres` source.
///
/// ```yaml
/// sources:
///   my-pg-source:
///     kind: postgres
///     host: 127.0.0.1
///     port: 5432
///     database: app_db
///     user: ${USER_NAME}
///     password: ${PASSWORD}
///     queryParams:
///       sslmode: disable
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct PostgresConfig {
    #[serde(skip)]
    pub name: String,

    pub kind: String,

    /// Hostname of the server.
    pub host: String,

    /// Port of the server.
    #[serde(default = "default_port")]
    pub port: u16,

    pub user: String,

    pub password: String,

    pub database: String,

    /// Connection parameters such as `sslmode` or `application_name`.
    /// Anything else is sent to the server as a runtime setting.
    #[serde(default)]
    pub query_params: BTreeMap<String, String>,

    /// Maximum number of pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// How long to wait for a pooled connection, in seconds.
    #[serde(default = "default_acquire_timeout_seconds")]
    pub acquire_timeout_seconds: u64,
}

fn default_port() -> u16 {
    5432
}

fn default_max_connections() -> u32 {
    10
}

fn default_acquire_timeout_seconds() -> u64 {
    30
}

pub fn decode(
    name: &str,
    node: serde_yaml::Value,
) -> Result<Box<dyn SourceConfig>, serde_yaml::Error> {
    let mut config: PostgresConfig = serde_yaml::from_value(node)?;
    config.name = name.to_string();
    Ok(Box::new(config))
}

impl PostgresConfig {
    /// Connection options built from the configured fields.
    pub fn connect_options(&self) -> anyhow::Result<PgConnectOptions> {
        let mut options = PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.database);

        let mut runtime_settings = Vec::new();
        for (key, value) in &self.query_params {
            match key.as_str() {
                "sslmode" => {
                    let mode = PgSslMode::from_str(value)
                        .map_err(|e| anyhow::anyhow!("invalid sslmode '{}': {}", value, e))?;
                    options = options.ssl_mode(mode);
                }
                "sslrootcert" => options = options.ssl_root_cert(value),
                "application_name" => options = options.application_name(value),
                _ => runtime_settings.push((key.as_str(), value.as_str())),
            }
        }
        if !runtime_settings.is_empty() {
            options = options.options(runtime_settings);
        }
        Ok(options)
    }

    fn pool_options(&self) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(Duration::from_secs(self.acquire_timeout_seconds))
    }
}

#[async_trait]
impl SourceConfig for PostgresConfig {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        KIND
    }

    async fn initialize(&self) -> anyhow::Result<Arc<dyn Source>> {
        let pool = self
            .pool_options()
            .connect_with(self.connect_options()?)
            .await?;

        // Fail fast on bad credentials rather than on the first tool call.
        sqlx::query("SELECT 1").execute(&pool).await?;

        tracing::debug!(
            source = %self.name,
            host = %self.host,
            database = %self.database,
            "connected to postgres"
        );
        Ok(Arc::new(PostgresSource::from_pool(&self.name, pool)))
    }
}

/// An initialized `postgres` source.
#[derive(Debug, Clone)]
pub struct PostgresSource {
    name: String,
    pool: PgPool,
}

impl PostgresSource {
    /// Wrap an existing pool.
    pub fn from_pool(name: &str, pool: PgPool) -> Self {
        Self {
            name: name.to_string(),
            pool,
        }
    }

    /// A source whose pool connects on first use.
    pub fn lazy(name: &str, config: &PostgresConfig) -> anyhow::Result<Self> {
        let pool = config
            .pool_options()
            .connect_lazy_with(config.connect_options()?);
        Ok(Self::from_pool(name, pool))
    }
}

impl Source for PostgresSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        KIND
    }

    fn postgres_pool(&self) -> Option<&PgPool> {
        Some(&self.pool)
    }
}
