//! The source configuration and runtime source traits.

use async_trait::async_trait;
use sqlx::{PgPool, SqlitePool};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::documents::DocumentStore;
use crate::error::SourceError;
use crate::redis::RedisStore;

/// Initialized sources by instance name.
pub type SourceMap = HashMap<String, Arc<dyn Source>>;

/// A decoded, not yet initialized source configuration.
#[async_trait]
pub trait SourceConfig: Send + Sync + fmt::Debug {
    /// Instance name (the key under `sources`).
    fn name(&self) -> &str;

    /// Kind this configuration was decoded as.
    fn kind(&self) -> &'static str;

    /// Connect to the backend. May perform I/O.
    async fn initialize(&self) -> anyhow::Result<Arc<dyn Source>>;
}

/// A live connection handle shared by every tool bound to it.
///
/// Tools check compatibility through the capability accessors; a source
/// exposes every handle it can serve and leaves the rest as `None`.
pub trait Source: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn kind(&self) -> &'static str;

    fn postgres_pool(&self) -> Option<&PgPool> {
        None
    }

    fn sqlite_pool(&self) -> Option<&SqlitePool> {
        None
    }

    fn document_store(&self) -> Option<&DocumentStore> {
        None
    }

    fn redis_store(&self) -> Option<&RedisStore> {
        None
    }
}

/// Initialize a source, attaching its name and kind to any failure.
pub async fn initialize_source(
    config: &dyn SourceConfig,
) -> Result<Arc<dyn Source>, SourceError> {
    let source = config
        .initialize()
        .await
        .map_err(|source| SourceError::Initialize {
            name: config.name().to_string(),
            kind: config.kind().to_string(),
            source,
        })?;
    tracing::info!(source = %config.name(), kind = config.kind(), "initialized source");
    Ok(source)
}
