//! # conduit-sources
//!
//! Sources are the configured connections tools run against. Each entry
//! under `sources:` in a tools file names a `kind`, which selects the factory
//! that decodes the rest of the entry:
//!
//! | Kind | Backend | Capability |
//! |------|---------|------------|
//! | `postgres` | PostgreSQL via sqlx | [`Source::postgres_pool`] |
//! | `sqlite` | SQLite via sqlx | [`Source::sqlite_pool`] |
//! | `local-documents` | JSON files on disk | [`Source::document_store`] |
//! | `redis` | Redis via a deadpool pool | [`Source::redis_store`] |
//!
//! Decoding is pure; [`SourceConfig::initialize`] is the only step that
//! touches the backend.

pub mod documents;
pub mod error;
pub mod postgres;
pub mod redis;
pub mod registry;
pub mod source;
pub mod sqlite;

pub use documents::{DocumentStore, DocumentsConfig, DocumentsSource};
pub use error::{DocumentError, RedisCommandError, RegistryError, SourceError};
pub use postgres::{PostgresConfig, PostgresSource};
pub use crate::redis::{RedisConfig, RedisSource, RedisStore};
pub use registry::{SourceFactory, SourceRegistry, register_builtin};
pub use source::{Source, SourceConfig, SourceMap, initialize_source};
pub use sqlite::{SqliteConfig, SqliteSource};
