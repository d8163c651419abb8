//! Error types for the sources crate.

use thiserror::Error;

/// Errors raised while decoding or initializing sources.
#[derive(Debug, Error)]
pub enum SourceError {
    /// No factory is registered for the kind.
    #[error("unknown source kind: \"{kind}\"")]
    UnknownKind { kind: String },

    /// The configuration node did not match the kind's schema.
    #[error("unable to parse source \"{name}\" as \"{kind}\": {source}")]
    Decode {
        name: String,
        kind: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// Connecting to or preparing the backend failed.
    #[error("unable to initialize source \"{name}\" ({kind}): {source:#}")]
    Initialize {
        name: String,
        kind: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Errors raised while populating a registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A factory for the kind was already registered.
    #[error("{registry} kind \"{kind}\" is already registered")]
    DuplicateKind { registry: &'static str, kind: String },
}

/// Errors raised by the local document store.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// The document path is not a safe relative path.
    #[error("invalid document path \"{path}\": {reason}")]
    InvalidPath { path: String, reason: &'static str },

    /// Reading or writing the document file failed.
    #[error("I/O error on document \"{path}\": {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The document file does not hold valid JSON.
    #[error("document \"{path}\" is not valid JSON: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors returned by a single redis command.
#[derive(Debug, Error)]
pub enum RedisCommandError {
    #[error("empty command")]
    EmptyCommand,

    #[error(transparent)]
    Pool(#[from] deadpool_redis::PoolError),

    #[error(transparent)]
    Command(#[from] redis::RedisError),
}
