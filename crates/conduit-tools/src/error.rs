//! Error types for the tools crate.

use conduit_core::ParameterError;
use thiserror::Error;

/// Errors raised while decoding, initializing or invoking tools.
#[derive(Debug, Error)]
pub enum ToolError {
    /// No factory is registered for the kind.
    #[error("unknown tool kind: \"{kind}\"")]
    UnknownKind { kind: String },

    /// The configuration node did not match the kind's schema.
    #[error("unable to parse tool \"{name}\" as kind \"{kind}\": {source}")]
    Decode {
        name: String,
        kind: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// The configuration decoded but is not usable.
    #[error("invalid configuration for tool \"{name}\": {reason}")]
    InvalidConfig { name: String, reason: String },

    /// The tool references a source that is not configured.
    #[error("no source named \"{source_name}\" configured")]
    NoSuchSource { source_name: String },

    /// The referenced source lacks the capability the tool needs.
    #[error("invalid source for \"{kind}\" tool: source kind must be one of {compatible:?}")]
    IncompatibleSource {
        kind: String,
        compatible: Vec<String>,
    },

    /// Request parameters were invalid.
    #[error(transparent)]
    Parameter(#[from] ParameterError),

    /// The backend call failed.
    #[error("tool \"{tool}\" failed to {operation}: {source:#}")]
    Backend {
        tool: String,
        operation: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl ToolError {
    pub fn backend(
        tool: &str,
        operation: &'static str,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Backend {
            tool: tool.to_string(),
            operation,
            source: source.into(),
        }
    }

    pub(crate) fn incompatible(kind: &str, compatible: &[&str]) -> Self {
        Self::IncompatibleSource {
            kind: kind.to_string(),
            compatible: compatible.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incompatible_source_message() {
        let err = ToolError::incompatible("sqlite-sql", &["sqlite"]);
        assert_eq!(
            err.to_string(),
            "invalid source for \"sqlite-sql\" tool: source kind must be one of [\"sqlite\"]"
        );
    }

    #[test]
    fn test_backend_message_includes_cause() {
        let err = ToolError::backend(
            "search",
            "run statement",
            anyhow::anyhow!("no such table: hotels"),
        );
        assert_eq!(
            err.to_string(),
            "tool \"search\" failed to run statement: no such table: hotels"
        );
    }
}
