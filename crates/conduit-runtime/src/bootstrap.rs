//! Registry construction.

use conduit_sources::{RegistryError, SourceRegistry};
use conduit_tools::ToolRegistry;

/// The source and tool registries used to decode tools files.
///
/// Built once at startup and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct Bootstrap {
    pub sources: SourceRegistry,
    pub tools: ToolRegistry,
}

impl Bootstrap {
    pub fn new(sources: SourceRegistry, tools: ToolRegistry) -> Self {
        Self { sources, tools }
    }

    /// Registries holding every built-in source and tool kind.
    pub fn builtin() -> Result<Self, RegistryError> {
        let bootstrap = Self::new(SourceRegistry::builtin()?, ToolRegistry::builtin()?);
        tracing::debug!(
            source_kinds = bootstrap.sources.kinds().count(),
            tool_kinds = bootstrap.tools.kinds().count(),
            "registered built-in kinds"
        );
        Ok(bootstrap)
    }
}
