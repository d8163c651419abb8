//! # conduit-tools
//!
//! Tools are parameterized operations bound to exactly one source. Each entry
//! under `tools:` in a tools file names a `kind` and a `source`:
//!
//! | Kind | Compatible sources | Parameters |
//! |------|--------------------|------------|
//! | `postgres-sql` | `postgres` | declared + template |
//! | `postgres-execute-sql` | `postgres` | `sql` |
//! | `sqlite-sql` | `sqlite` | declared + template |
//! | `sqlite-execute-sql` | `sqlite` | `sql` |
//! | `local-documents-get` | `local-documents` | `documentPaths` |
//! | `local-documents-delete` | `local-documents` | `documentPaths` |
//! | `redis` | `redis` | declared |
//!
//! ## Invocation
//!
//! ```text
//! authorized(verified) ──► parse_params(data, claims) ──► invoke(ParamValues) ──► JSON
//! ```
//!
//! Source compatibility is checked once, in [`ToolConfig::initialize`].

pub mod documents;
pub mod error;
pub mod redis;
pub mod registry;
pub mod sql;
pub mod tool;
pub mod toolset;

pub use error::ToolError;
pub use registry::{ToolFactory, ToolRegistry, register_builtin};
pub use tool::{Tool, ToolConfig, ToolMap, ToolMetadata, resolve_source};
pub use toolset::{Toolset, ToolsetConfig, ToolsetError, ToolsetManifest, default_toolset_config};
