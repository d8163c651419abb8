//! # conduit-runtime
//!
//! Turns tools files into a running [`Gateway`]:
//!
//! ```text
//! Bootstrap::builtin() ──► ToolsFile::load_files / load_folder ──► Gateway::initialize
//!                                                                        │
//!                                    Gateway::invoke(tool, data, claims, verified)
//! ```

pub mod bootstrap;
pub mod config;
pub mod gateway;

pub use bootstrap::Bootstrap;
pub use config::{ConfigError, ToolsFile, expand_env};
pub use gateway::{Gateway, InvokeError};
