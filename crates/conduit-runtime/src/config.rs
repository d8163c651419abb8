//! Tools file loading.
//!
//! A tools file is YAML with three optional top-level sections:
//!
//! ```yaml
//! sources:
//!   hotels-db:
//!     kind: sqlite
//!     database: ${HOTELS_DB}
//! tools:
//!   search-hotels:
//!     kind: sqlite-sql
//!     source: hotels-db
//!     description: Search hotels by name.
//!     statement: SELECT * FROM hotels WHERE name = ?
//!     parameters:
//!       - name: name
//!         type: string
//!         description: Hotel name
//! toolsets:
//!   travel: [search-hotels]
//! ```
//!
//! `${VAR}` is replaced with the environment variable's value before
//! decoding; unset variables are left as written. Several files (or every
//! `*.yaml`/`*.yml` file of a folder) can be merged as long as no name is
//! defined twice.

use conduit_core::is_valid_name;
use conduit_sources::{RegistryError, SourceConfig, SourceError};
use conduit_tools::{ToolConfig, ToolError, ToolsetError};
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;

use crate::bootstrap::Bootstrap;

/// Errors raised while loading tools files or initializing a gateway.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read tools file at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to parse tools file at {path:?}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: Box<ConfigError>,
    },

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{section} \"{name}\" has no `kind`")]
    MissingKind { section: &'static str, name: String },

    #[error("invalid {section} name: \"{name}\"")]
    InvalidName { section: &'static str, name: String },

    #[error(
        "resource conflicts detected:\n  - {}\n\nPlease ensure each source, tool, and toolset has a unique name across all files",
        .0.join("\n  - ")
    )]
    Conflicts(Vec<String>),

    #[error("path {0:?} is not a directory")]
    NotADirectory(PathBuf),

    #[error("no YAML files found in directory {0:?}")]
    NoYamlFiles(PathBuf),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error(transparent)]
    Toolset(#[from] ToolsetError),
}

/// Shape of a tools file before kind dispatch.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawToolsFile {
    #[serde(default)]
    sources: BTreeMap<String, serde_yaml::Value>,

    #[serde(default)]
    tools: BTreeMap<String, serde_yaml::Value>,

    #[serde(default)]
    toolsets: BTreeMap<String, Vec<String>>,
}

/// Decoded, not yet initialized configuration.
#[derive(Debug, Default)]
pub struct ToolsFile {
    pub sources: BTreeMap<String, Box<dyn SourceConfig>>,
    pub tools: BTreeMap<String, Box<dyn ToolConfig>>,
    pub toolsets: BTreeMap<String, Vec<String>>,
}

fn env_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{(\w+)\}").expect("valid env pattern"))
}

/// Replace `${VAR}` with the value of `VAR`, leaving unset variables untouched.
pub fn expand_env(input: &str) -> String {
    env_pattern()
        .replace_all(input, |caps: &regex::Captures<'_>| {
            std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}

fn kind_of(
    section: &'static str,
    name: &str,
    node: &serde_yaml::Value,
) -> Result<String, ConfigError> {
    node.get("kind")
        .and_then(serde_yaml::Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ConfigError::MissingKind {
            section,
            name: name.to_string(),
        })
}

fn check_name(section: &'static str, name: &str) -> Result<(), ConfigError> {
    if is_valid_name(name) {
        Ok(())
    } else {
        Err(ConfigError::InvalidName {
            section,
            name: name.to_string(),
        })
    }
}

impl ToolsFile {
    /// Decode a tools file, dispatching every entry on its `kind`.
    pub fn parse(raw: &str, bootstrap: &Bootstrap) -> Result<Self, ConfigError> {
        let raw: RawToolsFile = serde_yaml::from_str(&expand_env(raw))?;
        let mut file = ToolsFile::default();

        for (name, node) in raw.sources {
            let kind = kind_of("source", &name, &node)?;
            let config = bootstrap.sources.decode_config(&kind, &name, node)?;
            file.sources.insert(name, config);
        }

        for (name, node) in raw.tools {
            check_name("tool", &name)?;
            let kind = kind_of("tool", &name, &node)?;
            let config = bootstrap.tools.decode_config(&kind, &name, node)?;
            file.tools.insert(name, config);
        }

        for (name, tool_names) in raw.toolsets {
            check_name("toolset", &name)?;
            file.toolsets.insert(name, tool_names);
        }

        Ok(file)
    }

    /// Read and decode one tools file.
    pub fn from_file(path: impl AsRef<Path>, bootstrap: &Bootstrap) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, bootstrap).map_err(|e| ConfigError::File {
            path: path.to_path_buf(),
            source: Box::new(e),
        })
    }

    /// Merge several files. Every name defined more than once is reported.
    pub fn merge(files: impl IntoIterator<Item = ToolsFile>) -> Result<Self, ConfigError> {
        let mut merged = ToolsFile::default();
        let mut conflicts = Vec::new();

        for (index, file) in files.into_iter().enumerate() {
            let file_number = index + 1;
            for (name, source) in file.sources {
                if merged.sources.contains_key(&name) {
                    conflicts.push(format!("source '{name}' (file #{file_number})"));
                } else {
                    merged.sources.insert(name, source);
                }
            }
            for (name, tool) in file.tools {
                if merged.tools.contains_key(&name) {
                    conflicts.push(format!("tool '{name}' (file #{file_number})"));
                } else {
                    merged.tools.insert(name, tool);
                }
            }
            for (name, toolset) in file.toolsets {
                if merged.toolsets.contains_key(&name) {
                    conflicts.push(format!("toolset '{name}' (file #{file_number})"));
                } else {
                    merged.toolsets.insert(name, toolset);
                }
            }
        }

        if !conflicts.is_empty() {
            return Err(ConfigError::Conflicts(conflicts));
        }
        Ok(merged)
    }

    /// Load and merge the given files, in order.
    pub fn load_files<P: AsRef<Path>>(
        paths: &[P],
        bootstrap: &Bootstrap,
    ) -> Result<Self, ConfigError> {
        let files = paths
            .iter()
            .map(|path| Self::from_file(path, bootstrap))
            .collect::<Result<Vec<_>, _>>()?;
        Self::merge(files)
    }

    /// Load and merge every `*.yaml` and `*.yml` file directly inside `folder`.
    pub fn load_folder(
        folder: impl AsRef<Path>,
        bootstrap: &Bootstrap,
    ) -> Result<Self, ConfigError> {
        let folder = folder.as_ref();
        let io_error = |source| ConfigError::Io {
            path: folder.to_path_buf(),
            source,
        };
        if !fs::metadata(folder).map_err(io_error)?.is_dir() {
            return Err(ConfigError::NotADirectory(folder.to_path_buf()));
        }

        let mut paths = Vec::new();
        for entry in fs::read_dir(folder).map_err(io_error)? {
            let path = entry.map_err(io_error)?.path();
            if path.is_file()
                && path
                    .extension()
                    .map(|e| e == "yaml" || e == "yml")
                    .unwrap_or(false)
            {
                paths.push(path);
            }
        }
        if paths.is_empty() {
            return Err(ConfigError::NoYamlFiles(folder.to_path_buf()));
        }
        paths.sort();

        tracing::debug!(folder = %folder.display(), files = paths.len(), "loading tools folder");
        Self::load_files(&paths, bootstrap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bootstrap() -> Bootstrap {
        Bootstrap::builtin().unwrap()
    }

    const HOTELS: &str = r#"
sources:
  hotels-db:
    kind: sqlite
    database: ":memory:"
tools:
  search-hotels:
    kind: sqlite-sql
    source: hotels-db
    description: Search hotels.
    statement: SELECT * FROM hotels WHERE name = ?
    parameters:
      - name: name
        type: string
        description: Hotel name
toolsets:
  travel: [search-hotels]
"#;

    #[test]
    fn test_parse_dispatches_on_kind() {
        let file = ToolsFile::parse(HOTELS, &bootstrap()).unwrap();

        assert_eq!(file.sources["hotels-db"].kind(), "sqlite");
        assert_eq!(file.tools["search-hotels"].kind(), "sqlite-sql");
        assert_eq!(file.toolsets["travel"], ["search-hotels"]);
    }

    #[test]
    fn test_empty_file_is_valid() {
        let file = ToolsFile::parse("{}", &bootstrap()).unwrap();

        assert!(file.sources.is_empty());
        assert!(file.tools.is_empty());
    }

    #[test]
    fn test_unknown_top_level_key_is_rejected() {
        let err = ToolsFile::parse("widgets: {}", &bootstrap()).unwrap_err();

        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn test_unknown_kinds_name_the_kind() {
        let err = ToolsFile::parse("sources:\n  s:\n    kind: oracle\n", &bootstrap()).unwrap_err();
        assert_eq!(err.to_string(), "unknown source kind: \"oracle\"");

        let err = ToolsFile::parse("tools:\n  t:\n    kind: teleport\n", &bootstrap()).unwrap_err();
        assert_eq!(err.to_string(), "unknown tool kind: \"teleport\"");
    }

    #[test]
    fn test_missing_kind_is_rejected() {
        let err = ToolsFile::parse("sources:\n  s:\n    database: x\n", &bootstrap()).unwrap_err();

        assert_eq!(err.to_string(), "source \"s\" has no `kind`");
    }

    #[test]
    fn test_invalid_tool_name_is_rejected() {
        let err = ToolsFile::parse(&HOTELS.replace("search-hotels:", "search hotels:"), &bootstrap())
            .unwrap_err();

        assert!(matches!(err, ConfigError::InvalidName { section: "tool", .. }));
    }

    #[test]
    fn test_expand_env_replaces_set_variables_only() {
        // SAFETY: the variable name is unique to this test.
        unsafe { std::env::set_var("CONDUIT_TEST_DB_PATH", "/tmp/hotels.db") };

        assert_eq!(
            expand_env("database: ${CONDUIT_TEST_DB_PATH} # ${CONDUIT_TEST_UNSET_VAR}"),
            "database: /tmp/hotels.db # ${CONDUIT_TEST_UNSET_VAR}"
        );
    }

    #[test]
    fn test_merge_reports_every_conflict() {
        let files = vec![
            ToolsFile::parse(HOTELS, &bootstrap()).unwrap(),
            ToolsFile::parse(HOTELS, &bootstrap()).unwrap(),
        ];

        let err = ToolsFile::merge(files).unwrap_err();

        let ConfigError::Conflicts(conflicts) = &err else {
            panic!("expected conflicts, got {err}");
        };
        assert_eq!(
            conflicts,
            &[
                "source 'hotels-db' (file #2)",
                "tool 'search-hotels' (file #2)",
                "toolset 'travel' (file #2)",
            ]
        );
        assert!(
            err.to_string()
                .starts_with("resource conflicts detected:\n  - source 'hotels-db'")
        );
    }

    #[test]
    fn test_load_folder_merges_yaml_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("a.yaml"),
            "sources:\n  db:\n    kind: sqlite\n    database: ':memory:'\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("b.yml"),
            "tools:\n  run-sql:\n    kind: sqlite-execute-sql\n    source: db\n    description: Run SQL.\n",
        )
        .unwrap();
        fs::write(dir.path().join("notes.txt"), "not yaml").unwrap();

        let file = ToolsFile::load_folder(dir.path(), &bootstrap()).unwrap();

        assert_eq!(file.sources.len(), 1);
        assert_eq!(file.tools.len(), 1);
    }

    #[test]
    fn test_load_folder_without_yaml_files_fails() {
        let dir = tempfile::tempdir().unwrap();

        let err = ToolsFile::load_folder(dir.path(), &bootstrap()).unwrap_err();

        assert!(matches!(err, ConfigError::NoYamlFiles(_)));
    }

    #[test]
    fn test_load_files_names_the_failing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.yaml");
        fs::write(&path, "tools:\n  t:\n    kind: teleport\n").unwrap();

        let err = ToolsFile::load_files(&[&path], &bootstrap()).unwrap_err();

        assert!(matches!(err, ConfigError::File { .. }));
        assert!(err.to_string().contains("broken.yaml"));
    }
}
