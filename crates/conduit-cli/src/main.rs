use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use conduit_runtime::{Bootstrap, Gateway, ToolsFile};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod prebuilt;

const DEFAULT_TOOLS_FILE: &str = "tools.yaml";

#[derive(Parser, Debug)]
#[command(name = "conduit", version, about = "Conduit connector gateway")]
struct Cli {
    /// Tools file to load. Repeat to merge several files.
    #[arg(long = "tools-file", global = true, conflicts_with = "tools_folder")]
    tools_files: Vec<PathBuf>,

    /// Load and merge every *.yaml and *.yml file in this folder.
    #[arg(long = "tools-folder", global = true)]
    tools_folder: Option<PathBuf>,

    /// Use the tools file built in for a source type: postgres, redis or sqlite.
    #[arg(
        long,
        global = true,
        conflicts_with_all = ["tools_files", "tools_folder"]
    )]
    prebuilt: Option<String>,

    /// Minimum level of log events written to stderr.
    #[arg(
        long,
        global = true,
        env = "CONDUIT_LOG_LEVEL",
        value_enum,
        default_value_t = LogLevel::Info
    )]
    log_level: LogLevel,

    /// Log line format.
    #[arg(long, global = true, value_enum, default_value_t = LoggingFormat::Standard)]
    logging_format: LoggingFormat,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode the tools files. With --connect, also initialize every source and tool.
    Validate {
        #[arg(long, default_value_t = false)]
        connect: bool,
    },

    /// Print the manifest of a toolset as JSON.
    List {
        /// Toolset name. Defaults to the toolset holding every tool.
        #[arg(long, default_value = "")]
        toolset: String,
    },

    /// Print the MCP tools list of a toolset as JSON.
    McpList {
        #[arg(long, default_value = "")]
        toolset: String,
    },

    /// Invoke one tool and print its result as JSON.
    Invoke {
        tool: String,

        /// Tool arguments as a JSON object.
        #[arg(long, default_value = "{}")]
        params: String,

        /// Auth service treated as verified. Repeatable.
        #[arg(long = "auth-service")]
        auth_services: Vec<String>,

        /// Claims per auth service, e.g. '{"google": {"email": "a@b.c"}}'.
        #[arg(long, default_value = "{}")]
        claims: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LoggingFormat {
    Standard,
    Json,
}

/// Install the global subscriber. `RUST_LOG` overrides `--log-level`.
fn init_logging(level: LogLevel, format: LoggingFormat) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level.as_str()))
        .context("invalid log filter")?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LoggingFormat::Standard => builder.init(),
        LoggingFormat::Json => builder.json().init(),
    }
    Ok(())
}

impl Cli {
    fn load_tools_file(&self, bootstrap: &Bootstrap) -> Result<ToolsFile> {
        if let Some(name) = &self.prebuilt {
            let text = prebuilt::get(name)?;
            tracing::info!(prebuilt = %name, "using prebuilt tool configuration");
            return ToolsFile::parse(&text, bootstrap)
                .context("unable to parse prebuilt tool configuration");
        }
        if let Some(folder) = &self.tools_folder {
            return ToolsFile::load_folder(folder, bootstrap)
                .with_context(|| format!("unable to load tools folder {}", folder.display()));
        }
        let files = if self.tools_files.is_empty() {
            vec![PathBuf::from(DEFAULT_TOOLS_FILE)]
        } else {
            self.tools_files.clone()
        };
        Ok(ToolsFile::load_files(&files, bootstrap)?)
    }

    /// Server version reported in manifests, tagged with the prebuilt source type.
    fn version(&self) -> String {
        match &self.prebuilt {
            Some(name) => format!("{}+prebuilt.{name}", env!("CARGO_PKG_VERSION")),
            None => env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

async fn initialize(cli: &Cli, tools_file: &ToolsFile) -> Result<Gateway> {
    Gateway::initialize(tools_file, &cli.version())
        .await
        .context("unable to initialize gateway")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level, cli.logging_format)?;

    let bootstrap = Bootstrap::builtin()?;
    let tools_file = cli.load_tools_file(&bootstrap)?;

    match &cli.cmd {
        Command::Validate { connect } => {
            let gateway = if *connect {
                Some(initialize(&cli, &tools_file).await?)
            } else {
                None
            };
            commands::validate::run(&tools_file, gateway.as_ref())?
        }

        Command::List { toolset } => {
            let gateway = initialize(&cli, &tools_file).await?;
            commands::list::run_manifest(&gateway, toolset)?
        }

        Command::McpList { toolset } => {
            let gateway = initialize(&cli, &tools_file).await?;
            commands::list::run_mcp(&gateway, toolset)?
        }

        Command::Invoke {
            tool,
            params,
            auth_services,
            claims,
        } => {
            let gateway = initialize(&cli, &tools_file).await?;
            commands::invoke::run(&gateway, tool, params, auth_services, claims).await?
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prebuilt_conflicts_with_tools_file() {
        let err = Cli::try_parse_from([
            "conduit",
            "--prebuilt",
            "sqlite",
            "--tools-file",
            "tools.yaml",
            "list",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);

        let err = Cli::try_parse_from([
            "conduit",
            "list",
            "--prebuilt",
            "redis",
            "--tools-folder",
            ".",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_prebuilt_loads_embedded_tools_file() {
        let cli = Cli::try_parse_from(["conduit", "--prebuilt", "sqlite", "list"]).unwrap();
        let bootstrap = Bootstrap::builtin().unwrap();

        let tools_file = cli.load_tools_file(&bootstrap).unwrap();

        assert!(tools_file.tools.contains_key("execute_sql"));
        assert!(tools_file.toolsets.contains_key("sqlite-database-tools"));
        assert!(cli.version().ends_with("+prebuilt.sqlite"));
    }

    #[test]
    fn test_unknown_prebuilt_is_rejected() {
        let cli = Cli::try_parse_from(["conduit", "--prebuilt", "oracle", "list"]).unwrap();
        let bootstrap = Bootstrap::builtin().unwrap();

        let err = cli.load_tools_file(&bootstrap).unwrap_err();

        assert!(err.to_string().contains("Allowed: postgres, redis, sqlite"));
    }
}
