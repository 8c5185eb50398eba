mod capabilities;
mod copy;
mod extract;
mod format_args;
mod load;
mod query;
mod schema;

use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use dbpipe::config::ConnectionsFile;
use dbpipe::{DbConfig, QueryOptions};
use std::io;
use std::path::{Path, PathBuf};

pub use capabilities::CapabilitiesArgs;
pub use copy::CopyArgs;
pub use extract::ExtractArgs;
pub use load::LoadArgs;
pub use query::QueryArgs;
pub use schema::SchemaArgs;

#[derive(Parser)]
#[command(name = "dbpipe")]
#[command(version)]
#[command(
    about = "Build shell pipelines that copy data between databases with their native clients",
    long_about = None
)]
pub struct Cli {
    /// Connections file (default: $DBPIPE_CONFIG, then dbpipe/connections.yaml in the user config directory)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log to stderr: -v for debug, -vv for trace (RUST_LOG overrides)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print a command that runs the SQL statement on stdin
    Query(QueryArgs),

    /// Print a command that runs the query on stdin and writes rows to stdout
    Extract(ExtractArgs),

    /// Print a command that loads rows from stdin into a table
    Load(LoadArgs),

    /// Print a pipeline that copies a query result into a table of another database
    Copy(CopyArgs),

    /// Show what a dialect's client supports
    Capabilities(CapabilitiesArgs),

    /// Print JSON schemas for --json output
    Schema(SchemaArgs),

    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,
    },
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.config.as_deref();
    match cli.command {
        Commands::Query(args) => query::run(config, args),
        Commands::Extract(args) => extract::run(config, args),
        Commands::Load(args) => load::run(config, args),
        Commands::Copy(args) => copy::run(config, args),
        Commands::Capabilities(args) => capabilities::run(config, args),
        Commands::Schema(args) => schema::run(args),
        Commands::Completions { shell } => {
            generate(shell, &mut Cli::command(), "dbpipe", &mut io::stdout());
            Ok(())
        }
    }
}

/// A configured connection together with the file's default timezone.
struct Connection {
    db: DbConfig,
    default_timezone: Option<String>,
}

impl Connection {
    fn open(config: Option<&Path>, alias: &str) -> anyhow::Result<Self> {
        let file = ConnectionsFile::discover(config)?;
        Self::from_file(&file, alias)
    }

    fn from_file(file: &ConnectionsFile, alias: &str) -> anyhow::Result<Self> {
        Ok(Self {
            db: file.resolve(alias)?.clone(),
            default_timezone: file.default_timezone.clone(),
        })
    }

    /// An explicit timezone always applies; the default only where the
    /// client can set one.
    fn options(&self, timezone: Option<String>, echo: bool) -> QueryOptions {
        let timezone = timezone.or_else(|| {
            self.default_timezone
                .clone()
                .filter(|_| self.db.capabilities().supports_timezone)
        });
        QueryOptions {
            timezone,
            echo_queries: echo,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(yaml: &str) -> ConnectionsFile {
        serde_yaml_ng::from_str(yaml).unwrap()
    }

    #[test]
    fn test_default_timezone_skipped_when_unsupported() {
        let file = file(
            "default_timezone: UTC\ndatabases:\n  pg:\n    type: postgres\n  lite:\n    type: sqlite\n    file_name: x.db\n",
        );
        let pg = Connection::from_file(&file, "pg").unwrap();
        assert_eq!(pg.options(None, false).timezone.as_deref(), Some("UTC"));
        let lite = Connection::from_file(&file, "lite").unwrap();
        assert_eq!(lite.options(None, false).timezone, None);
        assert_eq!(
            lite.options(Some("CET".into()), false).timezone.as_deref(),
            Some("CET")
        );
    }

    #[test]
    fn test_cli_parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["dbpipe", "query", "dwh", "-vv", "--config", "c.yaml"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config.as_deref(), Some(Path::new("c.yaml")));
    }
}
