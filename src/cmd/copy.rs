//! Copy command: print an extract | transform | load pipeline between two
//! configured databases.

use super::format_args::FormatArgs;
use super::Connection;
use clap::Args;
use dbpipe::config::ConnectionsFile;
use dbpipe::{synthesize_pipeline, PipelineRequest, QueryOptions};
use std::path::Path;
use tracing::info;

#[derive(Args, Debug)]
#[command(after_help = "Examples:
  echo 'SELECT * FROM accounts' | bash -c \"$(dbpipe copy legacy dwh --table public.accounts --pipefail)\"
  dbpipe copy app dwh --table accounts --delimiter tab --quote none
  dbpipe copy app dwh --table accounts --json")]
pub struct CopyArgs {
    /// Source database alias
    #[arg(value_name = "SOURCE")]
    pub source: String,

    /// Target database alias
    #[arg(value_name = "TARGET")]
    pub target: String,

    /// Target table, used verbatim
    #[arg(short, long)]
    pub table: String,

    /// Format flags skip negotiation; unset CSV parameters come from the source
    #[command(flatten)]
    pub format: FormatArgs,

    /// Session timezone for both sides (defaults to the file's default_timezone where supported)
    #[arg(long, value_name = "TZ")]
    pub timezone: Option<String>,

    /// Make both clients print the statements they run
    #[arg(long)]
    pub echo: bool,

    /// Prefix the pipeline with `set -o pipefail` (bash)
    #[arg(long, conflicts_with = "json")]
    pub pipefail: bool,

    /// Output the plan as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(config: Option<&Path>, args: CopyArgs) -> anyhow::Result<()> {
    let file = ConnectionsFile::discover(config)?;
    let source = Connection::from_file(&file, &args.source)?;
    let target = Connection::from_file(&file, &args.target)?;

    let mut request = PipelineRequest::new(source.db, target.db, args.table.clone()).with_options(
        QueryOptions {
            timezone: args.timezone,
            echo_queries: args.echo,
        },
    );
    if let Some(timezone) = file.default_timezone {
        request = request.with_default_timezone(timezone);
    }
    if !args.format.is_empty() {
        let defaults = request.source.capabilities().default_csv();
        request = request.with_format(args.format.to_spec(defaults)?);
    }

    let plan = synthesize_pipeline(&request)?;
    info!(
        source = %args.source,
        target = %args.target,
        format = %plan.format,
        staged = plan.is_staged(),
        "pipeline ready"
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else if args.pipefail {
        println!("{}", plan.render_with_pipefail());
    } else {
        println!("{}", plan.render());
    }
    Ok(())
}
