//! Extract command: print the client invocation that writes query results
//! to stdout.

use super::format_args::FormatArgs;
use super::Connection;
use clap::Args;
use std::path::Path;
use tracing::debug;

#[derive(Args, Debug)]
#[command(after_help = "Examples:
  dbpipe extract dwh
  dbpipe extract dwh --delimiter tab --quote none --null '\\N'
  dbpipe extract dwh --format jsonl")]
pub struct ExtractArgs {
    /// Database alias from the connections file
    #[arg(value_name = "DB")]
    pub db: String,

    #[command(flatten)]
    pub format: FormatArgs,

    /// Session timezone (defaults to the file's default_timezone where supported)
    #[arg(long, value_name = "TZ")]
    pub timezone: Option<String>,
}

pub fn run(config: Option<&Path>, args: ExtractArgs) -> anyhow::Result<()> {
    let connection = Connection::open(config, &args.db)?;
    let format = args
        .format
        .to_spec(connection.db.capabilities().default_csv())?;
    debug!(db = %args.db, %format, "extract format");
    let options = connection.options(args.timezone, false);
    let command = dbpipe::build_extract_command(&connection.db, &format, &options)?;
    println!("{}", command);
    Ok(())
}
