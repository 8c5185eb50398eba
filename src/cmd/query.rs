//! Query command: print the client invocation for a statement on stdin.

use super::Connection;
use clap::Args;
use std::path::Path;

#[derive(Args, Debug)]
#[command(after_help = "Examples:
  echo 'SELECT 1' | sh -c \"$(dbpipe query dwh)\"
  dbpipe query dwh --timezone Europe/Berlin --echo")]
pub struct QueryArgs {
    /// Database alias from the connections file
    #[arg(value_name = "DB")]
    pub db: String,

    /// Session timezone (defaults to the file's default_timezone where supported)
    #[arg(long, value_name = "TZ")]
    pub timezone: Option<String>,

    /// Make the client print each statement it runs
    #[arg(long)]
    pub echo: bool,
}

pub fn run(config: Option<&Path>, args: QueryArgs) -> anyhow::Result<()> {
    let connection = Connection::open(config, &args.db)?;
    let options = connection.options(args.timezone, args.echo);
    let command = dbpipe::build_query_command(&connection.db, &options)?;
    println!("{}", command);
    Ok(())
}
