//! Load command: print the client invocation that reads rows from stdin
//! into a table.

use super::format_args::FormatArgs;
use super::Connection;
use clap::Args;
use dbpipe::CsvOptions;
use std::path::Path;

#[derive(Args, Debug)]
#[command(after_help = "Examples:
  dbpipe load dwh --table public.accounts
  dbpipe load dwh --table public.accounts --delimiter tab --quote none --null '\\N'
  dbpipe load lake --table events --format parquet --json")]
pub struct LoadArgs {
    /// Database alias from the connections file
    #[arg(value_name = "DB")]
    pub db: String,

    /// Target table, used verbatim
    #[arg(short, long)]
    pub table: String,

    #[command(flatten)]
    pub format: FormatArgs,

    /// Session timezone (defaults to the file's default_timezone where supported)
    #[arg(long, value_name = "TZ")]
    pub timezone: Option<String>,

    /// Output the load plan as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(config: Option<&Path>, args: LoadArgs) -> anyhow::Result<()> {
    let connection = Connection::open(config, &args.db)?;
    // Loads read RFC 4180 CSV unless told otherwise
    let format = args
        .format
        .to_spec(CsvOptions::default().with_quote(Some('"')))?;
    let options = connection.options(args.timezone, false);
    let load = dbpipe::plan_load(&connection.db, &args.table, &format, &options)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&load)?);
    } else {
        println!("{}", load.render());
    }
    Ok(())
}
