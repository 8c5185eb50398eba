//! Capabilities command: what a dialect's client can extract, load and set.

use clap::Args;
use dbpipe::config::{default_path, ConnectionsFile};
use dbpipe::dialect::{NullConvention, StagingProvider};
use dbpipe::{Dialect, DialectCapabilities, FormatKind};
use std::collections::BTreeSet;
use std::path::Path;

#[derive(Args, Debug)]
#[command(after_help = "Examples:
  dbpipe capabilities
  dbpipe capabilities postgres
  dbpipe capabilities dwh --json")]
pub struct CapabilitiesArgs {
    /// Dialect name or database alias (all dialects when omitted)
    #[arg(value_name = "NAME")]
    pub name: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(config: Option<&Path>, args: CapabilitiesArgs) -> anyhow::Result<()> {
    let selected: Vec<DialectCapabilities> = match &args.name {
        Some(name) => vec![lookup(config, name)?],
        None => Dialect::all().iter().map(|d| d.capabilities()).collect(),
    };

    // Always an array, even for a single name, so one schema fits both.
    if args.json {
        println!("{}", serde_json::to_string_pretty(&selected)?);
        return Ok(());
    }

    for (i, caps) in selected.iter().enumerate() {
        if i > 0 {
            println!();
        }
        print_capabilities(caps);
    }
    Ok(())
}

/// Aliases from the connections file win over dialect names.
fn lookup(config: Option<&Path>, name: &str) -> anyhow::Result<DialectCapabilities> {
    if default_path(config).is_some() {
        let file = ConnectionsFile::discover(config)?;
        if let Ok(db) = file.resolve(name) {
            return Ok(db.capabilities());
        }
    }
    let dialect: Dialect = name.parse().map_err(anyhow::Error::msg)?;
    Ok(dialect.capabilities())
}

fn kinds(set: &BTreeSet<FormatKind>) -> String {
    if set.is_empty() {
        return "-".to_string();
    }
    set.iter()
        .map(|k| k.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

fn print_capabilities(caps: &DialectCapabilities) {
    println!("{} ({})", caps.dialect, caps.client);
    println!("  extract:     {}", kinds(&caps.extract_formats));
    println!("  load:        {}", kinds(&caps.load_formats));
    println!(
        "  delimiter:   {}",
        dbpipe::shell::display_char(caps.default_delimiter)
    );
    println!(
        "  quote:       {}",
        caps.default_quote
            .map(|q| q.to_string())
            .unwrap_or_else(|| "none".to_string())
    );
    match &caps.extract_null {
        NullConvention::Fixed(s) => println!("  null:        {:?} (fixed)", s),
        NullConvention::Configurable => println!("  null:        configurable"),
    }
    println!(
        "  header/footer: {}/{}",
        yes_no(caps.header_control),
        yes_no(caps.footer_control)
    );
    match caps.staging {
        Some(StagingProvider::Gcs) => println!("  staging:     gcs"),
        Some(StagingProvider::S3) => println!("  staging:     s3"),
        None => {}
    }
    println!("  timezone:    {}", yes_no(caps.supports_timezone));
    println!("  echo:        {}", yes_no(caps.supports_echo));
}
