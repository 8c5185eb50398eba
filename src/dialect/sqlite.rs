//! SQLite through the `sqlite3` shell.
//!
//! `sqlite3` silently creates a missing database file, so every command
//! checks for the file first and fails with a message instead.

use super::capabilities::{
    kinds, DialectCapabilities, DialectStrategy, ExtractStrategy, NullConvention,
    StatementTermination,
};
use super::Dialect;
use crate::command::{LoadCommand, QueryOptions, TableName};
use crate::error::{PlanError, Side};
use crate::format::{CsvOptions, FormatKind, FormatSpec};
use crate::shell;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SqliteConfig {
    pub file_name: String,
}

pub(super) fn capabilities() -> DialectCapabilities {
    DialectCapabilities {
        dialect: Dialect::Sqlite,
        client: "sqlite3",
        extract_formats: kinds(&[FormatKind::Csv, FormatKind::Native]),
        load_formats: kinds(&[FormatKind::Csv]),
        default_delimiter: ',',
        default_quote: Some('"'),
        extract_null: NullConvention::Configurable,
        load_null: Some(String::new()),
        header_control: true,
        footer_control: false,
        staging: None,
        supports_timezone: false,
        supports_echo: true,
        strategy: DialectStrategy {
            termination: StatementTermination::None,
            extract: ExtractStrategy::NativeFlags,
        },
    }
}

/// `sqlite3 -bail <args> <file> <trailing>` behind the file existence guard.
fn sqlite3(config: &SqliteConfig, args: &str, trailing: &str) -> String {
    let file = shell::quote(&config.file_name);
    format!(
        "(test -f {file} || {{ >&2 echo {message}; exit 1; }}; sqlite3 -bail{args} {file}{trailing})",
        file = file,
        message = shell::quote(&format!("{} not found", config.file_name)),
        args = args,
        trailing = trailing,
    )
}

fn check_options(options: &QueryOptions) -> Result<(), PlanError> {
    if options.timezone.is_some() {
        return Err(PlanError::unimplemented(Dialect::Sqlite, "timezone"));
    }
    Ok(())
}

pub(super) fn query_command(config: &SqliteConfig, options: &QueryOptions) -> Result<String, PlanError> {
    check_options(options)?;
    let args = if options.echo_queries { " -echo" } else { "" };
    Ok(sqlite3(config, args, ""))
}

/// Output mode flags for a delimited format.
fn mode_args(csv: &CsvOptions) -> Result<String, PlanError> {
    let mut args = match csv.quote {
        Some('"') => String::from(" -csv"),
        None => String::from(" -list"),
        other => return Err(PlanError::unsupported_quote(Dialect::Sqlite, other, "\" or none")),
    };
    if csv.quote.is_none() || csv.delimiter != ',' {
        args.push_str(&format!(
            " -separator {}",
            shell::quote(&csv.delimiter.to_string())
        ));
    }
    Ok(args)
}

pub(super) fn extract_command(
    config: &SqliteConfig,
    format: &FormatSpec,
    options: &QueryOptions,
) -> Result<String, PlanError> {
    check_options(options)?;
    match format {
        FormatSpec::Native => Ok(sqlite3(config, " -list -noheader", "")),
        FormatSpec::Csv(csv) => {
            capabilities().check_header_footer(csv)?;
            let mut args = mode_args(csv)?;
            args.push_str(if csv.has_header { " -header" } else { " -noheader" });
            if let Some(null) = &csv.null_string {
                args.push_str(&format!(" -nullvalue {}", shell::quote(null)));
            }
            Ok(sqlite3(config, &args, ""))
        }
        other => Err(capabilities().unsupported(Side::Extract, other.kind())),
    }
}

pub(super) fn load_command(
    config: &SqliteConfig,
    table: &TableName,
    format: &FormatSpec,
) -> Result<LoadCommand, PlanError> {
    let csv = match format {
        FormatSpec::Csv(csv) => csv,
        other => return Err(capabilities().unsupported(Side::Load, other.kind())),
    };
    // .import stores empty fields as empty strings, never as NULL
    if let Some(null) = csv.null_string.as_deref().filter(|n| !n.is_empty()) {
        return Err(PlanError::UnsupportedNullString {
            dialect: Dialect::Sqlite,
            null_string: null.to_string(),
        });
    }
    let mut import = String::from(".import");
    if csv.has_header {
        import.push_str(" --skip 1");
    }
    import.push_str(&format!(" /dev/stdin {}", table));
    let trailing = format!(" {}", shell::quote(&import));
    Ok(LoadCommand::direct(sqlite3(config, &mode_args(csv)?, &trailing)))
}
