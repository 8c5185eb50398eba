//! PostgreSQL through `psql`.
//!
//! CSV and JSONL extraction rewrite the statement into `COPY (...) TO STDOUT`
//! and `row_to_json`, native extraction post-filters unaligned psql output.
//! Loads stream into `COPY ... FROM STDIN`.

use super::capabilities::{
    kinds, DialectCapabilities, DialectStrategy, ExtractStrategy, NullConvention,
    StatementTermination,
};
use super::Dialect;
use crate::command::{LoadCommand, QueryOptions, TableName};
use crate::error::{PlanError, Side};
use crate::format::{CsvOptions, Escaping, FormatKind, FormatSpec};
use crate::shell::{self, PIPE};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostgresConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    /// See https://www.postgresql.org/docs/current/libpq-ssl.html
    pub sslmode: Option<String>,
    pub sslrootcert: Option<String>,
    pub sslcert: Option<String>,
    pub sslkey: Option<String>,
}

pub(super) fn capabilities() -> DialectCapabilities {
    DialectCapabilities {
        dialect: Dialect::Postgres,
        client: "psql",
        extract_formats: kinds(&[
            FormatKind::Csv,
            FormatKind::NewlineDelimitedJson,
            FormatKind::Native,
        ]),
        load_formats: kinds(&[
            FormatKind::Csv,
            FormatKind::NewlineDelimitedJson,
            FormatKind::Native,
        ]),
        default_delimiter: ',',
        default_quote: Some('"'),
        extract_null: NullConvention::Configurable,
        load_null: None,
        header_control: true,
        footer_control: true,
        staging: None,
        supports_timezone: true,
        supports_echo: true,
        strategy: DialectStrategy {
            termination: StatementTermination::None,
            extract: ExtractStrategy::SqlRewrite,
        },
    }
}

/// Which psql flavour is talking: Redshift rejects `PGOPTIONS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Flavour {
    Postgres,
    Redshift,
}

/// `psql` reading statements from stdin, credentials in the environment.
pub(super) fn psql(config: &PostgresConfig, options: &QueryOptions, flavour: Flavour) -> String {
    let port = config.port.map(|p| p.to_string());
    let mut command = shell::env_prefix([
        ("PGTZ", options.timezone.as_deref()),
        ("PGPASSWORD", config.password.as_deref()),
        ("PGSSLMODE", config.sslmode.as_deref()),
        ("PGSSLROOTCERT", config.sslrootcert.as_deref()),
        ("PGSSLCERT", config.sslcert.as_deref()),
        ("PGSSLKEY", config.sslkey.as_deref()),
    ]);
    if flavour == Flavour::Postgres {
        command.push_str("PGOPTIONS=--client-min-messages=warning ");
    }
    command.push_str("psql");
    if let Some(user) = &config.user {
        command.push_str(&format!(" --username={}", shell::quote(user)));
    }
    if let Some(host) = &config.host {
        command.push_str(&format!(" --host={}", shell::quote(host)));
    }
    if let Some(port) = &port {
        command.push_str(&format!(" --port={}", port));
    }
    if options.echo_queries {
        command.push_str(" --echo-all");
    }
    command.push_str(" --no-psqlrc --set ON_ERROR_STOP=on");
    if let Some(database) = &config.database {
        command.push(' ');
        command.push_str(&shell::quote(database));
    }
    command
}

pub(super) fn query_command(
    config: &PostgresConfig,
    options: &QueryOptions,
) -> Result<String, PlanError> {
    Ok(psql(config, options, Flavour::Postgres))
}

/// Extraction never echoes: the statement would end up in the data.
pub(super) fn silent(options: &QueryOptions) -> QueryOptions {
    options.clone().with_echo(false)
}

/// Unaligned psql output with blank lines removed.
pub(super) fn native_extract(psql: String, delimiter: char, header: bool, footer: bool) -> String {
    let mut command = psql;
    if !header {
        command.push_str(" --tuples-only");
    }
    if !footer {
        command.push_str(" --pset=footer=off");
    }
    command.push_str(&format!(
        " --no-align --field-separator={}",
        shell::quote(&delimiter.to_string())
    ));
    command.push_str(PIPE);
    command.push_str("sed '/^$/d'");
    command
}

pub(super) fn extract_command(
    config: &PostgresConfig,
    format: &FormatSpec,
    options: &QueryOptions,
) -> Result<String, PlanError> {
    let psql = psql(config, &silent(options), Flavour::Postgres);
    match format {
        FormatSpec::Native => Ok(native_extract(psql, '\t', false, false)),
        FormatSpec::Csv(csv) => {
            if csv.has_footer {
                return Err(PlanError::unimplemented(
                    Dialect::Postgres,
                    "a footer row in COPY output",
                ));
            }
            let suffix = format!(") TO STDOUT WITH ({})", copy_options(csv));
            Ok(format!(
                "{}{}{}",
                shell::wrap_statement("COPY (", &suffix),
                PIPE,
                psql
            ))
        }
        FormatSpec::NewlineDelimitedJson => Ok(format!(
            "{}{}{} --tuples-only --pset=footer=off --no-align{}sed '/^$/d'",
            shell::wrap_statement(
                "SELECT row_to_json(dbpipe_row)::text FROM (",
                ") AS dbpipe_row"
            ),
            PIPE,
            psql,
            PIPE
        )),
        other => Err(capabilities().unsupported(Side::Extract, other.kind())),
    }
}

pub(super) fn load_command(
    config: &PostgresConfig,
    table: &TableName,
    format: &FormatSpec,
    options: &QueryOptions,
) -> Result<LoadCommand, PlanError> {
    let sql = match format {
        FormatSpec::Csv(csv) => format!("COPY {} FROM STDIN WITH ({})", table, copy_options(csv)),
        // One JSON document per row into a single json/jsonb column
        FormatSpec::NewlineDelimitedJson => format!("COPY {} FROM STDIN", table),
        FormatSpec::Native => format!("COPY {} FROM STDIN WITH (FORMAT text, NULL '')", table),
        other => return Err(capabilities().unsupported(Side::Load, other.kind())),
    };
    Ok(LoadCommand::direct(format!(
        "{}{}--command={}",
        psql(config, options, Flavour::Postgres),
        shell::CONTINUATION,
        shell::quote(&sql)
    )))
}

/// Option list for `COPY ... WITH (...)`.
///
/// Unquoted formats map to COPY's text format, quoted ones to CSV.
pub(super) fn copy_options(csv: &CsvOptions) -> String {
    let mut options = Vec::new();
    match csv.quote {
        Some(quote) => {
            options.push("FORMAT csv".to_string());
            options.push(format!("DELIMITER {}", sql_literal(&csv.delimiter.to_string())));
            options.push(format!("QUOTE {}", sql_literal(&quote.to_string())));
        }
        None => {
            options.push("FORMAT text".to_string());
            options.push(format!("DELIMITER {}", sql_literal(&csv.delimiter.to_string())));
        }
    }
    if let Some(null) = &csv.null_string {
        options.push(format!("NULL {}", sql_literal(null)));
    }
    if csv.has_header {
        options.push("HEADER true".to_string());
    }
    options.join(", ")
}

/// A PostgreSQL string literal for `value`.
///
/// Values with backslashes or control characters become `E''` strings so each
/// backslash is written exactly once more than it appears in the value.
pub(super) fn sql_literal(value: &str) -> String {
    let needs_escape_string = value.chars().any(|c| c == '\\' || c.is_control());
    if !needs_escape_string {
        return format!("'{}'", value.replace('\'', "''"));
    }
    let mut out = String::from("E'");
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c if c.is_control() => out.push_str(&format!("\\x{:02X}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

pub(super) fn extract_escaping(format: &FormatSpec) -> Escaping {
    match format {
        FormatSpec::Csv(csv) if csv.quote.is_none() => Escaping::Backslash,
        _ => Escaping::Literal,
    }
}

pub(super) fn load_escaping(format: &FormatSpec) -> Escaping {
    match format {
        FormatSpec::Csv(csv) if csv.quote.is_some() => Escaping::Literal,
        FormatSpec::Csv(_) | FormatSpec::NewlineDelimitedJson | FormatSpec::Native => {
            Escaping::Backslash
        }
        _ => Escaping::Literal,
    }
}
