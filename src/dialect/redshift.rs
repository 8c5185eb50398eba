//! Amazon Redshift: `psql` for queries, S3 staging for loads.

use super::capabilities::{
    kinds, DialectCapabilities, DialectStrategy, ExtractStrategy, NullConvention,
    StagingProvider, StatementTermination,
};
use super::postgres::{self, Flavour, PostgresConfig};
use super::Dialect;
use crate::command::{LoadCommand, QueryOptions, TableName};
use crate::error::{PlanError, Side};
use crate::format::{Escaping, FormatKind, FormatSpec};
use crate::shell;
use crate::staging::{StagedLoad, OBJECT_VAR};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedshiftConfig {
    #[serde(flatten)]
    pub connection: PostgresConfig,
    pub aws_access_key_id: Option<String>,
    pub aws_secret_access_key: Option<String>,
    /// Bucket used to stage data for `COPY ... FROM 's3://...'`
    pub aws_s3_bucket_name: Option<String>,
}

pub(super) fn capabilities() -> DialectCapabilities {
    DialectCapabilities {
        dialect: Dialect::Redshift,
        client: "psql",
        extract_formats: kinds(&[FormatKind::Csv, FormatKind::Native]),
        load_formats: kinds(&[
            FormatKind::Csv,
            FormatKind::NewlineDelimitedJson,
            FormatKind::Avro,
            FormatKind::Parquet,
            FormatKind::Orc,
        ]),
        default_delimiter: '\t',
        default_quote: None,
        extract_null: NullConvention::Fixed(String::new()),
        load_null: Some(String::new()),
        header_control: true,
        footer_control: true,
        staging: Some(StagingProvider::S3),
        supports_timezone: true,
        supports_echo: true,
        strategy: DialectStrategy {
            termination: StatementTermination::None,
            extract: ExtractStrategy::PostFilter,
        },
    }
}

pub(super) fn query_command(
    config: &RedshiftConfig,
    options: &QueryOptions,
) -> Result<String, PlanError> {
    Ok(postgres::psql(&config.connection, options, Flavour::Redshift))
}

pub(super) fn extract_command(
    config: &RedshiftConfig,
    format: &FormatSpec,
    options: &QueryOptions,
) -> Result<String, PlanError> {
    let psql = postgres::psql(&config.connection, &postgres::silent(options), Flavour::Redshift);
    match format {
        FormatSpec::Native => Ok(postgres::native_extract(psql, '\t', false, false)),
        // Redshift has no COPY TO STDOUT; unaligned psql output is all there is
        FormatSpec::Csv(csv) => {
            if csv.quote.is_some() {
                return Err(PlanError::unsupported_quote(
                    Dialect::Redshift,
                    csv.quote,
                    "none (unaligned psql output)",
                ));
            }
            if let Some(null) = csv.null_string.as_deref().filter(|n| !n.is_empty()) {
                return Err(PlanError::unimplemented(
                    Dialect::Redshift,
                    format!("null marker {:?} in unaligned output", null),
                ));
            }
            Ok(postgres::native_extract(
                psql,
                csv.delimiter,
                csv.has_header,
                csv.has_footer,
            ))
        }
        other => Err(capabilities().unsupported(Side::Extract, other.kind())),
    }
}

pub(super) fn load_command(
    config: &RedshiftConfig,
    table: &TableName,
    format: &FormatSpec,
    options: &QueryOptions,
) -> Result<LoadCommand, PlanError> {
    let bucket = config
        .aws_s3_bucket_name
        .as_deref()
        .ok_or_else(|| PlanError::missing(Dialect::Redshift, "aws_s3_bucket_name"))?;
    let access_key = config
        .aws_access_key_id
        .as_deref()
        .ok_or_else(|| PlanError::missing(Dialect::Redshift, "aws_access_key_id"))?;
    let secret_key = config
        .aws_secret_access_key
        .as_deref()
        .ok_or_else(|| PlanError::missing(Dialect::Redshift, "aws_secret_access_key"))?;

    let format_clause = match format {
        FormatSpec::Csv(csv) => {
            let mut clause = match csv.quote {
                Some('"') => "CSV".to_string(),
                Some(q) => format!("CSV QUOTE AS {}", postgres::sql_literal(&q.to_string())),
                // Unquoted text relies on backslash escapes
                None => "ESCAPE".to_string(),
            };
            clause.push_str(&format!(
                " DELIMITER AS {}",
                postgres::sql_literal(&csv.delimiter.to_string())
            ));
            if let Some(null) = &csv.null_string {
                clause.push_str(&format!(" NULL AS {}", postgres::sql_literal(null)));
            }
            if csv.has_header {
                clause.push_str(" IGNOREHEADER 1");
            }
            clause
        }
        FormatSpec::NewlineDelimitedJson => "FORMAT AS JSON 'auto'".to_string(),
        FormatSpec::Avro => "FORMAT AS AVRO 'auto'".to_string(),
        FormatSpec::Parquet => "FORMAT AS PARQUET".to_string(),
        FormatSpec::Orc => "FORMAT AS ORC".to_string(),
        FormatSpec::Native => {
            return Err(capabilities().unsupported(Side::Load, FormatKind::Native));
        }
    };

    let before = format!("COPY {} FROM '", table);
    let after = format!(
        "' ACCESS_KEY_ID '{}' SECRET_ACCESS_KEY '{}' {}",
        access_key.replace('\'', "''"),
        secret_key.replace('\'', "''"),
        format_clause
    );
    let load = format!(
        "{} --command={}",
        postgres::psql(&config.connection, options, Flavour::Redshift),
        shell::double_quote_around_var(&before, OBJECT_VAR, &after)
    );
    let env = shell::env_prefix([
        ("AWS_ACCESS_KEY_ID", Some(access_key)),
        ("AWS_SECRET_ACCESS_KEY", Some(secret_key)),
    ]);
    Ok(LoadCommand::Staged(StagedLoad::new(
        StagingProvider::S3,
        bucket,
        format.kind().extension(),
        &env,
        load,
    )))
}

pub(super) fn load_escaping(format: &FormatSpec) -> Escaping {
    match format {
        FormatSpec::Csv(csv) if csv.quote.is_none() => Escaping::Backslash,
        _ => Escaping::Literal,
    }
}
