//! Google BigQuery: `bq` for queries, GCS staging for loads.

use super::capabilities::{
    kinds, DialectCapabilities, DialectStrategy, ExtractStrategy, NullConvention,
    StagingProvider, StatementTermination,
};
use super::Dialect;
use crate::command::{LoadCommand, QueryOptions, TableName};
use crate::error::{PlanError, Side};
use crate::format::{FormatKind, FormatSpec};
use crate::shell::{self, PIPE};
use crate::staging::{self, StagedLoad};
use serde::{Deserialize, Serialize};

/// Upper bound passed to `--max_rows`; bq truncates to 100 rows otherwise.
const MAX_ROWS: u64 = 100_000_000;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BigQueryConfig {
    /// Service account key file (JSON)
    pub service_account_json_file_name: Option<String>,
    pub location: Option<String>,
    pub project: Option<String>,
    pub dataset: Option<String>,
    /// Bucket used to stage data for `bq load`
    pub gcloud_gcs_bucket_name: Option<String>,
    pub use_legacy_sql: bool,
}

pub(super) fn capabilities() -> DialectCapabilities {
    DialectCapabilities {
        dialect: Dialect::BigQuery,
        client: "bq",
        extract_formats: kinds(&[FormatKind::Csv]),
        load_formats: kinds(&[
            FormatKind::Csv,
            FormatKind::NewlineDelimitedJson,
            FormatKind::Avro,
            FormatKind::Parquet,
            FormatKind::Orc,
        ]),
        default_delimiter: ',',
        default_quote: Some('"'),
        extract_null: NullConvention::Fixed(String::new()),
        load_null: Some(String::new()),
        header_control: true,
        footer_control: false,
        staging: Some(StagingProvider::Gcs),
        supports_timezone: false,
        supports_echo: false,
        strategy: DialectStrategy {
            termination: StatementTermination::None,
            extract: ExtractStrategy::PostFilter,
        },
    }
}

/// Credentials and project for every `bq`/`gsutil` call.
fn cloud_env(config: &BigQueryConfig) -> String {
    shell::env_prefix([
        (
            "CLOUDSDK_AUTH_CREDENTIAL_FILE_OVERRIDE",
            config.service_account_json_file_name.as_deref(),
        ),
        ("CLOUDSDK_CORE_PROJECT", config.project.as_deref()),
    ])
}

/// `bq --headless --quiet <subcommand>` with the shared global flags.
fn bq(config: &BigQueryConfig, subcommand: &str) -> String {
    let mut command = cloud_env(config);
    command.push_str("bq --headless --quiet");
    if let Some(location) = &config.location {
        command.push_str(&format!(" --location={}", shell::quote(location)));
    }
    if let Some(dataset) = &config.dataset {
        command.push_str(&format!(" --dataset_id={}", shell::quote(dataset)));
    }
    command.push(' ');
    command.push_str(subcommand);
    command
}

fn check_options(options: &QueryOptions) -> Result<(), PlanError> {
    if options.timezone.is_some() {
        return Err(PlanError::unimplemented(Dialect::BigQuery, "timezone"));
    }
    if options.echo_queries {
        return Err(PlanError::unimplemented(Dialect::BigQuery, "echo_queries"));
    }
    Ok(())
}

pub(super) fn query_command(
    config: &BigQueryConfig,
    options: &QueryOptions,
) -> Result<String, PlanError> {
    check_options(options)?;
    Ok(format!(
        "{} --max_rows={} --use_legacy_sql={}",
        bq(config, "query"),
        MAX_ROWS,
        config.use_legacy_sql
    ))
}

pub(super) fn extract_command(
    config: &BigQueryConfig,
    format: &FormatSpec,
    options: &QueryOptions,
) -> Result<String, PlanError> {
    let csv = match format {
        FormatSpec::Csv(csv) => csv,
        other => return Err(capabilities().unsupported(Side::Extract, other.kind())),
    };
    capabilities().check_header_footer(csv)?;
    if csv.delimiter != ',' {
        return Err(PlanError::unsupported_delimiter(Dialect::BigQuery, csv.delimiter, ","));
    }
    if csv.quote != Some('"') {
        return Err(PlanError::unsupported_quote(Dialect::BigQuery, csv.quote, "\""));
    }
    if let Some(null) = csv.null_string.as_deref().filter(|n| !n.is_empty()) {
        return Err(PlanError::unimplemented(
            Dialect::BigQuery,
            format!("null marker {:?}", null),
        ));
    }
    let query = query_command(config, &options.clone().with_echo(false))?;
    let mut command = format!("{} --format=csv", query);
    // csv output always starts with the column names
    if !csv.has_header {
        command.push_str(PIPE);
        command.push_str("sed '1d'");
    }
    Ok(command)
}

pub(super) fn load_command(
    config: &BigQueryConfig,
    table: &TableName,
    format: &FormatSpec,
) -> Result<LoadCommand, PlanError> {
    let bucket = config
        .gcloud_gcs_bucket_name
        .as_deref()
        .ok_or_else(|| PlanError::missing(Dialect::BigQuery, "gcloud_gcs_bucket_name"))?;

    let format_flags = match format {
        FormatSpec::Csv(csv) => {
            if !csv.delimiter.is_ascii() {
                return Err(PlanError::unsupported_delimiter(
                    Dialect::BigQuery,
                    csv.delimiter,
                    "single-byte characters",
                ));
            }
            let delimiter = match csv.delimiter {
                '\t' => "tab".to_string(),
                c => shell::quote(&c.to_string()).into_owned(),
            };
            let quote = csv.quote.map(|q| q.to_string()).unwrap_or_default();
            let mut flags = format!(
                "--source_format=CSV --field_delimiter={} --quote={}",
                delimiter,
                shell::quote(&quote)
            );
            if csv.has_header {
                flags.push_str(" --skip_leading_rows=1");
            }
            if let Some(null) = &csv.null_string {
                flags.push_str(&format!(" --null_marker={}", shell::quote(null)));
            }
            flags
        }
        FormatSpec::NewlineDelimitedJson => "--source_format=NEWLINE_DELIMITED_JSON".to_string(),
        FormatSpec::Avro => "--source_format=AVRO".to_string(),
        FormatSpec::Parquet => "--source_format=PARQUET".to_string(),
        FormatSpec::Orc => "--source_format=ORC".to_string(),
        FormatSpec::Native => {
            return Err(capabilities().unsupported(Side::Load, FormatKind::Native));
        }
    };

    let load = format!(
        "{} {} {} {}",
        bq(config, "load"),
        format_flags,
        shell::quote(table.as_str()),
        staging::object_ref()
    );
    Ok(LoadCommand::Staged(StagedLoad::new(
        StagingProvider::Gcs,
        bucket,
        format.kind().extension(),
        &cloud_env(config),
        load,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::CsvOptions;

    fn config() -> BigQueryConfig {
        BigQueryConfig {
            service_account_json_file_name: Some("/etc/bq.json".into()),
            project: Some("acme".into()),
            dataset: Some("dwh".into()),
            location: Some("EU".into()),
            gcloud_gcs_bucket_name: Some("acme-staging".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_query_command() {
        assert_eq!(
            query_command(&config(), &QueryOptions::new()).unwrap(),
            "CLOUDSDK_AUTH_CREDENTIAL_FILE_OVERRIDE=/etc/bq.json CLOUDSDK_CORE_PROJECT=acme bq --headless --quiet --location=EU --dataset_id=dwh query --max_rows=100000000 --use_legacy_sql=false"
        );
    }

    #[test]
    fn test_timezone_unimplemented() {
        let options = QueryOptions::new().with_timezone("UTC");
        assert!(query_command(&config(), &options).is_err());
    }

    #[test]
    fn test_extract_drops_forced_header() {
        let command =
            extract_command(&config(), &FormatSpec::csv(), &QueryOptions::new()).unwrap();
        assert!(command.contains("--format=csv"));
        assert!(command.ends_with("sed '1d'"));
    }

    #[test]
    fn test_load_is_staged_through_gcs() {
        let table = TableName::parse("dwh.orders").unwrap();
        let load = load_command(&config(), &table, &FormatSpec::tsv()).unwrap();
        let staged = load.as_staged().unwrap();
        assert_eq!(staged.provider, StagingProvider::Gcs);
        assert!(staged.load.contains("--source_format=CSV --field_delimiter=tab --quote=''"));
        assert!(staged.load.ends_with("dwh.orders \"${DBPIPE_STAGE_OBJECT}\""));
        assert!(staged.write.contains("gsutil -q cp - "));
    }

    #[test]
    fn test_load_requires_bucket() {
        let config = BigQueryConfig {
            gcloud_gcs_bucket_name: None,
            ..config()
        };
        let table = TableName::parse("t").unwrap();
        assert!(matches!(
            load_command(&config, &table, &FormatSpec::Parquet),
            Err(PlanError::MissingConfiguration { .. })
        ));
    }

    #[test]
    fn test_load_rejects_multibyte_delimiter() {
        let table = TableName::parse("t").unwrap();
        let format = FormatSpec::Csv(CsvOptions::default().with_delimiter('§'));
        assert!(matches!(
            load_command(&config(), &table, &format),
            Err(PlanError::UnsupportedDelimiter { .. })
        ));
    }
}
