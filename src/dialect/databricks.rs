//! Databricks SQL through `dbsqlcli`.
//!
//! dbsqlcli takes the statement as an argument rather than on stdin.

use super::capabilities::{
    kinds, DialectCapabilities, DialectStrategy, ExtractStrategy, NullConvention,
    StatementTermination,
};
use super::Dialect;
use crate::command::QueryOptions;
use crate::error::{PlanError, Side};
use crate::format::{FormatKind, FormatSpec};
use crate::shell::{self, PIPE};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabricksConfig {
    pub host: Option<String>,
    pub http_path: Option<String>,
    pub access_token: Option<String>,
}

pub(super) fn capabilities() -> DialectCapabilities {
    DialectCapabilities {
        dialect: Dialect::Databricks,
        client: "dbsqlcli",
        extract_formats: kinds(&[FormatKind::Csv]),
        load_formats: kinds(&[]),
        default_delimiter: ',',
        default_quote: Some('"'),
        extract_null: NullConvention::Fixed(String::new()),
        load_null: None,
        header_control: true,
        footer_control: false,
        staging: None,
        supports_timezone: false,
        supports_echo: false,
        strategy: DialectStrategy {
            termination: StatementTermination::ExecuteArgument,
            extract: ExtractStrategy::PostFilter,
        },
    }
}

pub(super) fn query_command(
    config: &DatabricksConfig,
    options: &QueryOptions,
) -> Result<String, PlanError> {
    if options.timezone.is_some() {
        return Err(PlanError::unimplemented(Dialect::Databricks, "timezone"));
    }
    if options.echo_queries {
        return Err(PlanError::unimplemented(Dialect::Databricks, "echo_queries"));
    }
    let mut command = shell::env_prefix([("DBSQLCLI_ACCESS_TOKEN", config.access_token.as_deref())]);
    command.push_str("dbsqlcli");
    if let Some(host) = &config.host {
        command.push_str(&format!(" --hostname {}", shell::quote(host)));
    }
    if let Some(http_path) = &config.http_path {
        command.push_str(&format!(" --http-path {}", shell::quote(http_path)));
    }
    command.push_str(" -e \"$(cat)\"");
    Ok(command)
}

pub(super) fn extract_command(
    config: &DatabricksConfig,
    format: &FormatSpec,
    options: &QueryOptions,
) -> Result<String, PlanError> {
    let csv = match format {
        FormatSpec::Csv(csv) => csv,
        other => return Err(capabilities().unsupported(Side::Extract, other.kind())),
    };
    capabilities().check_header_footer(csv)?;
    let table_format = match csv.delimiter {
        ',' => "csv",
        '\t' => "tsv",
        other => {
            return Err(PlanError::unsupported_delimiter(
                Dialect::Databricks,
                other,
                ", \\t",
            ))
        }
    };
    if csv.quote != Some('"') {
        return Err(PlanError::unsupported_quote(Dialect::Databricks, csv.quote, "\""));
    }
    if let Some(null) = csv.null_string.as_deref().filter(|n| !n.is_empty()) {
        return Err(PlanError::unimplemented(
            Dialect::Databricks,
            format!("null marker {:?}", null),
        ));
    }
    let mut command = format!(
        "{} --table-format {}",
        query_command(config, &options.clone().with_echo(false))?,
        table_format
    );
    if !csv.has_header {
        command.push_str(PIPE);
        command.push_str("sed '1d'");
    }
    Ok(command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::CsvOptions;

    fn config() -> DatabricksConfig {
        DatabricksConfig {
            host: Some("adb-1.azuredatabricks.net".into()),
            http_path: Some("/sql/1.0/warehouses/abc".into()),
            access_token: Some("dapi123".into()),
        }
    }

    #[test]
    fn test_query_command_passes_statement_as_argument() {
        assert_eq!(
            query_command(&config(), &QueryOptions::new()).unwrap(),
            "DBSQLCLI_ACCESS_TOKEN=dapi123 dbsqlcli --hostname adb-1.azuredatabricks.net --http-path /sql/1.0/warehouses/abc -e \"$(cat)\""
        );
    }

    #[test]
    fn test_extract_with_header_keeps_first_line() {
        let format = FormatSpec::Csv(CsvOptions::default().with_quote(Some('"')).with_header(true));
        let command = extract_command(&config(), &format, &QueryOptions::new()).unwrap();
        assert!(command.ends_with("--table-format csv"));
    }

    #[test]
    fn test_extract_without_header_strips_it() {
        let command =
            extract_command(&config(), &FormatSpec::csv(), &QueryOptions::new()).unwrap();
        assert!(command.ends_with("sed '1d'"));
    }
}
