//! Snowflake through `snowsql`.
//!
//! snowsql only knows named output formats, so the delimiter has to map onto
//! `csv` or `tsv`. Values always come out double quoted.

use super::capabilities::{
    kinds, DialectCapabilities, DialectStrategy, ExtractStrategy, NullConvention,
    StatementTermination,
};
use super::Dialect;
use crate::command::QueryOptions;
use crate::error::{PlanError, Side};
use crate::format::{FormatKind, FormatSpec};
use crate::shell;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnowflakeConfig {
    /// Named connection from `~/.snowsql/config`
    pub connection: Option<String>,
    pub account: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
    /// Encrypted PEM key for key pair authentication
    pub private_key_file: Option<String>,
    pub private_key_passphrase: Option<String>,
}

pub(super) fn capabilities() -> DialectCapabilities {
    DialectCapabilities {
        dialect: Dialect::Snowflake,
        client: "snowsql",
        extract_formats: kinds(&[FormatKind::Csv]),
        load_formats: kinds(&[]),
        default_delimiter: ',',
        default_quote: Some('"'),
        extract_null: NullConvention::Fixed("NULL".to_string()),
        load_null: None,
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

pub(super) fn query_command(
    config: &SnowflakeConfig,
    options: &QueryOptions,
) -> Result<String, PlanError> {
    if options.timezone.is_some() {
        return Err(PlanError::unimplemented(Dialect::Snowflake, "timezone"));
    }
    let mut command = shell::env_prefix([
        ("SNOWSQL_PWD", config.password.as_deref()),
        (
            "SNOWSQL_PRIVATE_KEY_PASSPHRASE",
            config.private_key_passphrase.as_deref(),
        ),
    ]);
    command.push_str("snowsql");
    if let Some(connection) = &config.connection {
        command.push_str(&format!(" -c {}", shell::quote(connection)));
    }
    if let Some(account) = &config.account {
        command.push_str(&format!(" -a {}", shell::quote(account)));
    }
    if let Some(user) = &config.user {
        command.push_str(&format!(" -u {}", shell::quote(user)));
    }
    if let Some(database) = &config.database {
        command.push_str(&format!(" -d {}", shell::quote(database)));
    }
    if let Some(key) = &config.private_key_file {
        command.push_str(&format!(" --private-key-path {}", shell::quote(key)));
    }
    command.push_str(" -o quiet=true -o exit_on_error=true -o friendly=false -o timing=false");
    if options.echo_queries {
        command.push_str(" -o echo=true");
    }
    Ok(command)
}

pub(super) fn extract_command(
    config: &SnowflakeConfig,
    format: &FormatSpec,
    options: &QueryOptions,
) -> Result<String, PlanError> {
    let csv = match format {
        FormatSpec::Csv(csv) => csv,
        other => return Err(capabilities().unsupported(Side::Extract, other.kind())),
    };
    capabilities().check_header_footer(csv)?;
    let output_format = match csv.delimiter {
        ',' => "csv",
        '\t' => "tsv",
        other => {
            return Err(PlanError::unsupported_delimiter(
                Dialect::Snowflake,
                other,
                ", \\t",
            ))
        }
    };
    if csv.quote != Some('"') {
        return Err(PlanError::unsupported_quote(Dialect::Snowflake, csv.quote, "\""));
    }
    if let Some(null) = csv.null_string.as_deref().filter(|n| *n != "NULL") {
        return Err(PlanError::unimplemented(
            Dialect::Snowflake,
            format!("null marker {:?}", null),
        ));
    }
    Ok(format!(
        "{} -o output_format={} -o header={}",
        query_command(config, &options.clone().with_echo(false))?,
        output_format,
        csv.has_header
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::CsvOptions;

    fn config() -> SnowflakeConfig {
        SnowflakeConfig {
            account: Some("xy12345.eu-central-1".into()),
            user: Some("loader".into()),
            password: Some("pw".into()),
            database: Some("ANALYTICS".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_query_command() {
        assert_eq!(
            query_command(&config(), &QueryOptions::new()).unwrap(),
            "SNOWSQL_PWD=pw snowsql -a xy12345.eu-central-1 -u loader -d ANALYTICS -o quiet=true -o exit_on_error=true -o friendly=false -o timing=false"
        );
    }

    #[test]
    fn test_extract_named_modes() {
        let csv = FormatSpec::Csv(CsvOptions::default().with_quote(Some('"')).with_header(true));
        let command = extract_command(&config(), &csv, &QueryOptions::new()).unwrap();
        assert!(command.ends_with("-o output_format=csv -o header=true"));

        let tsv = FormatSpec::Csv(CsvOptions::default().with_delimiter('\t').with_quote(Some('"')));
        let command = extract_command(&config(), &tsv, &QueryOptions::new()).unwrap();
        assert!(command.ends_with("-o output_format=tsv -o header=false"));
    }

    #[test]
    fn test_extract_rejects_pipe_delimiter() {
        let format = FormatSpec::Csv(CsvOptions::default().with_delimiter('|').with_quote(Some('"')));
        assert!(matches!(
            extract_command(&config(), &format, &QueryOptions::new()),
            Err(PlanError::UnsupportedDelimiter { delimiter: '|', .. })
        ));
    }
}
