//! MySQL and MariaDB through the `mysql` client.
//!
//! In batch mode the client prints tab separated rows with backslash escapes
//! and the literal `NULL`; nothing about that is configurable.

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

const NULL_OUTPUT: &str = "NULL";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MysqlConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub ssl: Option<bool>,
    /// Passed as `--default-character-set`
    pub charset: Option<String>,
}

pub(super) fn capabilities() -> DialectCapabilities {
    DialectCapabilities {
        dialect: Dialect::MySql,
        client: "mysql",
        extract_formats: kinds(&[FormatKind::Csv, FormatKind::Native]),
        load_formats: kinds(&[]),
        default_delimiter: '\t',
        default_quote: None,
        extract_null: NullConvention::Fixed(NULL_OUTPUT.to_string()),
        load_null: None,
        header_control: true,
        footer_control: false,
        staging: None,
        supports_timezone: true,
        supports_echo: false,
        strategy: DialectStrategy {
            termination: StatementTermination::None,
            extract: ExtractStrategy::NativeFlags,
        },
    }
}

pub(super) fn query_command(config: &MysqlConfig, options: &QueryOptions) -> Result<String, PlanError> {
    if options.echo_queries {
        return Err(PlanError::unimplemented(Dialect::MySql, "echo_queries"));
    }
    let mut command = shell::env_prefix([("MYSQL_PWD", config.password.as_deref())]);
    command.push_str("mysql");
    if let Some(user) = &config.user {
        command.push_str(&format!(" --user={}", shell::quote(user)));
    }
    if let Some(host) = &config.host {
        command.push_str(&format!(" --host={}", shell::quote(host)));
    }
    if let Some(port) = config.port {
        command.push_str(&format!(" --port={}", port));
    }
    if config.ssl == Some(true) {
        command.push_str(" --ssl");
    }
    if let Some(charset) = &config.charset {
        command.push_str(&format!(" --default-character-set={}", shell::quote(charset)));
    }
    if let Some(timezone) = &options.timezone {
        let init = format!("SET time_zone = '{}'", timezone.replace('\'', "''"));
        command.push_str(&format!(" --init-command={}", shell::quote(&init)));
    }
    if let Some(database) = &config.database {
        command.push(' ');
        command.push_str(&shell::quote(database));
    }
    Ok(command)
}

pub(super) fn extract_command(
    config: &MysqlConfig,
    format: &FormatSpec,
    options: &QueryOptions,
) -> Result<String, PlanError> {
    let query = query_command(config, &options.clone().with_echo(false))?;
    match format {
        FormatSpec::Native => Ok(format!("{} --batch --skip-column-names", query)),
        FormatSpec::Csv(csv) => {
            capabilities().check_header_footer(csv)?;
            if csv.delimiter != '\t' {
                return Err(PlanError::unsupported_delimiter(
                    Dialect::MySql,
                    csv.delimiter,
                    "\\t",
                ));
            }
            if csv.quote.is_some() {
                return Err(PlanError::unsupported_quote(Dialect::MySql, csv.quote, "none"));
            }
            if let Some(null) = csv.null_string.as_deref().filter(|n| *n != NULL_OUTPUT) {
                return Err(PlanError::unimplemented(
                    Dialect::MySql,
                    format!("null marker {:?}", null),
                ));
            }
            let mut command = format!("{} --batch", query);
            if !csv.has_header {
                command.push_str(" --skip-column-names");
            }
            Ok(command)
        }
        other => Err(capabilities().unsupported(Side::Extract, other.kind())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::CsvOptions;

    fn config() -> MysqlConfig {
        MysqlConfig {
            host: Some("localhost".into()),
            database: Some("shop".into()),
            user: Some("app".into()),
            password: Some("s3cr3t".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_query_command_password_in_env() {
        let command = query_command(&config(), &QueryOptions::new()).unwrap();
        assert_eq!(
            command,
            "MYSQL_PWD=s3cr3t mysql --user=app --host=localhost shop"
        );
    }

    #[test]
    fn test_query_command_timezone_init_command() {
        let options = QueryOptions::new().with_timezone("Europe/Berlin");
        let command = query_command(&config(), &options).unwrap();
        assert!(command.contains("--init-command='SET time_zone = '\"'\"'Europe/Berlin'\"'\"''"));
    }

    #[test]
    fn test_echo_is_unimplemented() {
        let err = query_command(&config(), &QueryOptions::new().with_echo(true)).unwrap_err();
        assert!(matches!(err, PlanError::UnimplementedParameter { .. }));
    }

    #[test]
    fn test_extract_rejects_comma() {
        let format = FormatSpec::Csv(CsvOptions::default());
        assert!(matches!(
            extract_command(&config(), &format, &QueryOptions::new()),
            Err(PlanError::UnsupportedDelimiter { delimiter: ',', .. })
        ));
    }

    #[test]
    fn test_extract_header_toggle() {
        let tsv = FormatSpec::tsv();
        let without = extract_command(&config(), &tsv, &QueryOptions::new()).unwrap();
        assert!(without.ends_with("--batch --skip-column-names"));

        let with = FormatSpec::Csv(CsvOptions::default().with_delimiter('\t').with_header(true));
        let with = extract_command(&config(), &with, &QueryOptions::new()).unwrap();
        assert!(!with.contains("--skip-column-names"));
    }

    #[test]
    fn test_extract_footer_unimplemented() {
        let format = FormatSpec::Csv(CsvOptions::default().with_delimiter('\t').with_footer(true));
        assert!(matches!(
            extract_command(&config(), &format, &QueryOptions::new()),
            Err(PlanError::UnimplementedParameter { .. })
        ));
    }
}
