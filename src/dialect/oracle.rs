//! Oracle through `sqlplus64`.
//!
//! sqlplus only executes a statement terminated by `;` with nothing after it,
//! and reads its output settings from `set` commands sent before the query.

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

const DEFAULT_PORT: u16 = 1521;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    /// Service name
    pub endpoint: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
}

pub(super) fn capabilities() -> DialectCapabilities {
    DialectCapabilities {
        dialect: Dialect::Oracle,
        client: "sqlplus64",
        extract_formats: kinds(&[FormatKind::Csv]),
        load_formats: kinds(&[]),
        default_delimiter: ',',
        default_quote: Some('"'),
        extract_null: NullConvention::Configurable,
        load_null: None,
        header_control: true,
        footer_control: true,
        staging: None,
        supports_timezone: true,
        supports_echo: false,
        strategy: DialectStrategy {
            termination: StatementTermination::EnsureSemicolon,
            extract: ExtractStrategy::NativeFlags,
        },
    }
}

/// Strip trailing whitespace and append `;` unless the statement already ends
/// with one.
fn ensure_semicolon() -> &'static str {
    r#"awk '{ buf = buf $0 "\n" } END { sub(/[[:space:]]+$/, "", buf); if (buf !~ /;$/) buf = buf ";"; print buf }'"#
}

fn connect_string(config: &OracleConfig) -> String {
    format!(
        "{}/{}@{}:{}/{}",
        config.user.as_deref().unwrap_or_default(),
        config.password.as_deref().unwrap_or_default(),
        config.host.as_deref().unwrap_or("localhost"),
        config.port.unwrap_or(DEFAULT_PORT),
        config.endpoint.as_deref().unwrap_or_default()
    )
}

/// `settings` are sent as sqlplus commands ahead of the statement.
fn sqlplus(
    config: &OracleConfig,
    options: &QueryOptions,
    settings: &[String],
) -> Result<String, PlanError> {
    if options.echo_queries {
        return Err(PlanError::unimplemented(Dialect::Oracle, "echo_queries"));
    }
    let mut preamble = vec!["WHENEVER SQLERROR EXIT FAILURE".to_string()];
    preamble.extend(settings.iter().cloned());
    if let Some(timezone) = &options.timezone {
        preamble.push(format!(
            "ALTER SESSION SET TIME_ZONE = '{}';",
            timezone.replace('\'', "''")
        ));
    }
    let lines: Vec<String> = preamble
        .iter()
        .map(|line| shell::quote(line).into_owned())
        .collect();

    let mut command = ensure_semicolon().to_string();
    command.push_str(PIPE);
    command.push_str(&format!("(printf '%s\\n' {} && cat)", lines.join(" ")));
    command.push_str(PIPE);
    command.push_str("sqlplus64 -s ");
    command.push_str(&shell::quote(&connect_string(config)));
    Ok(command)
}

pub(super) fn query_command(config: &OracleConfig, options: &QueryOptions) -> Result<String, PlanError> {
    sqlplus(config, options, &[])
}

pub(super) fn extract_command(
    config: &OracleConfig,
    format: &FormatSpec,
    options: &QueryOptions,
) -> Result<String, PlanError> {
    let csv = match format {
        FormatSpec::Csv(csv) => csv,
        other => return Err(capabilities().unsupported(Side::Extract, other.kind())),
    };
    let quote = match csv.quote {
        Some('"') => "on",
        None => "off",
        other => return Err(PlanError::unsupported_quote(Dialect::Oracle, other, "\" or none")),
    };
    let on_off = |flag: bool| if flag { "on" } else { "off" };

    let mut settings = vec![
        format!("set markup csv on delimiter {} quote {}", csv.delimiter, quote),
        format!("set heading {}", on_off(csv.has_header)),
        format!("set feedback {}", on_off(csv.has_footer)),
    ];
    if let Some(null) = &csv.null_string {
        settings.push(format!("set null '{}'", null.replace('\'', "''")));
    }
    sqlplus(config, &options.clone().with_echo(false), &settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::CsvOptions;

    fn config() -> OracleConfig {
        OracleConfig {
            host: Some("ora.local".into()),
            endpoint: Some("ORCL".into()),
            user: Some("scott".into()),
            password: Some("tiger".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_query_command_connect_string() {
        let command = query_command(&config(), &QueryOptions::new()).unwrap();
        assert!(command.ends_with("sqlplus64 -s scott/tiger@ora.local:1521/ORCL"));
        assert!(command.starts_with("awk"));
        assert!(command.contains("'WHENEVER SQLERROR EXIT FAILURE'"));
    }

    #[test]
    fn test_timezone_alters_session() {
        let options = QueryOptions::new().with_timezone("UTC");
        let command = query_command(&config(), &options).unwrap();
        assert!(command.contains("ALTER SESSION SET TIME_ZONE"));
    }

    #[test]
    fn test_extract_settings() {
        let format = FormatSpec::Csv(
            CsvOptions::default()
                .with_delimiter('|')
                .with_null_string(Some("NULL".into())),
        );
        let command = extract_command(&config(), &format, &QueryOptions::new()).unwrap();
        assert!(command.contains("'set markup csv on delimiter | quote off'"));
        assert!(command.contains("'set heading off'"));
        assert!(command.contains("'set feedback off'"));
        assert!(command.contains("set null '\"'\"'NULL'\"'\"''"));
    }

    #[test]
    fn test_extract_rejects_single_quote() {
        let format = FormatSpec::Csv(CsvOptions::default().with_quote(Some('\'')));
        assert!(matches!(
            extract_command(&config(), &format, &QueryOptions::new()),
            Err(PlanError::UnsupportedQuote { .. })
        ));
    }
}
