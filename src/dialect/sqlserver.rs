//! Microsoft SQL Server, reachable through two different toolchains:
//! `sqsh` (FreeTDS) and the MSSQL tools (`sqlcmd` for queries, `bcp` for
//! bulk loads).

use super::capabilities::{
    kinds, DialectCapabilities, DialectStrategy, ExtractStrategy, NullConvention,
    StatementTermination,
};
use super::Dialect;
use crate::command::{LoadCommand, QueryOptions, TableName};
use crate::error::{PlanError, Side};
use crate::format::{FormatKind, FormatSpec};
use crate::shell::{self, PIPE};
use serde::{Deserialize, Serialize};

/// Connection parameters for `sqsh`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SqlServerConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
}

/// Network protocol prefix of a `sqlcmd -S` server argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlcmdProtocol {
    Tcp,
    /// Named pipes
    Np,
    /// Shared memory
    Lpc,
}

impl std::fmt::Display for SqlcmdProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlcmdProtocol::Tcp => write!(f, "tcp"),
            SqlcmdProtocol::Np => write!(f, "np"),
            SqlcmdProtocol::Lpc => write!(f, "lpc"),
        }
    }
}

/// Connection parameters for `sqlcmd` and `bcp`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SqlcmdConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    /// Named instance, `host\instance`
    pub instance: Option<String>,
    pub database: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub protocol: Option<SqlcmdProtocol>,
    /// Sets `QUOTED_IDENTIFIER ON` for the session (`-I` / `-q`)
    pub quoted_identifier: bool,
    /// Accept the server certificate without validation (`-C`)
    pub trust_server_certificate: bool,
}

impl Default for SqlcmdConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: None,
            instance: None,
            database: None,
            user: None,
            password: None,
            protocol: None,
            quoted_identifier: true,
            trust_server_certificate: false,
        }
    }
}

impl SqlcmdConfig {
    /// Reject server addresses `sqlcmd` cannot connect to.
    pub fn validate(&self) -> Result<(), PlanError> {
        let invalid = |reason: &str| PlanError::InvalidConfig {
            dialect: Dialect::Sqlcmd,
            reason: reason.to_string(),
        };
        if self.instance.is_some() && self.port.is_some() {
            return Err(invalid("set either an instance or a port, not both"));
        }
        match self.protocol {
            Some(SqlcmdProtocol::Tcp) if self.instance.is_some() => {
                Err(invalid("the tcp protocol connects by port, not by instance name"))
            }
            Some(protocol @ (SqlcmdProtocol::Np | SqlcmdProtocol::Lpc)) if self.port.is_some() => {
                Err(invalid(&format!("the {} protocol does not take a port", protocol)))
            }
            _ => Ok(()),
        }
    }

    /// The `-S` argument: `[protocol:]host[\instance][,port]`.
    fn server(&self) -> Option<String> {
        let host = self.host.as_deref()?;
        let mut server = String::new();
        if let Some(protocol) = self.protocol {
            server.push_str(&format!("{}:", protocol));
        }
        server.push_str(host);
        if let Some(instance) = &self.instance {
            server.push('\\');
            server.push_str(instance);
        }
        if let Some(port) = self.port {
            server.push_str(&format!(",{}", port));
        }
        Some(server)
    }
}

// ---------------------------------------------------------------------------
// sqsh
// ---------------------------------------------------------------------------

pub(super) fn sqsh_capabilities() -> DialectCapabilities {
    DialectCapabilities {
        dialect: Dialect::Sqsh,
        client: "sqsh",
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
        supports_echo: true,
        strategy: DialectStrategy {
            termination: StatementTermination::SqshGo,
            extract: ExtractStrategy::PostFilter,
        },
    }
}

pub(super) fn sqsh_query_command(
    config: &SqlServerConfig,
    options: &QueryOptions,
) -> Result<String, PlanError> {
    if options.timezone.is_some() {
        return Err(PlanError::unimplemented(Dialect::Sqsh, "timezone"));
    }
    // sqsh expands `$` itself, so it has to arrive as `\\$`: undo any existing
    // quoting first, then quote every `$`
    let mut command = String::from(r"sed 's/\\\\$/\$/g;s/\$/\\\\$/g'");
    command.push_str(PIPE);
    command.push_str("(cat && echo ';')");
    command.push_str(PIPE);
    command.push_str(r"(cat && echo ';' && echo '\go')");
    command.push_str(PIPE);
    command.push_str("sqsh");
    if let Some(user) = &config.user {
        command.push_str(&format!(" -U {}", shell::quote(user)));
    }
    if let Some(password) = &config.password {
        command.push_str(&format!(" -P {}", shell::quote(password)));
    }
    if let Some(host) = &config.host {
        let server = match config.port {
            Some(port) => format!("{}:{}", host, port),
            None => host.clone(),
        };
        command.push_str(&format!(" -S {}", shell::quote(&server)));
    }
    if let Some(database) = &config.database {
        command.push_str(&format!(" -D {}", shell::quote(database)));
    }
    if options.echo_queries {
        command.push_str(" -e");
    }
    Ok(command)
}

pub(super) fn sqsh_extract_command(
    config: &SqlServerConfig,
    format: &FormatSpec,
    options: &QueryOptions,
) -> Result<String, PlanError> {
    let csv = match format {
        FormatSpec::Csv(csv) => csv,
        other => return Err(sqsh_capabilities().unsupported(Side::Extract, other.kind())),
    };
    sqsh_capabilities().check_header_footer(csv)?;
    if csv.delimiter != ',' {
        return Err(PlanError::unsupported_delimiter(Dialect::Sqsh, csv.delimiter, ","));
    }
    if csv.quote != Some('"') {
        return Err(PlanError::unsupported_quote(Dialect::Sqsh, csv.quote, "\""));
    }
    if let Some(null) = csv.null_string.as_deref().filter(|n| !n.is_empty()) {
        return Err(PlanError::unimplemented(
            Dialect::Sqsh,
            format!("null marker {:?}", null),
        ));
    }
    let mut command = sqsh_query_command(config, &options.clone().with_echo(false))?;
    command.push_str(" -m csv");
    // csv mode always prints the column names
    if !csv.has_header {
        command.push_str(PIPE);
        command.push_str("sed '1d'");
    }
    Ok(command)
}

// ---------------------------------------------------------------------------
// sqlcmd / bcp
// ---------------------------------------------------------------------------

const SQLCMD_DELIMITERS: &[char] = &[',', ';'];

pub(super) fn sqlcmd_capabilities() -> DialectCapabilities {
    DialectCapabilities {
        dialect: Dialect::Sqlcmd,
        client: "sqlcmd",
        extract_formats: kinds(&[FormatKind::Csv]),
        load_formats: kinds(&[FormatKind::Csv]),
        default_delimiter: ',',
        default_quote: None,
        extract_null: NullConvention::Fixed("NULL".to_string()),
        load_null: Some(String::new()),
        header_control: true,
        footer_control: true,
        staging: None,
        supports_timezone: false,
        supports_echo: true,
        strategy: DialectStrategy {
            termination: StatementTermination::BatchGo,
            extract: ExtractStrategy::NativeFlags,
        },
    }
}

/// Connection arguments shared by `sqlcmd` and `bcp`.
fn connection_args(config: &SqlcmdConfig) -> String {
    let mut args = String::new();
    if let Some(server) = config.server() {
        args.push_str(&format!(" -S {}", shell::quote(&server)));
    }
    if let Some(database) = &config.database {
        args.push_str(&format!(" -d {}", shell::quote(database)));
    }
    if let Some(user) = &config.user {
        args.push_str(&format!(" -U {}", shell::quote(user)));
    }
    args
}

pub(super) fn sqlcmd_query_command(
    config: &SqlcmdConfig,
    options: &QueryOptions,
) -> Result<String, PlanError> {
    config.validate()?;
    if options.timezone.is_some() {
        return Err(PlanError::unimplemented(Dialect::Sqlcmd, "timezone"));
    }
    let mut command = String::from("(cat && echo ';' && echo 'GO')");
    command.push_str(PIPE);
    command.push_str(&shell::env_prefix([(
        "SQLCMDPASSWORD",
        config.password.as_deref(),
    )]));
    command.push_str("sqlcmd");
    command.push_str(&connection_args(config));
    if config.quoted_identifier {
        command.push_str(" -I");
    }
    command.push_str(" -b");
    if config.trust_server_certificate {
        command.push_str(" -C");
    }
    if options.echo_queries {
        command.push_str(" -e");
    }
    Ok(command)
}

pub(super) fn sqlcmd_extract_command(
    config: &SqlcmdConfig,
    format: &FormatSpec,
    options: &QueryOptions,
) -> Result<String, PlanError> {
    let csv = match format {
        FormatSpec::Csv(csv) => csv,
        other => return Err(sqlcmd_capabilities().unsupported(Side::Extract, other.kind())),
    };
    if !SQLCMD_DELIMITERS.contains(&csv.delimiter) {
        return Err(PlanError::unsupported_delimiter(
            Dialect::Sqlcmd,
            csv.delimiter,
            ", ;",
        ));
    }
    if csv.quote.is_some() {
        return Err(PlanError::unsupported_quote(Dialect::Sqlcmd, csv.quote, "none"));
    }
    if let Some(null) = csv.null_string.as_deref().filter(|n| *n != "NULL") {
        return Err(PlanError::unimplemented(
            Dialect::Sqlcmd,
            format!("null marker {:?}", null),
        ));
    }

    let mut command = String::new();
    // "(n rows affected)" is the footer
    if !csv.has_footer {
        command.push_str("(echo 'SET NOCOUNT ON;' && cat)");
        command.push_str(PIPE);
    }
    command.push_str(&sqlcmd_query_command(config, &options.clone().with_echo(false))?);
    command.push_str(&format!(
        " -s {} -W",
        shell::quote(&csv.delimiter.to_string())
    ));
    if csv.has_header {
        // drop the dashed line under the column names
        command.push_str(PIPE);
        command.push_str("sed '2d'");
    } else {
        command.push_str(" -h -1");
    }
    Ok(command)
}

pub(super) fn bcp_load_command(
    config: &SqlcmdConfig,
    table: &TableName,
    format: &FormatSpec,
) -> Result<LoadCommand, PlanError> {
    config.validate()?;
    let csv = match format {
        FormatSpec::Csv(csv) => csv,
        other => return Err(sqlcmd_capabilities().unsupported(Side::Load, other.kind())),
    };
    if csv.quote.is_some() {
        return Err(PlanError::unsupported_quote(Dialect::Sqlcmd, csv.quote, "none"));
    }
    if let Some(null) = csv.null_string.as_deref().filter(|n| !n.is_empty()) {
        return Err(PlanError::UnsupportedNullString {
            dialect: Dialect::Sqlcmd,
            null_string: null.to_string(),
        });
    }

    let mut command = format!("bcp {} in /dev/stdin", shell::quote(table.as_str()));
    command.push_str(&connection_args(config));
    if let Some(password) = &config.password {
        command.push_str(&format!(" -P {}", shell::quote(password)));
    }
    command.push_str(&format!(
        " -c -t {}",
        shell::quote(&csv.delimiter.to_string())
    ));
    if csv.has_header {
        command.push_str(" -F 2");
    }
    if config.quoted_identifier {
        command.push_str(" -q");
    }
    Ok(LoadCommand::direct(command))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::CsvOptions;

    fn sqlcmd() -> SqlcmdConfig {
        SqlcmdConfig {
            host: Some("mssql.local".into()),
            database: Some("erp".into()),
            user: Some("sa".into()),
            password: Some("pw".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_sqsh_query_requotes_dollar_and_adds_go() {
        let config = SqlServerConfig {
            host: Some("db".into()),
            database: Some("erp".into()),
            ..Default::default()
        };
        let command = sqsh_query_command(&config, &QueryOptions::new()).unwrap();
        assert!(command.starts_with(r"sed 's/\\\\$/\$/g;s/\$/\\\\$/g'"));
        assert!(command.contains(r"echo '\go'"));
        assert!(command.ends_with("sqsh -S db -D erp"));
    }

    #[test]
    fn test_sqsh_query_passes_every_connection_field() {
        let config = SqlServerConfig {
            host: Some("db".into()),
            port: Some(1433),
            database: Some("erp".into()),
            user: Some("sa".into()),
            password: Some("p w".into()),
        };
        let command = sqsh_query_command(&config, &QueryOptions::new()).unwrap();
        assert!(command.ends_with("sqsh -U sa -P 'p w' -S db:1433 -D erp"), "{command}");
    }

    #[test]
    fn test_sqsh_timezone_unimplemented() {
        let options = QueryOptions::new().with_timezone("UTC");
        assert!(matches!(
            sqsh_query_command(&SqlServerConfig::default(), &options),
            Err(PlanError::UnimplementedParameter { .. })
        ));
    }

    #[test]
    fn test_sqsh_extract_strips_forced_header() {
        let command = sqsh_extract_command(
            &SqlServerConfig::default(),
            &FormatSpec::csv(),
            &QueryOptions::new(),
        )
        .unwrap();
        assert!(command.contains("sqsh -m csv"));
        assert!(command.ends_with("sed '1d'"));
    }

    #[test]
    fn test_sqlcmd_server_string() {
        let config = SqlcmdConfig {
            host: Some("h".into()),
            instance: Some("SQLEXPRESS".into()),
            protocol: Some(SqlcmdProtocol::Np),
            ..Default::default()
        };
        assert_eq!(config.server().unwrap(), "np:h\\SQLEXPRESS");
    }

    #[test]
    fn test_sqlcmd_validate_rules() {
        let tcp_instance = SqlcmdConfig {
            protocol: Some(SqlcmdProtocol::Tcp),
            instance: Some("i".into()),
            ..Default::default()
        };
        assert!(tcp_instance.validate().is_err());

        let lpc_port = SqlcmdConfig {
            protocol: Some(SqlcmdProtocol::Lpc),
            port: Some(1433),
            ..Default::default()
        };
        assert!(lpc_port.validate().is_err());

        let instance_and_port = SqlcmdConfig {
            instance: Some("i".into()),
            port: Some(1433),
            ..Default::default()
        };
        assert!(instance_and_port.validate().is_err());

        let tcp_port = SqlcmdConfig {
            protocol: Some(SqlcmdProtocol::Tcp),
            port: Some(1433),
            ..Default::default()
        };
        assert!(tcp_port.validate().is_ok());
    }

    #[test]
    fn test_sqlcmd_query_command() {
        let command = sqlcmd_query_command(&sqlcmd(), &QueryOptions::new()).unwrap();
        assert!(command.starts_with("(cat && echo ';' && echo 'GO')"));
        assert!(command.ends_with("SQLCMDPASSWORD=pw sqlcmd -S mssql.local -d erp -U sa -I -b"));
    }

    #[test]
    fn test_sqlcmd_extract_rejects_quote() {
        let err = sqlcmd_extract_command(&sqlcmd(), &FormatSpec::csv(), &QueryOptions::new())
            .unwrap_err();
        assert!(matches!(err, PlanError::UnsupportedQuote { .. }));
    }

    #[test]
    fn test_sqlcmd_extract_without_header_or_footer() {
        let format = FormatSpec::Csv(CsvOptions::default().with_delimiter(';'));
        let command = sqlcmd_extract_command(&sqlcmd(), &format, &QueryOptions::new()).unwrap();
        assert!(command.starts_with("(echo 'SET NOCOUNT ON;' && cat)"));
        assert!(command.ends_with("-s ';' -W -h -1"));
    }

    #[test]
    fn test_bcp_load() {
        let table = TableName::parse("dbo.orders").unwrap();
        let format = FormatSpec::Csv(CsvOptions::default().with_header(true));
        let load = bcp_load_command(&sqlcmd(), &table, &format).unwrap();
        assert_eq!(
            load.render(),
            "bcp dbo.orders in /dev/stdin -S mssql.local -d erp -U sa -P pw -c -t , -F 2 -q"
        );
    }

    #[test]
    fn test_bcp_rejects_null_marker() {
        let table = TableName::parse("t").unwrap();
        let format = FormatSpec::Csv(CsvOptions::default().with_null_string(Some("NULL".into())));
        assert!(matches!(
            bcp_load_command(&sqlcmd(), &table, &format),
            Err(PlanError::UnsupportedNullString { .. })
        ));
    }
}
