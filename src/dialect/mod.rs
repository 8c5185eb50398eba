//! Database dialects: identity, connection configuration and capabilities.
//!
//! Each engine lives in its own module and exposes the same small set of
//! functions (`capabilities`, `query_command`, `extract_command`, and
//! `load_command` where the client can bulk load). The [`crate::command`]
//! module dispatches on [`DbConfig`] to reach them.

mod bigquery;
mod capabilities;
mod databricks;
mod mysql;
mod oracle;
mod postgres;
mod redshift;
mod snowflake;
mod sqlite;
mod sqlserver;

pub use bigquery::BigQueryConfig;
pub use capabilities::{
    DialectCapabilities, DialectStrategy, ExtractStrategy, NullConvention, StagingProvider,
    StatementTermination,
};
pub use databricks::DatabricksConfig;
pub use mysql::MysqlConfig;
pub use oracle::OracleConfig;
pub use postgres::PostgresConfig;
pub use redshift::RedshiftConfig;
pub use snowflake::SnowflakeConfig;
pub use sqlite::SqliteConfig;
pub use sqlserver::{SqlServerConfig, SqlcmdConfig, SqlcmdProtocol};

pub(crate) use capabilities::kinds;

use crate::command::{LoadCommand, QueryOptions, TableName};
use crate::error::{PlanError, Side};
use crate::format::{Escaping, FormatSpec};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A database engine paired with the command-line client used to reach it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Postgres,
    Redshift,
    MySql,
    /// SQL Server through `sqsh`
    Sqsh,
    /// SQL Server through the MSSQL tools (`sqlcmd`, `bcp`)
    Sqlcmd,
    Oracle,
    Sqlite,
    BigQuery,
    Snowflake,
    Databricks,
}

impl Dialect {
    pub fn all() -> &'static [Dialect] {
        &[
            Dialect::Postgres,
            Dialect::Redshift,
            Dialect::MySql,
            Dialect::Sqsh,
            Dialect::Sqlcmd,
            Dialect::Oracle,
            Dialect::Sqlite,
            Dialect::BigQuery,
            Dialect::Snowflake,
            Dialect::Databricks,
        ]
    }

    pub fn capabilities(self) -> DialectCapabilities {
        match self {
            Dialect::Postgres => postgres::capabilities(),
            Dialect::Redshift => redshift::capabilities(),
            Dialect::MySql => mysql::capabilities(),
            Dialect::Sqsh => sqlserver::sqsh_capabilities(),
            Dialect::Sqlcmd => sqlserver::sqlcmd_capabilities(),
            Dialect::Oracle => oracle::capabilities(),
            Dialect::Sqlite => sqlite::capabilities(),
            Dialect::BigQuery => bigquery::capabilities(),
            Dialect::Snowflake => snowflake::capabilities(),
            Dialect::Databricks => databricks::capabilities(),
        }
    }
}

impl std::str::FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Dialect::Postgres),
            "redshift" => Ok(Dialect::Redshift),
            "mysql" | "mariadb" => Ok(Dialect::MySql),
            "sqsh" | "mssql" | "sqlserver" => Ok(Dialect::Sqsh),
            "sqlcmd" => Ok(Dialect::Sqlcmd),
            "oracle" => Ok(Dialect::Oracle),
            "sqlite" | "sqlite3" => Ok(Dialect::Sqlite),
            "bigquery" | "bq" => Ok(Dialect::BigQuery),
            "snowflake" => Ok(Dialect::Snowflake),
            "databricks" => Ok(Dialect::Databricks),
            _ => Err(format!(
                "Unknown dialect: {}. Valid options: postgres, redshift, mysql, sqsh, sqlcmd, oracle, sqlite, bigquery, snowflake, databricks",
                s
            )),
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dialect::Postgres => write!(f, "postgres"),
            Dialect::Redshift => write!(f, "redshift"),
            Dialect::MySql => write!(f, "mysql"),
            Dialect::Sqsh => write!(f, "sqsh"),
            Dialect::Sqlcmd => write!(f, "sqlcmd"),
            Dialect::Oracle => write!(f, "oracle"),
            Dialect::Sqlite => write!(f, "sqlite"),
            Dialect::BigQuery => write!(f, "bigquery"),
            Dialect::Snowflake => write!(f, "snowflake"),
            Dialect::Databricks => write!(f, "databricks"),
        }
    }
}

/// Connection parameters for one database, tagged by dialect.
///
/// Produced by the configuration layer; builders only read from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DbConfig {
    Postgres(PostgresConfig),
    Redshift(RedshiftConfig),
    #[serde(alias = "mariadb")]
    MySql(MysqlConfig),
    #[serde(alias = "mssql", alias = "sqlserver")]
    Sqsh(SqlServerConfig),
    Sqlcmd(SqlcmdConfig),
    Oracle(OracleConfig),
    Sqlite(SqliteConfig),
    BigQuery(BigQueryConfig),
    Snowflake(SnowflakeConfig),
    Databricks(DatabricksConfig),
}

impl DbConfig {
    pub fn dialect(&self) -> Dialect {
        match self {
            DbConfig::Postgres(_) => Dialect::Postgres,
            DbConfig::Redshift(_) => Dialect::Redshift,
            DbConfig::MySql(_) => Dialect::MySql,
            DbConfig::Sqsh(_) => Dialect::Sqsh,
            DbConfig::Sqlcmd(_) => Dialect::Sqlcmd,
            DbConfig::Oracle(_) => Dialect::Oracle,
            DbConfig::Sqlite(_) => Dialect::Sqlite,
            DbConfig::BigQuery(_) => Dialect::BigQuery,
            DbConfig::Snowflake(_) => Dialect::Snowflake,
            DbConfig::Databricks(_) => Dialect::Databricks,
        }
    }

    pub fn capabilities(&self) -> DialectCapabilities {
        self.dialect().capabilities()
    }

    /// Check combinations of fields the client cannot connect with.
    pub fn validate(&self) -> Result<(), PlanError> {
        match self {
            DbConfig::Sqlcmd(c) => c.validate(),
            _ => Ok(()),
        }
    }

    pub(crate) fn query_command(&self, options: &QueryOptions) -> Result<String, PlanError> {
        match self {
            DbConfig::Postgres(c) => postgres::query_command(c, options),
            DbConfig::Redshift(c) => redshift::query_command(c, options),
            DbConfig::MySql(c) => mysql::query_command(c, options),
            DbConfig::Sqsh(c) => sqlserver::sqsh_query_command(c, options),
            DbConfig::Sqlcmd(c) => sqlserver::sqlcmd_query_command(c, options),
            DbConfig::Oracle(c) => oracle::query_command(c, options),
            DbConfig::Sqlite(c) => sqlite::query_command(c, options),
            DbConfig::BigQuery(c) => bigquery::query_command(c, options),
            DbConfig::Snowflake(c) => snowflake::query_command(c, options),
            DbConfig::Databricks(c) => databricks::query_command(c, options),
        }
    }

    pub(crate) fn extract_command(
        &self,
        format: &FormatSpec,
        options: &QueryOptions,
    ) -> Result<String, PlanError> {
        match self {
            DbConfig::Postgres(c) => postgres::extract_command(c, format, options),
            DbConfig::Redshift(c) => redshift::extract_command(c, format, options),
            DbConfig::MySql(c) => mysql::extract_command(c, format, options),
            DbConfig::Sqsh(c) => sqlserver::sqsh_extract_command(c, format, options),
            DbConfig::Sqlcmd(c) => sqlserver::sqlcmd_extract_command(c, format, options),
            DbConfig::Oracle(c) => oracle::extract_command(c, format, options),
            DbConfig::Sqlite(c) => sqlite::extract_command(c, format, options),
            DbConfig::BigQuery(c) => bigquery::extract_command(c, format, options),
            DbConfig::Snowflake(c) => snowflake::extract_command(c, format, options),
            DbConfig::Databricks(c) => databricks::extract_command(c, format, options),
        }
    }

    pub(crate) fn load_command(
        &self,
        table: &TableName,
        format: &FormatSpec,
        options: &QueryOptions,
    ) -> Result<LoadCommand, PlanError> {
        match self {
            DbConfig::Postgres(c) => postgres::load_command(c, table, format, options),
            DbConfig::Redshift(c) => redshift::load_command(c, table, format, options),
            DbConfig::Sqlcmd(c) => sqlserver::bcp_load_command(c, table, format),
            DbConfig::Sqlite(c) => sqlite::load_command(c, table, format),
            DbConfig::BigQuery(c) => bigquery::load_command(c, table, format),
            other => Err(other
                .capabilities()
                .unsupported(Side::Load, format.kind())),
        }
    }

    /// How the extract output for `format` encodes special characters.
    pub fn extract_escaping(&self, format: &FormatSpec) -> Escaping {
        match self.dialect() {
            Dialect::Postgres => postgres::extract_escaping(format),
            Dialect::MySql => Escaping::Backslash,
            _ => Escaping::Literal,
        }
    }

    /// How the load for `format` interprets special characters.
    pub fn load_escaping(&self, format: &FormatSpec) -> Escaping {
        match self.dialect() {
            Dialect::Postgres => postgres::load_escaping(format),
            Dialect::Redshift => redshift::load_escaping(format),
            _ => Escaping::Literal,
        }
    }
}
