//! Entry points for building single commands.
//!
//! Each builder validates the request against the dialect's capabilities
//! before the dialect module renders anything, so unsupported kinds fail the
//! same way for every engine.

use crate::dialect::DbConfig;
use crate::error::PlanError;
use crate::format::FormatSpec;
use crate::staging::StagedLoad;
use schemars::JsonSchema;
use serde::Serialize;
use tracing::trace;

/// Options for running a statement through a client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOptions {
    /// Session timezone, if the client has a way to set one
    pub timezone: Option<String>,
    /// Ask the client to print each statement it executes
    pub echo_queries: bool,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = Some(timezone.into());
        self
    }

    pub fn with_echo(mut self, echo_queries: bool) -> Self {
        self.echo_queries = echo_queries;
        self
    }
}

/// A target table identifier, embedded verbatim into load statements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(transparent)]
pub struct TableName(String);

impl TableName {
    pub fn parse(name: &str) -> Result<Self, PlanError> {
        let invalid = |reason: &str| PlanError::InvalidTableIdentifier {
            table: name.to_string(),
            reason: reason.to_string(),
        };
        if name.trim().is_empty() {
            return Err(invalid("empty name"));
        }
        if name.chars().any(|c| c.is_control()) {
            return Err(invalid("contains control characters"));
        }
        if name.trim() != name {
            return Err(invalid("leading or trailing whitespace"));
        }
        Ok(TableName(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TableName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The load half of a pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum LoadCommand {
    /// The client reads rows from stdin directly
    Direct { command: String },
    /// Rows go through an object store first
    Staged(StagedLoad),
}

impl LoadCommand {
    pub fn direct(command: String) -> Self {
        LoadCommand::Direct { command }
    }

    pub fn is_staged(&self) -> bool {
        matches!(self, LoadCommand::Staged(_))
    }

    pub fn as_staged(&self) -> Option<&StagedLoad> {
        match self {
            LoadCommand::Staged(staged) => Some(staged),
            LoadCommand::Direct { .. } => None,
        }
    }

    /// Render as one shell command reading rows from stdin.
    pub fn render(&self) -> String {
        match self {
            LoadCommand::Direct { command } => command.clone(),
            LoadCommand::Staged(staged) => staged.render(),
        }
    }
}

/// Build a command that executes the statement on stdin.
pub fn build_query_command(config: &DbConfig, options: &QueryOptions) -> Result<String, PlanError> {
    let command = config.query_command(options)?;
    trace!(dialect = %config.dialect(), %command, "built query command");
    Ok(command)
}

/// Build a command that executes the statement on stdin and writes the rows
/// to stdout in `format`.
pub fn build_extract_command(
    config: &DbConfig,
    format: &FormatSpec,
    options: &QueryOptions,
) -> Result<String, PlanError> {
    config.capabilities().check_extract(format)?;
    let command = config.extract_command(format, options)?;
    trace!(dialect = %config.dialect(), %format, %command, "built extract command");
    Ok(command)
}

/// Plan loading rows in `format` from stdin into `table`.
pub fn plan_load(
    config: &DbConfig,
    table: &str,
    format: &FormatSpec,
    options: &QueryOptions,
) -> Result<LoadCommand, PlanError> {
    let table = TableName::parse(table)?;
    config.capabilities().check_load(format)?;
    if let FormatSpec::Csv(csv) = format {
        if csv.has_footer {
            return Err(PlanError::unimplemented(
                config.dialect(),
                "skipping a footer row on load",
            ));
        }
    }
    let load = config.load_command(&table, format, options)?;
    trace!(dialect = %config.dialect(), %table, %format, staged = load.is_staged(), "planned load");
    Ok(load)
}

/// Build a command that loads rows in `format` from stdin into `table`.
pub fn build_load_command(
    config: &DbConfig,
    table: &str,
    format: &FormatSpec,
    options: &QueryOptions,
) -> Result<String, PlanError> {
    plan_load(config, table, format, options).map(|load| load.render())
}
