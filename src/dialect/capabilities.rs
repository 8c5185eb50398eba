//! Read-only description of what a dialect's client can do.

use super::Dialect;
use crate::error::{PlanError, Side};
use crate::format::{CsvOptions, FormatKind, FormatSpec};
use schemars::JsonSchema;
use serde::Serialize;
use std::collections::BTreeSet;

/// How a client prints SQL NULL in delimited output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum NullConvention {
    /// Always printed this way, no flag changes it
    Fixed(String),
    /// The extract builder can render any requested marker
    Configurable,
}

/// Object storage a dialect loads from when it has no stdin bulk path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum StagingProvider {
    /// Google Cloud Storage through `gsutil`
    Gcs,
    /// Amazon S3 through the `aws` CLI
    S3,
}

/// What has to be done to a statement read from stdin before the client
/// executes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum StatementTermination {
    /// The client executes stdin as is
    None,
    /// A `;` is appended unconditionally (an empty statement is harmless)
    AppendSemicolon,
    /// Trailing whitespace is stripped and a `;` added unless present
    EnsureSemicolon,
    /// `$` is re-quoted, then `;` and a `\go` line are appended
    SqshGo,
    /// `;` and a `GO` batch separator are appended
    BatchGo,
    /// The client takes the statement as a command-line argument
    ExecuteArgument,
}

/// How an extract command turns a statement into formatted rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ExtractStrategy {
    /// Client flags control delimiter, quoting and headers
    NativeFlags,
    /// The statement is wrapped into an export statement
    SqlRewrite,
    /// The client output is cleaned up by a text filter
    PostFilter,
}

/// Per-dialect quirks, selected by dialect identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
pub struct DialectStrategy {
    pub termination: StatementTermination,
    pub extract: ExtractStrategy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct DialectCapabilities {
    pub dialect: Dialect,
    /// Binary name of the native client
    pub client: &'static str,
    pub extract_formats: BTreeSet<FormatKind>,
    pub load_formats: BTreeSet<FormatKind>,
    pub default_delimiter: char,
    pub default_quote: Option<char>,
    pub extract_null: NullConvention,
    /// Null marker a load expects when nothing else is negotiated
    pub load_null: Option<String>,
    pub header_control: bool,
    pub footer_control: bool,
    pub staging: Option<StagingProvider>,
    pub supports_timezone: bool,
    pub supports_echo: bool,
    pub strategy: DialectStrategy,
}

impl DialectCapabilities {
    pub fn supported_extract_formats(&self) -> &BTreeSet<FormatKind> {
        &self.extract_formats
    }

    pub fn supported_load_formats(&self) -> &BTreeSet<FormatKind> {
        &self.load_formats
    }

    pub fn can_extract(&self, kind: FormatKind) -> bool {
        self.extract_formats.contains(&kind)
    }

    pub fn can_load(&self, kind: FormatKind) -> bool {
        self.load_formats.contains(&kind)
    }

    pub fn requires_staging(&self) -> bool {
        self.staging.is_some()
    }

    /// The CSV parameters this dialect writes when nothing is requested.
    pub fn default_csv(&self) -> CsvOptions {
        let null_string = match &self.extract_null {
            NullConvention::Fixed(s) => Some(s.clone()),
            NullConvention::Configurable => None,
        };
        CsvOptions::default()
            .with_delimiter(self.default_delimiter)
            .with_quote(self.default_quote)
            .with_null_string(null_string)
    }

    /// The format this dialect emits for `kind` without further parameters.
    pub fn default_format(&self, kind: FormatKind) -> FormatSpec {
        match kind {
            FormatKind::Csv => FormatSpec::Csv(self.default_csv()),
            other => FormatSpec::from_kind(other),
        }
    }

    pub fn check_extract(&self, format: &FormatSpec) -> Result<(), PlanError> {
        if self.can_extract(format.kind()) {
            Ok(())
        } else {
            Err(self.unsupported(Side::Extract, format.kind()))
        }
    }

    pub fn check_load(&self, format: &FormatSpec) -> Result<(), PlanError> {
        if self.can_load(format.kind()) {
            Ok(())
        } else {
            Err(self.unsupported(Side::Load, format.kind()))
        }
    }

    pub(crate) fn unsupported(&self, side: Side, kind: FormatKind) -> PlanError {
        PlanError::UnsupportedFormat {
            dialect: self.dialect,
            side,
            kind,
        }
    }

    /// Reject a requested header or footer the client cannot produce.
    pub(crate) fn check_header_footer(&self, options: &CsvOptions) -> Result<(), PlanError> {
        if options.has_footer && !self.footer_control {
            return Err(PlanError::unimplemented(self.dialect, "a footer row"));
        }
        if options.has_header && !self.header_control {
            return Err(PlanError::unimplemented(self.dialect, "a header row"));
        }
        Ok(())
    }
}

pub(crate) fn kinds(kinds: &[FormatKind]) -> BTreeSet<FormatKind> {
    kinds.iter().copied().collect()
}
