//! Errors returned by command synthesis.

use crate::dialect::Dialect;
use crate::format::FormatKind;
use thiserror::Error;

/// Which half of a transfer a dialect plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Extract,
    Load,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Extract => write!(f, "extract"),
            Side::Load => write!(f, "load"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("{dialect} cannot {side} format {kind}")]
    UnsupportedFormat {
        dialect: Dialect,
        side: Side,
        kind: FormatKind,
    },

    #[error("no common format: {from} cannot extract anything {to} can load")]
    NoCommonFormat { from: Dialect, to: Dialect },

    #[error("native output of {from} is not a contract {to} can load; pick an explicit format")]
    NativeAcrossDialects { from: Dialect, to: Dialect },

    #[error("{dialect} client has no way to express {parameter}")]
    UnimplementedParameter { dialect: Dialect, parameter: String },

    #[error("{dialect} does not support delimiter {delimiter:?} (supported: {supported})")]
    UnsupportedDelimiter {
        dialect: Dialect,
        delimiter: char,
        supported: String,
    },

    #[error("{dialect} does not support quote {quote} (supported: {supported})")]
    UnsupportedQuote {
        dialect: Dialect,
        quote: String,
        supported: String,
    },

    #[error("{dialect} bulk load only accepts an empty null marker, got {null_string:?}")]
    UnsupportedNullString {
        dialect: Dialect,
        null_string: String,
    },

    #[error("invalid table identifier {table:?}: {reason}")]
    InvalidTableIdentifier { table: String, reason: String },

    #[error("{dialect} requires `{field}` to be configured")]
    MissingConfiguration { dialect: Dialect, field: String },

    #[error(
        "{from} writes backslash-escaped {kind} but {to} reads it literally; pick another format"
    )]
    EscapingMismatch {
        from: Dialect,
        to: Dialect,
        kind: FormatKind,
    },

    #[error("invalid {dialect} configuration: {reason}")]
    InvalidConfig { dialect: Dialect, reason: String },

    #[error("could not delete staging object {object}")]
    StagingCleanupFailed { object: String },

    #[error("staged load from {object} failed{}", cleanup_note(.cleaned_up))]
    StagingLoadFailed { object: String, cleaned_up: bool },
}

fn cleanup_note(cleaned_up: &bool) -> &'static str {
    if *cleaned_up {
        ""
    } else {
        " and the object was left behind"
    }
}

impl PlanError {
    pub(crate) fn unimplemented(dialect: Dialect, parameter: impl Into<String>) -> Self {
        PlanError::UnimplementedParameter {
            dialect,
            parameter: parameter.into(),
        }
    }

    pub(crate) fn missing(dialect: Dialect, field: impl Into<String>) -> Self {
        PlanError::MissingConfiguration {
            dialect,
            field: field.into(),
        }
    }

    pub(crate) fn unsupported_quote(dialect: Dialect, quote: Option<char>, supported: &str) -> Self {
        PlanError::UnsupportedQuote {
            dialect,
            quote: match quote {
                Some(q) => format!("{:?}", q),
                None => "none".to_string(),
            },
            supported: supported.to_string(),
        }
    }

    pub(crate) fn unsupported_delimiter(dialect: Dialect, delimiter: char, supported: &str) -> Self {
        PlanError::UnsupportedDelimiter {
            dialect,
            delimiter,
            supported: supported.to_string(),
        }
    }
}
