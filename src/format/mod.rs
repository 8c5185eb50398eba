//! Interchange formats used between an extract and a load stage.
//!
//! The bytes themselves are produced and consumed by the native clients; this
//! module only describes them so builders can pick flags and negotiation can
//! compare both sides.

mod negotiate;

pub use negotiate::{negotiate, preferred_kind};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The kind of an interchange format.
///
/// Variant order is the default negotiation preference.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum FormatKind {
    Csv,
    #[serde(rename = "jsonl")]
    NewlineDelimitedJson,
    Avro,
    Parquet,
    Orc,
    /// Whatever the client emits when not asked for anything specific
    Native,
}

impl FormatKind {
    pub fn all() -> &'static [FormatKind] {
        &[
            FormatKind::Csv,
            FormatKind::NewlineDelimitedJson,
            FormatKind::Avro,
            FormatKind::Parquet,
            FormatKind::Orc,
            FormatKind::Native,
        ]
    }

    /// Binary columnar kinds are never chosen over CSV unless asked for.
    pub fn is_columnar(self) -> bool {
        matches!(self, FormatKind::Avro | FormatKind::Parquet | FormatKind::Orc)
    }

    /// File extension used for staged objects.
    pub fn extension(self) -> &'static str {
        match self {
            FormatKind::Csv => "csv",
            FormatKind::NewlineDelimitedJson => "jsonl",
            FormatKind::Avro => "avro",
            FormatKind::Parquet => "parquet",
            FormatKind::Orc => "orc",
            FormatKind::Native => "txt",
        }
    }
}

impl std::str::FromStr for FormatKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(FormatKind::Csv),
            "jsonl" | "ndjson" | "json" | "newline-delimited-json" => {
                Ok(FormatKind::NewlineDelimitedJson)
            }
            "avro" => Ok(FormatKind::Avro),
            "parquet" => Ok(FormatKind::Parquet),
            "orc" => Ok(FormatKind::Orc),
            "native" => Ok(FormatKind::Native),
            _ => Err(format!(
                "Unknown format: {}. Valid options: csv, jsonl, avro, parquet, orc, native",
                s
            )),
        }
    }
}

impl std::fmt::Display for FormatKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormatKind::Csv => write!(f, "csv"),
            FormatKind::NewlineDelimitedJson => write!(f, "jsonl"),
            FormatKind::Avro => write!(f, "avro"),
            FormatKind::Parquet => write!(f, "parquet"),
            FormatKind::Orc => write!(f, "orc"),
            FormatKind::Native => write!(f, "native"),
        }
    }
}

/// Parameters of a delimited text format.
///
/// `quote: None` means plain delimited text without any quoting; such streams
/// usually rely on backslash escapes instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CsvOptions {
    pub delimiter: char,
    pub quote: Option<char>,
    pub has_header: bool,
    pub has_footer: bool,
    pub null_string: Option<String>,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: ',',
            quote: None,
            has_header: false,
            has_footer: false,
            null_string: None,
        }
    }
}

impl CsvOptions {
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_quote(mut self, quote: Option<char>) -> Self {
        self.quote = quote;
        self
    }

    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    pub fn with_footer(mut self, has_footer: bool) -> Self {
        self.has_footer = has_footer;
        self
    }

    pub fn with_null_string(mut self, null_string: Option<String>) -> Self {
        self.null_string = null_string;
        self
    }
}

/// A fully specified interchange format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FormatSpec {
    Csv(CsvOptions),
    #[serde(rename = "jsonl")]
    NewlineDelimitedJson,
    Avro,
    Parquet,
    Orc,
    Native,
}

impl FormatSpec {
    /// RFC 4180 style CSV: comma separated, double quoted.
    pub fn csv() -> Self {
        FormatSpec::Csv(CsvOptions::default().with_quote(Some('"')))
    }

    /// Tab separated text without quoting.
    pub fn tsv() -> Self {
        FormatSpec::Csv(CsvOptions::default().with_delimiter('\t'))
    }

    /// The parameterless spec for a kind. CSV gets [`CsvOptions::default`].
    pub fn from_kind(kind: FormatKind) -> Self {
        match kind {
            FormatKind::Csv => FormatSpec::Csv(CsvOptions::default()),
            FormatKind::NewlineDelimitedJson => FormatSpec::NewlineDelimitedJson,
            FormatKind::Avro => FormatSpec::Avro,
            FormatKind::Parquet => FormatSpec::Parquet,
            FormatKind::Orc => FormatSpec::Orc,
            FormatKind::Native => FormatSpec::Native,
        }
    }

    pub fn kind(&self) -> FormatKind {
        match self {
            FormatSpec::Csv(_) => FormatKind::Csv,
            FormatSpec::NewlineDelimitedJson => FormatKind::NewlineDelimitedJson,
            FormatSpec::Avro => FormatKind::Avro,
            FormatSpec::Parquet => FormatKind::Parquet,
            FormatSpec::Orc => FormatKind::Orc,
            FormatSpec::Native => FormatKind::Native,
        }
    }

    pub fn csv_options(&self) -> Option<&CsvOptions> {
        match self {
            FormatSpec::Csv(options) => Some(options),
            _ => None,
        }
    }
}

impl std::fmt::Display for FormatSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormatSpec::Csv(o) => {
                write!(f, "csv(delimiter={}", crate::shell::display_char(o.delimiter))?;
                match o.quote {
                    Some(q) => write!(f, ", quote={}", q)?,
                    None => write!(f, ", unquoted")?,
                }
                if o.has_header {
                    write!(f, ", header")?;
                }
                if o.has_footer {
                    write!(f, ", footer")?;
                }
                if let Some(n) = &o.null_string {
                    write!(f, ", null={:?}", n)?;
                }
                write!(f, ")")
            }
            other => write!(f, "{}", other.kind()),
        }
    }
}

/// How a stream encodes characters that would otherwise break its framing.
///
/// Extract stages report what they write, load stages what they expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Escaping {
    /// Payload bytes are taken as they are (quoting or JSON syntax frames values)
    Literal,
    /// `\\`, `\t`, `\n` sequences stand for the escaped character
    Backslash,
}
