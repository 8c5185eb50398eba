//! Format flags shared by extract, load and copy.

use anyhow::bail;
use clap::Args;
use dbpipe::{CsvOptions, FormatKind, FormatSpec};

#[derive(Args, Debug, Default, Clone)]
pub struct FormatArgs {
    /// Format: csv, jsonl, avro, parquet, orc, native
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<String>,

    /// Field delimiter, a single character (`\t` or `tab` for tab)
    #[arg(long, value_name = "CHAR")]
    pub delimiter: Option<String>,

    /// Quote character, or `none` for unquoted text
    #[arg(long, value_name = "CHAR")]
    pub quote: Option<String>,

    /// First row holds column names
    #[arg(long)]
    pub header: bool,

    /// Output ends with a row count line
    #[arg(long)]
    pub footer: bool,

    /// String representing NULL
    #[arg(long = "null", value_name = "STRING")]
    pub null_string: Option<String>,
}

impl FormatArgs {
    fn has_csv_flags(&self) -> bool {
        self.delimiter.is_some()
            || self.quote.is_some()
            || self.header
            || self.footer
            || self.null_string.is_some()
    }

    /// No flag given at all.
    pub fn is_empty(&self) -> bool {
        self.format.is_none() && !self.has_csv_flags()
    }

    /// The requested format, with unset CSV parameters taken from `defaults`.
    pub fn to_spec(&self, defaults: CsvOptions) -> anyhow::Result<FormatSpec> {
        let kind = match &self.format {
            Some(name) => name.parse::<FormatKind>().map_err(anyhow::Error::msg)?,
            None => FormatKind::Csv,
        };
        if kind != FormatKind::Csv {
            if self.has_csv_flags() {
                bail!("--delimiter, --quote, --header, --footer and --null only apply to csv, not {kind}");
            }
            return Ok(FormatSpec::from_kind(kind));
        }

        let mut csv = defaults;
        if let Some(delimiter) = &self.delimiter {
            csv.delimiter = parse_delimiter(delimiter)?;
        }
        if let Some(quote) = &self.quote {
            csv.quote = parse_quote(quote)?;
        }
        if self.header {
            csv.has_header = true;
        }
        if self.footer {
            csv.has_footer = true;
        }
        if let Some(null_string) = &self.null_string {
            csv.null_string = Some(null_string.clone());
        }
        Ok(FormatSpec::Csv(csv))
    }
}

fn single_char(value: &str, flag: &str) -> anyhow::Result<char> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => bail!("--{flag} expects a single character, got {value:?}"),
    }
}

pub fn parse_delimiter(value: &str) -> anyhow::Result<char> {
    match value {
        "\\t" | "tab" => Ok('\t'),
        other => single_char(other, "delimiter"),
    }
}

pub fn parse_quote(value: &str) -> anyhow::Result<Option<char>> {
    match value {
        "none" | "" => Ok(None),
        other => single_char(other, "quote").map(Some),
    }
}
