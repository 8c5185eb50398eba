//! Picking the interchange format for a source/target pair.

use super::{CsvOptions, FormatKind, FormatSpec};
use crate::dialect::{DialectCapabilities, NullConvention};
use crate::error::PlanError;
use std::collections::BTreeSet;
use tracing::debug;

/// The most preferred kind both sides share, never [`FormatKind::Native`].
///
/// Only the intersection matters, so swapping the arguments gives the same
/// answer.
pub fn preferred_kind(
    extract: &BTreeSet<FormatKind>,
    load: &BTreeSet<FormatKind>,
) -> Option<FormatKind> {
    extract
        .intersection(load)
        .copied()
        .filter(|kind| *kind != FormatKind::Native)
        .min()
}

/// Choose the format `source` extracts and `target` loads.
///
/// A hint is validated against both sides and used as is. Without one, CSV
/// wins whenever both sides speak it, with the source's delimiter and quote
/// and a null marker both sides agree on.
pub fn negotiate(
    source: &DialectCapabilities,
    target: &DialectCapabilities,
    hint: Option<&FormatSpec>,
) -> Result<FormatSpec, PlanError> {
    if let Some(hint) = hint {
        if hint.kind() == FormatKind::Native && source.dialect != target.dialect {
            return Err(PlanError::NativeAcrossDialects {
                from: source.dialect,
                to: target.dialect,
            });
        }
        source.check_extract(hint)?;
        target.check_load(hint)?;
        debug!(from = %source.dialect, to = %target.dialect, format = %hint, "using requested format");
        return Ok(hint.clone());
    }

    let kind = preferred_kind(&source.extract_formats, &target.load_formats).ok_or(
        PlanError::NoCommonFormat {
            from: source.dialect,
            to: target.dialect,
        },
    )?;
    let format = match kind {
        FormatKind::Csv => FormatSpec::Csv(negotiated_csv(source, target)),
        other => FormatSpec::from_kind(other),
    };
    debug!(from = %source.dialect, to = %target.dialect, %format, "negotiated format");
    Ok(format)
}

fn negotiated_csv(source: &DialectCapabilities, target: &DialectCapabilities) -> CsvOptions {
    // A client that always prints NULL one way decides; otherwise the source
    // writes whatever the target reads as NULL.
    let null_string = match &source.extract_null {
        NullConvention::Fixed(null) => Some(null.clone()),
        NullConvention::Configurable => target.load_null.clone(),
    };
    CsvOptions::default()
        .with_delimiter(source.default_delimiter)
        .with_quote(source.default_quote)
        .with_null_string(null_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;
    use crate::dialect::kinds;

    #[test]
    fn test_preferred_kind_skips_native() {
        let a = kinds(&[FormatKind::Native, FormatKind::Parquet]);
        let b = kinds(&[FormatKind::Native, FormatKind::Parquet, FormatKind::Csv]);
        assert_eq!(preferred_kind(&a, &b), Some(FormatKind::Parquet));
        assert_eq!(preferred_kind(&kinds(&[FormatKind::Native]), &a), None);
    }

    #[test]
    fn test_preferred_kind_jsonl_before_columnar() {
        let a = kinds(&[FormatKind::Orc, FormatKind::NewlineDelimitedJson]);
        let b = kinds(&[FormatKind::NewlineDelimitedJson, FormatKind::Orc]);
        assert_eq!(preferred_kind(&a, &b), Some(FormatKind::NewlineDelimitedJson));
    }

    #[test]
    fn test_fixed_source_null_wins() {
        let mysql = Dialect::MySql.capabilities();
        let postgres = Dialect::Postgres.capabilities();
        let format = negotiate(&mysql, &postgres, None).unwrap();
        let csv = format.csv_options().unwrap();
        assert_eq!(csv.delimiter, '\t');
        assert_eq!(csv.quote, None);
        assert_eq!(csv.null_string.as_deref(), Some("NULL"));
    }

    #[test]
    fn test_configurable_source_takes_target_null() {
        let postgres = Dialect::Postgres.capabilities();
        let bigquery = Dialect::BigQuery.capabilities();
        let format = negotiate(&postgres, &bigquery, None).unwrap();
        assert_eq!(format.csv_options().unwrap().null_string.as_deref(), Some(""));
    }

    #[test]
    fn test_native_hint_only_within_dialect() {
        let postgres = Dialect::Postgres.capabilities();
        let redshift = Dialect::Redshift.capabilities();
        assert_eq!(
            negotiate(&postgres, &postgres, Some(&FormatSpec::Native)).unwrap(),
            FormatSpec::Native
        );
        assert!(matches!(
            negotiate(&redshift, &postgres, Some(&FormatSpec::Native)),
            Err(PlanError::NativeAcrossDialects { .. })
        ));
    }
}
