//! Query, extract and load builders against one fully configured connection
//! per dialect.

use dbpipe::config::ConnectionsFile;
use dbpipe::staging::StagingStepKind;
use dbpipe::{
    build_extract_command, build_load_command, build_query_command, plan_load, CsvOptions,
    DbConfig, Dialect, FormatSpec, PlanError, QueryOptions,
};

const CONNECTIONS: &str = r#"
databases:
  pg:
    type: postgres
    host: pg.internal
    port: 5432
    database: dwh
    user: etl
    password: "s3cret'"
  rs:
    type: redshift
    host: cluster.redshift.amazonaws.com
    port: 5439
    database: analytics
    user: loader
    aws_access_key_id: AKIA123
    aws_secret_access_key: secret
    aws_s3_bucket_name: staging-bucket
  my:
    type: mysql
    host: mysql.internal
    database: shop
    user: reader
    password: pw
  sqsh:
    type: sqsh
    host: mssql.internal
    database: erp
    user: sa
    password: pw
  sqlcmd:
    type: sqlcmd
    host: mssql.internal
    database: erp
    user: sa
    password: pw
  ora:
    type: oracle
    host: ora.internal
    endpoint: ORCL
    user: scott
    password: tiger
  lite:
    type: sqlite
    file_name: /data/app.db
  bq:
    type: bigquery
    project: acme
    dataset: raw
    location: EU
    gcloud_gcs_bucket_name: acme-staging
  sf:
    type: snowflake
    account: acme
    user: loader
    database: RAW
  dbx:
    type: databricks
    host: adb-1.azuredatabricks.net
    http_path: /sql/1.0/warehouses/abc
    access_token: dapi123
"#;

fn connections() -> ConnectionsFile {
    serde_yaml_ng::from_str(CONNECTIONS).unwrap()
}

fn db(alias: &str) -> DbConfig {
    connections().resolve(alias).unwrap().clone()
}

#[test]
fn test_fixture_covers_every_dialect() {
    let file = connections();
    let mut dialects: Vec<Dialect> = file.databases.values().map(DbConfig::dialect).collect();
    dialects.sort();
    assert_eq!(dialects, Dialect::all().to_vec());
}

#[test]
fn test_default_format_extracts_for_every_dialect() {
    for config in connections().databases.values() {
        let caps = config.capabilities();
        for kind in caps.supported_extract_formats() {
            let format = caps.default_format(*kind);
            let result = build_extract_command(config, &format, &QueryOptions::new());
            assert!(
                result.is_ok(),
                "{} cannot extract its own default {}: {:?}",
                config.dialect(),
                format,
                result
            );
        }
    }
}

#[test]
fn test_query_command_for_every_dialect() {
    for config in connections().databases.values() {
        let command = build_query_command(config, &QueryOptions::new()).unwrap();
        assert!(
            command.contains(config.capabilities().client),
            "{command}"
        );
    }
}

#[test]
fn test_builders_are_idempotent() {
    let options = QueryOptions::new().with_timezone("Europe/Berlin");
    for config in connections().databases.values() {
        let caps = config.capabilities();
        let options = if caps.supports_timezone {
            options.clone()
        } else {
            QueryOptions::new()
        };
        assert_eq!(
            build_query_command(config, &options),
            build_query_command(config, &options)
        );
        let format = caps.default_format(dbpipe::FormatKind::Csv);
        assert_eq!(
            build_extract_command(config, &format, &options),
            build_extract_command(config, &format, &options)
        );
        assert_eq!(
            build_load_command(config, "t", &FormatSpec::csv(), &options),
            build_load_command(config, "t", &FormatSpec::csv(), &options)
        );
    }
}

#[test]
fn test_postgres_tab_load_escapes_once() {
    let format = FormatSpec::Csv(
        CsvOptions::default()
            .with_delimiter('\t')
            .with_null_string(Some("\\N".to_string())),
    );
    let command = build_load_command(
        &db("pg"),
        "\"public\".\"accounts\"",
        &format,
        &QueryOptions::new(),
    )
    .unwrap();
    assert!(command.contains("\"public\".\"accounts\""), "{command}");
    assert_eq!(command.matches(r"\t").count(), 1, "{command}");
    assert_eq!(command.matches(r"\\N").count(), 1, "{command}");
    assert!(!command.contains(r"\\\N"), "{command}");
}

#[test]
fn test_postgres_password_in_environment() {
    let command = build_query_command(&db("pg"), &QueryOptions::new()).unwrap();
    assert!(command.starts_with("PGPASSWORD='s3cret'\"'\"''"), "{command}");
    assert!(command.contains("--no-psqlrc --set ON_ERROR_STOP=on dwh"));
}

#[test]
fn test_timezone_rejected_where_unsupported() {
    let options = QueryOptions::new().with_timezone("UTC");
    for alias in ["bq", "dbx", "lite"] {
        let err = build_query_command(&db(alias), &options).unwrap_err();
        assert!(
            matches!(err, PlanError::UnimplementedParameter { .. }),
            "{alias}: {err}"
        );
    }
}

#[test]
fn test_sqlcmd_load_rejects_quote() {
    let err = plan_load(&db("sqlcmd"), "dbo.t", &FormatSpec::csv(), &QueryOptions::new())
        .unwrap_err();
    assert!(
        matches!(
            err,
            PlanError::UnsupportedQuote {
                dialect: Dialect::Sqlcmd,
                ..
            }
        ),
        "{err}"
    );
}

#[test]
fn test_sqlcmd_extract_rejects_quote_and_other_delimiters() {
    let config = db("sqlcmd");
    let quoted = FormatSpec::csv();
    assert!(matches!(
        build_extract_command(&config, &quoted, &QueryOptions::new()),
        Err(PlanError::UnsupportedQuote { .. })
    ));
    let tabbed = FormatSpec::tsv();
    assert!(matches!(
        build_extract_command(&config, &tabbed, &QueryOptions::new()),
        Err(PlanError::UnsupportedDelimiter { .. })
    ));
    let semicolon = FormatSpec::Csv(CsvOptions::default().with_delimiter(';'));
    let command = build_extract_command(&config, &semicolon, &QueryOptions::new()).unwrap();
    assert!(command.contains("-s ';'"), "{command}");
}

#[test]
fn test_unsupported_format_is_rejected_before_rendering() {
    let err = build_extract_command(&db("ora"), &FormatSpec::Parquet, &QueryOptions::new())
        .unwrap_err();
    assert!(matches!(err, PlanError::UnsupportedFormat { .. }));

    let err = plan_load(&db("my"), "t", &FormatSpec::csv(), &QueryOptions::new()).unwrap_err();
    assert!(matches!(err, PlanError::UnsupportedFormat { .. }));
}

#[test]
fn test_footer_never_loaded() {
    let format = FormatSpec::Csv(CsvOptions::default().with_footer(true));
    let err = plan_load(&db("pg"), "t", &format, &QueryOptions::new()).unwrap_err();
    assert!(matches!(err, PlanError::UnimplementedParameter { .. }));
}

#[test]
fn test_invalid_table_identifier() {
    for table in ["", "  t", "a\nb"] {
        let err = plan_load(&db("pg"), table, &FormatSpec::csv(), &QueryOptions::new())
            .unwrap_err();
        assert!(matches!(err, PlanError::InvalidTableIdentifier { .. }));
    }
}

#[test]
fn test_bigquery_load_is_staged_in_three_steps() {
    let load = plan_load(&db("bq"), "raw.events", &FormatSpec::csv(), &QueryOptions::new())
        .unwrap();
    let staged = load.as_staged().unwrap();
    let steps = staged.steps();
    assert_eq!(
        steps.iter().map(|s| s.kind).collect::<Vec<_>>(),
        vec![
            StagingStepKind::Write,
            StagingStepKind::Load,
            StagingStepKind::Delete
        ]
    );
    assert!(steps[0].command.contains("gsutil -q cp -"));
    assert!(steps[1].command.contains("bq "));
    assert!(steps[2].command.contains("gsutil -q rm"));

    let rendered = load.render();
    assert!(rendered.contains("gs://acme-staging/dbpipe-tmp/"), "{rendered}");
}

#[test]
fn test_redshift_load_is_staged_through_s3() {
    let load = plan_load(&db("rs"), "public.t", &FormatSpec::tsv(), &QueryOptions::new())
        .unwrap();
    let staged = load.as_staged().unwrap();
    assert!(staged.write.contains("aws s3 cp"));
    assert!(staged.delete.contains("aws s3 rm"));
    assert!(staged.load.contains("COPY public.t FROM"), "{}", staged.load);
}

#[test]
fn test_staging_requires_bucket() {
    let mut config = db("bq");
    if let DbConfig::BigQuery(bq) = &mut config {
        bq.gcloud_gcs_bucket_name = None;
    }
    let err = plan_load(&config, "raw.events", &FormatSpec::csv(), &QueryOptions::new())
        .unwrap_err();
    assert!(matches!(err, PlanError::MissingConfiguration { .. }));
}

#[test]
fn test_echo_never_reaches_extract() {
    let options = QueryOptions::new().with_echo(true);
    let config = db("pg");
    let query = build_query_command(&config, &options).unwrap();
    assert!(query.contains("--echo-all"));
    let extract = build_extract_command(&config, &FormatSpec::csv(), &options).unwrap();
    assert!(!extract.contains("--echo-all"));
}
