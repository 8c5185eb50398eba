//! Extract → optional transform → load pipelines.
//!
//! [`synthesize_pipeline`] turns a [`PipelineRequest`] into a [`CommandPlan`]
//! by walking the phases in [`state`]. Plans are plain data: they can be
//! rendered to a shell pipeline or serialized for inspection.

mod state;

pub use state::{synthesize_pipeline, Phase, SynthesisError, SynthesisState};

use crate::command::{LoadCommand, QueryOptions, TableName};
use crate::dialect::{DbConfig, Dialect};
use crate::format::FormatSpec;
use crate::shell::PIPE;
use schemars::JsonSchema;
use serde::Serialize;

/// A text rewrite between extract and load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TransformRule {
    /// Double every backslash so a backslash-escaping loader reads the
    /// extracted bytes literally
    DoubleBackslashes,
}

impl TransformRule {
    pub fn command(self) -> &'static str {
        match self {
            TransformRule::DoubleBackslashes => r"sed 's/\\/\\\\/g'",
        }
    }
}

/// One stage of a [`CommandPlan`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum Stage {
    Extract { dialect: Dialect, command: String },
    Transform { rule: TransformRule, command: String },
    Load { dialect: Dialect, load: LoadCommand },
}

impl Stage {
    fn transform(rule: TransformRule) -> Self {
        Stage::Transform {
            rule,
            command: rule.command().to_string(),
        }
    }

    pub fn render(&self) -> String {
        match self {
            Stage::Extract { command, .. } | Stage::Transform { command, .. } => command.clone(),
            Stage::Load { load, .. } => load.render(),
        }
    }
}

/// A synthesized pipeline: one extract, at most one transform, one load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct CommandPlan {
    pub source: Dialect,
    pub target: Dialect,
    pub table: TableName,
    pub format: FormatSpec,
    pub stages: Vec<Stage>,
}

impl CommandPlan {
    pub fn extract(&self) -> Option<&Stage> {
        self.stages
            .iter()
            .find(|stage| matches!(stage, Stage::Extract { .. }))
    }

    pub fn transform(&self) -> Option<&Stage> {
        self.stages
            .iter()
            .find(|stage| matches!(stage, Stage::Transform { .. }))
    }

    pub fn load(&self) -> Option<&LoadCommand> {
        self.stages.iter().find_map(|stage| match stage {
            Stage::Load { load, .. } => Some(load),
            _ => None,
        })
    }

    pub fn is_staged(&self) -> bool {
        self.load().is_some_and(LoadCommand::is_staged)
    }

    /// The whole pipeline as one shell command reading the statement on stdin.
    pub fn render(&self) -> String {
        self.stages
            .iter()
            .map(Stage::render)
            .collect::<Vec<_>>()
            .join(PIPE)
    }

    /// [`render`](Self::render) for bash, failing when any stage fails rather
    /// than only the last one.
    pub fn render_with_pipefail(&self) -> String {
        format!("set -o pipefail\n{}", self.render())
    }
}

/// Everything needed to synthesize a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineRequest {
    pub source: DbConfig,
    pub target: DbConfig,
    pub table: String,
    /// Format to use instead of negotiating one
    pub format: Option<FormatSpec>,
    /// Applied to both sides
    pub options: QueryOptions,
    /// Applied only to sides whose client can set a timezone, when
    /// `options.timezone` is unset
    pub default_timezone: Option<String>,
}

impl PipelineRequest {
    pub fn new(source: DbConfig, target: DbConfig, table: impl Into<String>) -> Self {
        Self {
            source,
            target,
            table: table.into(),
            format: None,
            options: QueryOptions::default(),
            default_timezone: None,
        }
    }

    pub fn with_format(mut self, format: FormatSpec) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.options.timezone = Some(timezone.into());
        self
    }

    pub fn with_default_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.default_timezone = Some(timezone.into());
        self
    }

    /// The options one side runs with.
    pub(crate) fn options_for(&self, config: &DbConfig) -> QueryOptions {
        let mut options = self.options.clone();
        if options.timezone.is_none() && config.capabilities().supports_timezone {
            options.timezone = self.default_timezone.clone();
        }
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{BigQueryConfig, PostgresConfig};

    fn plan(stages: Vec<Stage>) -> CommandPlan {
        CommandPlan {
            source: Dialect::Postgres,
            target: Dialect::Postgres,
            table: TableName::parse("t").unwrap(),
            format: FormatSpec::tsv(),
            stages,
        }
    }

    #[test]
    fn test_render_joins_stages_with_pipes() {
        let plan = plan(vec![
            Stage::Extract {
                dialect: Dialect::Postgres,
                command: "a".into(),
            },
            Stage::transform(TransformRule::DoubleBackslashes),
            Stage::Load {
                dialect: Dialect::Postgres,
                load: LoadCommand::direct("b".into()),
            },
        ]);
        assert_eq!(plan.render(), "a \\\n  | sed 's/\\\\/\\\\\\\\/g' \\\n  | b");
        assert!(plan.render_with_pipefail().starts_with("set -o pipefail\n"));
        assert!(plan.transform().is_some());
        assert!(!plan.is_staged());
    }

    #[test]
    fn test_default_timezone_only_where_supported() {
        let request = PipelineRequest::new(
            DbConfig::Postgres(PostgresConfig::default()),
            DbConfig::BigQuery(BigQueryConfig::default()),
            "t",
        )
        .with_default_timezone("Europe/Berlin");
        assert_eq!(
            request.options_for(&request.source).timezone.as_deref(),
            Some("Europe/Berlin")
        );
        assert_eq!(request.options_for(&request.target).timezone, None);
    }

    #[test]
    fn test_explicit_timezone_applies_to_both_sides() {
        let request = PipelineRequest::new(
            DbConfig::Postgres(PostgresConfig::default()),
            DbConfig::BigQuery(BigQueryConfig::default()),
            "t",
        )
        .with_timezone("UTC");
        assert_eq!(
            request.options_for(&request.target).timezone.as_deref(),
            Some("UTC")
        );
    }
}
