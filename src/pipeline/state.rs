//! The synthesis state machine.
//!
//! Each phase consumes the previous state and produces the next one; the
//! first error ends the walk in [`SynthesisState::Failed`]. Nothing is
//! retried and no partial plan escapes.

use super::{CommandPlan, PipelineRequest, Stage, TransformRule};
use crate::command::{self, LoadCommand};
use crate::dialect::DbConfig;
use crate::error::PlanError;
use crate::format::{self, Escaping, FormatSpec};
use std::fmt;
use thiserror::Error;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Negotiating,
    BuildingExtract,
    BuildingTransform,
    BuildingLoad,
    Composed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Negotiating => write!(f, "negotiating"),
            Phase::BuildingExtract => write!(f, "building_extract"),
            Phase::BuildingTransform => write!(f, "building_transform"),
            Phase::BuildingLoad => write!(f, "building_load"),
            Phase::Composed => write!(f, "composed"),
        }
    }
}

/// Why a pipeline could not be synthesized, and in which phase.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{phase} failed")]
pub struct SynthesisError {
    pub phase: Phase,
    pub source: PlanError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthesisState {
    Negotiating,
    BuildingExtract {
        format: FormatSpec,
    },
    BuildingTransform {
        format: FormatSpec,
        extract: String,
    },
    BuildingLoad {
        format: FormatSpec,
        extract: String,
        transform: Option<TransformRule>,
    },
    Composed(CommandPlan),
    Failed {
        phase: Phase,
        error: PlanError,
    },
}

impl SynthesisState {
    pub fn phase(&self) -> Phase {
        match self {
            SynthesisState::Negotiating => Phase::Negotiating,
            SynthesisState::BuildingExtract { .. } => Phase::BuildingExtract,
            SynthesisState::BuildingTransform { .. } => Phase::BuildingTransform,
            SynthesisState::BuildingLoad { .. } => Phase::BuildingLoad,
            SynthesisState::Composed(_) => Phase::Composed,
            SynthesisState::Failed { phase, .. } => *phase,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SynthesisState::Composed(_) | SynthesisState::Failed { .. }
        )
    }

    /// Run the current phase and move on.
    pub fn advance(self, request: &PipelineRequest) -> SynthesisState {
        let phase = self.phase();
        trace!(%phase, "synthesis step");
        let next = match self {
            SynthesisState::Negotiating => format::negotiate(
                &request.source.capabilities(),
                &request.target.capabilities(),
                request.format.as_ref(),
            )
            .map(|format| SynthesisState::BuildingExtract { format }),

            SynthesisState::BuildingExtract { format } => {
                let options = request.options_for(&request.source);
                command::build_extract_command(&request.source, &format, &options)
                    .map(|extract| SynthesisState::BuildingTransform { format, extract })
            }

            SynthesisState::BuildingTransform { format, extract } => {
                transform_between(&request.source, &request.target, &format).map(|transform| {
                    SynthesisState::BuildingLoad {
                        format,
                        extract,
                        transform,
                    }
                })
            }

            SynthesisState::BuildingLoad {
                format,
                extract,
                transform,
            } => {
                let options = request.options_for(&request.target);
                command::plan_load(&request.target, &request.table, &format, &options)
                    .and_then(|load| compose(request, format, extract, transform, load))
                    .map(SynthesisState::Composed)
            }

            terminal => return terminal,
        };
        next.unwrap_or_else(|error| SynthesisState::Failed { phase, error })
    }
}

/// The transform needed for bytes written by `source` to be read back by
/// `target` unchanged.
fn transform_between(
    source: &DbConfig,
    target: &DbConfig,
    format: &FormatSpec,
) -> Result<Option<TransformRule>, PlanError> {
    match (source.extract_escaping(format), target.load_escaping(format)) {
        (Escaping::Literal, Escaping::Backslash) => {
            debug!(from = %source.dialect(), to = %target.dialect(), "doubling backslashes between extract and load");
            Ok(Some(TransformRule::DoubleBackslashes))
        }
        (Escaping::Backslash, Escaping::Literal) => Err(PlanError::EscapingMismatch {
            from: source.dialect(),
            to: target.dialect(),
            kind: format.kind(),
        }),
        _ => Ok(None),
    }
}

fn compose(
    request: &PipelineRequest,
    format: FormatSpec,
    extract: String,
    transform: Option<TransformRule>,
    load: LoadCommand,
) -> Result<CommandPlan, PlanError> {
    let table = command::TableName::parse(&request.table)?;
    let mut stages = vec![Stage::Extract {
        dialect: request.source.dialect(),
        command: extract,
    }];
    stages.extend(transform.map(Stage::transform));
    stages.push(Stage::Load {
        dialect: request.target.dialect(),
        load,
    });
    Ok(CommandPlan {
        source: request.source.dialect(),
        target: request.target.dialect(),
        table,
        format,
        stages,
    })
}

/// Synthesize an extract → transform → load pipeline for `request`.
pub fn synthesize_pipeline(request: &PipelineRequest) -> Result<CommandPlan, SynthesisError> {
    let mut state = SynthesisState::Negotiating;
    loop {
        state = match state {
            SynthesisState::Composed(plan) => {
                debug!(
                    source = %plan.source,
                    target = %plan.target,
                    format = %plan.format,
                    stages = plan.stages.len(),
                    "pipeline composed"
                );
                return Ok(plan);
            }
            SynthesisState::Failed { phase, error } => {
                return Err(SynthesisError {
                    phase,
                    source: error,
                })
            }
            pending => pending.advance(request),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{MysqlConfig, PostgresConfig};

    fn postgres() -> DbConfig {
        DbConfig::Postgres(PostgresConfig {
            database: Some("dwh".into()),
            ..Default::default()
        })
    }

    #[test]
    fn test_phases_in_order() {
        let request = PipelineRequest::new(postgres(), postgres(), "t");
        let mut state = SynthesisState::Negotiating;
        let mut phases = vec![state.phase()];
        while !state.is_terminal() {
            state = state.advance(&request);
            phases.push(state.phase());
        }
        assert_eq!(
            phases,
            vec![
                Phase::Negotiating,
                Phase::BuildingExtract,
                Phase::BuildingTransform,
                Phase::BuildingLoad,
                Phase::Composed
            ]
        );
    }

    #[test]
    fn test_failure_names_phase() {
        let request = PipelineRequest::new(
            postgres(),
            DbConfig::MySql(MysqlConfig::default()),
            "t",
        );
        let err = synthesize_pipeline(&request).unwrap_err();
        assert_eq!(err.phase, Phase::Negotiating);
        assert!(matches!(err.source, PlanError::NoCommonFormat { .. }));
    }

    #[test]
    fn test_terminal_state_does_not_move() {
        let request = PipelineRequest::new(postgres(), postgres(), "t");
        let failed = SynthesisState::Failed {
            phase: Phase::BuildingLoad,
            error: PlanError::StagingCleanupFailed { object: "x".into() },
        };
        assert_eq!(failed.clone().advance(&request), failed);
    }
}
