//! Shell command and pipeline synthesis for moving tabular data between
//! databases through their native command-line clients.

pub mod command;
pub mod config;
pub mod dialect;
pub mod error;
pub mod format;
pub mod json_schema;
pub mod pipeline;
pub mod shell;
pub mod staging;

pub use command::{
    build_extract_command, build_load_command, build_query_command, plan_load, LoadCommand,
    QueryOptions, TableName,
};
pub use dialect::{DbConfig, Dialect, DialectCapabilities};
pub use error::{PlanError, Side};
pub use format::{negotiate, CsvOptions, Escaping, FormatKind, FormatSpec};
pub use pipeline::{synthesize_pipeline, CommandPlan, PipelineRequest, SynthesisError};
