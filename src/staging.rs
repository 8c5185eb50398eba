//! Staged loads: write stdin to object storage, load from there, delete.
//!
//! The temporary object name is generated by the shell when the command runs
//! (UTC timestamp plus 64 random bits), so rendering stays deterministic while
//! concurrent executions never share an object.

use crate::dialect::StagingProvider;
use crate::error::PlanError;
use crate::shell;
use schemars::JsonSchema;
use serde::Serialize;

/// Shell variable holding the object URI for the duration of a staged load.
pub const OBJECT_VAR: &str = "DBPIPE_STAGE_OBJECT";

/// Directory inside the bucket that receives temporary objects.
pub const STAGING_PREFIX: &str = "dbpipe-tmp";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum StagingStepKind {
    Write,
    Load,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct StagingStep {
    pub kind: StagingStepKind,
    pub command: String,
}

/// The three commands of a staged load plus the object name assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct StagedLoad {
    pub provider: StagingProvider,
    /// Shell assignment of [`OBJECT_VAR`]
    pub object: String,
    pub write: String,
    pub load: String,
    pub delete: String,
}

impl StagedLoad {
    /// Assemble a staged load for `bucket`. `env` is prepended to the storage
    /// client calls (credentials), `load` must read the object from
    /// [`object_ref`].
    pub fn new(
        provider: StagingProvider,
        bucket: &str,
        extension: &str,
        env: &str,
        load: String,
    ) -> Self {
        let object = format!("{}={}", OBJECT_VAR, object_uri(provider, bucket, extension));
        let (write, delete) = match provider {
            StagingProvider::Gcs => (
                format!("{}gsutil -q cp - {}", env, object_ref()),
                format!("{}gsutil -q rm {}", env, object_ref()),
            ),
            StagingProvider::S3 => (
                format!("{}aws s3 cp --quiet - {}", env, object_ref()),
                format!("{}aws s3 rm --quiet {}", env, object_ref()),
            ),
        };
        Self {
            provider,
            object,
            write,
            load,
            delete,
        }
    }

    /// Write, load and delete, in execution order.
    pub fn steps(&self) -> [StagingStep; 3] {
        [
            StagingStep {
                kind: StagingStepKind::Write,
                command: self.write.clone(),
            },
            StagingStep {
                kind: StagingStepKind::Load,
                command: self.load.clone(),
            },
            StagingStep {
                kind: StagingStepKind::Delete,
                command: self.delete.clone(),
            },
        ]
    }

    /// Render as a subshell reading rows from stdin.
    ///
    /// Exits with the status of the write/load chain; the delete always runs
    /// and only prints a warning when it fails.
    pub fn render(&self) -> String {
        format!(
            "({object} \\\n    && {write} \\\n    && {load}; \\\n    rc=$?; {delete} || >&2 echo \"staging cleanup failed: {obj}\"; exit $rc)",
            object = self.object,
            write = self.write,
            load = self.load,
            delete = self.delete,
            obj = object_ref_bare(),
        )
    }
}

/// `"${DBPIPE_STAGE_OBJECT}"`, for embedding in staged commands.
pub fn object_ref() -> String {
    format!("\"{}\"", object_ref_bare())
}

fn object_ref_bare() -> String {
    format!("${{{}}}", OBJECT_VAR)
}

fn object_uri(provider: StagingProvider, bucket: &str, extension: &str) -> String {
    let scheme = match provider {
        StagingProvider::Gcs => "gs",
        StagingProvider::S3 => "s3",
    };
    let bucket = bucket
        .trim_start_matches("gs://")
        .trim_start_matches("s3://")
        .trim_end_matches('/');
    format!(
        "\"{}://{}/{}/$(date -u +%Y%m%dT%H%M%SZ)-$(od -An -N8 -tx1 /dev/urandom | tr -d ' \\n').{}\"",
        scheme,
        shell::escape_double_quoted(bucket),
        STAGING_PREFIX,
        extension
    )
}

/// Result of an executed staged load, for callers that run the steps one by
/// one instead of the rendered subshell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StagedOutcome {
    Loaded,
    /// The load went through but the temporary object is still there
    LoadedWithWarning(PlanError),
}

impl StagedOutcome {
    /// A failed cleanup never overturns a successful load, and never hides a
    /// failed one.
    pub fn settle(
        load_succeeded: bool,
        cleanup_succeeded: bool,
        object: &str,
    ) -> Result<StagedOutcome, PlanError> {
        let cleanup_error = || PlanError::StagingCleanupFailed {
            object: object.to_string(),
        };
        match (load_succeeded, cleanup_succeeded) {
            (true, true) => Ok(StagedOutcome::Loaded),
            (true, false) => Ok(StagedOutcome::LoadedWithWarning(cleanup_error())),
            (false, cleaned_up) => Err(PlanError::StagingLoadFailed {
                object: object.to_string(),
                cleaned_up,
            }),
        }
    }
}
