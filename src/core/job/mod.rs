#![allow(clippy::result_large_err)]

//! One obfuscation request from validation to cleanup.
//!
//! Phases run in order: Validating, Provisioning, Invoking, Resolving,
//! Reading, CleaningUp, Responding. A failure in any phase from Provisioning
//! through Reading skips ahead to CleaningUp, which always runs.

use crate::core::config::ServiceConfig;
use crate::core::error::AppError;
use crate::core::output_resolver::{read_output, OutputResolver};
use crate::core::tool_executor::{InvocationResult, TransformationInvoker};
use crate::core::types::{ErrorCategory, JobPhase, Preset};
use crate::core::workspace::{JobId, JobPaths, WorkspaceManager};
use serde::{Deserialize, Deserializer};
use tracing::Instrument;

pub const NO_CODE_MESSAGE: &str = "No code provided";
pub const INVALID_PRESET_MESSAGE: &str = "Invalid preset";

/// Inbound request body for `POST /api/obfuscate`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ObfuscateRequest {
    #[serde(default)]
    pub code: Option<String>,
    /// Only an absent field falls back to the default; `null` is not a preset.
    #[serde(default, deserialize_with = "deserialize_present_preset")]
    pub preset: Option<String>,
}

fn deserialize_present_preset<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Some(Option::<String>::deserialize(deserializer)?.unwrap_or_default()))
}

/// A request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedJob {
    pub source: String,
    pub preset: Preset,
}

impl ObfuscateRequest {
    /// Reject blank code and presets outside the allow-list. Does no I/O.
    pub fn validate(self) -> Result<ValidatedJob, AppError> {
        let source = match self.code {
            Some(code) if !code.trim().is_empty() => code,
            _ => {
                return Err(
                    AppError::new(ErrorCategory::ValidationError, NO_CODE_MESSAGE)
                        .with_code("JOB-VAL-001"),
                )
            }
        };
        let preset = match self.preset.as_deref() {
            None => Preset::default(),
            Some(name) => name.parse::<Preset>().map_err(|_| {
                AppError::new(ErrorCategory::ValidationError, INVALID_PRESET_MESSAGE)
                    .with_code("JOB-VAL-002")
                    .with_suggestion(format!(
                        "Use one of: {}",
                        Preset::ALL.map(Preset::as_str).join(", ")
                    ))
            })?,
        };
        Ok(ValidatedJob { source, preset })
    }
}

/// Result of a successful job.
#[derive(Debug, Clone)]
pub struct JobOutcome {
    pub job_id: JobId,
    pub preset: Preset,
    pub output: String,
    pub invocation: InvocationResult,
}

#[derive(Clone)]
pub struct JobRunner {
    workspace: WorkspaceManager,
    invoker: TransformationInvoker,
}

impl JobRunner {
    pub fn new(workspace: WorkspaceManager, invoker: TransformationInvoker) -> Self {
        JobRunner { workspace, invoker }
    }

    pub fn from_config(config: &ServiceConfig) -> Self {
        JobRunner::new(
            WorkspaceManager::new(
                config.workspace.scratch_dir.clone(),
                config.tool.source_extension.clone(),
            ),
            TransformationInvoker::new(&config.tool),
        )
    }

    pub fn workspace(&self) -> &WorkspaceManager {
        &self.workspace
    }

    /// Run a validated job end to end. Every file the job created is gone
    /// by the time this returns, whatever the outcome.
    pub async fn run(&self, job: ValidatedJob) -> Result<JobOutcome, AppError> {
        let job_id = JobId::generate();
        let span = tracing::info_span!("job", job_id = %job_id, preset = %job.preset);
        self.run_job(job_id, job).instrument(span).await
    }

    async fn run_job(&self, job_id: JobId, job: ValidatedJob) -> Result<JobOutcome, AppError> {
        enter(JobPhase::Provisioning);
        // A failed allocation owns nothing, so there is nothing to clean up.
        let paths = match self.workspace.allocate(&job_id).await {
            Ok(paths) => paths,
            Err(err) => return Err(fail(err)),
        };

        let result = self.execute(&paths, &job).await;

        enter(JobPhase::CleaningUp);
        self.workspace.release(&paths).await;

        enter(JobPhase::Responding);
        match result {
            Ok((output, invocation)) => {
                tracing::info!(
                    duration_ms = invocation.duration_ms,
                    output_bytes = output.len(),
                    "job completed"
                );
                Ok(JobOutcome {
                    job_id,
                    preset: job.preset,
                    output,
                    invocation,
                })
            }
            Err(err) => Err(fail(err)),
        }
    }

    async fn execute(
        &self,
        paths: &JobPaths,
        job: &ValidatedJob,
    ) -> Result<(String, InvocationResult), AppError> {
        self.workspace.write_input(paths, &job.source).await?;

        enter(JobPhase::Invoking);
        let invocation = self
            .invoker
            .run(&paths.input, job.preset, self.invoker.timeout())
            .await?;

        enter(JobPhase::Resolving);
        let output_path = OutputResolver::resolve(&paths.candidates).await?;

        enter(JobPhase::Reading);
        let output = read_output(&output_path).await?;
        Ok((output, invocation))
    }
}

fn enter(phase: JobPhase) {
    tracing::debug!(phase = %phase, "job phase");
}

fn fail(err: AppError) -> AppError {
    tracing::error!(code = %err.code, category = %err.category, error = %err, "job failed");
    err
}
