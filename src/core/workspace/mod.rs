#![allow(clippy::result_large_err)]

//! Per-job file layout inside the shared scratch directory.
//!
//! Every job gets its own `job-<id>` subdirectory holding the input file and
//! every location the obfuscator may write its result to. Keeping the fixed
//! `output.<ext>` fallback inside the job directory means two concurrent jobs
//! never race on the same file.

use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use chrono::Utc;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Prefix shared by every job directory.
pub const JOB_DIR_PREFIX: &str = "job-";

/// Stem of the fixed-name fallback output file.
pub const FALLBACK_OUTPUT_STEM: &str = "output";

/// Request-scoped job identifier: `<unix-millis>-<random>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobId(String);

impl JobId {
    pub fn generate() -> Self {
        JobId(format!(
            "{}-{}",
            Utc::now().timestamp_millis(),
            uuid::Uuid::new_v4().simple()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Paths owned by one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobPaths {
    pub job_dir: PathBuf,
    pub input: PathBuf,
    /// Output locations in probe order.
    pub candidates: Vec<PathBuf>,
}

/// Output locations the obfuscator is known to write to, most specific first:
/// `<stem>_obfuscated.<ext>`, `<stem>.obfuscated.<ext>`, then `output.<ext>`
/// next to the input.
pub fn candidate_outputs(input: &Path, extension: &str) -> Vec<PathBuf> {
    let dir = input.parent().unwrap_or_else(|| Path::new(""));
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    vec![
        dir.join(format!("{}_obfuscated.{}", stem, extension)),
        dir.join(format!("{}.obfuscated.{}", stem, extension)),
        dir.join(format!("{}.{}", FALLBACK_OUTPUT_STEM, extension)),
    ]
}

/// Remove a file or directory, treating "already gone" as success.
/// Returns whether anything was removed.
pub async fn remove_if_exists(path: &Path) -> io::Result<bool> {
    let metadata = match fs::symlink_metadata(path).await {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(err),
    };
    let result = if metadata.is_dir() {
        fs::remove_dir_all(path).await
    } else {
        fs::remove_file(path).await
    };
    match result {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}

#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    root: PathBuf,
    extension: String,
}

impl WorkspaceManager {
    /// A relative `root` is anchored at the current directory here, since the
    /// obfuscator runs from its own install root and must get absolute paths.
    pub fn new(root: PathBuf, extension: impl Into<String>) -> Self {
        let root = match std::path::absolute(&root) {
            Ok(absolute) => absolute,
            Err(err) => {
                tracing::warn!(root = %root.display(), error = %err, "failed to resolve scratch directory");
                root
            }
        };
        WorkspaceManager {
            root,
            extension: extension.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the scratch directory if absent. Safe to call repeatedly.
    pub fn ensure_root(&self) -> Result<(), AppError> {
        std::fs::create_dir_all(&self.root).map_err(|err| {
            AppError::new(
                ErrorCategory::ProvisioningError,
                format!(
                    "failed to create scratch directory {}: {}",
                    self.root.display(),
                    err
                ),
            )
            .with_code("WS-001")
        })
    }

    /// Derive the paths for a job without touching the filesystem.
    pub fn paths_for(&self, id: &JobId) -> JobPaths {
        let job_dir = self.root.join(format!("{}{}", JOB_DIR_PREFIX, id));
        let input = job_dir.join(format!("input_{}.{}", id, self.extension));
        let candidates = candidate_outputs(&input, &self.extension);
        JobPaths {
            job_dir,
            input,
            candidates,
        }
    }

    /// Reserve the job directory. Fails if it already exists so two jobs can
    /// never share paths.
    pub async fn allocate(&self, id: &JobId) -> Result<JobPaths, AppError> {
        let paths = self.paths_for(id);
        fs::create_dir_all(&self.root).await.map_err(|err| {
            AppError::new(
                ErrorCategory::ProvisioningError,
                format!(
                    "failed to create scratch directory {}: {}",
                    self.root.display(),
                    err
                ),
            )
            .with_code("JOB-PROV-001")
        })?;
        fs::create_dir(&paths.job_dir).await.map_err(|err| {
            AppError::new(
                ErrorCategory::ProvisioningError,
                format!(
                    "failed to create job directory {}: {}",
                    paths.job_dir.display(),
                    err
                ),
            )
            .with_code("JOB-PROV-001")
        })?;
        Ok(paths)
    }

    /// Write the job's source text to its input path.
    pub async fn write_input(&self, paths: &JobPaths, source: &str) -> Result<(), AppError> {
        fs::write(&paths.input, source.as_bytes())
            .await
            .map_err(|err| {
                AppError::new(
                    ErrorCategory::ProvisioningError,
                    format!("failed to write input {}: {}", paths.input.display(), err),
                )
                .with_code("JOB-PROV-002")
            })
    }

    /// Remove every path a job may have produced, then its directory.
    /// Failures are logged and never returned.
    pub async fn release(&self, paths: &JobPaths) {
        let files = std::iter::once(&paths.input).chain(paths.candidates.iter());
        for path in files.chain(std::iter::once(&paths.job_dir)) {
            if !path.starts_with(&self.root) {
                tracing::warn!(path = %path.display(), "refusing to remove path outside scratch directory");
                continue;
            }
            match remove_if_exists(path).await {
                Ok(true) => tracing::trace!(path = %path.display(), "removed job path"),
                Ok(false) => {}
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "failed to remove job path")
                }
            }
        }
    }

    /// Names of the entries currently inside a directory, for diagnostics.
    pub async fn list_dir(dir: &Path) -> Vec<String> {
        let mut names = Vec::new();
        let Ok(mut entries) = fs::read_dir(dir).await else {
            return names;
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        names
    }
}
