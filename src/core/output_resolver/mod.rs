#![allow(clippy::result_large_err)]

use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use crate::core::workspace::WorkspaceManager;
use std::path::{Path, PathBuf};

/// Picks the first candidate output path that exists.
///
/// Candidates are probed strictly in the given order; there is no merging and
/// no preference beyond existence. When nothing matches, the error carries the
/// candidate list and a listing of the directory the candidates live in.
pub struct OutputResolver;

impl OutputResolver {
    pub async fn resolve(candidates: &[PathBuf]) -> Result<PathBuf, AppError> {
        for candidate in candidates {
            match tokio::fs::metadata(candidate).await {
                Ok(metadata) if metadata.is_file() => {
                    tracing::debug!(output = %candidate.display(), "resolved obfuscator output");
                    return Ok(candidate.clone());
                }
                Ok(_) => {
                    tracing::debug!(path = %candidate.display(), "candidate output is not a file");
                }
                Err(_) => {}
            }
        }

        let mut error = AppError::new(
            ErrorCategory::OutputNotFound,
            "Obfuscated file was not created",
        )
        .with_code("OUT-001")
        .with_suggestion("Check which file name the obfuscator writes its output to");
        error.add_context("candidates", &render_paths(candidates));
        if let Some(dir) = candidates.first().and_then(|path| path.parent()) {
            let listing = WorkspaceManager::list_dir(dir).await;
            error.add_context("directory", &dir.display().to_string());
            error.add_context("listing", &listing.join(", "));
        }
        Err(error)
    }
}

fn render_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|path| path.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Read a resolved output as UTF-8 text.
pub async fn read_output(path: &Path) -> Result<String, AppError> {
    tokio::fs::read_to_string(path).await.map_err(|err| {
        AppError::new(
            ErrorCategory::IoError,
            format!("failed to read output {}: {}", path.display(), err),
        )
        .with_code("OUT-002")
    })
}
