use crate::cli::args::RunArgs;
use crate::core::config::ServiceConfig;
use crate::core::janitor::Janitor;
use crate::core::job::{JobRunner, ObfuscateRequest};
use crate::Result;
use anyhow::Context;
use std::io::Write;

pub async fn serve(config: ServiceConfig) -> Result<()> {
    crate::server::serve(config).await?;
    Ok(())
}

pub async fn run(args: RunArgs, config: ServiceConfig) -> Result<()> {
    let source = tokio::fs::read_to_string(&args.file)
        .await
        .with_context(|| format!("failed to read {}", args.file.display()))?;

    let job = ObfuscateRequest {
        code: Some(source),
        preset: Some(args.preset.as_str().to_string()),
    }
    .validate()?;

    let outcome = JobRunner::from_config(&config).run(job).await?;

    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(outcome.output.as_bytes())
        .context("failed to write output")?;
    stdout.flush().context("failed to flush output")?;
    Ok(())
}

pub async fn sweep(config: ServiceConfig) -> Result<()> {
    let janitor = Janitor::new(
        config.workspace.scratch_dir.clone(),
        config.workspace.sweep_interval,
        config.workspace.retention,
    );
    let report = janitor.sweep().await;
    eprintln!(
        "Swept {}: scanned {}, removed {}, failed {}",
        janitor.root().display(),
        report.scanned,
        report.removed.len(),
        report.failed
    );
    if report.failed > 0 {
        anyhow::bail!("{} scratch entries could not be removed", report.failed);
    }
    Ok(())
}
