#[path = "../common/mod.rs"]
mod common;

use anyhow::Result;
use common::{entries, expected_output, fake_tool, ToolMode};
use obfuscator_api::core::job::{JobRunner, ObfuscateRequest, ValidatedJob};
use obfuscator_api::core::types::{ErrorCategory, Preset};
use std::path::PathBuf;
use std::time::{Duration, Instant};

fn job(source: &str, preset: Preset) -> ValidatedJob {
    ValidatedJob {
        source: source.to_string(),
        preset,
    }
}

#[tokio::test]
async fn successful_job_returns_output_and_cleans_up() -> Result<()> {
    let tool = fake_tool(ToolMode::Suffix);
    let runner = JobRunner::from_config(&tool.config(Duration::from_secs(10)));

    let outcome = runner.run(job("print(1)\n", Preset::Strong)).await?;

    assert_eq!(outcome.output, expected_output("Strong", "print(1)\n"));
    assert_eq!(outcome.preset, Preset::Strong);
    assert!(outcome.invocation.stderr.contains("obfuscating with Strong"));
    assert!(entries(&tool.scratch).is_empty());
    Ok(())
}

#[tokio::test]
async fn relative_scratch_dir_works_with_separate_install_root() -> Result<()> {
    let tool = fake_tool(ToolMode::Suffix);
    let local = tempfile::Builder::new()
        .prefix("scratch-rel-")
        .tempdir_in(".")?;
    let relative = PathBuf::from(local.path().file_name().expect("temp dir name"));
    assert!(relative.is_relative());

    let mut config = tool.config(Duration::from_secs(10));
    config.workspace.scratch_dir = relative;
    assert_ne!(config.tool.install_root, std::env::current_dir()?);
    let runner = JobRunner::from_config(&config);

    let outcome = runner.run(job("print(2)\n", Preset::Weak)).await?;

    assert_eq!(outcome.output, expected_output("Weak", "print(2)\n"));
    assert!(entries(local.path()).is_empty());
    assert!(entries(tool.dir.path().join(local.path().file_name().unwrap()).as_path()).is_empty());
    Ok(())
}

#[tokio::test]
async fn dotted_and_fixed_output_names_are_found() -> Result<()> {
    for mode in [ToolMode::Dotted, ToolMode::Fixed] {
        let tool = fake_tool(mode);
        let runner = JobRunner::from_config(&tool.config(Duration::from_secs(10)));
        let outcome = runner.run(job("x = 1", Preset::Weak)).await?;
        assert_eq!(outcome.output, expected_output("Weak", "x = 1"), "{:?}", mode);
        assert!(entries(&tool.scratch).is_empty(), "{:?}", mode);
    }
    Ok(())
}

#[tokio::test]
async fn source_text_is_passed_through_verbatim() -> Result<()> {
    let tool = fake_tool(ToolMode::Suffix);
    let runner = JobRunner::from_config(&tool.config(Duration::from_secs(10)));
    let source = "local s = \"héllo ✓ $HOME `id`\"\r\nprint(s)\n";

    let outcome = runner.run(job(source, Preset::Medium)).await?;

    assert_eq!(outcome.output, expected_output("Medium", source));
    Ok(())
}

#[tokio::test]
async fn non_zero_exit_is_tool_failure_without_leftovers() -> Result<()> {
    let tool = fake_tool(ToolMode::Fail);
    let runner = JobRunner::from_config(&tool.config(Duration::from_secs(10)));

    let err = runner.run(job("x(", Preset::Strong)).await.unwrap_err();

    assert_eq!(err.category, ErrorCategory::ToolExecutionError);
    assert!(err.context["stderr"].contains("unexpected symbol"));
    assert_eq!(err.public_message(), "obfuscator exited with status 2");
    assert!(entries(&tool.scratch).is_empty());
    Ok(())
}

#[tokio::test]
async fn missing_output_is_reported_and_input_removed() -> Result<()> {
    let tool = fake_tool(ToolMode::NoOutput);
    let runner = JobRunner::from_config(&tool.config(Duration::from_secs(10)));

    let err = runner.run(job("x = 1", Preset::Strong)).await.unwrap_err();

    assert_eq!(err.category, ErrorCategory::OutputNotFound);
    assert!(err.context["listing"].starts_with("input_"));
    assert!(entries(&tool.scratch).is_empty());
    Ok(())
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn timeout_kills_the_tool_and_cleans_up() -> Result<()> {
    let tool = fake_tool(ToolMode::Hang);
    let runner = JobRunner::from_config(&tool.config(Duration::from_millis(500)));

    let start = Instant::now();
    let err = runner.run(job("while true do end", Preset::Extreme)).await.unwrap_err();

    assert_eq!(err.category, ErrorCategory::TimeoutError);
    assert!(start.elapsed() < Duration::from_secs(10));
    let pid = tool.recorded_pid().expect("fake tool recorded its pid");
    assert!(!common::process_alive(pid), "process {} still running", pid);
    assert!(entries(&tool.scratch).is_empty());
    Ok(())
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn timeout_kills_processes_started_by_the_tool() -> Result<()> {
    let tool = fake_tool(ToolMode::HangWithChild);
    let runner = JobRunner::from_config(&tool.config(Duration::from_millis(500)));

    let start = Instant::now();
    let err = runner.run(job("x = 1", Preset::Strong)).await.unwrap_err();

    assert_eq!(err.category, ErrorCategory::TimeoutError);
    assert!(start.elapsed() < Duration::from_secs(10));
    let helper = tool.recorded_pid().expect("fake tool recorded its helper pid");
    assert!(!common::process_alive(helper), "helper {} still running", helper);
    assert!(entries(&tool.scratch).is_empty());
    Ok(())
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn helper_left_running_after_exit_is_stopped() -> Result<()> {
    let tool = fake_tool(ToolMode::LeaveChild);
    let runner = JobRunner::from_config(&tool.config(Duration::from_secs(20)));

    let start = Instant::now();
    let outcome = runner.run(job("print(3)", Preset::Medium)).await?;

    assert_eq!(outcome.output, expected_output("Medium", "print(3)"));
    assert!(start.elapsed() < Duration::from_secs(10));
    let helper = tool.recorded_pid().expect("fake tool recorded its helper pid");
    assert!(!common::process_alive(helper), "helper {} still running", helper);
    assert!(entries(&tool.scratch).is_empty());
    Ok(())
}

#[tokio::test]
async fn missing_runtime_fails_without_leftovers() -> Result<()> {
    let tool = fake_tool(ToolMode::Suffix);
    let mut config = tool.config(Duration::from_secs(10));
    config.tool.runtime = "obfuscator-runtime-that-does-not-exist".to_string();
    let runner = JobRunner::from_config(&config);

    let err = runner.run(job("x = 1", Preset::Strong)).await.unwrap_err();

    assert_eq!(err.category, ErrorCategory::ToolExecutionError);
    assert_eq!(err.public_message(), "obfuscator could not be started");
    assert!(entries(&tool.scratch).is_empty());
    Ok(())
}

#[tokio::test]
async fn concurrent_jobs_with_fixed_output_name_do_not_interfere() -> Result<()> {
    let tool = fake_tool(ToolMode::Fixed);
    let runner = JobRunner::from_config(&tool.config(Duration::from_secs(20)));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let runner = runner.clone();
            tokio::spawn(async move {
                let source = format!("print({})\n", i);
                let outcome = runner.run(job(&source, Preset::Strong)).await;
                (source, outcome)
            })
        })
        .collect();

    for handle in handles {
        let (source, outcome) = handle.await?;
        let outcome = outcome?;
        assert_eq!(outcome.output, expected_output("Strong", &source));
    }
    assert!(entries(&tool.scratch).is_empty());
    Ok(())
}

#[tokio::test]
async fn rejected_requests_touch_nothing() -> Result<()> {
    let tool = fake_tool(ToolMode::Suffix);

    let blank = ObfuscateRequest {
        code: Some("  \n".to_string()),
        preset: Some("Strong".to_string()),
    };
    let bad_preset = ObfuscateRequest {
        code: Some("x=1".to_string()),
        preset: Some("Ultra".to_string()),
    };
    assert!(blank.validate().is_err());
    assert!(bad_preset.validate().is_err());
    assert!(!tool.scratch.exists());
    Ok(())
}
