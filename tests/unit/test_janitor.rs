use obfuscator_api::core::janitor::Janitor;
use std::fs::OpenOptions;
use std::path::Path;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

const RETENTION: Duration = Duration::from_secs(5 * 60);

fn write_aged(path: &Path, age: Duration) {
    std::fs::write(path, "-- leaked").unwrap();
    OpenOptions::new()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(SystemTime::now() - age)
        .unwrap();
}

#[tokio::test]
async fn test_sweep_removes_files_older_than_retention() {
    let temp = TempDir::new().unwrap();
    let stale = temp.path().join("input_1_obfuscated.lua");
    let young = temp.path().join("input_2.lua");
    write_aged(&stale, Duration::from_secs(10 * 60));
    write_aged(&young, Duration::from_secs(60));

    let janitor = Janitor::new(temp.path().to_path_buf(), Duration::from_secs(60), RETENTION);
    let report = janitor.sweep().await;

    assert_eq!(report.scanned, 2);
    assert_eq!(report.removed, vec![stale.clone()]);
    assert_eq!(report.failed, 0);
    assert!(!stale.exists());
    assert!(young.exists());
}

#[tokio::test]
async fn test_sweep_ignores_nested_entries_of_fresh_directories() {
    let temp = TempDir::new().unwrap();
    let job_dir = temp.path().join("job-1");
    std::fs::create_dir(&job_dir).unwrap();
    write_aged(&job_dir.join("output.lua"), Duration::from_secs(10 * 60));

    let janitor = Janitor::new(temp.path().to_path_buf(), Duration::from_secs(60), RETENTION);
    let report = janitor.sweep().await;

    assert!(report.removed.is_empty());
    assert!(job_dir.join("output.lua").exists());
}

#[tokio::test]
async fn test_background_sweep_runs_on_interval() {
    let temp = TempDir::new().unwrap();
    let stale = temp.path().join("output.lua");
    write_aged(&stale, Duration::from_secs(10 * 60));

    let handle = Janitor::new(
        temp.path().to_path_buf(),
        Duration::from_millis(20),
        RETENTION,
    )
    .spawn();

    let mut removed = false;
    for _ in 0..100 {
        if !stale.exists() {
            removed = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    handle.stop().await;
    assert!(removed, "janitor never removed the stale file");
}

#[tokio::test]
async fn test_stopped_janitor_no_longer_sweeps() {
    let temp = TempDir::new().unwrap();
    let handle = Janitor::new(
        temp.path().to_path_buf(),
        Duration::from_millis(20),
        RETENTION,
    )
    .spawn();
    handle.stop().await;

    let stale = temp.path().join("output.lua");
    write_aged(&stale, Duration::from_secs(10 * 60));
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(stale.exists());
}
