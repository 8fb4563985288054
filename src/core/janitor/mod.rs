//! Background sweep that deletes stale scratch entries left behind by crashed
//! or killed jobs. Per-job cleanup stays the primary path.

use crate::core::workspace::remove_if_exists;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Outcome of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub scanned: usize,
    pub removed: Vec<PathBuf>,
    pub failed: usize,
}

#[derive(Debug, Clone)]
pub struct Janitor {
    root: PathBuf,
    interval: Duration,
    retention: Duration,
}

impl Janitor {
    pub fn new(root: PathBuf, interval: Duration, retention: Duration) -> Self {
        Janitor {
            root,
            interval,
            retention,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn sweep(&self) -> SweepReport {
        self.sweep_at(SystemTime::now()).await
    }

    /// Remove every direct child of the scratch directory whose modification
    /// time is more than `retention` before `now`. Per-entry failures are
    /// logged and counted; the sweep always visits every entry.
    pub async fn sweep_at(&self, now: SystemTime) -> SweepReport {
        let mut report = SweepReport::default();
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return report,
            Err(err) => {
                tracing::warn!(root = %self.root.display(), error = %err, "janitor could not read scratch directory");
                report.failed += 1;
                return report;
            }
        };

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(err) => {
                    tracing::warn!(error = %err, "janitor failed to read directory entry");
                    report.failed += 1;
                    break;
                }
            };
            report.scanned += 1;
            let path = entry.path();

            let modified = match entry.metadata().await.and_then(|meta| meta.modified()) {
                Ok(modified) => modified,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "janitor failed to stat entry");
                    report.failed += 1;
                    continue;
                }
            };

            // Entries stamped in the future count as fresh.
            let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
            if age <= self.retention {
                continue;
            }

            match remove_if_exists(&path).await {
                Ok(true) => {
                    tracing::info!(path = %path.display(), age_secs = age.as_secs(), "janitor removed stale entry");
                    report.removed.push(path);
                }
                Ok(false) => {}
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "janitor failed to remove entry");
                    report.failed += 1;
                }
            }
        }

        report
    }

    /// Run sweeps every `interval` until the returned handle is stopped.
    pub fn spawn(self) -> JanitorHandle {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; skip it so the first sweep
            // happens one interval after start-up.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => {
                        let report = self.sweep().await;
                        tracing::debug!(
                            scanned = report.scanned,
                            removed = report.removed.len(),
                            failed = report.failed,
                            "janitor sweep finished"
                        );
                    }
                }
            }
            tracing::debug!("janitor stopped");
        });
        JanitorHandle { shutdown_tx, task }
    }
}

/// Owns the background sweep task.
pub struct JanitorHandle {
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl JanitorHandle {
    /// Signal the task to stop and wait for it to exit.
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(());
        if let Err(err) = self.task.await {
            tracing::warn!(error = %err, "janitor task ended abnormally");
        }
    }
}
