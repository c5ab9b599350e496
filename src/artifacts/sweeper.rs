//! Periodic removal of expired artifacts.

use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use tracing::{debug, info, warn};

use crate::Result;

/// Counters from one sweep pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepStats {
    /// Directory entries examined.
    pub examined: usize,
    /// Expired files deleted.
    pub removed: usize,
    /// Files that could not be inspected or deleted.
    pub failed: usize,
}

/// Deletes artifacts whose age exceeds the retention period.
///
/// Records in the TTL store expire on their own; the sweeper reclaims the
/// bytes on disk. Age is measured from the file's modification time.
#[derive(Clone)]
pub struct ArtifactSweeper {
    root: PathBuf,
    retention: Duration,
}

impl ArtifactSweeper {
    pub fn new(root: PathBuf, retention: Duration) -> Self {
        Self { root, retention }
    }

    /// Sweep the artifact directory once.
    ///
    /// Per-file failures are logged and skipped so one bad entry cannot
    /// stall the pass. Only a failure to scan the directory itself is an
    /// error.
    pub async fn sweep(&self) -> Result<SweepStats> {
        let mut stats = SweepStats::default();
        let now = SystemTime::now();

        let mut entries = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            stats.examined += 1;
            let path = entry.path();

            let metadata = match entry.metadata().await {
                Ok(m) => m,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "cannot stat artifact, skipping");
                    stats.failed += 1;
                    continue;
                }
            };
            if !metadata.is_file() {
                continue;
            }

            let modified = match metadata.modified() {
                Ok(t) => t,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "no modification time, skipping");
                    stats.failed += 1;
                    continue;
                }
            };
            // A future mtime counts as age zero.
            let age = now.duration_since(modified).unwrap_or_default();

            if age > self.retention {
                match tokio::fs::remove_file(&path).await {
                    Ok(()) => {
                        debug!(path = %path.display(), age_secs = age.as_secs(), "expired artifact removed");
                        stats.removed += 1;
                    }
                    // Someone else already removed it.
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "cannot remove artifact, skipping");
                        stats.failed += 1;
                    }
                }
            }
        }

        if stats.removed > 0 || stats.failed > 0 {
            info!(
                examined = stats.examined,
                removed = stats.removed,
                failed = stats.failed,
                "artifact sweep finished"
            );
        }
        Ok(stats)
    }
}

/// Start a background task sweeping on a fixed interval.
///
/// A failed sweep is logged and retried at the next tick.
///
/// # Returns
/// A join handle for the background task.
pub fn start_sweep_task(
    sweeper: ArtifactSweeper,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            timer.tick().await;
            if let Err(e) = sweeper.sweep().await {
                warn!(error = %e, "artifact sweep failed, will retry next tick");
            }
        }
    })
}
