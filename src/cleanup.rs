//! Scheduled sweep of stale sessions.

use crate::sessions::SessionStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Interval between cleanup runs.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Run all cleanup tasks once. Returns the number of sessions removed.
pub async fn run_cleanup<S: SessionStore>(sessions: &S) -> usize {
    match sessions.sweep().await {
        Ok(count) => {
            if count > 0 {
                info!(count, "Cleaned up stale sessions");
            }
            count
        }
        Err(e) => {
            error!(error = %e, "Failed to clean up stale sessions");
            0
        }
    }
}

/// Spawn a background task that runs cleanup periodically.
/// Returns a handle that can be used to abort the task.
pub fn spawn_cleanup_scheduler<S: SessionStore>(sessions: Arc<S>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
        // The first tick completes immediately; startup already ran a sweep.
        interval.tick().await;

        loop {
            interval.tick().await;
            run_cleanup(sessions.as_ref()).await;
        }
    })
}
