//! Session GC background task
//!
//! Periodic sweep that deletes Subjects idle past the configured maximum
//! age. Started from the composition root alongside the scheduler
//! credential refresher and the Status Monitor loop; stopped via its
//! `JoinHandle` on shutdown.

use std::time::Duration;

use tokio::task::JoinHandle;

use crate::backend::SessionBackend;

/// A callback invoked with every subject removed by a GC sweep, so the
/// caller can cascade the delete into owned datasets and jobs.
pub type CascadeFn = std::sync::Arc<dyn Fn(String) + Send + Sync>;

/// Spawn the session GC loop. Returns a handle the caller can abort.
pub fn spawn(backend: SessionBackend, on_removed: CascadeFn) -> JoinHandle<()> {
    let interval_secs = backend.config().gc_interval_secs;

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
        loop {
            ticker.tick().await;
            match backend.gc_sweep().await {
                Ok(removed) => {
                    for subject in removed {
                        on_removed(subject);
                    }
                }
                Err(e) => tracing::warn!(error = %e, "session GC sweep failed"),
            }
        }
    })
}
