//! Status Monitor (C5): drags persisted status toward scheduler-observed
//! truth. A long-lived task with explicit start/stop, following the same
//! shape as the session GC loop and the scheduler credential refresher.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use phylo_scheduler::SchedulerAdapter;

use crate::repository::JobRepository;
use crate::state::JobStatus;

/// Spawn the reconciliation loop. Returns a handle the caller aborts on
/// shutdown; the loop never exits on its own.
pub fn spawn(
    repo: Arc<dyn JobRepository>,
    scheduler: Arc<dyn SchedulerAdapter>,
    interval_secs: u64,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
        loop {
            ticker.tick().await;
            if let Err(e) = reconcile_once(&repo, &scheduler).await {
                tracing::warn!(error = %e, "status monitor tick failed");
            }
        }
    })
}

async fn reconcile_once(
    repo: &Arc<dyn JobRepository>,
    scheduler: &Arc<dyn SchedulerAdapter>,
) -> Result<(), phylo_common::Error> {
    let open = repo
        .list_by_statuses(&[JobStatus::Pending, JobStatus::Running])
        .await?;

    for job in open {
        match scheduler.get_status(&job.scheduler_job_id).await {
            Ok(live) => {
                let live = JobStatus::from(live);
                if live != job.status {
                    if let Err(e) = repo.update_status(&job.job_id, live).await {
                        tracing::warn!(job_id = %job.job_id, error = %e, "failed to persist reconciled status");
                    }
                }
            }
            Err(e) => {
                tracing::warn!(job_id = %job.job_id, error = %e, "status monitor could not reach scheduler for job");
            }
        }
    }
    Ok(())
}
