//! Application composition root
//!
//! Builds the repositories and backends for C1-C6, merges each domain's
//! router into one `Router`, and spawns the three long-lived background
//! tasks (session GC, scheduler credential refresher, status monitor).
//! The returned handles are the caller's responsibility to abort on
//! shutdown.

use std::sync::Arc;

use axum::Router;
use sqlx::PgPool;

use phylo_common::Config;
use phylo_datasets::{DatasetRepository, DatasetsState, PgDatasetRepository};
use phylo_jobs::{JobFacade, JobFilters, JobRepository, JobsState, PgJobRepository};
use phylo_scheduler::http::HttpSchedulerAdapter;
use phylo_scheduler::{SchedulerAdapter, SchedulerAdapterFactory, SchedulerConfig};
use phylo_session::{PgSessionRepository, SessionBackend, SessionConfig};

/// Handles for the background tasks spawned alongside the router.
/// `scheduler_refresher` is `None` when the configured scheduler
/// provider has no credential to refresh (the mock backend).
pub struct BackgroundTasks {
    pub session_gc: tokio::task::JoinHandle<()>,
    pub status_monitor: tokio::task::JoinHandle<()>,
    pub scheduler_refresher: Option<tokio::task::JoinHandle<()>>,
}

impl BackgroundTasks {
    pub fn abort_all(&self) {
        self.session_gc.abort();
        self.status_monitor.abort();
        if let Some(handle) = &self.scheduler_refresher {
            handle.abort();
        }
    }
}

/// Compose ownership lookups for the Session Service so that a removed
/// subject's datasets and jobs are cascade-deleted on GC.
fn cascade_fn(
    datasets: Arc<dyn DatasetRepository>,
    jobs: Arc<dyn JobRepository>,
) -> phylo_session::gc::CascadeFn {
    Arc::new(move |subject: String| {
        let datasets = datasets.clone();
        let jobs = jobs.clone();
        tokio::spawn(async move {
            if let Ok(owned) = datasets.list_by_owner(Some(&subject)).await {
                for dataset in owned {
                    if let Err(e) = datasets.delete(&dataset.id).await {
                        tracing::warn!(dataset_id = %dataset.id, error = %e, "GC cascade: failed to delete dataset");
                    }
                }
            }
            let owned_jobs = jobs
                .list_by_filters(JobFilters {
                    owner: Some(subject.clone()),
                    ..Default::default()
                })
                .await
                .unwrap_or_default();
            for job_id in owned_jobs {
                if let Err(e) = jobs.delete(&job_id, Some(&subject)).await {
                    tracing::warn!(job_id = %job_id, error = %e, "GC cascade: failed to delete job");
                }
            }
        });
    })
}

/// Build the router and start background tasks. `data_dir` doubles as
/// the results directory the Job Facade reads completed output from.
pub async fn create_app(config: &Config, pool: PgPool) -> anyhow::Result<(Router, BackgroundTasks)> {
    let datasets_repo: Arc<dyn DatasetRepository> = Arc::new(PgDatasetRepository::new(pool.clone()));
    let jobs_repo: Arc<dyn JobRepository> = Arc::new(PgJobRepository::new(pool.clone()));
    let session_repo = Arc::new(PgSessionRepository::new(pool.clone()));

    let session_key = phylo_common::load_or_create_key(&config.session_key_path)?;
    let session_config = SessionConfig::from(config);
    let session_backend = SessionBackend::new(session_repo, session_key, session_config);

    let scheduler_config = SchedulerConfig::from(config);
    let (scheduler, scheduler_refresher): (Arc<dyn SchedulerAdapter>, Option<_>) =
        if scheduler_config.provider == "http" {
            let adapter = Arc::new(HttpSchedulerAdapter::new(&scheduler_config)?);
            let refresher = phylo_scheduler::http::spawn_refresher(
                adapter.clone(),
                scheduler_config.token_refresh_secs,
            );
            (adapter, Some(refresher))
        } else {
            (SchedulerAdapterFactory::create(&scheduler_config)?, None)
        };

    let facade = Arc::new(JobFacade::new(
        jobs_repo.clone(),
        datasets_repo.clone(),
        scheduler.clone(),
        config.data_dir.clone(),
    ));

    let datasets_state = DatasetsState {
        repo: datasets_repo.clone(),
        session: session_backend.clone(),
    };
    let jobs_state = JobsState {
        facade,
        session: session_backend.clone(),
    };

    let session_gc = phylo_session::gc::spawn(
        session_backend,
        cascade_fn(datasets_repo.clone(), jobs_repo.clone()),
    );
    let status_monitor = phylo_jobs::monitor::spawn(jobs_repo, scheduler, config.monitor_interval_secs);

    let app = Router::new()
        .route("/health", axum::routing::get(health_check))
        .route("/", axum::routing::get(|| async { "phylo-job-core API" }))
        .merge(phylo_datasets::routes().with_state(datasets_state))
        .merge(phylo_jobs::routes().with_state(jobs_state));

    Ok((
        app,
        BackgroundTasks {
            session_gc,
            status_monitor,
            scheduler_refresher,
        },
    ))
}

async fn health_check() -> &'static str {
    "OK"
}
