//! Scheduler Adapter (C4): the sole place that talks to the external
//! compute scheduler.
//!
//! Implementations exist per backend — one cooperating with an
//! HTTP-addressable cluster manager over a documented REST dialect,
//! another a programmable in-process mock for tests. The contract is
//! identical: `submit`/`get_status`/`cancel`/`check_health`.

pub mod config;
mod error;
pub mod http;
pub mod mock;
pub mod status;

use std::sync::Arc;

pub use config::SchedulerConfig;
pub use error::SchedulerError;
pub use status::SchedulerStatus;

/// Everything the adapter needs to build a backend-native job script:
/// the logical job id, the fully normalized command, and the paths the
/// backend should redirect stdout/stderr and results to.
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub job_id: String,
    pub command: String,
    pub log_path: String,
    pub results_path: String,
}

#[async_trait::async_trait]
pub trait SchedulerAdapter: Send + Sync {
    /// Submit a job, returning the backend's own opaque job id.
    async fn submit(&self, req: &SubmitRequest) -> Result<String, SchedulerError>;

    /// Query live status. When the backend reports an unknown/not-found
    /// state, the adapter resolves the ambiguity itself (see the status
    /// mapping table) rather than taking a signal from the caller —
    /// only the adapter that owns the job's result location can tell
    /// whether "gone" means "garbage-collected after success" or
    /// "never ran".
    async fn get_status(&self, scheduler_job_id: &str) -> Result<SchedulerStatus, SchedulerError>;

    /// Instruct the backend to terminate the job. Callers must only
    /// remove their own job-id mapping after this returns `Ok`.
    async fn cancel(&self, scheduler_job_id: &str) -> Result<(), SchedulerError>;

    /// Liveness probe against the backend.
    async fn check_health(&self) -> (bool, String, Option<SchedulerError>);
}

pub struct SchedulerAdapterFactory;

impl SchedulerAdapterFactory {
    pub fn create(config: &SchedulerConfig) -> Result<Arc<dyn SchedulerAdapter>, SchedulerError> {
        match config.provider.as_str() {
            "http" => {
                tracing::info!(base_url = %config.base_url, "creating HTTP scheduler adapter");
                Ok(Arc::new(http::HttpSchedulerAdapter::new(config)?))
            }
            "mock" => {
                tracing::info!("creating mock scheduler adapter");
                Ok(Arc::new(mock::MockSchedulerAdapter::new()))
            }
            provider => Err(SchedulerError::Configuration(format!(
                "unknown scheduler provider: {provider}. supported providers: http, mock"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(provider: &str, base_dir: &std::path::Path) -> SchedulerConfig {
        SchedulerConfig {
            provider: provider.to_string(),
            base_url: "http://localhost:6820".to_string(),
            submit_path: "/slurm/v0.0.40".to_string(),
            api_path: "/slurm/v0.0.40".to_string(),
            key_path: base_dir.join("scheduler.key").to_str().unwrap().to_string(),
            token_lifetime_secs: 3600,
            token_refresh_secs: 1800,
            call_timeout_secs: 5,
            base_dir: base_dir.to_str().unwrap().to_string(),
        }
    }

    #[test]
    fn test_factory_creates_mock() {
        let dir = std::env::temp_dir().join(format!("phylo-sched-factory-{}", uuid::Uuid::new_v4()));
        let result = SchedulerAdapterFactory::create(&test_config("mock", &dir));
        assert!(result.is_ok());
    }

    #[test]
    fn test_factory_creates_http() {
        let dir = std::env::temp_dir().join(format!("phylo-sched-factory-{}", uuid::Uuid::new_v4()));
        let result = SchedulerAdapterFactory::create(&test_config("http", &dir));
        assert!(result.is_ok());
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_factory_rejects_unknown_provider() {
        let dir = std::env::temp_dir().join(format!("phylo-sched-factory-{}", uuid::Uuid::new_v4()));
        let result = SchedulerAdapterFactory::create(&test_config("slurm-direct", &dir));
        assert!(result.is_err());
    }
}
