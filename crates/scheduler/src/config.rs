//! Scheduler Adapter configuration

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub provider: String,
    pub base_url: String,
    pub submit_path: String,
    pub api_path: String,
    pub key_path: String,
    pub token_lifetime_secs: i64,
    pub token_refresh_secs: u64,
    pub call_timeout_secs: u64,
    /// Base directory under which per-job log and results files are
    /// written/read, e.g. `<base>/<method>_<job_id>_results.json`.
    pub base_dir: String,
}

impl From<&phylo_common::Config> for SchedulerConfig {
    fn from(config: &phylo_common::Config) -> Self {
        Self {
            provider: config.scheduler_provider.clone(),
            base_url: config.scheduler_base_url.clone(),
            submit_path: config.scheduler_submit_path.clone(),
            api_path: config.scheduler_api_path.clone(),
            key_path: config.scheduler_key_path.clone(),
            token_lifetime_secs: config.scheduler_token_lifetime_secs,
            token_refresh_secs: config.scheduler_token_refresh_secs,
            call_timeout_secs: config.scheduler_call_timeout_secs,
            base_dir: config.data_dir.clone(),
        }
    }
}
