//! HTTP Scheduler Adapter: an HTTP-addressable cluster manager over a
//! documented REST dialect (submit/status/cancel/health endpoints).
//!
//! Every request carries `X-SLURM-USER-TOKEN` and `X-SLURM-USER-NAME`.
//! The token is signed locally against a key file and refreshed on a
//! background interval — the scheduler trusts tokens signed with a key
//! it was provisioned with out of band, the same model as the Session
//! Service's own tokens.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;

use crate::config::SchedulerConfig;
use crate::error::SchedulerError;
use crate::status::{map_backend_status, SchedulerStatus};
use crate::{SchedulerAdapter, SubmitRequest};

const USER_NAME: &str = "phylo-core";

struct Credential {
    token: String,
    signed_at: i64,
}

/// What the adapter remembers about a job it submitted, so a later
/// `get_status` can pick the right element out of the backend's `jobs`
/// array (by `name`) and check the right results file on disk.
struct SubmittedJob {
    name: String,
    results_path: std::path::PathBuf,
}

pub struct HttpSchedulerAdapter {
    client: reqwest::Client,
    base_url: String,
    submit_path: String,
    api_path: String,
    /// Directory the submitted job's script is run in and its log/
    /// results files are written to — `SchedulerConfig::base_dir`.
    base_dir: std::path::PathBuf,
    key: String,
    token_lifetime_secs: i64,
    credential: RwLock<Credential>,
    jobs: RwLock<HashMap<String, SubmittedJob>>,
}

impl HttpSchedulerAdapter {
    pub fn new(config: &SchedulerConfig) -> Result<Self, SchedulerError> {
        let key = phylo_common::load_or_create_key(&config.key_path)
            .map_err(|e| SchedulerError::Configuration(e.to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.call_timeout_secs))
            .build()
            .map_err(|e| SchedulerError::Configuration(e.to_string()))?;

        let credential = Credential {
            token: sign_credential(&key, config.token_lifetime_secs),
            signed_at: chrono::Utc::now().timestamp(),
        };

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            submit_path: config.submit_path.clone(),
            api_path: config.api_path.clone(),
            base_dir: std::path::PathBuf::from(&config.base_dir),
            key,
            token_lifetime_secs: config.token_lifetime_secs,
            credential: RwLock::new(credential),
            jobs: RwLock::new(HashMap::new()),
        })
    }

    /// Re-sign the credential. Called by the background refresher; never
    /// fails — signing is local and infallible given a loaded key.
    pub async fn refresh_credential(&self) {
        let mut guard = self.credential.write().await;
        guard.token = sign_credential(&self.key, self.token_lifetime_secs);
        guard.signed_at = chrono::Utc::now().timestamp();
        tracing::info!("scheduler credential refreshed");
    }

    async fn token(&self) -> String {
        self.credential.read().await.token.clone()
    }

    fn submit_endpoint(&self, path: &str) -> String {
        format!(
            "{}{}{}",
            self.base_url.trim_end_matches('/'),
            self.submit_path,
            path
        )
    }

    fn api_endpoint(&self, path: &str) -> String {
        format!(
            "{}{}{}",
            self.base_url.trim_end_matches('/'),
            self.api_path,
            path
        )
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// A non-empty results file is the only reliable evidence, once the
    /// backend has forgotten a job, that it ran to completion rather
    /// than never having existed.
    async fn has_results(&self, scheduler_job_id: &str) -> bool {
        let Some(path) = self
            .jobs
            .read()
            .await
            .get(scheduler_job_id)
            .map(|j| j.results_path.clone())
        else {
            return false;
        };
        tokio::fs::metadata(&path)
            .await
            .map(|m| m.len() > 0)
            .unwrap_or(false)
    }
}

fn sign_credential(key: &str, lifetime_secs: i64) -> String {
    let now = chrono::Utc::now().timestamp();
    phylo_common::sha256_hex(format!("{key}:{USER_NAME}:{now}:{lifetime_secs}").as_bytes())
}

#[async_trait::async_trait]
impl SchedulerAdapter for HttpSchedulerAdapter {
    async fn submit(&self, req: &SubmitRequest) -> Result<String, SchedulerError> {
        let token = self.token().await;

        let results_path = self.base_dir.join(&req.results_path);
        let log_path = self.base_dir.join(&req.log_path);
        let results_str = results_path.to_string_lossy().into_owned();
        let log_str = log_path.to_string_lossy().into_owned();

        let script = format!("#!/bin/sh\n{} >{} 2>{}\n", req.command, results_str, log_str);
        let body = serde_json::json!({
            "job": {
                "name": req.job_id,
                "ntasks": 1,
                "nodes": 1,
                "current_working_directory": self.base_dir.to_string_lossy(),
                "standard_input": "/dev/null",
                "standard_output": results_str,
                "standard_error": log_str,
                "environment": { "PATH": "/bin:/usr/bin" },
            },
            "script": script,
        });

        let response = self
            .client
            .post(self.submit_endpoint("/job/submit"))
            .header("X-SLURM-USER-TOKEN", &token)
            .header("X-SLURM-USER-NAME", USER_NAME)
            .json(&body)
            .send()
            .await
            .map_err(|e| SchedulerError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SchedulerError::Backend { status, body });
        }

        let parsed: serde_json::Value = response
            .json()
            .await
            .map_err(|e| SchedulerError::Transport(e.to_string()))?;

        let scheduler_job_id = parsed
            .get("job_id")
            .and_then(|v| v.as_str().map(str::to_string).or_else(|| v.as_u64().map(|n| n.to_string())))
            .ok_or_else(|| SchedulerError::Transport("missing job_id in response".into()))?;

        self.jobs.write().await.insert(
            scheduler_job_id.clone(),
            SubmittedJob {
                name: req.job_id.clone(),
                results_path,
            },
        );

        Ok(scheduler_job_id)
    }

    async fn get_status(&self, scheduler_job_id: &str) -> Result<SchedulerStatus, SchedulerError> {
        let token = self.token().await;

        let response = self
            .client
            .get(self.api_endpoint(&format!("/job/{scheduler_job_id}")))
            .header("X-SLURM-USER-TOKEN", &token)
            .header("X-SLURM-USER-NAME", USER_NAME)
            .send()
            .await
            .map_err(|e| SchedulerError::Transport(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            let signal = self.has_results(scheduler_job_id).await;
            return Ok(map_backend_status("not-found", signal));
        }

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SchedulerError::Backend { status, body });
        }

        let parsed: serde_json::Value = response
            .json()
            .await
            .map_err(|e| SchedulerError::Transport(e.to_string()))?;

        let jobs = parsed.get("jobs").and_then(|v| v.as_array());
        let Some(jobs) = jobs else {
            let signal = self.has_results(scheduler_job_id).await;
            return Ok(map_backend_status("not-found", signal));
        };
        if jobs.is_empty() {
            let signal = self.has_results(scheduler_job_id).await;
            return Ok(map_backend_status("not-found", signal));
        }

        let expected_name = self
            .jobs
            .read()
            .await
            .get(scheduler_job_id)
            .map(|j| j.name.clone());
        let entry = expected_name
            .as_deref()
            .and_then(|name| jobs.iter().find(|j| j.get("name").and_then(|v| v.as_str()) == Some(name)))
            .or_else(|| jobs.first());

        let raw = entry
            .and_then(|j| j.get("state"))
            .and_then(|s| s.get("current"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown");

        let signal = if raw == "unknown" {
            self.has_results(scheduler_job_id).await
        } else {
            false
        };

        Ok(map_backend_status(raw, signal))
    }

    async fn cancel(&self, scheduler_job_id: &str) -> Result<(), SchedulerError> {
        let token = self.token().await;

        let response = self
            .client
            .delete(self.submit_endpoint(&format!("/job/{scheduler_job_id}")))
            .header("X-SLURM-USER-TOKEN", &token)
            .header("X-SLURM-USER-NAME", USER_NAME)
            .send()
            .await
            .map_err(|e| SchedulerError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SchedulerError::Backend { status, body });
        }

        self.jobs.write().await.remove(scheduler_job_id);
        Ok(())
    }

    async fn check_health(&self) -> (bool, String, Option<SchedulerError>) {
        let token = self.token().await;

        match self
            .client
            .get(self.endpoint("/openapi/v3"))
            .header("X-SLURM-USER-TOKEN", &token)
            .header("X-SLURM-USER-NAME", USER_NAME)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => {
                (true, "scheduler reachable".to_string(), None)
            }
            Ok(response) => {
                let status = response.status().as_u16();
                let body = response.text().await.unwrap_or_default();
                let err = SchedulerError::Backend { status, body };
                (false, err.to_string(), Some(err))
            }
            Err(e) => {
                let err = SchedulerError::Transport(e.to_string());
                (false, err.to_string(), Some(err))
            }
        }
    }
}

/// Spawn the scheduler credential refresher on the configured interval.
pub fn spawn_refresher(
    adapter: Arc<HttpSchedulerAdapter>,
    interval_secs: u64,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
        loop {
            ticker.tick().await;
            adapter.refresh_credential().await;
        }
    })
}
