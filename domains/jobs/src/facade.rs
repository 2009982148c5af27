//! Job Facade (C6): the sole coordination point exposed to request
//! handlers, threading a request through C1 (subject resolution), C2
//! (dataset ownership), C3 (job record), and C4 (scheduler).

use std::path::PathBuf;
use std::sync::Arc;

use phylo_common::Error;
use phylo_datasets::DatasetRepository;
use phylo_scheduler::{SchedulerAdapter, SubmitRequest};

use crate::method::{normalize_command, MethodParams, MethodType};
use crate::repository::JobRepository;
use crate::state::JobStatus;

pub struct JobFacade {
    jobs: Arc<dyn JobRepository>,
    datasets: Arc<dyn DatasetRepository>,
    scheduler: Arc<dyn SchedulerAdapter>,
    results_dir: PathBuf,
}

/// Outcome of `submit_job`.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Submission {
    pub job_id: String,
    pub status: JobStatus,
}

/// Outcome of `get_job`.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct JobView {
    pub status: JobStatus,
    pub result: Option<serde_json::Value>,
}

impl JobFacade {
    pub fn new(
        jobs: Arc<dyn JobRepository>,
        datasets: Arc<dyn DatasetRepository>,
        scheduler: Arc<dyn SchedulerAdapter>,
        results_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            jobs,
            datasets,
            scheduler,
            results_dir: results_dir.into(),
        }
    }

    /// Assert that `subject` may reference `dataset_id` (must exist and
    /// be owned by `subject` or ownerless). Mirrors the Dataset
    /// Tracker's `get_by_owner` contract, composed here from the
    /// narrower `get_owner`/`get` primitives.
    async fn assert_dataset_access(&self, dataset_id: &str, subject: &str) -> Result<(), Error> {
        match self.datasets.get_owner(dataset_id).await? {
            None => Err(Error::NotFound(format!("dataset {dataset_id} not found"))),
            Some(None) => Ok(()),
            Some(Some(owner)) if owner == subject => Ok(()),
            Some(Some(_)) => Err(Error::Forbidden(format!(
                "dataset {dataset_id} not owned by caller"
            ))),
        }
    }

    pub async fn submit_job(
        &self,
        subject: &str,
        method: MethodType,
        params: MethodParams,
        alignment_id: &str,
        tree_id: Option<&str>,
    ) -> Result<Submission, Error> {
        self.assert_dataset_access(alignment_id, subject).await?;
        if let Some(tree_id) = tree_id {
            self.assert_dataset_access(tree_id, subject).await?;
        }

        let command = normalize_command(method, alignment_id, tree_id, &params)?;
        let job_id = phylo_common::job_id(&command);

        if let Ok(_existing_scheduler_id) = self.jobs.get_scheduler_id(&job_id, Some(subject)).await {
            let metadata = self.jobs.get_metadata(&job_id).await?;
            return Ok(Submission {
                job_id,
                status: metadata.status,
            });
        }

        let log_path = format!("{}_{}.log", method.command_token(), job_id);
        let results_path = format!("{}_{}_results.json", method.command_token(), job_id);
        let scheduler_job_id = self
            .scheduler
            .submit(&SubmitRequest {
                job_id: job_id.clone(),
                command,
                log_path,
                results_path,
            })
            .await
            .map_err(phylo_common::Error::from)?;

        self.jobs
            .store_with_owner(&job_id, &scheduler_job_id, Some(subject))
            .await?;
        self.jobs
            .store_metadata(&job_id, Some(alignment_id), tree_id, method, JobStatus::Pending)
            .await?;

        Ok(Submission {
            job_id,
            status: JobStatus::Pending,
        })
    }

    pub async fn get_job(&self, subject: &str, job_id: &str) -> Result<JobView, Error> {
        let scheduler_job_id = self.jobs.get_scheduler_id(job_id, Some(subject)).await?;
        let status = match self.scheduler.get_status(&scheduler_job_id).await {
            Ok(status) => JobStatus::from(status),
            Err(_) => self.jobs.get_metadata(job_id).await?.status,
        };

        if status != JobStatus::Complete {
            return Ok(JobView { status, result: None });
        }

        let metadata = self.jobs.get_metadata(job_id).await?;
        let method = metadata
            .method_type
            .ok_or_else(|| Error::Internal(format!("job {job_id} missing method metadata")))?;
        let path = self
            .results_dir
            .join(format!("{}_{}_results.json", method.command_token(), job_id));

        let result = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Some(serde_json::from_str(&contents)?),
            Err(_) => None,
        };

        Ok(JobView { status, result })
    }

    pub async fn cancel_job(&self, subject: &str, job_id: &str) -> Result<(), Error> {
        let scheduler_job_id = self.jobs.get_scheduler_id(job_id, Some(subject)).await?;
        self.scheduler
            .cancel(&scheduler_job_id)
            .await
            .map_err(phylo_common::Error::from)?;
        self.jobs.delete(job_id, Some(subject)).await?;
        Ok(())
    }
}
