//! Job storage: ownership-gated reads/writes, upsert-on-submit
//! semantics, and the terminal-state transition guard.

use async_trait::async_trait;
use chrono::Utc;

use phylo_common::Error;

use crate::entity::{Job, JobInfo, JobMetadata};
use crate::filters::JobFilters;
use crate::method::MethodType;
use crate::state::JobStatus;

#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Upsert the `(job_id, scheduler_job_id, owner)` mapping. Absent
    /// `job_id` inserts; present with the same `scheduler_job_id` is a
    /// no-op except filling in `owner` if it was previously empty;
    /// present with a different `scheduler_job_id` overwrites it. An
    /// empty incoming `owner` never overwrites a non-empty stored one.
    async fn store_with_owner(
        &self,
        job_id: &str,
        scheduler_job_id: &str,
        owner: Option<&str>,
    ) -> Result<(), Error>;

    async fn store_metadata(
        &self,
        job_id: &str,
        alignment_id: Option<&str>,
        tree_id: Option<&str>,
        method_type: MethodType,
        initial_status: JobStatus,
    ) -> Result<(), Error>;

    /// Ownership-gated lookup. `NotFound` if absent; `Forbidden` if
    /// `owner` is set on the row and doesn't match.
    async fn get_scheduler_id(&self, job_id: &str, owner: Option<&str>) -> Result<String, Error>;

    async fn update_status(&self, job_id: &str, status: JobStatus) -> Result<(), Error>;

    async fn update_status_as_owner(
        &self,
        job_id: &str,
        owner: Option<&str>,
        status: JobStatus,
    ) -> Result<(), Error>;

    async fn delete(&self, job_id: &str, owner: Option<&str>) -> Result<(), Error>;

    async fn list_by_filters(&self, filters: JobFilters) -> Result<Vec<String>, Error>;

    async fn list_by_statuses(&self, statuses: &[JobStatus]) -> Result<Vec<JobInfo>, Error>;

    async fn get_metadata(&self, job_id: &str) -> Result<JobMetadata, Error>;

    /// `None` = no such job; `Some(None)` = exists, no owner (public);
    /// `Some(Some(subject))` = exists, owned.
    async fn get_owner(&self, job_id: &str) -> Result<Option<Option<String>>, Error>;
}

pub struct PgJobRepository {
    pool: sqlx::PgPool,
}

impl PgJobRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }

    async fn load(&self, job_id: &str) -> Result<Option<Job>, Error> {
        let row: Option<Job> = sqlx::query_as(
            "SELECT job_id, scheduler_job_id, owner_subject, alignment_id, tree_id, method_type, status, created_at, updated_at FROM jobs WHERE job_id = $1",
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}

#[async_trait]
impl JobRepository for PgJobRepository {
    async fn store_with_owner(
        &self,
        job_id: &str,
        scheduler_job_id: &str,
        owner: Option<&str>,
    ) -> Result<(), Error> {
        if job_id.trim().is_empty() || scheduler_job_id.trim().is_empty() {
            return Err(Error::Validation(
                "job_id and scheduler_job_id must not be empty".to_string(),
            ));
        }
        sqlx::query(
            r#"
            INSERT INTO jobs (job_id, scheduler_job_id, owner_subject, status, created_at, updated_at)
            VALUES ($1, $2, $3, 'pending', NOW(), NOW())
            ON CONFLICT (job_id) DO UPDATE SET
                scheduler_job_id = EXCLUDED.scheduler_job_id,
                owner_subject = COALESCE(jobs.owner_subject, EXCLUDED.owner_subject),
                updated_at = NOW()
            "#,
        )
        .bind(job_id)
        .bind(scheduler_job_id)
        .bind(owner)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn store_metadata(
        &self,
        job_id: &str,
        alignment_id: Option<&str>,
        tree_id: Option<&str>,
        method_type: MethodType,
        initial_status: JobStatus,
    ) -> Result<(), Error> {
        sqlx::query(
            "UPDATE jobs SET alignment_id = $2, tree_id = $3, method_type = $4, status = $5, updated_at = NOW() WHERE job_id = $1",
        )
        .bind(job_id)
        .bind(alignment_id)
        .bind(tree_id)
        .bind(method_type)
        .bind(initial_status)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_scheduler_id(&self, job_id: &str, owner: Option<&str>) -> Result<String, Error> {
        let job = self
            .load(job_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("job {job_id} not found")))?;
        match &job.owner_subject {
            None => Ok(job.scheduler_job_id),
            Some(stored) if Some(stored.as_str()) == owner => Ok(job.scheduler_job_id),
            Some(_) => Err(Error::Forbidden(format!("job {job_id} not owned by caller"))),
        }
    }

    async fn update_status(&self, job_id: &str, status: JobStatus) -> Result<(), Error> {
        let job = self
            .load(job_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("job {job_id} not found")))?;
        if !job.status.permits_transition_to(status) {
            return Ok(());
        }
        sqlx::query("UPDATE jobs SET status = $2, updated_at = NOW() WHERE job_id = $1")
            .bind(job_id)
            .bind(status)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_status_as_owner(
        &self,
        job_id: &str,
        owner: Option<&str>,
        status: JobStatus,
    ) -> Result<(), Error> {
        let job = self
            .load(job_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("job {job_id} not found")))?;
        if let Some(stored) = &job.owner_subject {
            if Some(stored.as_str()) != owner {
                return Err(Error::Forbidden(format!("job {job_id} not owned by caller")));
            }
        }
        self.update_status(job_id, status).await
    }

    async fn delete(&self, job_id: &str, owner: Option<&str>) -> Result<(), Error> {
        let job = self
            .load(job_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("job {job_id} not found")))?;
        if let Some(stored) = &job.owner_subject {
            if Some(stored.as_str()) != owner {
                return Err(Error::Forbidden(format!("job {job_id} not owned by caller")));
            }
        }
        sqlx::query("DELETE FROM jobs WHERE job_id = $1")
            .bind(job_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_by_filters(&self, filters: JobFilters) -> Result<Vec<String>, Error> {
        let mut qb = sqlx::QueryBuilder::new("SELECT job_id FROM jobs WHERE 1=1");
        if let Some(owner) = &filters.owner {
            qb.push(" AND owner_subject = ").push_bind(owner.clone());
        }
        if let Some(alignment_id) = &filters.alignment_id {
            qb.push(" AND alignment_id = ").push_bind(alignment_id.clone());
        }
        if let Some(tree_id) = &filters.tree_id {
            qb.push(" AND tree_id = ").push_bind(tree_id.clone());
        }
        if let Some(method_type) = filters.method_type {
            qb.push(" AND method_type = ").push_bind(method_type);
        }
        if let Some(status) = filters.status {
            qb.push(" AND status = ").push_bind(status);
        }
        qb.push(" ORDER BY created_at DESC");
        if let Some(limit) = filters.limit {
            qb.push(" LIMIT ").push_bind(limit);
        }

        let rows: Vec<(String,)> = qb.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn list_by_statuses(&self, statuses: &[JobStatus]) -> Result<Vec<JobInfo>, Error> {
        let rows: Vec<JobInfo> = sqlx::query_as(
            "SELECT job_id, scheduler_job_id, method_type, status FROM jobs WHERE status = ANY($1)",
        )
        .bind(statuses)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn get_metadata(&self, job_id: &str) -> Result<JobMetadata, Error> {
        let job = self
            .load(job_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("job {job_id} not found")))?;
        Ok(JobMetadata {
            alignment_id: job.alignment_id,
            tree_id: job.tree_id,
            method_type: job.method_type,
            status: job.status,
        })
    }

    async fn get_owner(&self, job_id: &str) -> Result<Option<Option<String>>, Error> {
        let row: Option<(Option<String>,)> =
            sqlx::query_as("SELECT owner_subject FROM jobs WHERE job_id = $1")
                .bind(job_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(owner,)| owner))
    }
}

/// In-memory `JobRepository`, used for tests and for exercising the
/// core without a live Postgres instance.
pub struct InMemoryJobRepository {
    jobs: tokio::sync::RwLock<std::collections::HashMap<String, Job>>,
}

impl InMemoryJobRepository {
    pub fn new() -> Self {
        Self {
            jobs: tokio::sync::RwLock::new(std::collections::HashMap::new()),
        }
    }
}

impl Default for InMemoryJobRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobRepository for InMemoryJobRepository {
    async fn store_with_owner(
        &self,
        job_id: &str,
        scheduler_job_id: &str,
        owner: Option<&str>,
    ) -> Result<(), Error> {
        if job_id.trim().is_empty() || scheduler_job_id.trim().is_empty() {
            return Err(Error::Validation(
                "job_id and scheduler_job_id must not be empty".to_string(),
            ));
        }
        let mut jobs = self.jobs.write().await;
        let now = Utc::now();
        match jobs.get_mut(job_id) {
            None => {
                jobs.insert(
                    job_id.to_string(),
                    Job {
                        job_id: job_id.to_string(),
                        scheduler_job_id: scheduler_job_id.to_string(),
                        owner_subject: owner.map(str::to_string),
                        alignment_id: None,
                        tree_id: None,
                        method_type: None,
                        status: JobStatus::Pending,
                        created_at: now,
                        updated_at: now,
                    },
                );
            }
            Some(job) => {
                job.scheduler_job_id = scheduler_job_id.to_string();
                if job.owner_subject.is_none() {
                    job.owner_subject = owner.map(str::to_string);
                }
                job.updated_at = now;
            }
        }
        Ok(())
    }

    async fn store_metadata(
        &self,
        job_id: &str,
        alignment_id: Option<&str>,
        tree_id: Option<&str>,
        method_type: MethodType,
        initial_status: JobStatus,
    ) -> Result<(), Error> {
        let mut jobs = self.jobs.write().await;
        let job = jobs
            .get_mut(job_id)
            .ok_or_else(|| Error::NotFound(format!("job {job_id} not found")))?;
        job.alignment_id = alignment_id.map(str::to_string);
        job.tree_id = tree_id.map(str::to_string);
        job.method_type = Some(method_type);
        job.status = initial_status;
        job.updated_at = Utc::now();
        Ok(())
    }

    async fn get_scheduler_id(&self, job_id: &str, owner: Option<&str>) -> Result<String, Error> {
        let jobs = self.jobs.read().await;
        let job = jobs
            .get(job_id)
            .ok_or_else(|| Error::NotFound(format!("job {job_id} not found")))?;
        match &job.owner_subject {
            None => Ok(job.scheduler_job_id.clone()),
            Some(stored) if Some(stored.as_str()) == owner => Ok(job.scheduler_job_id.clone()),
            Some(_) => Err(Error::Forbidden(format!("job {job_id} not owned by caller"))),
        }
    }

    async fn update_status(&self, job_id: &str, status: JobStatus) -> Result<(), Error> {
        let mut jobs = self.jobs.write().await;
        let job = jobs
            .get_mut(job_id)
            .ok_or_else(|| Error::NotFound(format!("job {job_id} not found")))?;
        if job.status.permits_transition_to(status) {
            job.status = status;
            job.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn update_status_as_owner(
        &self,
        job_id: &str,
        owner: Option<&str>,
        status: JobStatus,
    ) -> Result<(), Error> {
        {
            let jobs = self.jobs.read().await;
            let job = jobs
                .get(job_id)
                .ok_or_else(|| Error::NotFound(format!("job {job_id} not found")))?;
            if let Some(stored) = &job.owner_subject {
                if Some(stored.as_str()) != owner {
                    return Err(Error::Forbidden(format!("job {job_id} not owned by caller")));
                }
            }
        }
        self.update_status(job_id, status).await
    }

    async fn delete(&self, job_id: &str, owner: Option<&str>) -> Result<(), Error> {
        let mut jobs = self.jobs.write().await;
        let job = jobs
            .get(job_id)
            .ok_or_else(|| Error::NotFound(format!("job {job_id} not found")))?;
        if let Some(stored) = &job.owner_subject {
            if Some(stored.as_str()) != owner {
                return Err(Error::Forbidden(format!("job {job_id} not owned by caller")));
            }
        }
        jobs.remove(job_id);
        Ok(())
    }

    async fn list_by_filters(&self, filters: JobFilters) -> Result<Vec<String>, Error> {
        let jobs = self.jobs.read().await;
        let mut matches: Vec<&Job> = jobs
            .values()
            .filter(|j| filters.owner.is_none() || j.owner_subject == filters.owner)
            .filter(|j| filters.alignment_id.is_none() || j.alignment_id == filters.alignment_id)
            .filter(|j| filters.tree_id.is_none() || j.tree_id == filters.tree_id)
            .filter(|j| filters.method_type.is_none() || j.method_type == filters.method_type)
            .filter(|j| filters.status.is_none() || Some(j.status) == filters.status)
            .collect();
        matches.sort_by_key(|j| std::cmp::Reverse(j.created_at));
        if let Some(limit) = filters.limit {
            matches.truncate(limit as usize);
        }
        Ok(matches.into_iter().map(|j| j.job_id.clone()).collect())
    }

    async fn list_by_statuses(&self, statuses: &[JobStatus]) -> Result<Vec<JobInfo>, Error> {
        let jobs = self.jobs.read().await;
        Ok(jobs
            .values()
            .filter(|j| statuses.contains(&j.status))
            .map(|j| JobInfo {
                job_id: j.job_id.clone(),
                scheduler_job_id: j.scheduler_job_id.clone(),
                method_type: j.method_type,
                status: j.status,
            })
            .collect())
    }

    async fn get_metadata(&self, job_id: &str) -> Result<JobMetadata, Error> {
        let jobs = self.jobs.read().await;
        let job = jobs
            .get(job_id)
            .ok_or_else(|| Error::NotFound(format!("job {job_id} not found")))?;
        Ok(JobMetadata {
            alignment_id: job.alignment_id.clone(),
            tree_id: job.tree_id.clone(),
            method_type: job.method_type,
            status: job.status,
        })
    }

    async fn get_owner(&self, job_id: &str) -> Result<Option<Option<String>>, Error> {
        Ok(self.jobs.read().await.get(job_id).map(|j| j.owner_subject.clone()))
    }
}
