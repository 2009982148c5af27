//! Job entity: the authoritative record mapping a logical job to a
//! scheduler job, its owner, its inputs, and its status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::method::MethodType;
use crate::state::JobStatus;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Job {
    pub job_id: String,
    pub scheduler_job_id: String,
    pub owner_subject: Option<String>,
    pub alignment_id: Option<String>,
    pub tree_id: Option<String>,
    pub method_type: Option<MethodType>,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The narrow projection `list_by_statuses` needs — only what C5 must
/// carry to build a transient scheduler handle and reconcile status.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct JobInfo {
    pub job_id: String,
    pub scheduler_job_id: String,
    pub method_type: Option<MethodType>,
    pub status: JobStatus,
}

/// `get_metadata` projection.
#[derive(Debug, Clone)]
pub struct JobMetadata {
    pub alignment_id: Option<String>,
    pub tree_id: Option<String>,
    pub method_type: Option<MethodType>,
    pub status: JobStatus,
}
