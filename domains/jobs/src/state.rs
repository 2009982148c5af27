//! Job status and its transition guard.
//!
//! Status only ever advances by reconciliation (C5) or an explicit
//! cancel path, and never regresses out of a terminal state.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "job_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Complete,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Complete | JobStatus::Failed | JobStatus::Cancelled)
    }

    /// Would moving from `self` to `next` violate the never-regress-from-
    /// terminal invariant? Terminal-to-terminal transitions (e.g. a
    /// reconciliation tick re-observing the same completed state) are
    /// allowed since they aren't a regression.
    pub fn permits_transition_to(&self, next: JobStatus) -> bool {
        !self.is_terminal() || *self == next
    }
}

impl From<phylo_scheduler::SchedulerStatus> for JobStatus {
    fn from(status: phylo_scheduler::SchedulerStatus) -> Self {
        match status {
            phylo_scheduler::SchedulerStatus::Pending => JobStatus::Pending,
            phylo_scheduler::SchedulerStatus::Running => JobStatus::Running,
            phylo_scheduler::SchedulerStatus::Complete => JobStatus::Complete,
            phylo_scheduler::SchedulerStatus::Failed => JobStatus::Failed,
            phylo_scheduler::SchedulerStatus::Cancelled => JobStatus::Cancelled,
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Complete => "complete",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_terminal_permits_any_transition() {
        assert!(JobStatus::Pending.permits_transition_to(JobStatus::Running));
        assert!(JobStatus::Running.permits_transition_to(JobStatus::Complete));
    }

    #[test]
    fn test_terminal_rejects_regression() {
        assert!(!JobStatus::Complete.permits_transition_to(JobStatus::Pending));
        assert!(!JobStatus::Complete.permits_transition_to(JobStatus::Failed));
        assert!(!JobStatus::Cancelled.permits_transition_to(JobStatus::Running));
    }

    #[test]
    fn test_terminal_permits_reobserving_same_state() {
        assert!(JobStatus::Complete.permits_transition_to(JobStatus::Complete));
    }

    #[test]
    fn test_is_terminal() {
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::Complete.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Cancelled.is_terminal());
    }
}
