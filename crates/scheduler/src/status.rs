//! Logical job status and the backend-state mapping table
//!
//! Identical across every Scheduler Adapter backend: whatever vocabulary
//! the backend uses, it collapses to one of these five states before the
//! rest of the core ever sees it.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerStatus {
    Pending,
    Running,
    Complete,
    Failed,
    Cancelled,
}

impl std::fmt::Display for SchedulerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SchedulerStatus::Pending => "pending",
            SchedulerStatus::Running => "running",
            SchedulerStatus::Complete => "complete",
            SchedulerStatus::Failed => "failed",
            SchedulerStatus::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

/// Map a raw backend state string to a `SchedulerStatus`. `success_signal`
/// resolves the ambiguous `unknown`/not-found case: a non-empty results
/// file or an exit-code record counts as a success signal.
pub fn map_backend_status(raw: &str, success_signal: bool) -> SchedulerStatus {
    match raw.to_ascii_lowercase().as_str() {
        "pending" | "queued" | "held" => SchedulerStatus::Pending,
        "running" => SchedulerStatus::Running,
        "completed" | "complete" | "exit0" | "exit_0" => SchedulerStatus::Complete,
        "failed" | "timeout" | "oom" => SchedulerStatus::Failed,
        "cancelled" | "canceled" => SchedulerStatus::Cancelled,
        _ if raw.starts_with("exit") && raw != "exit0" && raw != "exit_0" => {
            SchedulerStatus::Failed
        }
        _ => {
            if success_signal {
                SchedulerStatus::Complete
            } else {
                SchedulerStatus::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_family_maps_to_pending() {
        for raw in ["pending", "queued", "held", "PENDING"] {
            assert_eq!(map_backend_status(raw, false), SchedulerStatus::Pending);
        }
    }

    #[test]
    fn test_running_maps_to_running() {
        assert_eq!(map_backend_status("running", false), SchedulerStatus::Running);
    }

    #[test]
    fn test_completed_family_maps_to_complete() {
        for raw in ["completed", "complete", "exit0"] {
            assert_eq!(map_backend_status(raw, false), SchedulerStatus::Complete);
        }
    }

    #[test]
    fn test_failure_family_maps_to_failed() {
        for raw in ["failed", "timeout", "oom", "exit1", "exit137"] {
            assert_eq!(map_backend_status(raw, false), SchedulerStatus::Failed);
        }
    }

    #[test]
    fn test_cancelled_maps_to_cancelled() {
        assert_eq!(map_backend_status("cancelled", false), SchedulerStatus::Cancelled);
        assert_eq!(map_backend_status("canceled", false), SchedulerStatus::Cancelled);
    }

    #[test]
    fn test_unknown_with_success_signal_maps_to_complete() {
        assert_eq!(map_backend_status("unknown", true), SchedulerStatus::Complete);
        assert_eq!(map_backend_status("not-found", true), SchedulerStatus::Complete);
    }

    #[test]
    fn test_unknown_without_success_signal_maps_to_failed() {
        assert_eq!(map_backend_status("unknown", false), SchedulerStatus::Failed);
        assert_eq!(map_backend_status("not-found", false), SchedulerStatus::Failed);
    }
}
