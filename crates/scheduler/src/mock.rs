//! Mock Scheduler Adapter
//!
//! Programmable in-process scheduler used for tests and for running the
//! core without a live cluster manager. Every submitted job transitions
//! pending -> running -> complete (or -> failed) on its own short timer,
//! mirroring the teacher's postback-simulation mock.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tokio::time::Duration;

use crate::error::SchedulerError;
use crate::status::SchedulerStatus;
use crate::{SchedulerAdapter, SubmitRequest};

/// What a submitted job should settle into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MockOutcome {
    #[default]
    Complete,
    Fail,
    /// Never advances past `pending` (simulates a stuck/unresponsive backend).
    Stuck,
}

#[derive(Debug, Default)]
pub struct MockSchedulerBehavior {
    outcome: RwLock<MockOutcome>,
    settle_delay_ms: RwLock<u64>,
}

impl MockSchedulerBehavior {
    pub fn new() -> Self {
        Self {
            outcome: RwLock::new(MockOutcome::Complete),
            settle_delay_ms: RwLock::new(20),
        }
    }

    pub fn set_outcome(&self, outcome: MockOutcome) {
        *self.outcome.write().unwrap() = outcome;
    }

    pub fn set_settle_delay_ms(&self, delay: u64) {
        *self.settle_delay_ms.write().unwrap() = delay;
    }

    fn outcome(&self) -> MockOutcome {
        *self.outcome.read().unwrap()
    }

    fn settle_delay_ms(&self) -> u64 {
        *self.settle_delay_ms.read().unwrap()
    }
}

struct JobRecord {
    status: SchedulerStatus,
}

pub struct MockSchedulerAdapter {
    behavior: Arc<MockSchedulerBehavior>,
    jobs: Arc<std::sync::Mutex<HashMap<String, JobRecord>>>,
    healthy: std::sync::atomic::AtomicBool,
    submit_calls: std::sync::atomic::AtomicUsize,
}

impl MockSchedulerAdapter {
    pub fn new() -> Self {
        Self {
            behavior: Arc::new(MockSchedulerBehavior::new()),
            jobs: Arc::new(std::sync::Mutex::new(HashMap::new())),
            healthy: std::sync::atomic::AtomicBool::new(true),
            submit_calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn behavior(&self) -> &Arc<MockSchedulerBehavior> {
        &self.behavior
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, std::sync::atomic::Ordering::SeqCst);
    }

    /// Number of times `submit` has been called. Lets tests assert
    /// idempotent submission reaches the backend exactly once.
    pub fn submit_call_count(&self) -> usize {
        self.submit_calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

impl Default for MockSchedulerAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl SchedulerAdapter for MockSchedulerAdapter {
    async fn submit(&self, req: &SubmitRequest) -> Result<String, SchedulerError> {
        self.submit_calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let scheduler_job_id = format!("mock-{}", req.job_id);

        self.jobs.lock().unwrap().insert(
            scheduler_job_id.clone(),
            JobRecord {
                status: SchedulerStatus::Pending,
            },
        );

        let jobs = self.jobs.clone();
        let behavior = self.behavior.clone();
        let key = scheduler_job_id.clone();

        tokio::spawn(async move {
            if behavior.outcome() == MockOutcome::Stuck {
                return;
            }

            tokio::time::sleep(Duration::from_millis(behavior.settle_delay_ms())).await;
            if let Some(job) = jobs.lock().unwrap().get_mut(&key) {
                job.status = SchedulerStatus::Running;
            }

            tokio::time::sleep(Duration::from_millis(behavior.settle_delay_ms())).await;
            let outcome = match behavior.outcome() {
                MockOutcome::Complete => SchedulerStatus::Complete,
                MockOutcome::Fail => SchedulerStatus::Failed,
                MockOutcome::Stuck => return,
            };
            if let Some(job) = jobs.lock().unwrap().get_mut(&key) {
                job.status = outcome;
            }
        });

        Ok(scheduler_job_id)
    }

    async fn get_status(&self, scheduler_job_id: &str) -> Result<SchedulerStatus, SchedulerError> {
        match self.jobs.lock().unwrap().get(scheduler_job_id) {
            Some(job) => Ok(job.status),
            // The mock never garbage-collects a job it tracked, so "not
            // tracked" always means "never submitted" — there is no
            // results file to consult, unlike the HTTP backend.
            None => Ok(crate::status::map_backend_status("unknown", false)),
        }
    }

    async fn cancel(&self, scheduler_job_id: &str) -> Result<(), SchedulerError> {
        if let Some(job) = self.jobs.lock().unwrap().get_mut(scheduler_job_id) {
            job.status = SchedulerStatus::Cancelled;
        }
        Ok(())
    }

    async fn check_health(&self) -> (bool, String, Option<SchedulerError>) {
        if self.healthy.load(std::sync::atomic::Ordering::SeqCst) {
            (true, "mock scheduler healthy".to_string(), None)
        } else {
            let err = SchedulerError::Transport("mock scheduler unreachable".to_string());
            (false, err.to_string(), Some(err))
        }
    }
}
