//! Scheduler Adapter errors

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("scheduler configuration error: {0}")]
    Configuration(String),

    #[error("scheduler credential error: {0}")]
    Unauthorized(String),

    #[error("scheduler backend error ({status}): {body}")]
    Backend { status: u16, body: String },

    #[error("scheduler transport error: {0}")]
    Transport(String),
}

impl From<SchedulerError> for phylo_common::Error {
    fn from(err: SchedulerError) -> Self {
        match err {
            SchedulerError::Configuration(msg) => phylo_common::Error::Internal(msg),
            SchedulerError::Unauthorized(msg) => phylo_common::Error::Unauthorized(msg),
            SchedulerError::Backend { status, body } => {
                phylo_common::Error::BackendError { status, body }
            }
            SchedulerError::Transport(msg) => phylo_common::Error::BackendError {
                status: 502,
                body: msg,
            },
        }
    }
}
