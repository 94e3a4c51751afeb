//! Error types for the scheduler.

use std::fmt::Display;

use thiserror::Error;

/// Errors returned by scheduler operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("job not found: {0}")]
    NotFound(String),

    #[error("job {0} is already running")]
    AlreadyRunning(String),

    #[error("invalid trigger: {0}")]
    InvalidTrigger(String),
}

/// Failure reported by a job handler. The scheduler logs it and records it in
/// the run history; the job stays registered.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JobError {
    #[error("job execution failed: {0}")]
    ExecutionFailed(String),
}

impl JobError {
    pub fn failed(err: impl Display) -> Self {
        Self::ExecutionFailed(err.to_string())
    }
}
