use cms_auth::AuthError;
use cms_jobs::BackupError;
use cms_scheduler::SchedulerError;
use serde_json::{json, Value};
use thiserror::Error;

/// Error returned by every administrative operation.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error("authentication error: {0}")]
    Authentication(#[from] AuthError),
    #[error(transparent)]
    Backup(#[from] BackupError),
    #[error("scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),
    #[error("bad request: {0}")]
    BadRequest(String),
}

impl AdminError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// HTTP status a routing layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            AdminError::Authentication(AuthError::Forbidden { .. }) => 403,
            AdminError::Authentication(_) => 401,
            AdminError::Backup(e) if e.is_not_found() => 404,
            AdminError::Backup(BackupError::ExternalProcess(_)) => 502,
            AdminError::Backup(_) => 500,
            AdminError::Scheduler(SchedulerError::NotFound(_)) => 404,
            AdminError::Scheduler(SchedulerError::AlreadyRunning(_)) => 409,
            AdminError::Scheduler(_) => 400,
            AdminError::BadRequest(_) => 400,
        }
    }

    /// Error body shared by the console and any HTTP front end.
    pub fn to_json(&self) -> Value {
        json!({ "error": self.to_string(), "status": self.status_code() })
    }
}
