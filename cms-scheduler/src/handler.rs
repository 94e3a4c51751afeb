//! The unit of work a registered job runs.

use async_trait::async_trait;

use crate::error::JobError;

/// Body of a recurring job.
///
/// A handler is invoked at most once at a time per job id. It acquires the
/// resources it needs (a pooled connection, a file handle) itself and must
/// release them on every exit path, which scoped guards do for free.
#[async_trait]
pub trait JobHandler: Send + Sync + 'static {
    async fn run(&self) -> Result<(), JobError>;
}
