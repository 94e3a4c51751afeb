//! In-process scheduler for the back office's recurring jobs.
//!
//! # Architecture
//!
//! - [`JobScheduler`] - registry of jobs, the dispatcher task and a bounded
//!   execution pool
//! - [`Trigger`] - interval or wall-clock firing rule
//! - [`JobHandler`] - trait implemented by the work a job performs
//! - [`JobRun`] - a record of one execution, kept in a bounded history
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use cms_scheduler::{async_trait, JobError, JobHandler, JobScheduler, Trigger};
//!
//! struct Heartbeat;
//!
//! #[async_trait]
//! impl JobHandler for Heartbeat {
//!     async fn run(&self) -> Result<(), JobError> {
//!         tracing::info!("still alive");
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let scheduler = JobScheduler::default();
//!     scheduler
//!         .register("heartbeat", Trigger::every_minutes(1), Arc::new(Heartbeat), Duration::from_secs(60))
//!         .await
//!         .unwrap();
//!     scheduler.start().await;
//!     tokio::time::sleep(Duration::from_secs(3600)).await;
//!     scheduler.stop().await;
//! }
//! ```

mod error;
mod handler;
mod history;
mod scheduler;
mod trigger;
mod types;

pub use error::{JobError, SchedulerError};
pub use handler::JobHandler;
pub use scheduler::{JobScheduler, DEFAULT_MAX_CONCURRENT_JOBS};
pub use trigger::Trigger;
pub use types::{JobInfo, JobRun, JobStatus, TriggeredBy};

// Re-export async_trait for convenience when implementing JobHandler
pub use async_trait::async_trait;
pub use chrono::Weekday;
