//! Connection pool for the back-office database, compiled for exactly one of
//! the `sqlite` or `mysql` backends.

pub mod config;
pub mod error;
pub mod pool;

pub use config::DbConnectionConfig;
pub use error::DbConnectionError;
pub use pool::{create_pool, redact_url, DbPool};
