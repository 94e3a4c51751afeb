#[cfg(not(any(feature = "mysql", feature = "sqlite")))]
compile_error!("Enable exactly one of the `mysql` or `sqlite` features for cms-db.");

#[cfg(all(feature = "mysql", feature = "sqlite"))]
compile_error!("Activate only one backend feature (`mysql` or `sqlite`) for cms-db.");

#[cfg(feature = "mysql")]
pub type DbBackend = sqlx::MySql;
#[cfg(feature = "sqlite")]
pub type DbBackend = sqlx::Sqlite;

/// Driver name this build talks to, as spelled in `database.driver`.
#[cfg(feature = "mysql")]
pub const BACKEND_NAME: &str = "mysql";
#[cfg(feature = "sqlite")]
pub const BACKEND_NAME: &str = "sqlite";

pub mod backup_records;
pub mod comments;
pub mod operation_logs;
pub mod update;

#[cfg(all(test, feature = "sqlite"))]
pub(crate) mod test_support;

pub use cms_db_connection::{create_pool, DbConnectionConfig, DbConnectionError, DbPool};

/// Current local wall-clock time truncated to whole seconds, the resolution
/// every timestamp column in this schema is stored with.
pub fn now_local() -> chrono::NaiveDateTime {
    truncate_to_seconds(chrono::Local::now().naive_local())
}

pub fn truncate_to_seconds(ts: chrono::NaiveDateTime) -> chrono::NaiveDateTime {
    use chrono::Timelike;
    ts.with_nanosecond(0).unwrap_or(ts)
}
