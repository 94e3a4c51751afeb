use std::borrow::Cow;
use std::str::FromStr;

#[cfg(feature = "mysql")]
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
#[cfg(feature = "sqlite")]
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

use crate::config::DbConnectionConfig;
use crate::error::DbConnectionError;

#[cfg(not(any(feature = "mysql", feature = "sqlite")))]
compile_error!("Enable exactly one of the `mysql` or `sqlite` features for cms-db-connection.");

#[cfg(all(feature = "mysql", feature = "sqlite"))]
compile_error!("Activate only one backend feature (`mysql` or `sqlite`) for cms-db-connection.");

#[cfg(feature = "mysql")]
pub type DbPool = MySqlPool;
#[cfg(feature = "sqlite")]
pub type DbPool = SqlitePool;

#[cfg(feature = "mysql")]
type DbPoolOptions = MySqlPoolOptions;
#[cfg(feature = "sqlite")]
type DbPoolOptions = SqlitePoolOptions;

/// Creates the process-wide connection pool.
///
/// Every job execution and every admin operation checks its own connection out
/// of this pool; connections go back to the pool when the guard drops.
pub async fn create_pool(config: &DbConnectionConfig) -> Result<DbPool, DbConnectionError> {
    config.validate()?;
    let url = config.url.trim();
    let options = connect_options(url, config)?;

    let mut pool_options = DbPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.connect_timeout());
    if let Some(idle) = config.idle_timeout() {
        pool_options = pool_options.idle_timeout(idle);
    }

    match pool_options.connect_with(options).await {
        Ok(pool) => {
            tracing::info!(
                database_url = %redact_url(url),
                max_connections = config.max_connections,
                "database pool created"
            );
            Ok(pool)
        }
        Err(err) => {
            tracing::error!(
                database_url = %redact_url(url),
                error = %err,
                "failed to create database pool"
            );
            Err(err.into())
        }
    }
}

/// File databases run in WAL mode; writers wait up to the busy timeout for a
/// lock.
#[cfg(feature = "sqlite")]
fn connect_options(
    url: &str,
    config: &DbConnectionConfig,
) -> Result<SqliteConnectOptions, DbConnectionError> {
    let mut options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(config.busy_timeout());

    if let Some(path) = sqlite_file_path(url) {
        let parent = std::path::Path::new(path).parent();
        if let Some(parent) = parent.filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| DbConnectionError::Directory {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        options = options.journal_mode(SqliteJournalMode::Wal);
    }
    Ok(options)
}

/// Sessions use `utf8mb4`.
#[cfg(feature = "mysql")]
fn connect_options(
    url: &str,
    _config: &DbConnectionConfig,
) -> Result<MySqlConnectOptions, DbConnectionError> {
    Ok(MySqlConnectOptions::from_str(url)?.charset("utf8mb4"))
}

/// File path of a SQLite URL, or `None` for in-memory databases.
#[cfg(feature = "sqlite")]
pub(crate) fn sqlite_file_path(url: &str) -> Option<&str> {
    let lower = url.to_ascii_lowercase();
    if lower.contains(":memory:") || lower.contains("mode=memory") {
        return None;
    }

    let rest = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
        .unwrap_or(url);
    let rest = rest.strip_prefix("file:").unwrap_or(rest);
    let path = rest.split('?').next().unwrap_or_default().trim();
    (!path.is_empty()).then_some(path)
}

/// Connection URL with any `user:password@` replaced, safe to log.
pub fn redact_url(raw: &str) -> Cow<'_, str> {
    let Some((scheme, rest)) = raw.split_once("://") else {
        return if raw.starts_with("sqlite:") {
            Cow::Borrowed(raw)
        } else {
            Cow::Borrowed("<redacted>")
        };
    };
    let authority_end = rest.find('/').unwrap_or(rest.len());
    match rest[..authority_end].rfind('@') {
        Some(at) => Cow::Owned(format!("{scheme}://****:****@{}", &rest[at + 1..])),
        None => Cow::Borrowed(raw),
    }
}
