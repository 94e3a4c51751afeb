use std::path::PathBuf;
use std::time::Duration;

use cms_db::DbConnectionConfig;
use cms_dump_client::{CommandDumpClient, DumpTarget};

const DEFAULT_MYSQL_PORT: u16 = 3306;

/// Build database connection config from application config.
///
/// The driver must match the backend this binary was compiled for.
pub fn database_config_from_config(
    cfg: &cms_config::Config,
) -> Result<DbConnectionConfig, cms_config::ConfigError> {
    let db = &cfg.database;
    if db.driver != cms_db::BACKEND_NAME {
        return Err(cms_config::ConfigError::Validation(format!(
            "database.driver is `{}` but this build supports `{}`",
            db.driver,
            cms_db::BACKEND_NAME
        )));
    }

    let url = match db.driver.as_str() {
        "mysql" => {
            let credentials = match (&db.username, &db.password) {
                (Some(user), Some(password)) => format!("{user}:{password}@"),
                (Some(user), None) => format!("{user}@"),
                _ => String::new(),
            };
            format!(
                "mysql://{credentials}{}:{}/{}",
                db.host.as_deref().unwrap_or("localhost"),
                db.port.unwrap_or(DEFAULT_MYSQL_PORT),
                db.database.as_deref().unwrap_or_default()
            )
        }
        _ => format!("sqlite://{}", db.path.as_deref().unwrap_or_default()),
    };

    let mut config = DbConnectionConfig::new(url);
    if let Some(max) = db.max_connections {
        config = config.with_max_connections(max);
    }
    Ok(config)
}

/// Database the dump tools should operate on.
pub fn dump_target_from_config(cfg: &cms_config::Config) -> DumpTarget {
    let db = &cfg.database;
    match db.driver.as_str() {
        "mysql" => DumpTarget::MySql {
            host: db.host.clone().unwrap_or_else(|| "localhost".into()),
            port: db.port,
            username: db.username.clone(),
            password: db.password.clone(),
            database: db.database.clone().unwrap_or_default(),
        },
        _ => DumpTarget::Sqlite {
            path: PathBuf::from(db.path.clone().unwrap_or_default()),
        },
    }
}

/// Command-backed dump client with the configured programs and timeout.
pub fn dump_client_from_config(cfg: &cms_config::Config) -> CommandDumpClient {
    let mut client = CommandDumpClient::new(dump_target_from_config(cfg))
        .with_timeout(Duration::from_secs(cfg.backups.command_timeout_secs));
    if let Some(program) = &cfg.backups.dump_program {
        client = client.with_dump_program(program);
    }
    if let Some(program) = &cfg.backups.restore_program {
        client = client.with_restore_program(program);
    }
    client
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "sqlite")]
    #[test]
    fn sqlite_url_uses_configured_path() {
        let mut cfg = cms_config::Config::default();
        cfg.database.path = Some("data/museum.sqlite".into());
        cfg.database.max_connections = Some(3);

        let db = database_config_from_config(&cfg).unwrap();
        assert_eq!(db.url, "sqlite://data/museum.sqlite");
        assert_eq!(db.max_connections, 3);
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn driver_must_match_the_build() {
        let mut cfg = cms_config::Config::default();
        cfg.database.driver = "mysql".into();
        let err = database_config_from_config(&cfg).unwrap_err();
        assert!(err.to_string().contains("this build supports `sqlite`"));
    }

    #[test]
    fn mysql_dump_target_carries_credentials() {
        let mut cfg = cms_config::Config::default();
        cfg.database.driver = "mysql".into();
        cfg.database.host = Some("db.internal".into());
        cfg.database.database = Some("museumdb".into());
        cfg.database.username = Some("backup".into());
        cfg.database.password = Some("hunter2".into());

        match dump_target_from_config(&cfg) {
            DumpTarget::MySql {
                host,
                password,
                database,
                port,
                ..
            } => {
                assert_eq!(host, "db.internal");
                assert_eq!(database, "museumdb");
                assert_eq!(password.as_deref(), Some("hunter2"));
                assert_eq!(port, None);
            }
            other => panic!("unexpected target {other:?}"),
        }
    }
}
