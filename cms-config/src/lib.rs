use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

/// Pre-compiled regex for hostname validation (compiled once at first use)
static HOSTNAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9][-a-zA-Z0-9\.]*[a-zA-Z0-9]$").unwrap());

/// Terms the comment moderation sweep hides when no list is configured.
pub const DEFAULT_SENSITIVE_TERMS: &[&str] = &[
    "脏话", "妈的", "操", "滚", "傻逼", "去死", "神经病", "色情", "裸聊", "约炮", "卖淫", "嫖娼",
    "暴力", "砍人", "自杀", "恐怖袭击",
];

#[derive(Debug, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub database: Option<DatabaseSection>,
    #[serde(default)]
    pub logging: Option<LoggingSection>,
    #[serde(default)]
    pub backups: Option<BackupsSection>,
    #[serde(default)]
    pub moderation: Option<ModerationSection>,
    #[serde(default)]
    pub scheduler: Option<SchedulerSection>,
}

#[derive(Debug, Deserialize)]
pub struct LoggingSection {
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub json: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct DatabaseSection {
    pub driver: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub max_connections: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct BackupsSection {
    #[serde(default)]
    pub directory: Option<String>,
    #[serde(default)]
    pub retention_days: Option<u32>,
    #[serde(default)]
    pub dump_program: Option<String>,
    #[serde(default)]
    pub restore_program: Option<String>,
    #[serde(default)]
    pub command_timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct ModerationSection {
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub sensitive_terms: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct SchedulerSection {
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub max_concurrent_jobs: Option<usize>,
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Load a RawConfigFile from a path. The format is inferred from the extension: .toml, .yaml/.yml, .json
pub fn load_raw_from_file<P: AsRef<Path>>(path: P) -> Result<RawConfigFile, ConfigError> {
    let path = path.as_ref();
    let s = fs::read_to_string(path)?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_ascii_lowercase());
    parse_config_str(&s, ext.as_deref())
}

#[inline]
fn parse_config_str(s: &str, ext: Option<&str>) -> Result<RawConfigFile, ConfigError> {
    match ext {
        #[cfg(feature = "toml")]
        Some("toml") => toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string())),
        #[cfg(feature = "yaml")]
        Some("yaml" | "yml") => {
            serde_yaml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))
        }
        #[cfg(feature = "json")]
        Some("json") => serde_json::from_str(s).map_err(|e| ConfigError::Parse(e.to_string())),
        _ => parse_config_auto(s),
    }
}

/// Try to parse config by attempting each enabled format
#[inline]
fn parse_config_auto(s: &str) -> Result<RawConfigFile, ConfigError> {
    #[cfg(feature = "yaml")]
    if let Ok(cfg) = serde_yaml::from_str(s) {
        return Ok(cfg);
    }

    #[cfg(feature = "toml")]
    if let Ok(cfg) = toml::from_str(s) {
        return Ok(cfg);
    }

    #[cfg(feature = "json")]
    if let Ok(cfg) = serde_json::from_str(s) {
        return Ok(cfg);
    }

    #[cfg(any(feature = "yaml", feature = "toml", feature = "json"))]
    {
        Err(ConfigError::Parse(
            "failed to parse config as any supported format".into(),
        ))
    }

    #[cfg(not(any(feature = "yaml", feature = "toml", feature = "json")))]
    {
        let _ = s;
        Err(ConfigError::Parse("no config format enabled".into()))
    }
}

/// Concrete application configuration with defaults.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Config {
    pub logging: LoggingConfig,
    pub database: DatabaseConfig,
    pub backups: BackupsConfig,
    pub moderation: ModerationConfig,
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatabaseConfig {
    pub driver: String,
    pub path: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub max_connections: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackupsConfig {
    /// Directory backup artifacts are written to.
    pub directory: String,
    /// Age after which scheduled (auto) backups are removed.
    pub retention_days: u32,
    /// Override for the dump executable (`mysqldump` / `sqlite3` by default).
    pub dump_program: Option<String>,
    /// Override for the restore executable (`mysql` / `sqlite3` by default).
    pub restore_program: Option<String>,
    pub command_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModerationConfig {
    pub enabled: bool,
    pub sensitive_terms: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub max_concurrent_jobs: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig {
                level: "info".to_string(),
                json: false,
            },
            database: DatabaseConfig {
                driver: "sqlite".to_string(),
                path: Some("museum.sqlite".to_string()),
                host: None,
                port: None,
                database: None,
                username: None,
                password: None,
                max_connections: None,
            },
            backups: BackupsConfig {
                directory: "backups".to_string(),
                retention_days: 30,
                dump_program: None,
                restore_program: None,
                command_timeout_secs: 600,
            },
            moderation: ModerationConfig {
                enabled: true,
                sensitive_terms: DEFAULT_SENSITIVE_TERMS
                    .iter()
                    .map(|t| (*t).to_string())
                    .collect(),
            },
            scheduler: SchedulerConfig {
                enabled: true,
                max_concurrent_jobs: 10,
            },
        }
    }
}

#[inline]
fn parse_bool(s: &str) -> Result<bool, ()> {
    match s.as_bytes() {
        b"1" | b"true" | b"TRUE" | b"True" | b"yes" | b"YES" | b"Yes" | b"y" | b"Y" => Ok(true),
        b"0" | b"false" | b"FALSE" | b"False" | b"no" | b"NO" | b"No" | b"n" | b"N" => Ok(false),
        _ => match s.to_ascii_lowercase().as_str() {
            "true" | "yes" | "y" => Ok(true),
            "false" | "no" | "n" => Ok(false),
            _ => Err(()),
        },
    }
}

#[inline]
fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .filter_map(|p| {
            let trimmed = p.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
        .collect()
}

/// Helper macro to apply optional value if present
macro_rules! apply_opt {
    ($target:expr, $source:expr) => {
        if let Some(v) = $source {
            $target = v;
        }
    };
    ($target:expr, $source:expr, wrap) => {
        if let Some(v) = $source {
            $target = Some(v);
        }
    };
}

/// Load concrete `Config` from optional file and environment variables.
/// Environment variables take precedence over file values and defaults.
pub fn load_config<P: AsRef<Path>>(path: Option<P>) -> Result<Config, ConfigError> {
    let mut cfg = Config::default();

    if let Some(p) = path {
        let raw = load_raw_from_file(p)?;
        if let Some(logging) = raw.logging {
            apply_opt!(cfg.logging.level, logging.level);
            apply_opt!(cfg.logging.json, logging.json);
        }
        if let Some(db) = raw.database {
            cfg.database.driver = db.driver;
            apply_opt!(cfg.database.path, db.path, wrap);
            apply_opt!(cfg.database.host, db.host, wrap);
            apply_opt!(cfg.database.port, db.port, wrap);
            apply_opt!(cfg.database.database, db.database, wrap);
            apply_opt!(cfg.database.username, db.username, wrap);
            apply_opt!(cfg.database.password, db.password, wrap);
            apply_opt!(cfg.database.max_connections, db.max_connections, wrap);
        }
        if let Some(b) = raw.backups {
            apply_opt!(cfg.backups.directory, b.directory);
            apply_opt!(cfg.backups.retention_days, b.retention_days);
            apply_opt!(cfg.backups.dump_program, b.dump_program, wrap);
            apply_opt!(cfg.backups.restore_program, b.restore_program, wrap);
            apply_opt!(cfg.backups.command_timeout_secs, b.command_timeout_secs);
        }
        if let Some(m) = raw.moderation {
            apply_opt!(cfg.moderation.enabled, m.enabled);
            apply_opt!(cfg.moderation.sensitive_terms, m.sensitive_terms);
        }
        if let Some(s) = raw.scheduler {
            apply_opt!(cfg.scheduler.enabled, s.enabled);
            apply_opt!(cfg.scheduler.max_concurrent_jobs, s.max_concurrent_jobs);
        }
    }

    apply_env_overrides(&mut cfg)?;

    Ok(cfg)
}

#[inline]
fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(v) => v
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::Parse(format!("invalid {}: {}", key, e))),
        Err(_) => Ok(None),
    }
}

#[inline]
fn env_bool(key: &str) -> Result<Option<bool>, ConfigError> {
    match env::var(key) {
        Ok(v) => parse_bool(&v)
            .map(Some)
            .map_err(|_| ConfigError::Parse(format!("invalid {}", key))),
        Err(_) => Ok(None),
    }
}

#[inline]
fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn apply_env_overrides(cfg: &mut Config) -> Result<(), ConfigError> {
    // Logging
    if let Some(v) = env_str("CMS_LOG_LEVEL") {
        cfg.logging.level = v;
    }
    if let Some(v) = env_bool("CMS_LOG_JSON")? {
        cfg.logging.json = v;
    }

    // Database
    if let Some(v) = env_str("CMS_DATABASE_DRIVER") {
        cfg.database.driver = v;
    }
    if let Some(v) = env_str("CMS_DATABASE_PATH") {
        cfg.database.path = Some(v);
    }
    if let Some(v) = env_str("CMS_DATABASE_HOST") {
        cfg.database.host = Some(v);
    }
    if let Some(v) = env_parse::<u16>("CMS_DATABASE_PORT")? {
        cfg.database.port = Some(v);
    }
    if let Some(v) = env_str("CMS_DATABASE_NAME") {
        cfg.database.database = Some(v);
    }
    if let Some(v) = env_str("CMS_DATABASE_USERNAME") {
        cfg.database.username = Some(v);
    }
    if let Some(v) = env_str("CMS_DATABASE_PASSWORD") {
        cfg.database.password = Some(v);
    }
    if let Some(v) = env_parse::<u32>("CMS_DATABASE_MAX_CONNECTIONS")? {
        cfg.database.max_connections = Some(v);
    }

    // Backups
    if let Some(v) = env_str("CMS_BACKUP_DIRECTORY") {
        cfg.backups.directory = v;
    }
    if let Some(v) = env_parse::<u32>("CMS_BACKUP_RETENTION_DAYS")? {
        cfg.backups.retention_days = v;
    }
    if let Some(v) = env_str("CMS_BACKUP_DUMP_PROGRAM") {
        cfg.backups.dump_program = Some(v);
    }
    if let Some(v) = env_str("CMS_BACKUP_RESTORE_PROGRAM") {
        cfg.backups.restore_program = Some(v);
    }
    if let Some(v) = env_parse::<u64>("CMS_BACKUP_COMMAND_TIMEOUT_SECS")? {
        cfg.backups.command_timeout_secs = v;
    }

    // Moderation
    if let Some(v) = env_bool("CMS_MODERATION_ENABLED")? {
        cfg.moderation.enabled = v;
    }
    if let Some(v) = env_str("CMS_MODERATION_TERMS") {
        cfg.moderation.sensitive_terms = split_csv(&v);
    }

    // Scheduler
    if let Some(v) = env_bool("CMS_SCHEDULER_ENABLED")? {
        cfg.scheduler.enabled = v;
    }
    if let Some(v) = env_parse::<usize>("CMS_SCHEDULER_MAX_CONCURRENT_JOBS")? {
        cfg.scheduler.max_concurrent_jobs = v;
    }

    Ok(())
}

/// Validate higher-level constraints on the resolved configuration.
///
/// Any error returned here is fatal at startup.
pub fn validate_config(cfg: &Config) -> Result<(), ConfigError> {
    match cfg.database.driver.as_str() {
        "sqlite" => {
            if cfg.database.path.as_deref().map_or(true, str::is_empty) {
                return Err(ConfigError::Validation(
                    "database.path must be set for the sqlite driver".into(),
                ));
            }
        }
        "mysql" => {
            let host = cfg.database.host.as_deref().unwrap_or_default();
            if host.is_empty() {
                return Err(ConfigError::Validation(
                    "database.host must be set for the mysql driver".into(),
                ));
            }
            let host_ok =
                host.parse::<std::net::IpAddr>().is_ok() || HOSTNAME_REGEX.is_match(host);
            if !host_ok {
                return Err(ConfigError::Validation(format!(
                    "invalid database.host: {}",
                    host
                )));
            }
            if cfg.database.database.as_deref().map_or(true, str::is_empty) {
                return Err(ConfigError::Validation(
                    "database.database must be set for the mysql driver".into(),
                ));
            }
        }
        other => {
            return Err(ConfigError::Validation(format!(
                "unsupported database driver: {}",
                other
            )))
        }
    }

    if cfg.database.max_connections == Some(0) {
        return Err(ConfigError::Validation(
            "database.max_connections must be > 0".into(),
        ));
    }
    if cfg.backups.directory.trim().is_empty() {
        return Err(ConfigError::Validation(
            "backups.directory must not be empty".into(),
        ));
    }
    if cfg.backups.retention_days == 0 {
        return Err(ConfigError::Validation(
            "backups.retention_days must be > 0".into(),
        ));
    }
    if cfg.backups.command_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "backups.command_timeout_secs must be > 0".into(),
        ));
    }
    if cfg.scheduler.max_concurrent_jobs == 0 {
        return Err(ConfigError::Validation(
            "scheduler.max_concurrent_jobs must be > 0".into(),
        ));
    }
    Ok(())
}
