//! Client for the external database dump and restore tools.
//!
//! Backups are produced by the vendor tools (`mysqldump`/`mysql` or the
//! `sqlite3` shell) rather than in-process, so the artifact is a plain SQL
//! script any operator can replay by hand.

use std::borrow::Cow;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Output, Stdio};
use std::time::Duration;

use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

// Re-export async_trait for implementors of DumpClient
pub use async_trait::async_trait;

pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(600);

/// Dumps a set of tables to a file and replays such a file into the database.
#[async_trait]
pub trait DumpClient: Send + Sync + 'static {
    /// Writes a SQL dump of `tables` to `dest`, creating or truncating it.
    async fn dump(&self, tables: &[&str], dest: &Path) -> Result<(), DumpError>;

    /// Replays the SQL script at `src`, replacing the tables it defines.
    async fn restore(&self, src: &Path) -> Result<(), DumpError>;
}

/// Database the tools operate on.
#[derive(Clone)]
pub enum DumpTarget {
    MySql {
        host: String,
        port: Option<u16>,
        username: Option<String>,
        password: Option<String>,
        database: String,
    },
    Sqlite {
        path: PathBuf,
    },
}

impl std::fmt::Debug for DumpTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MySql {
                host,
                port,
                username,
                database,
                ..
            } => f
                .debug_struct("MySql")
                .field("host", host)
                .field("port", port)
                .field("username", username)
                .field("password", &"<redacted>")
                .field("database", database)
                .finish(),
            Self::Sqlite { path } => f.debug_struct("Sqlite").field("path", path).finish(),
        }
    }
}

impl DumpTarget {
    fn default_programs(&self) -> (&'static str, &'static str) {
        match self {
            Self::MySql { .. } => ("mysqldump", "mysql"),
            Self::Sqlite { .. } => ("sqlite3", "sqlite3"),
        }
    }
}

/// [`DumpClient`] backed by the vendor command-line tools.
#[derive(Debug, Clone)]
pub struct CommandDumpClient {
    target: DumpTarget,
    dump_program: PathBuf,
    restore_program: PathBuf,
    timeout: Duration,
}

impl CommandDumpClient {
    #[must_use]
    pub fn new(target: DumpTarget) -> Self {
        let (dump, restore) = target.default_programs();
        Self {
            target,
            dump_program: PathBuf::from(dump),
            restore_program: PathBuf::from(restore),
            timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_dump_program<P: Into<PathBuf>>(mut self, program: P) -> Self {
        self.dump_program = program.into();
        self
    }

    #[must_use]
    pub fn with_restore_program<P: Into<PathBuf>>(mut self, program: P) -> Self {
        self.restore_program = program.into();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn dump_command(&self, tables: &[&str]) -> Command {
        let mut command = Command::new(&self.dump_program);
        match &self.target {
            DumpTarget::MySql { database, .. } => {
                self.apply_mysql_connection(&mut command);
                command.arg("--single-transaction").arg(database).args(tables);
            }
            DumpTarget::Sqlite { path } => {
                command.arg(path).arg(format!(".dump {}", tables.join(" ")));
            }
        }
        command
    }

    fn restore_command(&self) -> Command {
        let mut command = Command::new(&self.restore_program);
        match &self.target {
            DumpTarget::MySql { database, .. } => {
                self.apply_mysql_connection(&mut command);
                command.arg(database);
            }
            DumpTarget::Sqlite { path } => {
                command.arg("-bail").arg(path);
            }
        }
        command
    }

    /// Host, port and user go on the command line; the password travels in
    /// the environment so it never shows up in a process listing.
    fn apply_mysql_connection(&self, command: &mut Command) {
        if let DumpTarget::MySql {
            host,
            port,
            username,
            password,
            ..
        } = &self.target
        {
            command.arg("-h").arg(host);
            if let Some(port) = port {
                command.arg("-P").arg(port.to_string());
            }
            if let Some(username) = username {
                command.arg("-u").arg(username);
            }
            if let Some(password) = password {
                command.env("MYSQL_PWD", password);
            }
        }
    }

    async fn run(
        &self,
        mut command: Command,
        name: &'static str,
        stdin: Option<Stdin>,
    ) -> Result<(), DumpError> {
        let program = command.as_std().get_program().to_string_lossy().into_owned();
        command.kill_on_drop(true).stderr(Stdio::piped());

        let script = match stdin {
            Some(Stdin::File(file)) => {
                command.stdin(Stdio::from(file));
                None
            }
            Some(Stdin::Script(script)) => {
                command.stdin(Stdio::piped());
                Some(script)
            }
            None => {
                command.stdin(Stdio::null());
                None
            }
        };

        let mut child = command.spawn().map_err(|source| DumpError::Spawn {
            program: program.clone(),
            source,
        })?;

        tracing::debug!(command = name, program = %program, "external tool started");

        let work = async move {
            if let (Some(script), Some(mut pipe)) = (script, child.stdin.take()) {
                pipe.write_all(script.as_bytes()).await?;
                pipe.shutdown().await?;
            }
            child.wait_with_output().await
        };

        let output = match tokio::time::timeout(self.timeout, work).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(DumpError::Timeout {
                    command: Cow::Borrowed(name),
                    timeout: self.timeout,
                })
            }
        };

        check_output(output, name)
    }
}

enum Stdin {
    File(std::fs::File),
    Script(String),
}

#[async_trait]
impl DumpClient for CommandDumpClient {
    async fn dump(&self, tables: &[&str], dest: &Path) -> Result<(), DumpError> {
        let out = tokio::fs::File::create(dest).await?.into_std().await;
        let mut command = self.dump_command(tables);
        command.stdout(Stdio::from(out));
        self.run(command, "dump", None).await
    }

    async fn restore(&self, src: &Path) -> Result<(), DumpError> {
        let mut command = self.restore_command();
        command.stdout(Stdio::null());
        let stdin = match &self.target {
            DumpTarget::MySql { .. } => {
                Stdin::File(tokio::fs::File::open(src).await?.into_std().await)
            }
            DumpTarget::Sqlite { .. } => {
                let dump = tokio::fs::read_to_string(src).await?;
                Stdin::Script(sqlite_restore_script(&dump))
            }
        };
        self.run(command, "restore", Some(stdin)).await
    }
}

/// `sqlite3 .dump` output recreates tables without dropping them first, so
/// prefix a drop for every table the script creates.
fn sqlite_restore_script(dump: &str) -> String {
    let mut script = String::with_capacity(dump.len() + 256);
    for line in dump.lines() {
        if let Some(table) = created_table_name(line) {
            script.push_str(&format!("DROP TABLE IF EXISTS \"{table}\";\n"));
        }
    }
    script.push_str(dump);
    script
}

fn created_table_name(line: &str) -> Option<&str> {
    let rest = line.trim_start().strip_prefix("CREATE TABLE ")?;
    let rest = rest.strip_prefix("IF NOT EXISTS ").unwrap_or(rest);
    let name = rest
        .split(|c: char| c.is_whitespace() || c == '(')
        .next()?
        .trim_matches(|c: char| c == '"' || c == '`' || c == '\'' || c == '[' || c == ']');
    (!name.is_empty() && !name.starts_with("sqlite_")).then_some(name)
}

/// Errors surfaced while running the dump or restore tools.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DumpError {
    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("{command} command failed with status {status}: {stderr}")]
    ToolFailure {
        command: Cow<'static, str>,
        status: ExitStatus,
        stderr: String,
    },
    #[error("{command} command did not finish within {timeout:?}")]
    Timeout {
        command: Cow<'static, str>,
        timeout: Duration,
    },
    #[error("i/o error around external tool: {0}")]
    Io(#[from] io::Error),
}

#[inline]
fn check_output(output: Output, name: &'static str) -> Result<(), DumpError> {
    if output.status.success() {
        Ok(())
    } else {
        let stderr = match String::from_utf8(output.stderr) {
            Ok(s) => s.trim().to_owned(),
            Err(e) => String::from_utf8_lossy(e.as_bytes()).trim().to_owned(),
        };
        Err(DumpError::ToolFailure {
            command: Cow::Borrowed(name),
            status: output.status,
            stderr,
        })
    }
}
