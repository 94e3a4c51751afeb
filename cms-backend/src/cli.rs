use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Museum CMS back office: recurring jobs and backup administration.
#[derive(Debug, Parser)]
#[command(name = "cms-backend", version, about)]
pub struct CliArgs {
    /// Path to configuration file (overrides CMS_CONFIG_PATH)
    #[arg(short = 'c', long = "config-path", global = true)]
    pub config_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the scheduler until interrupted (default)
    Serve,
    /// Manage database backups
    #[command(subcommand)]
    Backup(BackupCommand),
    /// Inspect and run recurring jobs
    #[command(subcommand)]
    Jobs(JobsCommand),
}

#[derive(Debug, Subcommand)]
pub enum BackupCommand {
    /// List backup records, newest first
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 10)]
        per_page: u32,
    },
    /// Create a manual backup
    Create {
        #[arg(short, long, default_value = "")]
        description: String,
    },
    /// Replace the database contents with a backup
    Restore { id: i64 },
    /// Delete a backup record and its file
    Delete { id: i64 },
}

#[derive(Debug, Subcommand)]
pub enum JobsCommand {
    /// List registered jobs and their next due time
    List,
    /// Run a job once and print the result
    Run { name: String },
}

impl CliArgs {
    /// Splits into the config path and the command to run.
    pub fn into_parts(self) -> (Option<PathBuf>, Command) {
        (self.config_path, self.command.unwrap_or(Command::Serve))
    }
}
