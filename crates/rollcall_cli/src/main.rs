//! rollcall command-line entry point.
//!
//! # Responsibility
//! - Parse flags, initialize logging and open the record store.
//! - Run the scripted walkthrough in `demo` and print each result.

mod demo;

use anyhow::{anyhow, Context};
use clap::{Parser, ValueEnum};
use log::info;
use rollcall_core::db::{open_db, open_db_in_memory};
use rollcall_core::{default_log_level, init_logging, EnrolledDefault, SqliteStudentRepository};
use std::path::PathBuf;

/// Level used when logs go to stderr and no level was requested.
const STDERR_LOG_LEVEL: &str = "warn";

#[derive(Debug, Parser)]
#[command(
    name = "rollcall",
    version,
    about = "Walk a student record store through insert, query, update and delete"
)]
struct Cli {
    /// SQLite database file. Omit for a transient in-memory store.
    #[arg(long, env = "ROLLCALL_DB")]
    db: Option<PathBuf>,

    /// trace|debug|info|warn|error
    #[arg(long, env = "ROLLCALL_LOG_LEVEL")]
    log_level: Option<String>,

    /// Absolute directory for rotating log files. Logs go to stderr otherwise.
    #[arg(long, env = "ROLLCALL_LOG_DIR")]
    log_dir: Option<String>,

    /// How `enrolled_date` is filled for records that leave it unset.
    #[arg(long, value_enum, default_value_t = EnrolledDefaultArg::PerRow)]
    enrolled_default: EnrolledDefaultArg,

    /// Print one JSON object per result line.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum EnrolledDefaultArg {
    PerRow,
    SchemaLoad,
}

impl From<EnrolledDefaultArg> for EnrolledDefault {
    fn from(value: EnrolledDefaultArg) -> Self {
        match value {
            EnrolledDefaultArg::PerRow => EnrolledDefault::PerRow,
            EnrolledDefaultArg::SchemaLoad => EnrolledDefault::SchemaLoad,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match (cli.log_level.as_deref(), cli.log_dir.as_deref()) {
        (Some(level), _) => level,
        (None, Some(_)) => default_log_level(),
        (None, None) => STDERR_LOG_LEVEL,
    };
    init_logging(level, cli.log_dir.as_deref()).map_err(|err| anyhow!(err))?;

    let mut conn = match cli.db.as_ref() {
        Some(path) => open_db(path)
            .with_context(|| format!("failed to open database `{}`", path.display()))?,
        None => open_db_in_memory().context("failed to open in-memory database")?,
    };

    let repo = SqliteStudentRepository::try_new(&mut conn)
        .context("database is not ready for student records")?
        .with_enrolled_default(cli.enrolled_default.into());
    info!(
        "event=cli_start module=cli status=ok db={} enrolled_default={:?}",
        cli.db
            .as_ref()
            .map_or_else(|| ":memory:".to_string(), |path| path.display().to_string()),
        repo.enrolled_default()
    );

    let stdout = std::io::stdout();
    let mut report = demo::Report::new(stdout.lock(), cli.json);
    demo::run(repo, &mut report)
}
