//! Per-run log files.
//!
//! Every run writes to its own `<logs_dir>/logs_YYYYmmdd_HHMMSS.txt`. After
//! the new file is opened, older run logs beyond [`MAX_RUN_LOGS`] are deleted,
//! oldest first.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use tracing_subscriber::{fmt, EnvFilter};

/// Number of run logs kept on disk, the current one included.
pub const MAX_RUN_LOGS: usize = 20;

const PREFIX: &str = "logs_";
const SUFFIX: &str = ".txt";

pub fn run_log_name(at: DateTime<Local>) -> String {
    format!("{PREFIX}{}{SUFFIX}", at.format("%Y%m%d_%H%M%S"))
}

/// Open this run's log file, install the global subscriber on it and prune
/// old run logs. Returns the path of the new log.
pub fn init_run_log(logs_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(logs_dir)
        .with_context(|| format!("failed to create log directory {}", logs_dir.display()))?;

    let started = Local::now();
    let path = logs_dir.join(run_log_name(started));
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init();

    tracing::info!(
        "==================== run started {} ====================",
        started.format("%Y-%m-%d %H:%M:%S")
    );

    match prune_run_logs(logs_dir, MAX_RUN_LOGS) {
        Ok(0) => {}
        Ok(removed) => tracing::debug!(removed, "pruned old run logs"),
        Err(err) => tracing::warn!(error = %err, "failed to prune old run logs"),
    }
    Ok(path)
}

/// Console-only subscriber for commands that do not write a run log.
pub fn init_stderr() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

/// Run logs in `logs_dir`, oldest first. Other files are ignored.
pub fn run_logs(logs_dir: &Path) -> io::Result<Vec<PathBuf>> {
    let entries = match fs::read_dir(logs_dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err),
    };

    let mut logs = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let is_run_log = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(PREFIX) && n.ends_with(SUFFIX));
        if is_run_log && path.is_file() {
            logs.push(path);
        }
    }
    // The timestamp format sorts lexically.
    logs.sort();
    Ok(logs)
}

pub fn newest_run_log(logs_dir: &Path) -> io::Result<Option<PathBuf>> {
    Ok(run_logs(logs_dir)?.pop())
}

/// Delete all but the newest `keep` run logs. Returns how many were removed.
pub fn prune_run_logs(logs_dir: &Path, keep: usize) -> io::Result<usize> {
    let logs = run_logs(logs_dir)?;
    let excess = logs.len().saturating_sub(keep);
    for path in &logs[..excess] {
        fs::remove_file(path)?;
    }
    Ok(excess)
}
