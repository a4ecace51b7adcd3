//! `repomirror logs`: tail of the newest run log.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use repomirror_core::config::DEFAULT_LOGS_DIR;

use crate::logging;

#[derive(Args, Debug)]
pub struct LogsArgs {
    /// Number of trailing lines to show.
    #[arg(long, default_value_t = 100)]
    pub lines: usize,

    /// Log directory (overrides LOGS_DIR).
    #[arg(long, value_name = "DIR")]
    pub dir: Option<PathBuf>,
}

impl LogsArgs {
    pub fn run(self) -> Result<()> {
        let dir = self.dir.unwrap_or_else(|| {
            std::env::var("LOGS_DIR")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOGS_DIR))
        });

        let newest = logging::newest_run_log(&dir)
            .with_context(|| format!("failed to list run logs in {}", dir.display()))?;
        match newest {
            Some(path) => print_tail(&path, self.lines),
            None => {
                println!("no run logs in {}", dir.display());
                Ok(())
            }
        }
    }
}

fn print_tail(path: &Path, lines: usize) -> Result<()> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let reader = BufReader::new(file);

    let mut tail = VecDeque::<String>::new();
    for line in reader.lines() {
        let line = line.with_context(|| format!("read {}", path.display()))?;
        if lines == 0 {
            continue;
        }
        if tail.len() == lines {
            tail.pop_front();
        }
        tail.push_back(line);
    }

    println!("==> {} <==", path.display());
    for line in tail {
        println!("{line}");
    }
    Ok(())
}
