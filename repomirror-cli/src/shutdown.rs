//! Ctrl+C handling.
//!
//! The first interrupt raises a flag the pipeline checks between
//! repositories, so the repository in flight finishes cleanly. A second
//! interrupt exits immediately with status 130.

use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use console::Term;

static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Flag handed to [`repomirror_sync::Pipeline::run`].
pub fn flag() -> &'static AtomicBool {
    &SHUTDOWN_REQUESTED
}

pub fn install_handler() -> Result<()> {
    ctrlc::set_handler(|| {
        let is_tty = Term::stderr().is_term();
        if SHUTDOWN_REQUESTED.swap(true, Ordering::AcqRel) {
            if is_tty {
                eprintln!("Force quit!");
            }
            std::process::exit(130);
        }

        if is_tty {
            eprintln!("\n\nShutdown requested, finishing the current repository...");
            eprintln!("Press Ctrl+C again to force quit.");
        }
        tracing::warn!("shutdown requested, finishing the current repository");
    })
    .context("failed to install Ctrl+C handler")
}
