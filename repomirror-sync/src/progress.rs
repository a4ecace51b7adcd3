//! Progress observer the pipeline reports into.
//!
//! Rendering lives with the caller; the pipeline only emits events. All hooks
//! take `&self` and default to no-ops.

use repomirror_core::{RemoteRepository, SyncOutcome, SyncStage};

pub trait SyncObserver {
    /// Called once, after listing, with the number of repositories to process.
    fn on_run_start(&self, _total: usize) {}

    /// Called before the first step of each repository. `index` is 0-based.
    fn on_repo_start(&self, _index: usize, _repo: &RemoteRepository) {}

    /// `stage` completed for `repo`. Stages arrive in order; a failing step
    /// ends the sequence early and a failed visibility update skips
    /// `VisibilityReconciled`. Not emitted on dry runs.
    fn on_stage(&self, _repo: &RemoteRepository, _stage: SyncStage) {}

    /// One line of subprocess output or a dry-run plan step.
    fn on_log_line(&self, _line: &str) {}

    /// Called after every repository, whatever the outcome.
    fn on_repo_done(&self, _repo: &RemoteRepository, _outcome: &SyncOutcome) {}
}

/// Observer that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl SyncObserver for NoopObserver {}
