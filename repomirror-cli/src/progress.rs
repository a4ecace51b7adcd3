//! Terminal progress for `repomirror sync`.
//!
//! Two reporters implement [`SyncObserver`]:
//! - [`InteractiveReporter`] draws an indicatif bar with a tail of git output
//!   under it when stdout is a TTY
//! - [`LoggingReporter`] emits tracing events for CI and pipes

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use colored::Colorize;
use console::Term;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use repomirror_core::{RemoteRepository, SyncOutcome, SyncStage};
use repomirror_sync::SyncObserver;

/// Longest subprocess line shown in the tail panel.
const MESSAGE_WIDTH: usize = 60;

/// Subprocess lines kept in the tail panel for the current repository.
const TAIL_LINES: usize = 5;

pub enum ProgressReporter {
    Interactive(InteractiveReporter),
    Logging(LoggingReporter),
}

impl ProgressReporter {
    /// Pick the reporter from whether stdout is a terminal.
    pub fn new() -> Self {
        if Term::stdout().is_term() {
            Self::Interactive(InteractiveReporter::new())
        } else {
            Self::Logging(LoggingReporter)
        }
    }

    pub fn finish(&self) {
        if let Self::Interactive(r) = self {
            r.tail.finish_and_clear();
            r.bar.finish_and_clear();
        }
    }

    fn observer(&self) -> &dyn SyncObserver {
        match self {
            Self::Interactive(r) => r as &dyn SyncObserver,
            Self::Logging(r) => r,
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncObserver for ProgressReporter {
    fn on_run_start(&self, total: usize) {
        self.observer().on_run_start(total);
    }

    fn on_repo_start(&self, index: usize, repo: &RemoteRepository) {
        self.observer().on_repo_start(index, repo);
    }

    fn on_stage(&self, repo: &RemoteRepository, stage: SyncStage) {
        self.observer().on_stage(repo, stage);
    }

    fn on_log_line(&self, line: &str) {
        self.observer().on_log_line(line);
    }

    fn on_repo_done(&self, repo: &RemoteRepository, outcome: &SyncOutcome) {
        self.observer().on_repo_done(repo, outcome);
    }
}

// ---------------------------------------------------------------------------
// Interactive
// ---------------------------------------------------------------------------

/// Overall bar plus a panel with the last few git lines of the repository
/// being synced. The panel is emptied when the next repository starts.
pub struct InteractiveReporter {
    bar: ProgressBar,
    tail: ProgressBar,
    lines: Mutex<VecDeque<String>>,
}

impl InteractiveReporter {
    pub fn new() -> Self {
        Self::with_multi(MultiProgress::new())
    }

    fn with_multi(multi: MultiProgress) -> Self {
        let bar = multi.add(ProgressBar::new(0));
        bar.set_style(Self::bar_style());
        let tail = multi.add(ProgressBar::new(0));
        tail.set_style(Self::tail_style());
        Self {
            bar,
            tail,
            lines: Mutex::new(VecDeque::with_capacity(TAIL_LINES)),
        }
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template(
                "{prefix:.bold.cyan} [{bar:40.cyan/blue}] {pos:>3}/{len:3} {elapsed_precise} {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░")
    }

    fn tail_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{msg:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
    }

    fn push_line(&self, line: &str) {
        let mut lines = self.lines.lock().unwrap_or_else(|e| e.into_inner());
        if lines.len() == TAIL_LINES {
            lines.pop_front();
        }
        lines.push_back(truncate(line, MESSAGE_WIDTH));
        let panel: Vec<String> = lines.iter().map(|l| format!("  {l}")).collect();
        self.tail.set_message(panel.join("\n"));
    }

    fn clear_lines(&self) {
        self.lines
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
        self.tail.set_message("");
    }
}

impl Default for InteractiveReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncObserver for InteractiveReporter {
    fn on_run_start(&self, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.reset_elapsed();
        self.bar.enable_steady_tick(Duration::from_millis(100));
    }

    fn on_repo_start(&self, _index: usize, repo: &RemoteRepository) {
        self.bar.set_prefix(format!("{:20}", truncate(repo.name.as_str(), 20)));
        self.bar.set_message("");
        self.clear_lines();
    }

    fn on_stage(&self, _repo: &RemoteRepository, stage: SyncStage) {
        self.bar.set_message(stage.to_string());
    }

    fn on_log_line(&self, line: &str) {
        let line = line.trim();
        if !line.is_empty() {
            self.push_line(line);
        }
    }

    fn on_repo_done(&self, repo: &RemoteRepository, outcome: &SyncOutcome) {
        let line = match outcome {
            SyncOutcome::Success => format!("{} {}", "✓".green(), repo.name),
            SyncOutcome::PartialFailure { .. } => {
                format!("{} {}: {}", "!".yellow(), repo.name, outcome)
            }
            SyncOutcome::Failed { .. } => format!("{} {}: {}", "✗".red(), repo.name, outcome),
        };
        self.bar.println(line);
        self.bar.inc(1);
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Reporter for non-TTY output. Subprocess lines already reach the log file
/// through the pipeline, so they are not repeated here.
pub struct LoggingReporter;

impl SyncObserver for LoggingReporter {
    fn on_run_start(&self, total: usize) {
        tracing::info!(total, "syncing repositories");
        println!("Syncing {total} repositories");
    }

    fn on_repo_start(&self, index: usize, repo: &RemoteRepository) {
        tracing::debug!(repo = %repo.name, position = index + 1, "starting repository");
    }

    fn on_stage(&self, repo: &RemoteRepository, stage: SyncStage) {
        tracing::debug!(repo = %repo.name, %stage, "stage complete");
    }

    fn on_repo_done(&self, repo: &RemoteRepository, outcome: &SyncOutcome) {
        if outcome.is_success() {
            tracing::info!(repo = %repo.name, "repository synced");
        } else {
            tracing::warn!(repo = %repo.name, %outcome, "repository not fully synced");
        }
        println!("{}: {}", repo.name, outcome);
    }
}

fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}…", &text[..cut]),
        None => text.to_owned(),
    }
}
