//! `repomirror sync`: mirror every listed repository into GitLab.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use repomirror_core::{RunReport, Settings, VisibilityPolicy};
use repomirror_sync::{GitCli, GitHubClient, GitLabClient, MirrorStore, Pipeline, UreqTransport};

use crate::progress::ProgressReporter;
use crate::{logging, shutdown};

/// Arguments for `repomirror sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Look everything up and print the plan without cloning, creating,
    /// updating or pushing.
    #[arg(long)]
    pub dry_run: bool,

    /// Exit non-zero when any repository failed or synced only partially.
    #[arg(long)]
    pub fail_on_error: bool,

    /// Directory holding the bare mirrors (overrides BACKUP_DIR).
    #[arg(long, value_name = "DIR")]
    pub backup_dir: Option<PathBuf>,

    /// `auto`, `private`, `internal` or `public` (overrides REPO_VISIBILITY).
    #[arg(long)]
    pub visibility: Option<String>,

    /// GitLab group to mirror into (overrides GITLAB_GROUP).
    #[arg(long)]
    pub group: Option<String>,
}

impl SyncArgs {
    pub fn run(self) -> Result<ExitCode> {
        let mut settings = super::load_settings()?;
        self.apply_overrides(&mut settings);

        let log_path = logging::init_run_log(&settings.logs_dir)?;
        shutdown::install_handler()?;
        tracing::info!(
            namespace = settings.target_namespace(),
            visibility = %settings.visibility,
            backup_dir = %settings.backup_dir.display(),
            dry_run = self.dry_run,
            "starting sync"
        );

        let transport = UreqTransport::new();
        let github = GitHubClient::from_settings(&settings, &transport);
        let gitlab = GitLabClient::from_settings(&settings, &transport);
        let git = GitCli::new();
        let store = MirrorStore::from_settings(&settings, &git);
        let reporter = ProgressReporter::new();

        let result = Pipeline::new(&settings, &github, &gitlab, &store)
            .dry_run(self.dry_run)
            .run(&reporter, shutdown::flag());
        reporter.finish();
        let report = result.context("sync aborted")?;

        print_summary(&report, self.dry_run, &log_path);
        Ok(ExitCode::from(exit_status(&report, self.fail_on_error)))
    }

    fn apply_overrides(&self, settings: &mut Settings) {
        if let Some(dir) = &self.backup_dir {
            settings.backup_dir = dir.clone();
        }
        if let Some(raw) = &self.visibility {
            settings.visibility = VisibilityPolicy::parse(raw.trim());
        }
        if let Some(group) = self.group.as_deref().map(str::trim) {
            settings.gitlab_group = (!group.is_empty()).then(|| group.to_owned());
        }
    }
}

/// An interrupted run is a clean stop and exits 0 unless `--fail-on-error`
/// sees a failure among the repositories already processed.
fn exit_status(report: &RunReport, fail_on_error: bool) -> u8 {
    if fail_on_error && !report.all_succeeded() {
        1
    } else {
        0
    }
}

fn print_summary(report: &RunReport, dry_run: bool, log_path: &Path) {
    let prefix = if dry_run { "[dry-run] " } else { "" };

    if report.total == 0 {
        println!("{prefix}No repositories found. Nothing to sync.");
    } else {
        println!(
            "{prefix}{} synced, {} partial, {} failed (of {})",
            report.synced.len().to_string().green().bold(),
            report.partial.len().to_string().yellow().bold(),
            report.failed.len().to_string().red().bold(),
            report.total,
        );
    }

    for (name, reason) in &report.partial {
        println!("  {} {name}: {reason}", "!".yellow());
    }
    for (name, reason) in &report.failed {
        println!("  {} {name}: {reason}", "✗".red());
    }
    if report.interrupted {
        println!(
            "{}",
            format!(
                "Interrupted after {} of {} repositories.",
                report.processed(),
                report.total
            )
            .yellow()
        );
    }
    println!("Log: {}", log_path.display());
}
