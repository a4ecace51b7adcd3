//! `repomirror list`: show what a sync would pick up.

use anyhow::{Context, Result};
use clap::Args;
use repomirror_core::{RemoteRepository, VisibilityPolicy};
use repomirror_sync::{GitHubClient, RepositorySource, UreqTransport};
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use crate::logging;

/// Arguments for `repomirror list`.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled)]
struct RepoRow {
    #[tabled(rename = "repository")]
    name: String,
    #[tabled(rename = "github")]
    source: &'static str,
    #[tabled(rename = "gitlab")]
    desired: String,
    #[tabled(rename = "clone url")]
    clone_url: String,
}

#[derive(Serialize)]
struct RepoJson<'a> {
    #[serde(flatten)]
    repo: &'a RemoteRepository,
    desired_visibility: String,
}

impl ListArgs {
    pub fn run(self) -> Result<()> {
        let settings = super::load_settings()?;
        logging::init_stderr();

        let transport = UreqTransport::new();
        let repos = GitHubClient::from_settings(&settings, &transport).list_repositories();

        if self.json {
            print_json(&repos, &settings.visibility)
        } else {
            print_table(&repos, &settings.visibility);
            Ok(())
        }
    }
}

fn print_json(repos: &[RemoteRepository], policy: &VisibilityPolicy) -> Result<()> {
    let payload: Vec<RepoJson<'_>> = repos
        .iter()
        .map(|repo| RepoJson {
            repo,
            desired_visibility: policy.desired_for(repo).to_string(),
        })
        .collect();
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to render listing JSON")?
    );
    Ok(())
}

fn print_table(repos: &[RemoteRepository], policy: &VisibilityPolicy) {
    if repos.is_empty() {
        println!("No repositories found.");
        return;
    }

    let rows: Vec<RepoRow> = repos.iter().map(|repo| row(repo, policy)).collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    println!("{} repositories | visibility policy: {policy}", repos.len());
}

fn row(repo: &RemoteRepository, policy: &VisibilityPolicy) -> RepoRow {
    RepoRow {
        name: repo.name.0.clone(),
        source: if repo.is_private { "private" } else { "public" },
        desired: policy.desired_for(repo).to_string(),
        clone_url: repo.clone_url.clone(),
    }
}
