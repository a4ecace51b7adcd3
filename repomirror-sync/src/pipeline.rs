//! Pipeline driver: list, then per repository
//! `mirror → ensure destination → reconcile visibility → push`.
//!
//! Each step is idempotent, so a repository that fails mid-way simply gets a
//! fresh attempt at every step on the next run. No error crosses a repository
//! boundary; only an unresolvable destination group (or an unusable mirror
//! directory) aborts the run, and both happen before any repository is touched.

use std::sync::atomic::{AtomicBool, Ordering};

use repomirror_core::{RemoteRepository, RunReport, Settings, SyncOutcome, SyncStage};

use crate::error::PipelineError;
use crate::github::RepositorySource;
use crate::gitlab::Destination;
use crate::progress::SyncObserver;
use crate::reconcile::{reconcile, ReconcileAction};
use crate::store::MirrorStore;

pub struct Pipeline<'a> {
    settings: &'a Settings,
    source: &'a dyn RepositorySource,
    destination: &'a dyn Destination,
    store: &'a MirrorStore<'a>,
    dry_run: bool,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        settings: &'a Settings,
        source: &'a dyn RepositorySource,
        destination: &'a dyn Destination,
        store: &'a MirrorStore<'a>,
    ) -> Self {
        Self {
            settings,
            source,
            destination,
            store,
            dry_run: false,
        }
    }

    /// Only read-only API calls; planned actions are reported as log lines.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Run the whole batch.
    ///
    /// `interrupt` is checked between repositories; once set, the loop stops
    /// and the report is returned with `interrupted = true`.
    pub fn run(
        &self,
        observer: &dyn SyncObserver,
        interrupt: &AtomicBool,
    ) -> Result<RunReport, PipelineError> {
        let namespace_id = match self.settings.gitlab_group.as_deref() {
            Some(group) => Some(self.destination.resolve_namespace_id(group).map_err(
                |source| PipelineError::Namespace {
                    group: group.to_owned(),
                    source,
                },
            )?),
            None => None,
        };

        if !self.dry_run {
            self.store.ensure_root()?;
        }

        let repos = self.source.list_repositories();
        let mut report = RunReport {
            total: repos.len(),
            ..RunReport::default()
        };
        if repos.is_empty() {
            tracing::info!("no repositories found; nothing to sync");
            return Ok(report);
        }

        observer.on_run_start(repos.len());
        for (index, repo) in repos.iter().enumerate() {
            if interrupt.load(Ordering::Acquire) {
                tracing::warn!(next = %repo.name, "interrupted by user; stopping");
                report.interrupted = true;
                break;
            }

            observer.on_repo_start(index, repo);
            let outcome = if self.dry_run {
                self.plan_one(repo, observer)
            } else {
                self.sync_one(repo, namespace_id, observer)
            };

            match &outcome {
                SyncOutcome::Success => tracing::info!(repo = %repo.name, "synced"),
                SyncOutcome::PartialFailure { reason } => {
                    tracing::warn!(repo = %repo.name, %reason, "partially synced")
                }
                SyncOutcome::Failed { stage, reason } => {
                    tracing::error!(repo = %repo.name, %stage, %reason, "failed")
                }
            }
            report.record(&repo.name, &outcome);
            observer.on_repo_done(repo, &outcome);
        }

        tracing::info!(
            synced = report.synced.len(),
            partial = report.partial.len(),
            failed = report.failed.len(),
            interrupted = report.interrupted,
            "run complete"
        );
        Ok(report)
    }

    fn sync_one(
        &self,
        repo: &RemoteRepository,
        namespace_id: Option<u64>,
        observer: &dyn SyncObserver,
    ) -> SyncOutcome {
        let desired = self.settings.visibility.desired_for(repo);
        let local_path = self.store.local_path(&repo.name);
        let mut on_line = |line: &str| {
            tracing::info!(repo = %repo.name, "{line}");
            observer.on_log_line(line);
        };
        observer.on_stage(repo, SyncStage::Listed);

        match self
            .store
            .sync_mirror(&repo.name, &repo.clone_url, &local_path, &mut on_line)
        {
            Ok(action) => tracing::debug!(repo = %repo.name, ?action, "mirror up to date"),
            Err(err) => return failed(SyncStage::Mirrored, err),
        }
        observer.on_stage(repo, SyncStage::Mirrored);

        let existing = match self.destination.find_project(&repo.name) {
            Ok(existing) => existing,
            Err(err) => return failed(SyncStage::DestinationEnsured, err),
        };

        let mut partial = None;
        match existing {
            None => {
                tracing::info!(repo = %repo.name, "project not found on GitLab, creating");
                if let Err(err) = self
                    .destination
                    .create_project(&repo.name, &desired, namespace_id)
                {
                    return failed(SyncStage::DestinationEnsured, err);
                }
                observer.on_stage(repo, SyncStage::DestinationEnsured);
                observer.on_stage(repo, SyncStage::VisibilityReconciled);
            }
            Some(project) => {
                observer.on_stage(repo, SyncStage::DestinationEnsured);
                match reconcile(self.destination, &project, &desired) {
                    ReconcileAction::Unchanged | ReconcileAction::Updated { .. } => {
                        observer.on_stage(repo, SyncStage::VisibilityReconciled);
                    }
                    ReconcileAction::UpdateFailed { from, to, reason } => {
                        partial =
                            Some(format!("visibility update {from} -> {to} failed: {reason}"));
                    }
                }
            }
        }

        let push_url = self.destination.push_url(&repo.name);
        tracing::info!(
            repo = %repo.name,
            namespace = self.settings.target_namespace(),
            "pushing mirror to GitLab"
        );
        if let Err(err) = self
            .store
            .push_mirror(&repo.name, &local_path, &push_url, &mut on_line)
        {
            return failed(SyncStage::Pushed, err);
        }
        observer.on_stage(repo, SyncStage::Pushed);
        observer.on_stage(repo, SyncStage::Done);

        match partial {
            Some(reason) => SyncOutcome::PartialFailure { reason },
            None => SyncOutcome::Success,
        }
    }

    fn plan_one(&self, repo: &RemoteRepository, observer: &dyn SyncObserver) -> SyncOutcome {
        let desired = self.settings.visibility.desired_for(repo);
        let local_path = self.store.local_path(&repo.name);
        let project_path = self.destination.project_path(&repo.name);

        let mut steps = vec![if local_path.exists() {
            format!("fetch --all --prune {}", local_path.display())
        } else {
            format!("clone --mirror {} into {}", repo.name, local_path.display())
        }];

        match self.destination.find_project(&repo.name) {
            Ok(None) => steps.push(format!("create {project_path} ({desired})")),
            Ok(Some(project)) if project.visibility != desired => steps.push(format!(
                "update visibility of {project_path}: {} -> {desired}",
                project.visibility
            )),
            Ok(Some(_)) => steps.push(format!("{project_path} already {desired}")),
            Err(err) => return failed(SyncStage::DestinationEnsured, err),
        }
        steps.push(format!("push --mirror to {project_path}"));

        for step in steps {
            let line = format!("[dry-run] {step}");
            tracing::info!(repo = %repo.name, "{line}");
            observer.on_log_line(&line);
        }
        SyncOutcome::Success
    }
}

fn failed(stage: SyncStage, err: impl std::fmt::Display) -> SyncOutcome {
    SyncOutcome::Failed {
        stage,
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use repomirror_core::{RepoName, Token};
    use tempfile::TempDir;

    use super::*;
    use crate::gitlab::GitLabClient;
    use crate::progress::NoopObserver;
    use crate::test_support::{ok, RecordingGit, ScriptedTransport};

    struct FixedSource(Vec<RemoteRepository>);

    impl RepositorySource for FixedSource {
        fn list_repositories(&self) -> Vec<RemoteRepository> {
            self.0.clone()
        }
    }

    #[derive(Default)]
    struct Lines(RefCell<Vec<String>>);

    #[derive(Default)]
    struct Stages(RefCell<Vec<SyncStage>>);

    impl SyncObserver for Stages {
        fn on_stage(&self, _repo: &RemoteRepository, stage: SyncStage) {
            self.0.borrow_mut().push(stage);
        }
    }

    impl SyncObserver for Lines {
        fn on_log_line(&self, line: &str) {
            self.0.borrow_mut().push(line.to_owned());
        }
    }

    fn repo(name: &str, private: bool) -> RemoteRepository {
        RemoteRepository {
            name: RepoName::from(name),
            clone_url: format!("https://github.com/octo/{name}.git"),
            is_private: private,
        }
    }

    fn settings(dir: &TempDir, extra: &[(&str, &str)]) -> Settings {
        let mut env: HashMap<String, String> = [
            ("GITHUB_USER", "octo"),
            ("GITHUB_TOKEN", "ghp"),
            ("GITLAB_USER", "tanuki"),
            ("GITLAB_TOKEN", "glpat"),
            ("GITLAB_URL", "https://gitlab.test"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        env.insert(
            "BACKUP_DIR".into(),
            dir.path().join("mirrors").display().to_string(),
        );
        for (k, v) in extra {
            env.insert(k.to_string(), v.to_string());
        }
        Settings::from_lookup(|k| env.get(k).cloned()).expect("settings")
    }

    fn gitlab<'t>(
        transport: &'t ScriptedTransport,
        namespace: &str,
    ) -> GitLabClient<&'t ScriptedTransport> {
        GitLabClient::new(transport, "https://gitlab.test", Token::new("glpat"), namespace)
    }

    #[test]
    fn new_repository_is_cloned_created_and_pushed() {
        let dir = TempDir::new().expect("tempdir");
        let settings = settings(&dir, &[]);
        let source = FixedSource(vec![repo("a", false)]);
        let transport = ScriptedTransport::new(vec![
            ok(404, "{}"),
            ok(201, r#"{"id":1,"name":"a","visibility":"public"}"#),
        ]);
        let dest = gitlab(&transport, "tanuki");
        let git = RecordingGit::default();
        let store = MirrorStore::from_settings(&settings, &git);

        let report = Pipeline::new(&settings, &source, &dest, &store)
            .run(&NoopObserver, &AtomicBool::new(false))
            .expect("run");

        assert_eq!(report.synced, vec![RepoName::from("a")]);
        assert_eq!(git.subcommands(), vec!["clone", "push"]);
        let requests = transport.requests.borrow();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].json.as_ref().expect("body")["visibility"], "public");
    }

    #[test]
    fn stages_are_reported_in_order() {
        let dir = TempDir::new().expect("tempdir");
        let settings = settings(&dir, &[]);
        let source = FixedSource(vec![repo("a", false)]);
        let transport = ScriptedTransport::new(vec![
            ok(404, "{}"),
            ok(201, r#"{"id":1,"name":"a","visibility":"public"}"#),
        ]);
        let dest = gitlab(&transport, "tanuki");
        let git = RecordingGit::default();
        let store = MirrorStore::from_settings(&settings, &git);
        let stages = Stages::default();

        Pipeline::new(&settings, &source, &dest, &store)
            .run(&stages, &AtomicBool::new(false))
            .expect("run");

        assert_eq!(
            *stages.0.borrow(),
            vec![
                SyncStage::Listed,
                SyncStage::Mirrored,
                SyncStage::DestinationEnsured,
                SyncStage::VisibilityReconciled,
                SyncStage::Pushed,
                SyncStage::Done,
            ]
        );
    }

    #[test]
    fn failed_push_stops_stage_sequence() {
        let dir = TempDir::new().expect("tempdir");
        let settings = settings(&dir, &[]);
        let source = FixedSource(vec![repo("a", false)]);
        let transport = ScriptedTransport::new(vec![ok(
            200,
            r#"{"id":1,"name":"a","visibility":"public"}"#,
        )]);
        let dest = gitlab(&transport, "tanuki");
        let git = RecordingGit::failing(&["push"]);
        let store = MirrorStore::from_settings(&settings, &git);
        let stages = Stages::default();

        let report = Pipeline::new(&settings, &source, &dest, &store)
            .run(&stages, &AtomicBool::new(false))
            .expect("run");

        assert!(report.failed[0].1.contains("failed at push"));
        assert_eq!(stages.0.borrow().last(), Some(&SyncStage::VisibilityReconciled));
    }

    #[test]
    fn failed_visibility_update_still_pushes_and_is_partial() {
        let dir = TempDir::new().expect("tempdir");
        let settings = settings(&dir, &[("REPO_VISIBILITY", "internal")]);
        let source = FixedSource(vec![repo("d", true)]);
        let transport = ScriptedTransport::new(vec![
            ok(200, r#"{"id":4,"name":"d","visibility":"private"}"#),
            ok(403, "forbidden"),
        ]);
        let dest = gitlab(&transport, "tanuki");
        let git = RecordingGit::default();
        let store = MirrorStore::from_settings(&settings, &git);

        let report = Pipeline::new(&settings, &source, &dest, &store)
            .run(&NoopObserver, &AtomicBool::new(false))
            .expect("run");

        assert_eq!(report.partial.len(), 1);
        assert!(report.partial[0].1.contains("private -> internal"));
        assert_eq!(git.subcommands(), vec!["clone", "push"]);
    }

    #[test]
    fn lookup_error_fails_repository_without_create_or_push() {
        let dir = TempDir::new().expect("tempdir");
        let settings = settings(&dir, &[]);
        let source = FixedSource(vec![repo("a", false)]);
        let transport = ScriptedTransport::new(vec![ok(500, "oops")]);
        let dest = gitlab(&transport, "tanuki");
        let git = RecordingGit::default();
        let store = MirrorStore::from_settings(&settings, &git);

        let report = Pipeline::new(&settings, &source, &dest, &store)
            .run(&NoopObserver, &AtomicBool::new(false))
            .expect("run");

        assert_eq!(report.failed.len(), 1);
        assert!(report.failed[0].1.contains("destination"));
        assert_eq!(transport.urls().len(), 1);
        assert_eq!(git.subcommands(), vec!["clone"]);
    }

    #[test]
    fn unresolvable_group_aborts_before_listing() {
        let dir = TempDir::new().expect("tempdir");
        let settings = settings(&dir, &[("GITLAB_GROUP", "mirrors")]);
        let source = FixedSource(vec![repo("a", false)]);
        let transport = ScriptedTransport::new(vec![ok(404, "{}")]);
        let dest = gitlab(&transport, "mirrors");
        let git = RecordingGit::default();
        let store = MirrorStore::from_settings(&settings, &git);

        let err = Pipeline::new(&settings, &source, &dest, &store)
            .run(&NoopObserver, &AtomicBool::new(false))
            .unwrap_err();

        assert!(matches!(err, PipelineError::Namespace { .. }));
        assert!(git.calls.borrow().is_empty());
    }

    #[test]
    fn dry_run_only_looks_up() {
        let dir = TempDir::new().expect("tempdir");
        let settings = settings(&dir, &[]);
        let source = FixedSource(vec![repo("a", false), repo("b", true)]);
        let transport = ScriptedTransport::new(vec![
            ok(404, "{}"),
            ok(200, r#"{"id":2,"name":"b","visibility":"public"}"#),
        ]);
        let dest = gitlab(&transport, "tanuki");
        let git = RecordingGit::default();
        let store = MirrorStore::from_settings(&settings, &git);
        let lines = Lines::default();

        let report = Pipeline::new(&settings, &source, &dest, &store)
            .dry_run(true)
            .run(&lines, &AtomicBool::new(false))
            .expect("run");

        assert_eq!(report.synced.len(), 2);
        assert!(git.calls.borrow().is_empty());
        assert!(!store.root().exists(), "dry run must not create the store");
        let lines = lines.0.borrow();
        assert!(lines.iter().all(|l| l.starts_with("[dry-run] ")));
        assert!(lines.contains(&"[dry-run] create tanuki/a (public)".to_string()));
        assert!(lines.contains(
            &"[dry-run] update visibility of tanuki/b: public -> private".to_string()
        ));
    }

    #[test]
    fn interrupt_stops_before_next_repository() {
        let dir = TempDir::new().expect("tempdir");
        let settings = settings(&dir, &[]);
        let source = FixedSource(vec![repo("a", false)]);
        let transport = ScriptedTransport::new(vec![]);
        let dest = gitlab(&transport, "tanuki");
        let git = RecordingGit::default();
        let store = MirrorStore::from_settings(&settings, &git);

        let report = Pipeline::new(&settings, &source, &dest, &store)
            .run(&NoopObserver, &AtomicBool::new(true))
            .expect("run");

        assert!(report.interrupted);
        assert_eq!(report.processed(), 0);
        assert_eq!(report.total, 1);
    }
}
