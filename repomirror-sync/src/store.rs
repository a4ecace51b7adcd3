//! Local mirror store and mirror pusher.
//!
//! # Layout
//!
//! ```text
//! <backup_dir>/
//!   <repo-name>.git/   (bare mirror clone, one per source repository)
//! ```
//!
//! # Recovery policy
//!
//! A fetch failure on an existing mirror triggers exactly one recovery:
//! remove the directory, clone again. A failed clone into a fresh path is not
//! retried within the run; the next run sees no directory and clones.

use std::fs;
use std::path::{Path, PathBuf};

use repomirror_core::{RepoName, Settings, Token};

use crate::error::{io_err, MirrorError};
use crate::git::GitRunner;
use crate::redact::embed_credentials;

/// What [`MirrorStore::sync_mirror`] did to bring the mirror up to date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorAction {
    Cloned,
    Fetched,
    /// Fetch failed; the mirror was deleted and cloned again.
    Recloned,
}

pub struct MirrorStore<'a> {
    root: PathBuf,
    runner: &'a dyn GitRunner,
    user: String,
    token: Token,
}

impl<'a> MirrorStore<'a> {
    pub fn new(
        root: impl Into<PathBuf>,
        runner: &'a dyn GitRunner,
        user: impl Into<String>,
        token: Token,
    ) -> Self {
        Self {
            root: root.into(),
            runner,
            user: user.into(),
            token,
        }
    }

    /// Store rooted at `settings.backup_dir`, cloning with the GitHub credentials.
    pub fn from_settings(settings: &Settings, runner: &'a dyn GitRunner) -> Self {
        Self::new(
            &settings.backup_dir,
            runner,
            &settings.github_user,
            settings.github_token.clone(),
        )
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the store directory if missing.
    pub fn ensure_root(&self) -> Result<(), MirrorError> {
        fs::create_dir_all(&self.root).map_err(|e| io_err(&self.root, e))
    }

    /// `<root>/<name>.git`. Pure, no I/O.
    pub fn local_path(&self, name: &RepoName) -> PathBuf {
        self.root.join(format!("{}.git", name.0))
    }

    /// Bring the mirror at `local_path` up to date with `clone_url`.
    pub fn sync_mirror(
        &self,
        name: &RepoName,
        clone_url: &str,
        local_path: &Path,
        on_line: &mut dyn FnMut(&str),
    ) -> Result<MirrorAction, MirrorError> {
        let auth_url = embed_credentials(clone_url, &self.user, self.token.expose());

        if !local_path.exists() {
            tracing::info!(repo = %name, "cloning (mirror)");
            self.clone_mirror(&auth_url, local_path, on_line)
                .map_err(|source| MirrorError::Clone {
                    name: name.0.clone(),
                    source,
                })?;
            return Ok(MirrorAction::Cloned);
        }

        let git_dir = local_path.to_string_lossy();
        let fetch = self
            .runner
            .run(&["--git-dir", &*git_dir, "fetch", "--all", "--prune"], on_line);
        let fetch_error = match fetch {
            Ok(()) => return Ok(MirrorAction::Fetched),
            Err(err) => err,
        };

        tracing::warn!(repo = %name, error = %fetch_error, "fetch failed, recloning mirror");
        fs::remove_dir_all(local_path).map_err(|e| io_err(local_path, e))?;
        self.clone_mirror(&auth_url, local_path, on_line)
            .map_err(|source| MirrorError::Reclone {
                name: name.0.clone(),
                fetch_error: fetch_error.to_string(),
                source,
            })?;
        Ok(MirrorAction::Recloned)
    }

    /// Push every ref of the bare mirror to `push_url`, deleting refs the
    /// destination has that the mirror does not.
    pub fn push_mirror(
        &self,
        name: &RepoName,
        local_path: &Path,
        push_url: &str,
        on_line: &mut dyn FnMut(&str),
    ) -> Result<(), MirrorError> {
        let git_dir = local_path.to_string_lossy();
        self.runner
            .run(&["--git-dir", &*git_dir, "push", "--mirror", push_url], on_line)
            .map_err(|source| MirrorError::Push {
                name: name.0.clone(),
                source,
            })
    }

    fn clone_mirror(
        &self,
        auth_url: &str,
        local_path: &Path,
        on_line: &mut dyn FnMut(&str),
    ) -> Result<(), crate::error::GitError> {
        let path = local_path.to_string_lossy();
        self.runner
            .run(&["clone", "--mirror", auth_url, &*path], on_line)
    }
}
