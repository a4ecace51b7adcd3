//! Error types for repomirror-sync.

use std::path::PathBuf;

use thiserror::Error;

/// Failure to complete an HTTP exchange at all (DNS, TLS, timeout, body read).
///
/// Non-2xx statuses are not transport errors; they come back as
/// [`crate::http::ApiResponse`] and each client classifies them.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("failed to read response body from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from the destination (GitLab) API.
#[derive(Debug, Error)]
pub enum DestinationError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Any status the caller did not expect, including transient 5xx.
    #[error("GitLab API returned {status} while trying to {action}: {body}")]
    Api {
        action: String,
        status: u16,
        body: String,
    },

    #[error("GitLab group {group} not found (status {status}): {body}")]
    NamespaceNotFound {
        group: String,
        status: u16,
        body: String,
    },

    #[error("failed to create GitLab project {name} (status {status}): {body}")]
    CreateFailed {
        name: String,
        status: u16,
        body: String,
    },

    #[error("unexpected GitLab response while trying to {action}: {source}")]
    Parse {
        action: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors from running the `git` binary.
#[derive(Debug, Error)]
pub enum GitError {
    #[error("failed to spawn `git {command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`git {command}` exited with {status}{}", output_suffix(.last_line))]
    Failed {
        command: String,
        status: String,
        last_line: Option<String>,
    },

    #[error("I/O error while running `git {command}`: {source}")]
    Io {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from the local mirror store and mirror pusher.
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("mirror clone of {name} failed: {source}")]
    Clone {
        name: String,
        #[source]
        source: GitError,
    },

    #[error("reclone of {name} failed after fetch error ({fetch_error}): {source}")]
    Reclone {
        name: String,
        fetch_error: String,
        #[source]
        source: GitError,
    },

    #[error("mirror push of {name} failed: {source}")]
    Push {
        name: String,
        #[source]
        source: GitError,
    },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Run-aborting errors. Everything repository-local is folded into
/// [`repomirror_core::SyncOutcome`] instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("cannot sync into GitLab group {group}: {source}")]
    Namespace {
        group: String,
        #[source]
        source: DestinationError,
    },

    #[error("mirror store unavailable: {0}")]
    Store(#[from] MirrorError),
}

fn output_suffix(last_line: &Option<String>) -> String {
    last_line
        .as_deref()
        .map(|line| format!(": {line}"))
        .unwrap_or_default()
}

/// Convenience constructor for [`MirrorError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> MirrorError {
    MirrorError::Io {
        path: path.into(),
        source,
    }
}
