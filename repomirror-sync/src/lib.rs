//! # repomirror-sync
//!
//! Mirror pipeline: list repositories on GitHub, keep a bare mirror of each
//! under the backup directory, make sure a matching GitLab project exists with
//! the desired visibility, then `push --mirror` into it.
//!
//! Build the collaborators once ([`GitHubClient`], [`GitLabClient`],
//! [`MirrorStore`] over a [`GitCli`]) and hand them to [`Pipeline::run`].

pub mod error;
pub mod git;
pub mod github;
pub mod gitlab;
pub mod http;
pub mod pipeline;
pub mod progress;
pub mod reconcile;
pub mod redact;
pub mod store;

#[cfg(test)]
mod test_support;

pub use error::{DestinationError, GitError, MirrorError, PipelineError, TransportError};
pub use git::{GitCli, GitRunner};
pub use github::{GitHubClient, RepositorySource};
pub use gitlab::{Destination, GitLabClient};
pub use http::{ApiRequest, ApiResponse, Method, Transport, UreqTransport};
pub use pipeline::Pipeline;
pub use progress::{NoopObserver, SyncObserver};
pub use reconcile::{reconcile, ReconcileAction};
pub use redact::{embed_credentials, redact_secrets};
pub use store::{MirrorAction, MirrorStore};
