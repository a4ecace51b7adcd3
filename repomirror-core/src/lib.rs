//! repomirror core library: domain types, settings, errors.
//!
//! - [`types`]: repositories, projects, visibility policy, run outcomes
//! - [`config`]: [`Settings`] loaded from the environment
//! - [`error`]: [`ConfigError`]

pub mod config;
pub mod error;
pub mod types;

pub use config::{Settings, Token};
pub use error::ConfigError;
pub use types::{
    DestinationProject, RemoteRepository, RepoName, RunReport, SyncOutcome, SyncStage, Visibility,
    VisibilityPolicy,
};
