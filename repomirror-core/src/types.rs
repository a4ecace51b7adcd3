//! Domain types shared by the listing, destination and pipeline layers.
//!
//! Source repositories and destination projects deserialize straight from the
//! GitHub and GitLab JSON payloads; everything else is run-local state.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed repository name, shared by source and destination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoName(pub String);

impl RepoName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RepoName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for RepoName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RepoName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Visibility
// ---------------------------------------------------------------------------

/// Access classification of a hosted project.
///
/// `Other` carries any literal the operator configured so that it reaches the
/// destination API verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Visibility {
    #[default]
    Private,
    Internal,
    Public,
    Other(String),
}

impl Visibility {
    pub fn as_str(&self) -> &str {
        match self {
            Visibility::Private => "private",
            Visibility::Internal => "internal",
            Visibility::Public => "public",
            Visibility::Other(s) => s,
        }
    }
}

impl From<&str> for Visibility {
    fn from(s: &str) -> Self {
        match s {
            "private" => Visibility::Private,
            "internal" => Visibility::Internal,
            "public" => Visibility::Public,
            other => Visibility::Other(other.to_owned()),
        }
    }
}

impl From<String> for Visibility {
    fn from(s: String) -> Self {
        Visibility::from(s.as_str())
    }
}

impl From<Visibility> for String {
    fn from(v: Visibility) -> Self {
        v.as_str().to_owned()
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the desired destination visibility is derived for each repository.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum VisibilityPolicy {
    /// Empty policy string: every project is private.
    AlwaysPrivate,
    /// `"auto"`: follow the source repository's own private flag.
    #[default]
    Auto,
    /// Any other literal, applied to every repository.
    Fixed(Visibility),
}

impl VisibilityPolicy {
    /// Parse the raw policy string (`REPO_VISIBILITY`).
    pub fn parse(raw: &str) -> Self {
        match raw {
            "" => VisibilityPolicy::AlwaysPrivate,
            "auto" => VisibilityPolicy::Auto,
            literal => VisibilityPolicy::Fixed(Visibility::from(literal)),
        }
    }

    /// Desired visibility for `repo` under this policy.
    pub fn desired_for(&self, repo: &RemoteRepository) -> Visibility {
        match self {
            VisibilityPolicy::AlwaysPrivate => Visibility::Private,
            VisibilityPolicy::Auto if repo.is_private => Visibility::Private,
            VisibilityPolicy::Auto => Visibility::Public,
            VisibilityPolicy::Fixed(v) => v.clone(),
        }
    }
}

impl fmt::Display for VisibilityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VisibilityPolicy::AlwaysPrivate => f.write_str("private (default)"),
            VisibilityPolicy::Auto => f.write_str("auto"),
            VisibilityPolicy::Fixed(v) => v.fmt(f),
        }
    }
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// A repository reported by the source host listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRepository {
    pub name: RepoName,
    pub clone_url: String,
    #[serde(rename = "private")]
    pub is_private: bool,
}

/// A project on the destination host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationProject {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub visibility: Visibility,
}

// ---------------------------------------------------------------------------
// Run state
// ---------------------------------------------------------------------------

/// Linear per-repository pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncStage {
    Listed,
    Mirrored,
    DestinationEnsured,
    VisibilityReconciled,
    Pushed,
    Done,
}

impl fmt::Display for SyncStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SyncStage::Listed => "listed",
            SyncStage::Mirrored => "mirror",
            SyncStage::DestinationEnsured => "destination",
            SyncStage::VisibilityReconciled => "visibility",
            SyncStage::Pushed => "push",
            SyncStage::Done => "done",
        };
        f.write_str(s)
    }
}

/// Result of syncing one repository. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Success,
    /// The mirror was pushed but a best-effort step (visibility) failed.
    PartialFailure { reason: String },
    /// The pipeline stopped at `stage`.
    Failed { stage: SyncStage, reason: String },
}

impl SyncOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SyncOutcome::Success)
    }
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncOutcome::Success => f.write_str("synced"),
            SyncOutcome::PartialFailure { reason } => write!(f, "partially synced: {reason}"),
            SyncOutcome::Failed { stage, reason } => write!(f, "failed at {stage}: {reason}"),
        }
    }
}

/// Aggregate of a whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub total: usize,
    pub synced: Vec<RepoName>,
    pub partial: Vec<(RepoName, String)>,
    pub failed: Vec<(RepoName, String)>,
    /// The loop was stopped early by an interrupt.
    pub interrupted: bool,
}

impl RunReport {
    pub fn record(&mut self, name: &RepoName, outcome: &SyncOutcome) {
        match outcome {
            SyncOutcome::Success => self.synced.push(name.clone()),
            SyncOutcome::PartialFailure { reason } => {
                self.partial.push((name.clone(), reason.clone()))
            }
            SyncOutcome::Failed { .. } => self.failed.push((name.clone(), outcome.to_string())),
        }
    }

    pub fn processed(&self) -> usize {
        self.synced.len() + self.partial.len() + self.failed.len()
    }

    /// `true` when every processed repository synced cleanly.
    pub fn all_succeeded(&self) -> bool {
        self.partial.is_empty() && self.failed.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
