//! Run settings sourced from the environment.
//!
//! # Variables
//!
//! | variable | default |
//! |---|---|
//! | `GITHUB_USER`, `GITHUB_TOKEN` | required |
//! | `GITLAB_USER`, `GITLAB_TOKEN` | required |
//! | `GITLAB_GROUP` | unset (push into the user namespace) |
//! | `REPO_VISIBILITY` | `auto` |
//! | `BACKUP_DIR` | `./repos-backup` |
//! | `LOGS_DIR` | `./Logs` |
//! | `GITLAB_URL` | `https://gitlab.com` |
//! | `GITHUB_API_URL` | `https://api.github.com` |
//! | `PER_PAGE` | `100` |
//! | `SLEEP_BETWEEN_API_MS` | `500` |
//!
//! # API pattern
//!
//! [`Settings::from_lookup`] takes the variable source as a closure; tests pass
//! a map and never touch the process environment. [`Settings::from_env`] is the
//! convenience wrapper over `std::env::var`.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;
use crate::types::VisibilityPolicy;

pub const DEFAULT_BACKUP_DIR: &str = "./repos-backup";
pub const DEFAULT_LOGS_DIR: &str = "./Logs";
pub const DEFAULT_GITLAB_URL: &str = "https://gitlab.com";
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
pub const DEFAULT_PER_PAGE: u32 = 100;
pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_millis(500);

/// An API token. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(***)")
    }
}

/// Everything one run needs. Constructed once, then borrowed by every client.
#[derive(Debug, Clone)]
pub struct Settings {
    pub github_user: String,
    pub github_token: Token,
    pub gitlab_user: String,
    pub gitlab_token: Token,
    pub gitlab_group: Option<String>,
    pub visibility: VisibilityPolicy,
    pub backup_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub gitlab_url: String,
    pub github_api_url: String,
    pub per_page: u32,
    pub page_delay: Duration,
}

impl Settings {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` as the variable source.
    ///
    /// Credentials are checked first so a missing token is reported before any
    /// other validation.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |var: &'static str| -> Result<String, ConfigError> {
            lookup(var)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(var))
        };
        let optional = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let github_token = Token::new(required("GITHUB_TOKEN")?);
        let gitlab_token = Token::new(required("GITLAB_TOKEN")?);
        let gitlab_user = required("GITLAB_USER")?;
        let github_user = required("GITHUB_USER")?;

        // An explicitly empty REPO_VISIBILITY means "always private", so this
        // one must not go through `optional`.
        let visibility = match lookup("REPO_VISIBILITY") {
            Some(raw) => VisibilityPolicy::parse(raw.trim()),
            None => VisibilityPolicy::Auto,
        };

        let per_page = match optional("PER_PAGE") {
            Some(raw) => parse_per_page(&raw)?,
            None => DEFAULT_PER_PAGE,
        };
        let page_delay = match optional("SLEEP_BETWEEN_API_MS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|e| ConfigError::Invalid {
                    var: "SLEEP_BETWEEN_API_MS",
                    value: raw.clone(),
                    reason: e.to_string(),
                })?,
            None => DEFAULT_PAGE_DELAY,
        };

        Ok(Self {
            github_user,
            github_token,
            gitlab_user,
            gitlab_token,
            gitlab_group: optional("GITLAB_GROUP"),
            visibility,
            backup_dir: optional("BACKUP_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_BACKUP_DIR)),
            logs_dir: optional("LOGS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOGS_DIR)),
            gitlab_url: trim_base(optional("GITLAB_URL"), DEFAULT_GITLAB_URL),
            github_api_url: trim_base(optional("GITHUB_API_URL"), DEFAULT_GITHUB_API_URL),
            per_page,
            page_delay,
        })
    }

    /// Namespace projects live under: the group when configured, else the user.
    pub fn target_namespace(&self) -> &str {
        self.gitlab_group.as_deref().unwrap_or(&self.gitlab_user)
    }
}

fn parse_per_page(raw: &str) -> Result<u32, ConfigError> {
    let invalid = |reason: String| ConfigError::Invalid {
        var: "PER_PAGE",
        value: raw.to_owned(),
        reason,
    };
    let n = raw.trim().parse::<u32>().map_err(|e| invalid(e.to_string()))?;
    if !(1..=100).contains(&n) {
        return Err(invalid("must be between 1 and 100".into()));
    }
    Ok(n)
}

fn trim_base(value: Option<String>, default: &str) -> String {
    value
        .as_deref()
        .unwrap_or(default)
        .trim()
        .trim_end_matches('/')
        .to_owned()
}
