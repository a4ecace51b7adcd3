pub mod list;
pub mod logs;
pub mod sync;

use anyhow::{Context, Result};
use repomirror_core::Settings;

/// Settings from the environment; a missing credential aborts the command.
pub fn load_settings() -> Result<Settings> {
    Settings::from_env().context("invalid configuration")
}
