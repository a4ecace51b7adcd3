//! Visibility reconciliation for an existing destination project.
//!
//! Best effort: a failed update is logged and reported back, never raised.
//! The comparison is re-evaluated from scratch every run, so a failure here is
//! retried by the next run.

use repomirror_core::{DestinationProject, Visibility};

use crate::gitlab::Destination;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileAction {
    Unchanged,
    Updated { from: Visibility, to: Visibility },
    UpdateFailed {
        from: Visibility,
        to: Visibility,
        reason: String,
    },
}

/// Issue one visibility update iff `project.visibility != desired`.
pub fn reconcile(
    destination: &dyn Destination,
    project: &DestinationProject,
    desired: &Visibility,
) -> ReconcileAction {
    if &project.visibility == desired {
        tracing::info!(
            project = %project.name,
            visibility = %desired,
            "project exists on GitLab with matching visibility"
        );
        return ReconcileAction::Unchanged;
    }

    tracing::info!(
        project = %project.name,
        current = %project.visibility,
        desired = %desired,
        "visibility differs, updating"
    );
    match destination.update_visibility(project.id, desired) {
        Ok(_) => ReconcileAction::Updated {
            from: project.visibility.clone(),
            to: desired.clone(),
        },
        Err(err) => {
            tracing::error!(project = %project.name, error = %err, "failed to update visibility");
            ReconcileAction::UpdateFailed {
                from: project.visibility.clone(),
                to: desired.clone(),
                reason: err.to_string(),
            }
        }
    }
}
