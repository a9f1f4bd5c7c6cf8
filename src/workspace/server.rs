//! Per-request workspace resolution for page loaders and API handlers.
//!
//! Requests share nothing: each one reads the caller's memberships and the
//! selection cookie and resolves from scratch.

use super::{resolve_current, SelectionHints};
use crate::db::Repository;
use crate::errors::AppError;
use crate::models::{Workspace, WorkspaceSelection};

/// Server-side resolution: the cookie, then the first membership.
pub fn resolve_for_request<'w>(
    workspaces: &'w [Workspace],
    cookie_id: Option<&str>,
) -> Option<&'w Workspace> {
    resolve_current(workspaces, SelectionHints::default().persisted(cookie_id))
}

/// Load the caller's workspaces and resolve the current one.
pub async fn load_selection(
    repo: &Repository,
    user_id: &str,
    cookie_id: Option<&str>,
) -> Result<WorkspaceSelection, AppError> {
    let workspaces = repo.list_user_workspaces(user_id).await?;
    let current_workspace = resolve_for_request(&workspaces, cookie_id).cloned();

    tracing::debug!(
        user_id,
        cookie = cookie_id.unwrap_or_default(),
        current = current_workspace.as_ref().map(|w| w.id.as_str()).unwrap_or_default(),
        "Resolved workspace for request"
    );

    Ok(WorkspaceSelection {
        workspaces,
        current_workspace,
    })
}

/// Like [`load_selection`], but a lookup failure degrades to "no workspaces"
/// so the page still renders.
pub async fn load_selection_or_empty(
    repo: &Repository,
    user_id: &str,
    cookie_id: Option<&str>,
) -> WorkspaceSelection {
    match load_selection(repo, user_id, cookie_id).await {
        Ok(selection) => selection,
        Err(e) => {
            tracing::error!("Error fetching workspaces: {}", e);
            WorkspaceSelection {
                workspaces: Vec::new(),
                current_workspace: None,
            }
        }
    }
}
