//! Client-side workspace state.
//!
//! [`WorkspaceStore`] holds the user's workspaces and the one currently
//! selected. Every synchronous operation is a single atomic replacement of
//! the state inside a `watch` channel, so subscribers never observe a half
//! applied change. Selection precedence comes from
//! [`resolve_current`](crate::workspace::resolve_current), the same rule the
//! server uses.

mod storage;

pub use storage::*;

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::watch;

use crate::client::ClientError;
use crate::models::Workspace;
use crate::workspace::{resolve_current, SelectionHints};

/// Snapshot of the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkspaceState {
    pub current_workspace: Option<Workspace>,
    pub workspaces: Vec<Workspace>,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl WorkspaceState {
    pub fn current_id(&self) -> Option<&str> {
        self.current_workspace.as_ref().map(|w| w.id.as_str())
    }
}

/// Fetches the acting user's workspaces.
#[async_trait]
pub trait WorkspaceSource: Send + Sync {
    async fn fetch_workspaces(&self) -> Result<Vec<Workspace>, ClientError>;
}

/// Metadata changes applied to the current workspace.
#[derive(Debug, Clone, Default)]
pub struct WorkspacePatch {
    pub name: Option<String>,
    pub logo: Option<String>,
    pub updated_at: Option<String>,
}

impl WorkspacePatch {
    fn apply(&self, workspace: &mut Workspace) {
        if let Some(name) = &self.name {
            workspace.name = name.clone();
        }
        if let Some(logo) = &self.logo {
            workspace.logo = Some(logo.clone());
        }
        if let Some(updated_at) = &self.updated_at {
            workspace.updated_at = updated_at.clone();
        }
    }
}

pub struct WorkspaceStore {
    state: watch::Sender<WorkspaceState>,
    storage: Arc<dyn SelectionStorage>,
    source: Arc<dyn WorkspaceSource>,
    // Held across "read storage, replace state, write storage" so selections
    // persist in the order they were applied. Storage I/O never runs under
    // the watch lock.
    selection: Mutex<()>,
}

impl WorkspaceStore {
    pub fn new(storage: Arc<dyn SelectionStorage>, source: Arc<dyn WorkspaceSource>) -> Self {
        Self {
            state: watch::Sender::new(WorkspaceState::default()),
            storage,
            source,
            selection: Mutex::new(()),
        }
    }

    fn lock_selection(&self) -> std::sync::MutexGuard<'_, ()> {
        self.selection.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// A copy of the current state.
    pub fn state(&self) -> WorkspaceState {
        self.state.borrow().clone()
    }

    /// Receive every state replacement from now on.
    pub fn subscribe(&self) -> watch::Receiver<WorkspaceState> {
        self.state.subscribe()
    }

    /// Replace the list and resolve the current workspace.
    ///
    /// Precedence is `explicit_id`, then the persisted id, then whatever was
    /// current before, then the first workspace. The result is persisted.
    pub fn set_workspaces(
        &self,
        workspaces: Vec<Workspace>,
        explicit_id: Option<&str>,
    ) -> Option<Workspace> {
        let _guard = self.lock_selection();
        let persisted = self.storage.get();
        let mut selected = None;
        self.state.send_modify(|state| {
            let current = resolve_current(
                &workspaces,
                SelectionHints::default()
                    .explicit(explicit_id)
                    .persisted(persisted.as_deref())
                    .prior(state.current_id()),
            )
            .cloned();

            tracing::debug!(
                count = workspaces.len(),
                current = ?current.as_ref().map(|w| &w.id),
                "Workspaces replaced"
            );

            state.workspaces = workspaces;
            state.current_workspace = current.clone();
            state.is_loading = false;
            selected = current;
        });

        if let Some(ws) = &selected {
            self.storage.set(&ws.id);
        }
        selected
    }

    /// Make a workspace current.
    ///
    /// With `data` the record is inserted into (or replaces its entry in)
    /// the list. Without it the id must already be listed; an unknown id
    /// leaves the state untouched and returns `None`.
    pub fn set_current_workspace(
        &self,
        workspace_id: &str,
        data: Option<Workspace>,
    ) -> Option<Workspace> {
        let _guard = self.lock_selection();
        let mut selected = None;
        self.state.send_if_modified(|state| {
            let workspace = match data {
                Some(mut ws) => {
                    ws.id = workspace_id.to_string();
                    match state.workspaces.iter_mut().find(|w| w.id == ws.id) {
                        Some(entry) => *entry = ws.clone(),
                        None => state.workspaces.push(ws.clone()),
                    }
                    ws
                }
                None => match state.workspaces.iter().find(|w| w.id == workspace_id) {
                    Some(ws) => ws.clone(),
                    None => {
                        tracing::debug!(workspace_id, "Ignoring selection of unknown workspace");
                        return false;
                    }
                },
            };

            tracing::debug!(workspace_id, "Workspace selected");
            state.current_workspace = Some(workspace.clone());
            selected = Some(workspace);
            true
        });

        if let Some(ws) = &selected {
            self.storage.set(&ws.id);
        }
        selected
    }

    pub fn set_loading(&self, is_loading: bool) {
        self.state.send_modify(|state| state.is_loading = is_loading);
    }

    pub fn set_error(&self, error: Option<String>) {
        self.state.send_modify(|state| state.error = error);
    }

    /// Forget the persisted selection and return to the initial state.
    pub fn reset(&self) {
        let _guard = self.lock_selection();
        self.state.send_replace(WorkspaceState::default());
        self.storage.remove();
    }

    /// Apply `patch` to the current workspace and its list entry.
    pub fn update_current_workspace(&self, patch: &WorkspacePatch) -> Option<Workspace> {
        let mut updated = None;
        self.state.send_if_modified(|state| {
            let Some(current) = state.current_workspace.as_mut() else {
                return false;
            };
            patch.apply(current);
            let current = current.clone();

            if let Some(entry) = state.workspaces.iter_mut().find(|w| w.id == current.id) {
                *entry = current.clone();
            }
            updated = Some(current);
            true
        });
        updated
    }

    /// Reload the list from the source.
    ///
    /// Resolution happens against the state as it is when the fetch
    /// completes, so a selection made meanwhile is kept. Overlapping
    /// refreshes are not cancelled; each applies when it finishes.
    pub async fn refresh(&self) -> Result<(), ClientError> {
        self.state.send_modify(|state| {
            state.is_loading = true;
            state.error = None;
        });

        match self.source.fetch_workspaces().await {
            Ok(workspaces) => {
                self.set_workspaces(workspaces, None);
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Failed to refresh workspaces: {}", e);
                let message = e.to_string();
                self.state.send_modify(|state| {
                    state.is_loading = false;
                    state.error = Some(message);
                });
                Err(e)
            }
        }
    }
}
