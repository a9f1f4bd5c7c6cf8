//! Workspace API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use super::{success, ApiResponse, ApiResult};
use crate::auth::SessionUser;
use crate::errors::AppError;
use crate::models::{
    CreateWorkspaceRequest, SelectWorkspaceRequest, UpdateWorkspaceRequest, User, Workspace,
    WorkspaceSelection,
};
use crate::workspace::{load_selection, CURRENT_WORKSPACE_KEY};
use crate::AppState;

/// Read the workspace selection cookie.
pub fn selection_cookie(jar: &CookieJar) -> Option<String> {
    jar.get(CURRENT_WORKSPACE_KEY)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}

/// Resolve the caller's current workspace for this request, or fail with 400
/// when they have none.
pub async fn require_current_workspace(
    state: &AppState,
    user: &User,
    jar: &CookieJar,
) -> Result<Workspace, AppError> {
    let cookie = selection_cookie(jar);
    load_selection(&state.repo, &user.id, cookie.as_deref())
        .await?
        .current_workspace
        .ok_or_else(|| AppError::BadRequest("No workspace selected".to_string()))
}

/// GET /api/workspaces - List the caller's workspaces in membership order.
pub async fn list_workspaces(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
) -> ApiResult<Vec<Workspace>> {
    success(state.repo.list_user_workspaces(&user.id).await?)
}

/// POST /api/workspaces - Create a workspace owned by the caller.
pub async fn create_workspace(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
    Json(request): Json<CreateWorkspaceRequest>,
) -> ApiResult<Workspace> {
    if request.name.trim().is_empty() {
        return Err(AppError::Validation("Workspace name is required".to_string()));
    }

    let workspace = state.repo.create_workspace(&user.id, &request).await?;
    tracing::info!(workspace_id = %workspace.id, user_id = %user.id, "Workspace created");
    success(workspace)
}

/// PUT /api/workspaces/:id - Update a workspace's name or logo.
pub async fn update_workspace(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
    Path(id): Path<String>,
    Json(request): Json<UpdateWorkspaceRequest>,
) -> ApiResult<Workspace> {
    if matches!(&request.name, Some(name) if name.trim().is_empty()) {
        return Err(AppError::Validation("Workspace name cannot be empty".to_string()));
    }

    let membership = state
        .repo
        .get_user_workspace(&user.id, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Workspace {} not found", id)))?;

    let mut workspace = state.repo.update_workspace(&id, &request).await?;
    workspace.role = membership.role;
    success(workspace)
}

/// GET /api/workspaces/current - The caller's workspaces and the one this
/// request resolves as current.
pub async fn get_current_workspace(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
    jar: CookieJar,
) -> ApiResult<WorkspaceSelection> {
    let cookie = selection_cookie(&jar);
    success(load_selection(&state.repo, &user.id, cookie.as_deref()).await?)
}

/// PUT /api/workspaces/current - Select the active workspace and remember it
/// in the selection cookie.
pub async fn select_workspace(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
    jar: CookieJar,
    Json(request): Json<SelectWorkspaceRequest>,
) -> Result<(CookieJar, ApiResponse<Workspace>), AppError> {
    let workspace = state
        .repo
        .get_user_workspace(&user.id, &request.workspace_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("Workspace {} not found", request.workspace_id))
        })?;

    let cookie = Cookie::build((CURRENT_WORKSPACE_KEY, workspace.id.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config.secure_cookies);

    tracing::debug!(workspace_id = %workspace.id, user_id = %user.id, "Workspace selected");
    Ok((jar.add(cookie), ApiResponse::new(workspace)))
}
