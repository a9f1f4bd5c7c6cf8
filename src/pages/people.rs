//! Workspace people settings page: member list plus invite, remove and
//! role-update actions.

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
    Form, Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};

use super::LOGIN_PATH;
use crate::api::{require_current_workspace, selection_cookie};
use crate::auth::MaybeUser;
use crate::errors::AppError;
use crate::models::{
    ActionResult, InviteUserForm, PendingInvite, RemoveUserForm, Role, UpdateRoleForm, User,
    Workspace, WorkspaceMember,
};
use crate::workspace::load_selection_or_empty;
use crate::AppState;

/// Optional fallback when no workspace resolves for the request.
#[derive(Debug, Deserialize)]
pub struct PeopleQuery {
    #[serde(default)]
    pub workspace: Option<String>,
}

/// Data rendered by the people page.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeoplePageData {
    pub members: Vec<WorkspaceMember>,
    pub workspace: Option<Workspace>,
    pub workspace_roles: Vec<&'static str>,
    pub pending_invites: Vec<PendingInvite>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub no_workspace_selected: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub no_workspace_access: bool,
}

impl PeoplePageData {
    fn empty() -> Self {
        Self {
            members: Vec::new(),
            workspace: None,
            workspace_roles: Role::labels(),
            pending_invites: Vec::new(),
            no_workspace_selected: false,
            no_workspace_access: false,
        }
    }
}

/// GET /pages/settings/workspace/people
pub async fn load_people(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    jar: CookieJar,
    Query(query): Query<PeopleQuery>,
) -> Response {
    let Some(user) = user else {
        return Redirect::to(LOGIN_PATH).into_response();
    };

    let cookie = selection_cookie(&jar);
    let selection = load_selection_or_empty(&state.repo, &user.id, cookie.as_deref()).await;
    let workspace_id = selection
        .current_workspace
        .map(|w| w.id)
        .or(query.workspace.filter(|id| !id.is_empty()));

    let Some(workspace_id) = workspace_id else {
        tracing::warn!(user_id = %user.id, "No workspace resolved for people page");
        return Json(PeoplePageData {
            no_workspace_selected: true,
            ..PeoplePageData::empty()
        })
        .into_response();
    };

    let has_access = match state.repo.get_membership(&user.id, &workspace_id).await {
        Ok(membership) => membership.is_some(),
        Err(e) => {
            tracing::error!("Error checking workspace access: {}", e);
            false
        }
    };
    if !has_access {
        tracing::warn!(user_id = %user.id, workspace_id = %workspace_id, "User has no access to workspace");
        return Json(PeoplePageData {
            no_workspace_access: true,
            ..PeoplePageData::empty()
        })
        .into_response();
    }

    let members = state
        .repo
        .list_members(&workspace_id)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Error fetching workspace members: {}", e);
            Vec::new()
        });
    let workspace = state
        .repo
        .get_workspace(&workspace_id)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Error fetching workspace details: {}", e);
            None
        });

    tracing::debug!(workspace_id = %workspace_id, count = members.len(), "Loaded workspace members");
    Json(PeoplePageData {
        members,
        workspace,
        ..PeoplePageData::empty()
    })
    .into_response()
}

fn require_user(user: Option<User>, action: &str) -> Result<User, AppError> {
    user.ok_or_else(|| AppError::Unauthorized(format!("You must be logged in to {}", action)))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_role(raw: &str) -> Result<Role, AppError> {
    Role::parse(raw).ok_or_else(|| AppError::Validation(format!("Unknown role '{}'", raw)))
}

/// POST /pages/settings/workspace/people/invite - Add an existing user by email.
pub async fn invite_user(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    jar: CookieJar,
    Form(form): Form<InviteUserForm>,
) -> Result<Json<ActionResult>, AppError> {
    let user = require_user(user, "invite users")?;
    let workspace = require_current_workspace(&state, &user, &jar).await?;

    let email = non_empty(form.email).map(|e| e.to_lowercase());
    let (Some(email), Some(role)) = (email, non_empty(form.role)) else {
        return Err(AppError::BadRequest("Email and role are required".to_string()));
    };
    let role = parse_role(&role)?;

    let Some(invitee) = state.repo.find_user_by_email(&email).await? else {
        return Ok(Json(ActionResult::failed(
            "User not found. Please ask them to sign up first.",
        )));
    };

    if state
        .repo
        .get_membership(&invitee.id, &workspace.id)
        .await?
        .is_some()
    {
        return Err(AppError::BadRequest(
            "This user is already a member of this workspace".to_string(),
        ));
    }

    state.repo.add_member(&invitee.id, &workspace.id, role).await?;
    tracing::info!(
        workspace_id = %workspace.id,
        invitee_id = %invitee.id,
        role = role.as_str(),
        "User added to workspace"
    );

    Ok(Json(ActionResult {
        user_added: Some(true),
        ..ActionResult::ok("User added to workspace")
    }))
}

/// POST /pages/settings/workspace/people/remove - Remove a member.
pub async fn remove_user(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    jar: CookieJar,
    Form(form): Form<RemoveUserForm>,
) -> Result<Json<ActionResult>, AppError> {
    let user = require_user(user, "remove users")?;
    let workspace = require_current_workspace(&state, &user, &jar).await?;

    let Some(target_id) = non_empty(form.user_id) else {
        return Err(AppError::BadRequest("User ID is required".to_string()));
    };
    if target_id == user.id {
        return Err(AppError::BadRequest(
            "You cannot remove yourself from the workspace".to_string(),
        ));
    }

    let membership = state
        .repo
        .get_membership(&target_id, &workspace.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found in this workspace".to_string()))?;

    state.repo.delete_membership(&membership.id).await?;
    tracing::info!(workspace_id = %workspace.id, user_id = %target_id, "User removed from workspace");

    Ok(Json(ActionResult::ok("User removed from workspace")))
}

/// POST /pages/settings/workspace/people/update-role - Change a member's role.
pub async fn update_role(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    jar: CookieJar,
    Form(form): Form<UpdateRoleForm>,
) -> Result<Json<ActionResult>, AppError> {
    let user = require_user(user, "update roles")?;
    let workspace = require_current_workspace(&state, &user, &jar).await?;

    let (Some(membership_id), Some(role)) = (non_empty(form.user_workspace_id), non_empty(form.role))
    else {
        return Err(AppError::BadRequest(
            "User workspace ID and role are required".to_string(),
        ));
    };
    let role = parse_role(&role)?;

    let membership = state
        .repo
        .get_membership_by_id(&membership_id, &workspace.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found in this workspace".to_string()))?;

    if membership.user_id == user.id && membership.role == Role::SuperAdmin && role != Role::SuperAdmin
    {
        return Err(AppError::BadRequest(
            "You cannot downgrade your own Super Admin role".to_string(),
        ));
    }

    state.repo.update_member_role(&membership.id, role).await?;
    tracing::info!(
        workspace_id = %workspace.id,
        membership_id = %membership.id,
        role = role.as_str(),
        "Role updated"
    );

    Ok(Json(ActionResult::ok("Role updated")))
}
