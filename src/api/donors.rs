//! Contact and business endpoints.

use axum::{extract::State, Json};
use axum_extra::extract::cookie::CookieJar;

use super::{require_current_workspace, success, ApiResult};
use crate::auth::SessionUser;
use crate::errors::AppError;
use crate::models::{CreateDonorRequest, Donor, DonorKind};
use crate::AppState;

/// POST /api/contacts - Create a contact in the current workspace.
pub async fn create_contact(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
    jar: CookieJar,
    Json(request): Json<CreateDonorRequest>,
) -> ApiResult<Donor> {
    create_donor(&state, &user, &jar, DonorKind::Contact, &request).await
}

/// POST /api/businesses - Create a business in the current workspace.
pub async fn create_business(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
    jar: CookieJar,
    Json(request): Json<CreateDonorRequest>,
) -> ApiResult<Donor> {
    create_donor(&state, &user, &jar, DonorKind::Business, &request).await
}

async fn create_donor(
    state: &AppState,
    user: &crate::models::User,
    jar: &CookieJar,
    kind: DonorKind,
    request: &CreateDonorRequest,
) -> ApiResult<Donor> {
    if request.name.trim().is_empty() {
        return Err(AppError::Validation(format!("{} name is required", kind.label())));
    }

    let workspace = require_current_workspace(state, user, jar).await?;
    success(state.repo.create_donor(kind, &workspace.id, request).await?)
}
