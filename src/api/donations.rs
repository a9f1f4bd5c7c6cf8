//! Donation API endpoints.
//!
//! Donations are only visible through a workspace the caller belongs to;
//! anything else reads as "not found".

use axum::{
    extract::{Path, Query, State},
    Json,
};
use axum_extra::extract::cookie::CookieJar;

use super::{require_current_workspace, success, ApiResult};
use crate::auth::SessionUser;
use crate::db::DonationScope;
use crate::errors::AppError;
use crate::models::{
    CreateDonationRequest, DeleteResult, Donation, DonationListParams, DonationListQuery,
    DonationOwner, DonationPage, Donor, DonorKind, UpdateDonationRequest, User,
};
use crate::AppState;

fn list_params(query: DonationListQuery) -> Result<DonationListParams, AppError> {
    query.into_params().map_err(AppError::Validation)
}

/// Load a contact or business the caller can see.
async fn visible_donor(
    state: &AppState,
    user: &User,
    kind: DonorKind,
    id: &str,
) -> Result<Donor, AppError> {
    let not_found = || AppError::NotFound(format!("{} {} not found", kind.label(), id));

    let donor = state.repo.get_donor(kind, id).await?.ok_or_else(not_found)?;
    if state
        .repo
        .get_membership(&user.id, &donor.workspace_id)
        .await?
        .is_none()
    {
        return Err(not_found());
    }
    Ok(donor)
}

/// Load a donation the caller can see.
async fn visible_donation(state: &AppState, user: &User, id: &str) -> Result<Donation, AppError> {
    let not_found = || AppError::NotFound(format!("Donation {} not found", id));

    let donation = state.repo.get_donation(id).await?.ok_or_else(not_found)?;
    if state
        .repo
        .get_membership(&user.id, &donation.workspace_id)
        .await?
        .is_none()
    {
        return Err(not_found());
    }
    Ok(donation)
}

async fn list_for_donor(
    state: &AppState,
    user: &User,
    kind: DonorKind,
    id: &str,
    query: DonationListQuery,
) -> ApiResult<DonationPage> {
    let params = list_params(query)?;
    let donor = visible_donor(state, user, kind, id).await?;
    let scope = match kind {
        DonorKind::Contact => DonationScope::Contact(donor.id),
        DonorKind::Business => DonationScope::Business(donor.id),
    };

    let page = state.repo.list_donations(&scope, &params).await?;
    tracing::debug!(donor_id = id, count = page.donations.len(), "Listed donor donations");
    success(page)
}

async fn create_for_donor(
    state: &AppState,
    user: &User,
    kind: DonorKind,
    id: &str,
    request: CreateDonationRequest,
) -> ApiResult<Donation> {
    request.validate().map_err(AppError::Validation)?;
    let donor = visible_donor(state, user, kind, id).await?;
    let owner = match kind {
        DonorKind::Contact => DonationOwner::Contact(donor.id),
        DonorKind::Business => DonationOwner::Business(donor.id),
    };

    let donation = state
        .repo
        .create_donation(&donor.workspace_id, &owner, &request)
        .await?;
    tracing::info!(donation_id = %donation.id, workspace_id = %donation.workspace_id, "Donation created");
    success(donation)
}

/// GET /api/contacts/:id/donations - List a contact's donations.
pub async fn list_contact_donations(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
    Path(id): Path<String>,
    Query(query): Query<DonationListQuery>,
) -> ApiResult<DonationPage> {
    list_for_donor(&state, &user, DonorKind::Contact, &id, query).await
}

/// GET /api/businesses/:id/donations - List a business's donations.
pub async fn list_business_donations(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
    Path(id): Path<String>,
    Query(query): Query<DonationListQuery>,
) -> ApiResult<DonationPage> {
    list_for_donor(&state, &user, DonorKind::Business, &id, query).await
}

/// POST /api/contacts/:id/donations - Record a donation from a contact.
pub async fn create_contact_donation(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
    Path(id): Path<String>,
    Json(request): Json<CreateDonationRequest>,
) -> ApiResult<Donation> {
    create_for_donor(&state, &user, DonorKind::Contact, &id, request).await
}

/// POST /api/businesses/:id/donations - Record a donation from a business.
pub async fn create_business_donation(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
    Path(id): Path<String>,
    Json(request): Json<CreateDonationRequest>,
) -> ApiResult<Donation> {
    create_for_donor(&state, &user, DonorKind::Business, &id, request).await
}

/// GET /api/donations - Page through the current workspace's donations.
pub async fn list_donations(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
    jar: CookieJar,
    Query(query): Query<DonationListQuery>,
) -> ApiResult<DonationPage> {
    let params = list_params(query)?;
    let workspace = require_current_workspace(&state, &user, &jar).await?;

    success(
        state
            .repo
            .list_donations(&DonationScope::Workspace(workspace.id), &params)
            .await?,
    )
}

/// PUT /api/donations/:id - Change a donation's amount and/or status.
pub async fn update_donation(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
    Path(id): Path<String>,
    Json(request): Json<UpdateDonationRequest>,
) -> ApiResult<Donation> {
    request.validate().map_err(AppError::Validation)?;
    visible_donation(&state, &user, &id).await?;

    success(state.repo.update_donation(&id, &request).await?)
}

/// DELETE /api/donations/:id - Delete a donation.
pub async fn delete_donation(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
    Path(id): Path<String>,
) -> ApiResult<DeleteResult> {
    visible_donation(&state, &user, &id).await?;
    state.repo.delete_donation(&id).await?;

    tracing::info!(donation_id = %id, "Donation deleted");
    success(DeleteResult { success: true })
}
