//! Root layout loader and route guards.

use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;

use super::{Session, APP_PATH, LOGIN_PATH};
use crate::api::selection_cookie;
use crate::auth::MaybeUser;
use crate::models::{User, Workspace};
use crate::workspace::load_selection_or_empty;
use crate::AppState;

/// Data every page receives from the root layout.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutData {
    pub session: Option<Session>,
    pub user: Option<User>,
    pub workspaces: Vec<Workspace>,
    pub current_workspace: Option<Workspace>,
}

/// Data for pages that only need to know who is signed in.
#[derive(Debug, Serialize)]
pub struct GuardedPageData {
    pub session: Session,
    pub user: User,
}

/// GET /pages/layout - Session, user and the workspace resolved for this request.
pub async fn load_layout(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    jar: CookieJar,
) -> Json<LayoutData> {
    let Some(user) = user else {
        return Json(LayoutData {
            session: None,
            user: None,
            workspaces: Vec::new(),
            current_workspace: None,
        });
    };

    let cookie = selection_cookie(&jar);
    let selection = load_selection_or_empty(&state.repo, &user.id, cookie.as_deref()).await;

    Json(LayoutData {
        session: Some(Session::active()),
        user: Some(user),
        workspaces: selection.workspaces,
        current_workspace: selection.current_workspace,
    })
}

fn guarded(user: Option<User>) -> Response {
    match user {
        Some(user) => Json(GuardedPageData {
            session: Session::active(),
            user,
        })
        .into_response(),
        None => Redirect::to(LOGIN_PATH).into_response(),
    }
}

/// GET /pages/app - Main application shell.
pub async fn load_app(MaybeUser(user): MaybeUser) -> Response {
    guarded(user)
}

/// GET /pages/engage - Engagement section; guards everything beneath it.
pub async fn load_engage(MaybeUser(user): MaybeUser) -> Response {
    guarded(user)
}

/// GET /pages/onboarding - First-run onboarding flow.
pub async fn load_onboarding(MaybeUser(user): MaybeUser) -> Response {
    guarded(user)
}

/// GET /pages/login - Signed-in visitors go straight to the app.
pub async fn load_login(MaybeUser(user): MaybeUser) -> Response {
    match user {
        Some(_) => Redirect::to(APP_PATH).into_response(),
        None => Json(serde_json::json!({})).into_response(),
    }
}
