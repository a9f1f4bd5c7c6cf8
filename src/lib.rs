//! Engage backend
//!
//! Workspace membership and donation tracking: a REST API and page loaders
//! backed by SQLite, plus the client-side workspace store and services that
//! talk to them.

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod pages;
pub mod store;
pub mod workspace;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use db::Repository;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub config: Arc<Config>,
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Clone PSK for the auth layer
    let psk = state.config.api_psk.clone();

    // API routes
    let api_routes = Router::new()
        // Workspaces
        .route(
            "/workspaces",
            get(api::list_workspaces).post(api::create_workspace),
        )
        .route(
            "/workspaces/current",
            get(api::get_current_workspace).put(api::select_workspace),
        )
        .route("/workspaces/{id}", put(api::update_workspace))
        // Contacts and businesses
        .route("/contacts", post(api::create_contact))
        .route("/businesses", post(api::create_business))
        .route(
            "/contacts/{id}/donations",
            get(api::list_contact_donations).post(api::create_contact_donation),
        )
        .route(
            "/businesses/{id}/donations",
            get(api::list_business_donations).post(api::create_business_donation),
        )
        // Donations
        .route("/donations", get(api::list_donations))
        .route(
            "/donations/{id}",
            put(api::update_donation).delete(api::delete_donation),
        );

    // Page loaders and form actions
    let page_routes = Router::new()
        .route("/layout", get(pages::load_layout))
        .route("/app", get(pages::load_app))
        .route("/engage", get(pages::load_engage))
        .route("/onboarding", get(pages::load_onboarding))
        .route("/login", get(pages::load_login))
        .route("/settings/workspace/people", get(pages::load_people))
        .route("/settings/workspace/people/invite", post(pages::invite_user))
        .route("/settings/workspace/people/remove", post(pages::remove_user))
        .route(
            "/settings/workspace/people/update-role",
            post(pages::update_role),
        );

    // Apply PSK auth middleware; only the trusted auth proxy may forward user ids
    let protected = Router::new()
        .nest("/api", api_routes)
        .nest("/pages", page_routes)
        .layer(middleware::from_fn(move |req, next| {
            auth::psk_auth_layer(psk.clone(), req, next)
        }));

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .merge(protected)
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests;
