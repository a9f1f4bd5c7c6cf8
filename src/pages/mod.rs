//! Server-side page loaders and form actions.
//!
//! Loaders return the JSON data a page renders from; guarded pages redirect
//! signed-out visitors to `/login` with `303 See Other`.

mod layout;
mod people;

pub use layout::*;
pub use people::*;

use serde::Serialize;

/// Where signed-out visitors are sent.
pub const LOGIN_PATH: &str = "/login";
/// Where signed-in visitors to the login page are sent.
pub const APP_PATH: &str = "/app";

/// Session marker handed to pages.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub active: bool,
}

impl Session {
    pub fn active() -> Self {
        Self { active: true }
    }
}
