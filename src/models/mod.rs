//! Data models for the Engage application.
//!
//! Field names serialize in camelCase to match the web frontend's types.

mod donation;
mod donor;
mod member;
mod user;
mod workspace;

pub use donation::*;
pub use donor::*;
pub use member::*;
pub use user::*;
pub use workspace::*;
