//! Active-workspace selection.
//!
//! [`resolve_current`] is the single resolution rule. The client store calls it
//! with every candidate it knows about; the per-request server loader only has
//! the selection cookie.

mod resolver;
mod server;

pub use resolver::*;
pub use server::*;

/// Name of both the durable client storage key and the selection cookie.
pub const CURRENT_WORKSPACE_KEY: &str = "currentWorkspaceId";
