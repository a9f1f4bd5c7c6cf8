//! Workspace membership models.

use serde::{Deserialize, Serialize};

/// Role a user holds inside a workspace.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Role {
    #[serde(rename = "Super Admin")]
    SuperAdmin,
    #[serde(rename = "Admin")]
    Admin,
    #[serde(rename = "Basic User")]
    BasicUser,
    #[serde(rename = "Volunteer")]
    Volunteer,
}

impl Role {
    /// Every role label, in the order the people page lists them.
    pub const ALL: [Role; 4] = [Role::SuperAdmin, Role::Admin, Role::BasicUser, Role::Volunteer];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "Super Admin",
            Role::Admin => "Admin",
            Role::BasicUser => "Basic User",
            Role::Volunteer => "Volunteer",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Super Admin" => Some(Role::SuperAdmin),
            "Admin" => Some(Role::Admin),
            "Basic User" => Some(Role::BasicUser),
            "Volunteer" => Some(Role::Volunteer),
            _ => None,
        }
    }

    /// Labels for role pickers.
    pub fn labels() -> Vec<&'static str> {
        Self::ALL.iter().map(Role::as_str).collect()
    }
}

/// A raw (user, workspace, role) row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub id: String,
    pub user_id: String,
    pub workspace_id: String,
    pub role: Role,
    pub created_at: String,
    pub updated_at: String,
}

/// Public profile fields shown next to a member.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberUser {
    pub id: String,
    pub email: String,
    pub username: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// Membership joined with the member's profile, as listed on the people page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceMember {
    pub id: String,
    pub user_id: String,
    pub workspace_id: String,
    pub role: Role,
    pub created_at: String,
    pub updated_at: String,
    pub user: MemberUser,
}

/// An invitation waiting for the invitee to sign up.
///
/// Invites only ever name existing users and take effect immediately, so the
/// people page always reports an empty list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingInvite {
    pub id: String,
    pub email: String,
    pub role: Role,
    pub created_at: String,
}

/// Form body for inviting a user by email.
#[derive(Debug, Clone, Deserialize)]
pub struct InviteUserForm {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

/// Form body for removing a member.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveUserForm {
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Form body for changing a member's role.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRoleForm {
    #[serde(default)]
    pub user_workspace_id: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

/// Outcome of a people-page form action.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResult {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_added: Option<bool>,
}

impl ActionResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            user_added: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            user_added: None,
        }
    }
}
