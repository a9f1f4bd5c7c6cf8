//! Contact and business records that donations are attributed to.

use serde::{Deserialize, Serialize};

/// Which kind of donor a record is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DonorKind {
    Contact,
    Business,
}

impl DonorKind {
    pub fn table(&self) -> &'static str {
        match self {
            DonorKind::Contact => "contacts",
            DonorKind::Business => "businesses",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DonorKind::Contact => "Contact",
            DonorKind::Business => "Business",
        }
    }
}

/// A contact or business inside a workspace.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Donor {
    pub id: String,
    pub workspace_id: String,
    pub name: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Request body for creating a contact or business.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDonorRequest {
    pub name: String,
}
