//! Donation model and list query parameters.

use serde::{Deserialize, Serialize};

/// Default number of donations per page.
pub const DEFAULT_PAGE_SIZE: u32 = 20;
/// Largest page a caller may request.
pub const MAX_PAGE_SIZE: u32 = 100;

/// A donation from exactly one contact or business.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Donation {
    pub id: String,
    pub workspace_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_id: Option<String>,
    pub amount: f64,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_type: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Who a donation is attributed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DonationOwner {
    Contact(String),
    Business(String),
}

impl DonationOwner {
    pub fn contact_id(&self) -> Option<&str> {
        match self {
            DonationOwner::Contact(id) => Some(id),
            DonationOwner::Business(_) => None,
        }
    }

    pub fn business_id(&self) -> Option<&str> {
        match self {
            DonationOwner::Business(id) => Some(id),
            DonationOwner::Contact(_) => None,
        }
    }
}

/// Request body for creating a donation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDonationRequest {
    pub amount: f64,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_type: Option<String>,
}

impl CreateDonationRequest {
    pub fn validate(&self) -> Result<(), String> {
        validate_amount(self.amount)?;
        if self.status.trim().is_empty() {
            return Err("Status is required".to_string());
        }
        Ok(())
    }
}

/// Partial update; only amount and status are mutable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDonationRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl UpdateDonationRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.amount.is_none() && self.status.is_none() {
            return Err("Nothing to update: provide amount and/or status".to_string());
        }
        if let Some(amount) = self.amount {
            validate_amount(amount)?;
        }
        if matches!(&self.status, Some(s) if s.trim().is_empty()) {
            return Err("Status cannot be empty".to_string());
        }
        Ok(())
    }
}

fn validate_amount(amount: f64) -> Result<(), String> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err("Amount must be a positive number".to_string());
    }
    Ok(())
}

/// Result of deleting a donation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResult {
    pub success: bool,
}

/// Query parameters for listing donations.
///
/// `filters` is a comma separated list of `field:value` pairs and `sort` a
/// comma separated list of `field` or `field:asc|desc`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationListQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
}

/// Columns a list may be filtered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterField {
    Status,
    PaymentType,
    ContactId,
    BusinessId,
}

impl FilterField {
    pub fn column(&self) -> &'static str {
        match self {
            FilterField::Status => "status",
            FilterField::PaymentType => "payment_type",
            FilterField::ContactId => "contact_id",
            FilterField::BusinessId => "business_id",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "status" => Some(FilterField::Status),
            "paymentType" => Some(FilterField::PaymentType),
            "contactId" => Some(FilterField::ContactId),
            "businessId" => Some(FilterField::BusinessId),
            _ => None,
        }
    }
}

/// Columns a list may be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Amount,
    Status,
    CreatedAt,
    UpdatedAt,
}

impl SortField {
    pub fn column(&self) -> &'static str {
        match self {
            SortField::Amount => "amount",
            SortField::Status => "status",
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "amount" => Some(SortField::Amount),
            "status" => Some(SortField::Status),
            "createdAt" => Some(SortField::CreatedAt),
            "updatedAt" => Some(SortField::UpdatedAt),
            _ => None,
        }
    }
}

/// A single `field = value` filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DonationFilter {
    pub field: FilterField,
    pub value: String,
}

/// A single ordering term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DonationSort {
    pub field: SortField,
    pub descending: bool,
}

/// Validated form of [`DonationListQuery`].
#[derive(Debug, Clone, PartialEq)]
pub struct DonationListParams {
    pub page: u32,
    pub page_size: u32,
    pub search: Option<String>,
    pub filters: Vec<DonationFilter>,
    pub sort: Vec<DonationSort>,
}

impl Default for DonationListParams {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            search: None,
            filters: Vec::new(),
            sort: Vec::new(),
        }
    }
}

impl DonationListParams {
    /// Rows to skip. Widened so any `page` the query accepts is representable.
    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.page_size)
    }
}

impl DonationListQuery {
    /// Validate and normalize the raw query.
    pub fn into_params(self) -> Result<DonationListParams, String> {
        let page = self.page.unwrap_or(1).max(1);
        let page_size = self
            .page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        let search = self
            .search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let mut filters = Vec::new();
        for term in split_terms(self.filters.as_deref()) {
            let (field, value) = term
                .split_once(':')
                .ok_or_else(|| format!("Invalid filter '{}': expected field:value", term))?;
            let field = FilterField::parse(field.trim())
                .ok_or_else(|| format!("Unknown filter field '{}'", field.trim()))?;
            filters.push(DonationFilter {
                field,
                value: value.trim().to_string(),
            });
        }

        let mut sort = Vec::new();
        for term in split_terms(self.sort.as_deref()) {
            let (field, direction) = match term.split_once(':') {
                Some((field, direction)) => (field.trim(), direction.trim()),
                None => (term, "asc"),
            };
            let field = SortField::parse(field)
                .ok_or_else(|| format!("Unknown sort field '{}'", field))?;
            let descending = match direction.to_ascii_lowercase().as_str() {
                "asc" => false,
                "desc" => true,
                other => return Err(format!("Invalid sort direction '{}'", other)),
            };
            sort.push(DonationSort { field, descending });
        }

        Ok(DonationListParams {
            page,
            page_size,
            search,
            filters,
            sort,
        })
    }
}

fn split_terms(raw: Option<&str>) -> impl Iterator<Item = &str> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// One page of donations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationPage {
    pub donations: Vec<Donation>,
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
}
