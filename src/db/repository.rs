//! Database repository for CRUD operations.
//!
//! Every donation and membership query is filtered by workspace; callers
//! check that the acting user belongs to that workspace first.

use chrono::Utc;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use crate::errors::AppError;
use crate::models::{
    CreateDonationRequest, CreateDonorRequest, CreateUserRequest, CreateWorkspaceRequest, Donation,
    DonationListParams, DonationOwner, DonationPage, Donor, DonorKind, MemberUser, Membership,
    Role, UpdateDonationRequest, UpdateWorkspaceRequest, User, Workspace, WorkspaceMember,
};

const DONATION_COLUMNS: &str = "id, workspace_id, contact_id, business_id, amount, status, notes, payment_type, created_at, updated_at";

/// Which donations a list query covers.
#[derive(Debug, Clone)]
pub enum DonationScope {
    Workspace(String),
    Contact(String),
    Business(String),
}

impl DonationScope {
    fn column(&self) -> &'static str {
        match self {
            DonationScope::Workspace(_) => "workspace_id",
            DonationScope::Contact(_) => "contact_id",
            DonationScope::Business(_) => "business_id",
        }
    }

    fn id(&self) -> &str {
        match self {
            DonationScope::Workspace(id) | DonationScope::Contact(id) | DonationScope::Business(id) => id,
        }
    }
}

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ==================== USER OPERATIONS ====================

    /// Register a user. Emails are stored lowercase.
    pub async fn create_user(&self, request: &CreateUserRequest) -> Result<User, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let email = request.email.trim().to_lowercase();

        sqlx::query(
            "INSERT INTO users (id, email, username, display_name, avatar, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&email)
        .bind(&request.username)
        .bind(&request.display_name)
        .bind(&request.avatar)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(User {
            id,
            email,
            username: request.username.clone(),
            display_name: request.display_name.clone(),
            avatar: request.avatar.clone(),
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Get a user by ID.
    pub async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query(
            "SELECT id, email, username, display_name, avatar, created_at, updated_at FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    /// Find a user by (already lowercased) email.
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query(
            "SELECT id, email, username, display_name, avatar, created_at, updated_at FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    // ==================== WORKSPACE OPERATIONS ====================

    /// Create a workspace; the creator becomes its Super Admin.
    pub async fn create_workspace(
        &self,
        creator_id: &str,
        request: &CreateWorkspaceRequest,
    ) -> Result<Workspace, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO workspaces (id, name, logo, created_at, updated_at, created_by_id) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&request.name)
        .bind(&request.logo)
        .bind(&now)
        .bind(&now)
        .bind(creator_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO user_workspaces (id, user_id, workspace_id, role, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(creator_id)
        .bind(&id)
        .bind(Role::SuperAdmin.as_str())
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Workspace {
            id,
            name: request.name.clone(),
            logo: request.logo.clone(),
            role: Some(Role::SuperAdmin),
            created_at: now.clone(),
            updated_at: now,
            created_by_id: Some(creator_id.to_string()),
        })
    }

    /// List the workspaces a user belongs to, in the order they joined.
    pub async fn list_user_workspaces(&self, user_id: &str) -> Result<Vec<Workspace>, AppError> {
        let rows = sqlx::query(
            "SELECT w.id, w.name, w.logo, w.created_at, w.updated_at, w.created_by_id, uw.role \
             FROM user_workspaces uw JOIN workspaces w ON w.id = uw.workspace_id \
             WHERE uw.user_id = ? ORDER BY uw.created_at, uw.rowid",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(member_workspace_from_row).collect())
    }

    /// Get one of a user's workspaces, or `None` if they are not a member.
    pub async fn get_user_workspace(
        &self,
        user_id: &str,
        workspace_id: &str,
    ) -> Result<Option<Workspace>, AppError> {
        let row = sqlx::query(
            "SELECT w.id, w.name, w.logo, w.created_at, w.updated_at, w.created_by_id, uw.role \
             FROM user_workspaces uw JOIN workspaces w ON w.id = uw.workspace_id \
             WHERE uw.user_id = ? AND uw.workspace_id = ?",
        )
        .bind(user_id)
        .bind(workspace_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(member_workspace_from_row))
    }

    /// Get a workspace by ID without membership context.
    pub async fn get_workspace(&self, id: &str) -> Result<Option<Workspace>, AppError> {
        let row = sqlx::query(
            "SELECT id, name, logo, created_at, updated_at, created_by_id FROM workspaces WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(workspace_from_row))
    }

    /// Rename a workspace or change its logo. Fields left out of `request`
    /// keep their stored value.
    pub async fn update_workspace(
        &self,
        id: &str,
        request: &UpdateWorkspaceRequest,
    ) -> Result<Workspace, AppError> {
        let row = sqlx::query(
            "UPDATE workspaces SET name = COALESCE(?, name), logo = COALESCE(?, logo), updated_at = ? \
             WHERE id = ? RETURNING id, name, logo, created_at, updated_at, created_by_id",
        )
        .bind(&request.name)
        .bind(&request.logo)
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref()
            .map(workspace_from_row)
            .ok_or_else(|| AppError::NotFound(format!("Workspace {} not found", id)))
    }

    // ==================== MEMBERSHIP OPERATIONS ====================

    /// Get the membership pairing a user with a workspace.
    pub async fn get_membership(
        &self,
        user_id: &str,
        workspace_id: &str,
    ) -> Result<Option<Membership>, AppError> {
        let row = sqlx::query(
            "SELECT id, user_id, workspace_id, role, created_at, updated_at FROM user_workspaces WHERE user_id = ? AND workspace_id = ?",
        )
        .bind(user_id)
        .bind(workspace_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(membership_from_row))
    }

    /// Get a membership by its own ID, restricted to one workspace.
    pub async fn get_membership_by_id(
        &self,
        id: &str,
        workspace_id: &str,
    ) -> Result<Option<Membership>, AppError> {
        let row = sqlx::query(
            "SELECT id, user_id, workspace_id, role, created_at, updated_at FROM user_workspaces WHERE id = ? AND workspace_id = ?",
        )
        .bind(id)
        .bind(workspace_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(membership_from_row))
    }

    /// List a workspace's members with their profiles.
    pub async fn list_members(&self, workspace_id: &str) -> Result<Vec<WorkspaceMember>, AppError> {
        let rows = sqlx::query(
            "SELECT uw.id, uw.user_id, uw.workspace_id, uw.role, uw.created_at, uw.updated_at, \
                    u.email, u.username, u.display_name, u.avatar \
             FROM user_workspaces uw JOIN users u ON u.id = uw.user_id \
             WHERE uw.workspace_id = ? ORDER BY uw.created_at, uw.rowid",
        )
        .bind(workspace_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let membership = membership_from_row(row);
                WorkspaceMember {
                    user: MemberUser {
                        id: membership.user_id.clone(),
                        email: row.get("email"),
                        username: row.get("username"),
                        display_name: row.get("display_name"),
                        avatar: row.get("avatar"),
                    },
                    id: membership.id,
                    user_id: membership.user_id,
                    workspace_id: membership.workspace_id,
                    role: membership.role,
                    created_at: membership.created_at,
                    updated_at: membership.updated_at,
                }
            })
            .collect())
    }

    /// Add a user to a workspace. A second membership for the same pair is a conflict.
    pub async fn add_member(
        &self,
        user_id: &str,
        workspace_id: &str,
        role: Role,
    ) -> Result<Membership, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO user_workspaces (id, user_id, workspace_id, role, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(user_id)
        .bind(workspace_id)
        .bind(role.as_str())
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(Membership {
            id,
            user_id: user_id.to_string(),
            workspace_id: workspace_id.to_string(),
            role,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Delete a membership.
    pub async fn delete_membership(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM user_workspaces WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Membership {} not found", id)));
        }
        Ok(())
    }

    /// Change a member's role.
    pub async fn update_member_role(&self, id: &str, role: Role) -> Result<(), AppError> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query("UPDATE user_workspaces SET role = ?, updated_at = ? WHERE id = ?")
            .bind(role.as_str())
            .bind(&now)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Membership {} not found", id)));
        }
        Ok(())
    }

    // ==================== CONTACT / BUSINESS OPERATIONS ====================

    /// Create a contact or business in a workspace.
    pub async fn create_donor(
        &self,
        kind: DonorKind,
        workspace_id: &str,
        request: &CreateDonorRequest,
    ) -> Result<Donor, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let sql = format!(
            "INSERT INTO {} (id, workspace_id, name, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
            kind.table()
        );

        sqlx::query(&sql)
            .bind(&id)
            .bind(workspace_id)
            .bind(request.name.trim())
            .bind(&now)
            .bind(&now)
            .execute(&self.pool)
            .await?;

        Ok(Donor {
            id,
            workspace_id: workspace_id.to_string(),
            name: request.name.trim().to_string(),
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Get a contact or business by ID.
    pub async fn get_donor(&self, kind: DonorKind, id: &str) -> Result<Option<Donor>, AppError> {
        let sql = format!(
            "SELECT id, workspace_id, name, created_at, updated_at FROM {} WHERE id = ?",
            kind.table()
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| Donor {
            id: row.get("id"),
            workspace_id: row.get("workspace_id"),
            name: row.get("name"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }))
    }

    // ==================== DONATION OPERATIONS ====================

    /// List one page of donations in a scope.
    pub async fn list_donations(
        &self,
        scope: &DonationScope,
        params: &DonationListParams,
    ) -> Result<DonationPage, AppError> {
        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) AS total FROM donations WHERE ");
        push_donation_conditions(&mut count, scope, params);
        let total: i64 = count.build().fetch_one(&self.pool).await?.get("total");

        let mut query = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {} FROM donations WHERE ",
            DONATION_COLUMNS
        ));
        push_donation_conditions(&mut query, scope, params);

        query.push(" ORDER BY ");
        if params.sort.is_empty() {
            query.push("created_at DESC, rowid DESC");
        } else {
            for (i, term) in params.sort.iter().enumerate() {
                if i > 0 {
                    query.push(", ");
                }
                query.push(term.field.column());
                query.push(if term.descending { " DESC" } else { " ASC" });
            }
            query.push(", rowid ASC");
        }

        query
            .push(" LIMIT ")
            .push_bind(i64::from(params.page_size))
            .push(" OFFSET ")
            .push_bind(params.offset());

        let rows = query.build().fetch_all(&self.pool).await?;

        Ok(DonationPage {
            donations: rows.iter().map(donation_from_row).collect(),
            total,
            page: params.page,
            page_size: params.page_size,
        })
    }

    /// Get a donation by ID.
    pub async fn get_donation(&self, id: &str) -> Result<Option<Donation>, AppError> {
        let sql = format!("SELECT {} FROM donations WHERE id = ?", DONATION_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(donation_from_row))
    }

    /// Create a donation attributed to a contact or business.
    pub async fn create_donation(
        &self,
        workspace_id: &str,
        owner: &DonationOwner,
        request: &CreateDonationRequest,
    ) -> Result<Donation, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO donations (id, workspace_id, contact_id, business_id, amount, status, notes, payment_type, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(workspace_id)
        .bind(owner.contact_id())
        .bind(owner.business_id())
        .bind(request.amount)
        .bind(&request.status)
        .bind(&request.notes)
        .bind(&request.payment_type)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(Donation {
            id,
            workspace_id: workspace_id.to_string(),
            contact_id: owner.contact_id().map(str::to_string),
            business_id: owner.business_id().map(str::to_string),
            amount: request.amount,
            status: request.status.clone(),
            notes: request.notes.clone(),
            payment_type: request.payment_type.clone(),
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Apply a partial update to a donation in a single statement, so
    /// concurrent updates to different fields do not overwrite each other.
    pub async fn update_donation(
        &self,
        id: &str,
        request: &UpdateDonationRequest,
    ) -> Result<Donation, AppError> {
        let sql = format!(
            "UPDATE donations SET amount = COALESCE(?, amount), status = COALESCE(?, status), updated_at = ? \
             WHERE id = ? RETURNING {}",
            DONATION_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(request.amount)
            .bind(&request.status)
            .bind(Utc::now().to_rfc3339())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref()
            .map(donation_from_row)
            .ok_or_else(|| AppError::NotFound(format!("Donation {} not found", id)))
    }

    /// Delete a donation.
    pub async fn delete_donation(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM donations WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Donation {} not found", id)));
        }
        Ok(())
    }
}

/// Escape LIKE wildcards so `raw` matches literally.
fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn push_donation_conditions(
    query: &mut QueryBuilder<'_, Sqlite>,
    scope: &DonationScope,
    params: &DonationListParams,
) {
    query
        .push(scope.column())
        .push(" = ")
        .push_bind(scope.id().to_string());

    for filter in &params.filters {
        query
            .push(" AND ")
            .push(filter.field.column())
            .push(" = ")
            .push_bind(filter.value.clone());
    }

    if let Some(search) = &params.search {
        let pattern = format!("%{}%", escape_like(search));
        query
            .push(" AND (status LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR IFNULL(notes, '') LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR IFNULL(payment_type, '') LIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
    }
}

// Helper functions for row conversion

fn parse_role(raw: &str) -> Role {
    Role::parse(raw).unwrap_or_else(|| {
        tracing::warn!("Unknown role label '{}' in database, treating as Volunteer", raw);
        Role::Volunteer
    })
}

fn user_from_row(row: &sqlx::sqlite::SqliteRow) -> User {
    User {
        id: row.get("id"),
        email: row.get("email"),
        username: row.get("username"),
        display_name: row.get("display_name"),
        avatar: row.get("avatar"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn workspace_from_row(row: &sqlx::sqlite::SqliteRow) -> Workspace {
    Workspace {
        id: row.get("id"),
        name: row.get("name"),
        logo: row.get("logo"),
        role: None,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        created_by_id: row.get("created_by_id"),
    }
}

fn member_workspace_from_row(row: &sqlx::sqlite::SqliteRow) -> Workspace {
    let role: String = row.get("role");
    Workspace {
        role: Some(parse_role(&role)),
        ..workspace_from_row(row)
    }
}

fn membership_from_row(row: &sqlx::sqlite::SqliteRow) -> Membership {
    let role: String = row.get("role");
    Membership {
        id: row.get("id"),
        user_id: row.get("user_id"),
        workspace_id: row.get("workspace_id"),
        role: parse_role(&role),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn donation_from_row(row: &sqlx::sqlite::SqliteRow) -> Donation {
    Donation {
        id: row.get("id"),
        workspace_id: row.get("workspace_id"),
        contact_id: row.get("contact_id"),
        business_id: row.get("business_id"),
        amount: row.get("amount"),
        status: row.get("status"),
        notes: row.get("notes"),
        payment_type: row.get("payment_type"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}
