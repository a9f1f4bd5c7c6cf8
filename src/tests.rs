//! Integration tests for the Engage backend.

use std::sync::Arc;

use reqwest::{redirect::Policy, Client, StatusCode};
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::client::{ApiClient, ClientError, DonationService, WorkspaceService};
use crate::config::Config;
use crate::db::{init_database, Repository};
use crate::models::{
    CreateDonationRequest, CreateUserRequest, CreateWorkspaceRequest, DonationListQuery,
    UpdateDonationRequest, UpdateWorkspaceRequest, User, Workspace,
};
use crate::store::{MemoryStorage, SelectionStorage, WorkspaceStore};
use crate::{create_router, AppState};

const TEST_PSK: &str = "test-api-key";

/// Test fixture for integration tests.
struct TestFixture {
    repo: Arc<Repository>,
    base_url: String,
    temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        Self::with_psk(Some(TEST_PSK.to_string())).await
    }

    async fn with_psk(psk: Option<String>) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.sqlite");

        let pool = init_database(&db_path).await.expect("Failed to init DB");
        let repo = Arc::new(Repository::new(pool));

        let config = Config {
            api_psk: psk,
            db_path,
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "warn".to_string(),
            secure_cookies: false,
        };

        let state = AppState {
            repo: repo.clone(),
            config: Arc::new(config),
        };

        let app = create_router(state);

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        TestFixture {
            repo,
            base_url: format!("http://{}", addr),
            temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn db_path(&self) -> std::path::PathBuf {
        self.temp_dir.path().join("test.sqlite")
    }

    async fn user(&self, name: &str) -> User {
        self.repo
            .create_user(&CreateUserRequest {
                email: format!("{}@example.com", name),
                username: name.to_string(),
                display_name: name.to_uppercase(),
                avatar: None,
            })
            .await
            .unwrap()
    }

    async fn workspace(&self, owner: &User, name: &str) -> Workspace {
        self.repo
            .create_workspace(
                &owner.id,
                &CreateWorkspaceRequest {
                    name: name.to_string(),
                    logo: None,
                },
            )
            .await
            .unwrap()
    }

    /// Raw HTTP client acting as `user` (or signed out). Redirects are not
    /// followed so guards can be asserted.
    fn client(&self, user: Option<&User>) -> Client {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("x-api-key", TEST_PSK.parse().unwrap());
        if let Some(user) = user {
            headers.insert("x-user-id", user.id.parse().unwrap());
        }
        Client::builder()
            .default_headers(headers)
            .redirect(Policy::none())
            .build()
            .unwrap()
    }

    fn api(&self, user: &User) -> ApiClient {
        ApiClient::new(&self.base_url, Some(TEST_PSK), Some(&user.id)).unwrap()
    }
}

fn selection_cookie(workspace_id: &str) -> String {
    format!("currentWorkspaceId={}", workspace_id)
}

async fn create_contact(fixture: &TestFixture, user: &User, name: &str) -> String {
    let resp = fixture
        .client(Some(user))
        .post(fixture.url("/api/contacts"))
        .json(&json!({ "name": name }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    body["data"]["id"].as_str().unwrap().to_string()
}

fn donation(amount: f64, status: &str) -> CreateDonationRequest {
    CreateDonationRequest {
        amount,
        status: status.to_string(),
        notes: None,
        payment_type: None,
    }
}

// ==================== AUTH ====================

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = Client::new().get(fixture.url("/health")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_auth_missing_psk() {
    let fixture = TestFixture::new().await;

    let resp = Client::new()
        .get(fixture.url("/api/workspaces"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_auth_invalid_psk() {
    let fixture = TestFixture::new().await;

    let resp = Client::new()
        .get(fixture.url("/api/workspaces"))
        .header("x-api-key", "wrong-key")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_auth_bearer_psk() {
    let fixture = TestFixture::new().await;
    let alice = fixture.user("alice").await;

    let resp = Client::new()
        .get(fixture.url("/api/workspaces"))
        .header("authorization", format!("Bearer {}", TEST_PSK))
        .header("x-user-id", &alice.id)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn test_dev_mode_without_psk() {
    let fixture = TestFixture::with_psk(None).await;
    let alice = fixture.user("alice").await;

    let resp = Client::new()
        .get(fixture.url("/api/workspaces"))
        .header("x-user-id", &alice.id)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn test_api_requires_session() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client(None)
        .get(fixture.url("/api/workspaces"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["message"], "You must be logged in");
}

// ==================== WORKSPACES ====================

#[tokio::test]
async fn test_workspace_create_and_list() {
    let fixture = TestFixture::new().await;
    let alice = fixture.user("alice").await;
    let client = fixture.client(Some(&alice));

    let resp = client
        .get(fixture.url("/api/workspaces"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"], json!([]));

    for name in ["First", "Second"] {
        let resp = client
            .post(fixture.url("/api/workspaces"))
            .json(&json!({ "name": name }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["data"]["name"], name);
        assert_eq!(body["data"]["role"], "Super Admin");
        assert_eq!(body["data"]["createdById"], alice.id.as_str());
    }

    let resp = client
        .get(fixture.url("/api/workspaces"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|w| w["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["First", "Second"]);

    let resp = client
        .post(fixture.url("/api/workspaces"))
        .json(&json!({ "name": "   " }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_current_workspace_follows_cookie() {
    let fixture = TestFixture::new().await;
    let alice = fixture.user("alice").await;
    let first = fixture.workspace(&alice, "First").await;
    let second = fixture.workspace(&alice, "Second").await;
    let client = fixture.client(Some(&alice));

    // No cookie: first membership
    let resp = client
        .get(fixture.url("/api/workspaces/current"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["currentWorkspace"]["id"], first.id.as_str());
    assert_eq!(body["data"]["workspaces"].as_array().unwrap().len(), 2);

    // Matching cookie wins
    let resp = client
        .get(fixture.url("/api/workspaces/current"))
        .header("cookie", selection_cookie(&second.id))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["currentWorkspace"]["id"], second.id.as_str());

    // Stale cookie falls back to the first membership
    let resp = client
        .get(fixture.url("/api/workspaces/current"))
        .header("cookie", selection_cookie("deleted-workspace"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["currentWorkspace"]["id"], first.id.as_str());
}

#[tokio::test]
async fn test_select_workspace_sets_cookie() {
    let fixture = TestFixture::new().await;
    let alice = fixture.user("alice").await;
    let bob = fixture.user("bob").await;
    fixture.workspace(&alice, "First").await;
    let second = fixture.workspace(&alice, "Second").await;
    let foreign = fixture.workspace(&bob, "Bob's").await;
    let client = fixture.client(Some(&alice));

    let resp = client
        .put(fixture.url("/api/workspaces/current"))
        .json(&json!({ "workspaceId": second.id }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let set_cookie = resp
        .headers()
        .get("set-cookie")
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(set_cookie.starts_with(&selection_cookie(&second.id)));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Lax"));
    assert!(set_cookie.contains("Path=/"));

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["id"], second.id.as_str());

    // Not a member
    let resp = client
        .put(fixture.url("/api/workspaces/current"))
        .json(&json!({ "workspaceId": foreign.id }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    assert!(resp.headers().get("set-cookie").is_none());
}

#[tokio::test]
async fn test_update_workspace_requires_membership() {
    let fixture = TestFixture::new().await;
    let alice = fixture.user("alice").await;
    let bob = fixture.user("bob").await;
    let ws = fixture.workspace(&alice, "Original").await;

    let resp = fixture
        .client(Some(&alice))
        .put(fixture.url(&format!("/api/workspaces/{}", ws.id)))
        .json(&json!({ "name": "Renamed", "logo": "https://cdn.example.com/logo.png" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["name"], "Renamed");
    assert_eq!(body["data"]["logo"], "https://cdn.example.com/logo.png");
    assert_eq!(body["data"]["role"], "Super Admin");

    let resp = fixture
        .client(Some(&bob))
        .put(fixture.url(&format!("/api/workspaces/{}", ws.id)))
        .json(&json!({ "name": "Hijacked" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

// ==================== PAGES ====================

#[tokio::test]
async fn test_layout_loader() {
    let fixture = TestFixture::new().await;
    let alice = fixture.user("alice").await;
    fixture.workspace(&alice, "First").await;
    let second = fixture.workspace(&alice, "Second").await;

    let resp = fixture
        .client(None)
        .get(fixture.url("/pages/layout"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert!(body["session"].is_null());
    assert!(body["user"].is_null());
    assert!(body["currentWorkspace"].is_null());
    assert_eq!(body["workspaces"], json!([]));

    let resp = fixture
        .client(Some(&alice))
        .get(fixture.url("/pages/layout"))
        .header("cookie", selection_cookie(&second.id))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["session"]["active"], true);
    assert_eq!(body["user"]["id"], alice.id.as_str());
    assert_eq!(body["workspaces"].as_array().unwrap().len(), 2);
    assert_eq!(body["currentWorkspace"]["id"], second.id.as_str());
}

#[tokio::test]
async fn test_layout_without_memberships() {
    let fixture = TestFixture::new().await;
    let alice = fixture.user("alice").await;

    let resp = fixture
        .client(Some(&alice))
        .get(fixture.url("/pages/layout"))
        .header("cookie", selection_cookie("anything"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["workspaces"], json!([]));
    assert!(body["currentWorkspace"].is_null());
}

#[tokio::test]
async fn test_layout_survives_membership_lookup_failure() {
    let fixture = TestFixture::new().await;
    let alice = fixture.user("alice").await;
    fixture.workspace(&alice, "First").await;

    // Users stay readable; only the membership query starts failing.
    let pool = init_database(&fixture.db_path()).await.unwrap();
    sqlx::query("DROP TABLE user_workspaces")
        .execute(&pool)
        .await
        .unwrap();
    pool.close().await;

    let resp = fixture
        .client(Some(&alice))
        .get(fixture.url("/pages/layout"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["session"]["active"], true);
    assert_eq!(body["user"]["id"], alice.id.as_str());
    assert_eq!(body["workspaces"], json!([]));
    assert!(body["currentWorkspace"].is_null());
}

#[tokio::test]
async fn test_guarded_pages_redirect_to_login() {
    let fixture = TestFixture::new().await;
    let alice = fixture.user("alice").await;

    for path in ["/pages/app", "/pages/engage", "/pages/onboarding"] {
        let resp = fixture
            .client(None)
            .get(fixture.url(path))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER, "{}", path);
        assert_eq!(resp.headers()["location"], "/login");

        let resp = fixture
            .client(Some(&alice))
            .get(fixture.url(path))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200, "{}", path);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["session"]["active"], true);
        assert_eq!(body["user"]["email"], "alice@example.com");
    }
}

#[tokio::test]
async fn test_login_page_redirects_signed_in_users() {
    let fixture = TestFixture::new().await;
    let alice = fixture.user("alice").await;

    let resp = fixture
        .client(Some(&alice))
        .get(fixture.url("/pages/login"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(resp.headers()["location"], "/app");

    let resp = fixture
        .client(None)
        .get(fixture.url("/pages/login"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({}));
}

#[tokio::test]
async fn test_unknown_user_counts_as_signed_out() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client(None)
        .get(fixture.url("/pages/app"))
        .header("x-user-id", "no-such-user")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
}

// ==================== PEOPLE PAGE ====================

#[tokio::test]
async fn test_people_page_lists_members() {
    let fixture = TestFixture::new().await;
    let alice = fixture.user("alice").await;
    let bob = fixture.user("bob").await;
    let ws = fixture.workspace(&alice, "Team").await;
    fixture
        .repo
        .add_member(&bob.id, &ws.id, crate::models::Role::Volunteer)
        .await
        .unwrap();

    let resp = fixture
        .client(Some(&alice))
        .get(fixture.url("/pages/settings/workspace/people"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();

    assert_eq!(body["workspace"]["id"], ws.id.as_str());
    assert_eq!(
        body["workspaceRoles"],
        json!(["Super Admin", "Admin", "Basic User", "Volunteer"])
    );
    let members = body["members"].as_array().unwrap();
    assert_eq!(members.len(), 2);
    let bob_entry = members
        .iter()
        .find(|m| m["userId"] == bob.id.as_str())
        .unwrap();
    assert_eq!(bob_entry["role"], "Volunteer");
    assert_eq!(bob_entry["user"]["email"], "bob@example.com");
    assert_eq!(body["pendingInvites"], json!([]));
    assert!(body.get("noWorkspaceSelected").is_none());
    assert!(body.get("noWorkspaceAccess").is_none());
}

#[tokio::test]
async fn test_people_page_without_workspace() {
    let fixture = TestFixture::new().await;
    let alice = fixture.user("alice").await;
    let bob = fixture.user("bob").await;
    let foreign = fixture.workspace(&bob, "Bob's").await;

    let resp = fixture
        .client(Some(&alice))
        .get(fixture.url("/pages/settings/workspace/people"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["noWorkspaceSelected"], true);
    assert_eq!(body["members"], json!([]));
    assert_eq!(body["pendingInvites"], json!([]));

    // A workspace named in the query still needs membership
    let resp = fixture
        .client(Some(&alice))
        .get(fixture.url(&format!(
            "/pages/settings/workspace/people?workspace={}",
            foreign.id
        )))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["noWorkspaceAccess"], true);
    assert_eq!(body["members"], json!([]));

    let resp = fixture
        .client(None)
        .get(fixture.url("/pages/settings/workspace/people"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_invite_user() {
    let fixture = TestFixture::new().await;
    let alice = fixture.user("alice").await;
    let bob = fixture.user("bob").await;
    let ws = fixture.workspace(&alice, "Team").await;
    let client = fixture.client(Some(&alice));
    let invite_url = fixture.url("/pages/settings/workspace/people/invite");

    let resp = client
        .post(&invite_url)
        .form(&[("email", "nobody@example.com"), ("role", "Admin")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(
        body["message"],
        "User not found. Please ask them to sign up first."
    );

    let resp = client
        .post(&invite_url)
        .form(&[("email", "BOB@example.com"), ("role", "Basic User")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["userAdded"], true);

    let membership = fixture
        .repo
        .get_membership(&bob.id, &ws.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(membership.role, crate::models::Role::BasicUser);

    let resp = client
        .post(&invite_url)
        .form(&[("email", "bob@example.com"), ("role", "Admin")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(
        body["error"]["message"],
        "This user is already a member of this workspace"
    );

    let resp = client
        .post(&invite_url)
        .form(&[("email", "bob@example.com")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["message"], "Email and role are required");

    let resp = fixture
        .client(None)
        .post(&invite_url)
        .form(&[("email", "bob@example.com"), ("role", "Admin")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_invite_without_workspace() {
    let fixture = TestFixture::new().await;
    let alice = fixture.user("alice").await;
    fixture.user("bob").await;

    let resp = fixture
        .client(Some(&alice))
        .post(fixture.url("/pages/settings/workspace/people/invite"))
        .form(&[("email", "bob@example.com"), ("role", "Admin")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["message"], "No workspace selected");
}

#[tokio::test]
async fn test_remove_user() {
    let fixture = TestFixture::new().await;
    let alice = fixture.user("alice").await;
    let bob = fixture.user("bob").await;
    let carol = fixture.user("carol").await;
    let ws = fixture.workspace(&alice, "Team").await;
    fixture
        .repo
        .add_member(&bob.id, &ws.id, crate::models::Role::Admin)
        .await
        .unwrap();
    let client = fixture.client(Some(&alice));
    let remove_url = fixture.url("/pages/settings/workspace/people/remove");

    let resp = client
        .post(&remove_url)
        .form(&[("userId", alice.id.as_str())])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(
        body["error"]["message"],
        "You cannot remove yourself from the workspace"
    );

    let resp = client
        .post(&remove_url)
        .form(&[("userId", carol.id.as_str())])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let resp = client
        .post(&remove_url)
        .form(&[("userId", bob.id.as_str())])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "User removed from workspace");
    assert!(fixture
        .repo
        .get_membership(&bob.id, &ws.id)
        .await
        .unwrap()
        .is_none());

    let resp = client
        .post(&remove_url)
        .form(&[("userId", "")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_update_role() {
    let fixture = TestFixture::new().await;
    let alice = fixture.user("alice").await;
    let bob = fixture.user("bob").await;
    let ws = fixture.workspace(&alice, "Team").await;
    let bob_membership = fixture
        .repo
        .add_member(&bob.id, &ws.id, crate::models::Role::Volunteer)
        .await
        .unwrap();
    let alice_membership = fixture
        .repo
        .get_membership(&alice.id, &ws.id)
        .await
        .unwrap()
        .unwrap();
    let client = fixture.client(Some(&alice));
    let role_url = fixture.url("/pages/settings/workspace/people/update-role");

    let resp = client
        .post(&role_url)
        .form(&[
            ("userWorkspaceId", alice_membership.id.as_str()),
            ("role", "Admin"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(
        body["error"]["message"],
        "You cannot downgrade your own Super Admin role"
    );

    let resp = client
        .post(&role_url)
        .form(&[
            ("userWorkspaceId", bob_membership.id.as_str()),
            ("role", "Overlord"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = client
        .post(&role_url)
        .form(&[
            ("userWorkspaceId", bob_membership.id.as_str()),
            ("role", "Admin"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Role updated");

    let updated = fixture
        .repo
        .get_membership(&bob.id, &ws.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.role, crate::models::Role::Admin);

    let resp = client
        .post(&role_url)
        .form(&[("userWorkspaceId", "missing"), ("role", "Admin")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

// ==================== DONATIONS ====================

#[tokio::test]
async fn test_donation_crud_through_service() {
    let fixture = TestFixture::new().await;
    let alice = fixture.user("alice").await;
    fixture.workspace(&alice, "Team").await;
    let contact_id = create_contact(&fixture, &alice, "Dana Donor").await;
    let service = DonationService::new(fixture.api(&alice));

    let created = service
        .create_contact_donation(
            &contact_id,
            &CreateDonationRequest {
                amount: 50.0,
                status: "pending".to_string(),
                notes: Some("Spring appeal".to_string()),
                payment_type: Some("card".to_string()),
            },
        )
        .await
        .unwrap();
    assert_eq!(created.contact_id.as_deref(), Some(contact_id.as_str()));
    assert!(created.business_id.is_none());

    let legacy = service
        .create_donation(&contact_id, 25.0, "completed")
        .await
        .unwrap();
    assert_eq!(legacy.amount, 25.0);

    let listed = service.fetch_contact_donations(&contact_id).await.unwrap();
    assert_eq!(listed.len(), 2);

    let updated = service
        .update_donation(
            &created.id,
            &UpdateDonationRequest {
                amount: Some(75.0),
                status: Some("completed".to_string()),
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.amount, 75.0);
    assert_eq!(updated.status, "completed");
    assert_eq!(updated.notes.as_deref(), Some("Spring appeal"));

    assert!(service.delete_donation(&created.id).await.unwrap());
    let listed = service.fetch_contact_donations(&contact_id).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, legacy.id);

    let err = service.delete_donation(&created.id).await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
}

#[tokio::test]
async fn test_business_donations() {
    let fixture = TestFixture::new().await;
    let alice = fixture.user("alice").await;
    fixture.workspace(&alice, "Team").await;

    let resp = fixture
        .client(Some(&alice))
        .post(fixture.url("/api/businesses"))
        .json(&json!({ "name": "Acme Corp" }))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    let business_id = body["data"]["id"].as_str().unwrap().to_string();

    let service = DonationService::new(fixture.api(&alice));
    let created = service
        .create_business_donation(&business_id, &donation(1000.0, "pledged"))
        .await
        .unwrap();
    assert_eq!(created.business_id.as_deref(), Some(business_id.as_str()));
    assert!(created.contact_id.is_none());

    let listed = service.fetch_business_donations(&business_id).await.unwrap();
    assert_eq!(listed.len(), 1);

    // A business id is not a contact id
    let err = service
        .fetch_contact_donations(&business_id)
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
}

#[tokio::test]
async fn test_donation_validation_errors() {
    let fixture = TestFixture::new().await;
    let alice = fixture.user("alice").await;
    fixture.workspace(&alice, "Team").await;
    let contact_id = create_contact(&fixture, &alice, "Dana Donor").await;
    let service = DonationService::new(fixture.api(&alice));

    let err = service
        .create_contact_donation(&contact_id, &donation(-5.0, "pending"))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
    assert_eq!(err.to_string(), "Amount must be a positive number");

    let created = service
        .create_contact_donation(&contact_id, &donation(5.0, "pending"))
        .await
        .unwrap();
    let err = service
        .update_donation(&created.id, &UpdateDonationRequest::default())
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));

    let err = service
        .fetch_contact_donations_page(
            &contact_id,
            &DonationListQuery {
                sort: Some("color:desc".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Unknown sort field 'color'");
}

#[tokio::test]
async fn test_donations_hidden_from_non_members() {
    let fixture = TestFixture::new().await;
    let alice = fixture.user("alice").await;
    let mallory = fixture.user("mallory").await;
    fixture.workspace(&alice, "Team").await;
    fixture.workspace(&mallory, "Elsewhere").await;
    let contact_id = create_contact(&fixture, &alice, "Dana Donor").await;

    let created = DonationService::new(fixture.api(&alice))
        .create_contact_donation(&contact_id, &donation(10.0, "pending"))
        .await
        .unwrap();

    let intruder = DonationService::new(fixture.api(&mallory));
    let err = intruder
        .fetch_contact_donations(&contact_id)
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));

    let err = intruder
        .update_donation(
            &created.id,
            &UpdateDonationRequest {
                amount: Some(1.0),
                status: None,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));

    let err = intruder.delete_donation(&created.id).await.unwrap_err();
    assert!(matches!(err, ClientError::Api { .. }));

    let page = intruder
        .fetch_donations(&DonationListQuery::default())
        .await
        .unwrap();
    assert_eq!(page.total, 0);
}

#[tokio::test]
async fn test_donation_paging_filtering_sorting() {
    let fixture = TestFixture::new().await;
    let alice = fixture.user("alice").await;
    fixture.workspace(&alice, "Team").await;
    let contact_id = create_contact(&fixture, &alice, "Dana Donor").await;
    let service = DonationService::new(fixture.api(&alice));

    for (amount, status) in [
        (30.0, "pending"),
        (10.0, "completed"),
        (50.0, "pending"),
        (20.0, "completed"),
        (40.0, "pending"),
    ] {
        service
            .create_contact_donation(&contact_id, &donation(amount, status))
            .await
            .unwrap();
    }

    let page = service
        .fetch_contact_donations_page(
            &contact_id,
            &DonationListQuery {
                page: Some(2),
                page_size: Some(2),
                sort: Some("amount:asc".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(page.total, 5);
    assert_eq!(page.page, 2);
    assert_eq!(page.page_size, 2);
    let amounts: Vec<f64> = page.donations.iter().map(|d| d.amount).collect();
    assert_eq!(amounts, vec![30.0, 40.0]);

    let page = service
        .fetch_contact_donations_page(
            &contact_id,
            &DonationListQuery {
                filters: Some("status:pending".to_string()),
                sort: Some("amount:desc".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(page.total, 3);
    let amounts: Vec<f64> = page.donations.iter().map(|d| d.amount).collect();
    assert_eq!(amounts, vec![50.0, 40.0, 30.0]);

    let page = service
        .fetch_contact_donations_page(
            &contact_id,
            &DonationListQuery {
                page: Some(3),
                page_size: Some(2),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(page.donations.len(), 1);
}

#[tokio::test]
async fn test_donation_page_far_past_the_end_is_empty() {
    let fixture = TestFixture::new().await;
    let alice = fixture.user("alice").await;
    fixture.workspace(&alice, "Team").await;
    let contact_id = create_contact(&fixture, &alice, "Dana Donor").await;
    let service = DonationService::new(fixture.api(&alice));
    service
        .create_contact_donation(&contact_id, &donation(25.0, "pending"))
        .await
        .unwrap();

    let res = fixture
        .client(Some(&alice))
        .get(fixture.url("/api/donations"))
        .query(&[("page", "50000000"), ("pageSize", "100")])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["donations"], json!([]));
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["page"], 50_000_000);

    let page = service
        .fetch_contact_donations_page(
            &contact_id,
            &DonationListQuery {
                page: Some(u32::MAX),
                page_size: Some(100),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(page.donations.is_empty());
    assert_eq!(page.total, 1);
}

#[tokio::test]
async fn test_workspace_donations_follow_selection() {
    let fixture = TestFixture::new().await;
    let alice = fixture.user("alice").await;
    fixture.workspace(&alice, "First").await;
    let second = fixture.workspace(&alice, "Second").await;

    // Contact in the first workspace (no cookie yet)
    let contact_id = create_contact(&fixture, &alice, "First Donor").await;

    let api = fixture.api(&alice);
    let donations = DonationService::new(api.clone());
    let workspaces = WorkspaceService::new(api);

    donations
        .create_contact_donation(&contact_id, &donation(12.0, "pending"))
        .await
        .unwrap();
    let page = donations
        .fetch_donations(&DonationListQuery::default())
        .await
        .unwrap();
    assert_eq!(page.total, 1);

    let selected = workspaces.select_workspace(&second.id).await.unwrap();
    assert_eq!(selected.id, second.id);

    let current = workspaces.fetch_current_workspace().await.unwrap();
    assert_eq!(current.current_workspace.map(|w| w.id), Some(second.id));

    let page = donations
        .fetch_donations(&DonationListQuery::default())
        .await
        .unwrap();
    assert_eq!(page.total, 0);
}

// ==================== CLIENT SERVICES AND STORE ====================

#[tokio::test]
async fn test_workspace_service() {
    let fixture = TestFixture::new().await;
    let alice = fixture.user("alice").await;
    let service = WorkspaceService::new(fixture.api(&alice));

    let created = service.create_workspace("Hello").await.unwrap();
    assert_eq!(created.role, Some(crate::models::Role::SuperAdmin));

    let updated = service
        .update_workspace(
            &created.id,
            &UpdateWorkspaceRequest {
                name: Some("Hello Again".to_string()),
                logo: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "Hello Again");

    let listed = service.fetch_user_workspaces().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, updated.id);
    assert_eq!(listed[0].name, "Hello Again");

    let err = service.select_workspace("missing").await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
}

#[tokio::test]
async fn test_service_reports_transport_errors() {
    let service = WorkspaceService::new(
        ApiClient::new("http://127.0.0.1:9", Some(TEST_PSK), Some("nobody")).unwrap(),
    );
    let err = service.fetch_user_workspaces().await.unwrap_err();
    assert!(matches!(err, ClientError::Transport(_)));
}

#[tokio::test]
async fn test_store_refresh_from_api() {
    let fixture = TestFixture::new().await;
    let alice = fixture.user("alice").await;
    let first = fixture.workspace(&alice, "First").await;
    let second = fixture.workspace(&alice, "Second").await;

    let storage = Arc::new(MemoryStorage::with_value(&second.id));
    let source = Arc::new(WorkspaceService::new(fixture.api(&alice)));
    let store = WorkspaceStore::new(storage.clone(), source);

    store.refresh().await.unwrap();
    let state = store.state();
    assert_eq!(state.workspaces.len(), 2);
    assert_eq!(state.current_id(), Some(second.id.as_str()));
    assert!(!state.is_loading);

    store.set_current_workspace(&first.id, None);
    store.refresh().await.unwrap();
    assert_eq!(store.state().current_id(), Some(first.id.as_str()));
    assert_eq!(storage.get().as_deref(), Some(first.id.as_str()));

    store.reset();
    assert_eq!(storage.get(), None);
    assert!(store.state().workspaces.is_empty());
}

#[tokio::test]
async fn test_store_refresh_failure_records_error() {
    let fixture = TestFixture::new().await;
    let alice = fixture.user("alice").await;
    fixture.workspace(&alice, "First").await;

    let storage = Arc::new(MemoryStorage::new());
    let good = Arc::new(WorkspaceService::new(fixture.api(&alice)));
    let store = WorkspaceStore::new(storage.clone(), good);
    store.refresh().await.unwrap();

    // Same persisted state, but a source that is rejected by the PSK layer
    let bad = Arc::new(WorkspaceService::new(
        ApiClient::new(&fixture.base_url, Some("wrong-key"), Some(&alice.id)).unwrap(),
    ));
    let failing = WorkspaceStore::new(storage, bad);
    failing.set_workspaces(store.state().workspaces, None);
    let before = failing.state();

    let err = failing.refresh().await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));

    let after = failing.state();
    assert_eq!(after.workspaces, before.workspaces);
    assert_eq!(after.current_workspace, before.current_workspace);
    assert_eq!(after.error.as_deref(), Some("Invalid API key"));
    assert!(!after.is_loading);
}
