//! Workspace service.

use async_trait::async_trait;

use super::{ApiClient, ClientError};
use crate::models::{
    CreateWorkspaceRequest, SelectWorkspaceRequest, UpdateWorkspaceRequest, Workspace,
    WorkspaceSelection,
};
use crate::store::WorkspaceSource;

/// Calls the workspace endpoints.
#[derive(Debug, Clone)]
pub struct WorkspaceService {
    client: ApiClient,
}

impl WorkspaceService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// The acting user's workspaces, in membership order.
    pub async fn fetch_user_workspaces(&self) -> Result<Vec<Workspace>, ClientError> {
        let url = self.client.url("/api/workspaces");
        self.client
            .send(self.client.http().get(url), "fetch workspaces")
            .await
    }

    /// What the server resolves as current for this client's cookie.
    pub async fn fetch_current_workspace(&self) -> Result<WorkspaceSelection, ClientError> {
        let url = self.client.url("/api/workspaces/current");
        self.client
            .send(self.client.http().get(url), "fetch current workspace")
            .await
    }

    /// Make `workspace_id` current on the server; the response cookie is kept
    /// for later requests.
    pub async fn select_workspace(&self, workspace_id: &str) -> Result<Workspace, ClientError> {
        let url = self.client.url("/api/workspaces/current");
        let body = SelectWorkspaceRequest {
            workspace_id: workspace_id.to_string(),
        };
        self.client
            .send(self.client.http().put(url).json(&body), "select workspace")
            .await
    }

    pub async fn create_workspace(&self, name: &str) -> Result<Workspace, ClientError> {
        let url = self.client.url("/api/workspaces");
        let body = CreateWorkspaceRequest {
            name: name.to_string(),
            logo: None,
        };
        self.client
            .send(self.client.http().post(url).json(&body), "create workspace")
            .await
    }

    pub async fn update_workspace(
        &self,
        workspace_id: &str,
        request: &UpdateWorkspaceRequest,
    ) -> Result<Workspace, ClientError> {
        let url = self.client.url(&format!("/api/workspaces/{}", workspace_id));
        self.client
            .send(self.client.http().put(url).json(request), "update workspace")
            .await
    }
}

#[async_trait]
impl WorkspaceSource for WorkspaceService {
    async fn fetch_workspaces(&self) -> Result<Vec<Workspace>, ClientError> {
        self.fetch_user_workspaces().await
    }
}
