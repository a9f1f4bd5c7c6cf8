//! HTTP services used by the frontend to call the REST API.
//!
//! Each service is a thin wrapper: it shapes the request, unwraps the
//! `{ success, data }` envelope and turns failures into [`ClientError`].
//! Nothing is retried.

mod donations;
mod workspaces;

pub use donations::*;
pub use workspaces::*;

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::auth::{API_KEY_HEADER, USER_ID_HEADER};
use crate::errors::ErrorResponse;

/// Failure talking to the API.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The request never produced a usable response.
    #[error("{0}")]
    Transport(#[from] reqwest::Error),
    /// The server answered with a non-success status.
    #[error("{message}")]
    Api { status: StatusCode, message: String },
    /// A credential could not be sent as a header.
    #[error("invalid header value for {0}")]
    InvalidHeader(&'static str),
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Transport(e) => e.status(),
            ClientError::InvalidHeader(_) => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

/// Shared HTTP client carrying the API key and acting user.
///
/// Cookies are kept between calls so a workspace selection made through
/// [`WorkspaceService::select_workspace`] applies to later requests.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<&str>,
        user_id: Option<&str>,
    ) -> Result<Self, ClientError> {
        let mut headers = HeaderMap::new();
        if let Some(key) = api_key {
            let value =
                HeaderValue::from_str(key).map_err(|_| ClientError::InvalidHeader(API_KEY_HEADER))?;
            headers.insert(API_KEY_HEADER, value);
        }
        if let Some(id) = user_id {
            let value =
                HeaderValue::from_str(id).map_err(|_| ClientError::InvalidHeader(USER_ID_HEADER))?;
            headers.insert(USER_ID_HEADER, value);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .cookie_store(true)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Send a request and unwrap the success envelope.
    ///
    /// `action` completes the fallback message "Failed to <action>" used when
    /// the error body is not the usual JSON envelope.
    pub(crate) async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        action: &str,
    ) -> Result<T, ClientError> {
        let response = request.send().await.map_err(|e| {
            tracing::error!("Error trying to {}: {}", action, e);
            ClientError::Transport(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<ErrorResponse>().await {
                Ok(body) if !body.error.message.is_empty() => body.error.message,
                Ok(_) => format!("Failed to {}", action),
                Err(e) => {
                    tracing::debug!("Failed to parse error response: {}", e);
                    format!("Failed to {}: {}", action, status)
                }
            };
            tracing::error!(%status, "API error trying to {}: {}", action, message);
            return Err(ClientError::Api { status, message });
        }

        let envelope: Envelope<T> = response.json().await?;
        Ok(envelope.data)
    }
}
