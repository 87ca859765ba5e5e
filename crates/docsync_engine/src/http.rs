//! HTTP document client.
//!
//! Talks to the Drive v3 and Docs v1 REST APIs with `reqwest`. Credentials
//! are abstracted via [`TokenSource`] so the client does not care whether the
//! bearer token comes from a service account, a user session or a fixed value.

use crate::client::DocumentClient;
use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use docsync_protocol::{
    BatchUpdateRequest, BatchUpdateResponse, Document, DriveFile, FileHandle, FileList, NewFile,
    PermissionGrant, PLAIN_TEXT_MIME_TYPE,
};
use reqwest::{Client, RequestBuilder, Response, Url};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Default Drive v3 base URL.
pub const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

/// Default Docs v1 base URL.
pub const DOCS_API_BASE: &str = "https://docs.googleapis.com/v1";

/// Supplies bearer tokens for API calls.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Returns a currently valid access token.
    async fn access_token(&self) -> SyncResult<String>;
}

/// A token source that always returns the same token.
#[derive(Clone)]
pub struct StaticToken {
    token: String,
}

impl StaticToken {
    /// Creates a static token source.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl std::fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticToken").finish_non_exhaustive()
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn access_token(&self) -> SyncResult<String> {
        if self.token.is_empty() {
            return Err(SyncError::upstream("no API access token configured"));
        }
        Ok(self.token.clone())
    }
}

/// Base URLs of the REST APIs.
#[derive(Debug, Clone)]
pub struct ApiEndpoints {
    /// Drive API base URL.
    pub drive: String,
    /// Docs API base URL.
    pub docs: String,
}

impl Default for ApiEndpoints {
    fn default() -> Self {
        Self {
            drive: DRIVE_API_BASE.to_string(),
            docs: DOCS_API_BASE.to_string(),
        }
    }
}

/// HTTP-based document client.
pub struct HttpDocumentClient {
    http: Client,
    endpoints: ApiEndpoints,
    tokens: Arc<dyn TokenSource>,
}

impl HttpDocumentClient {
    /// Creates a client against the default endpoints.
    pub fn new(tokens: Arc<dyn TokenSource>) -> SyncResult<Self> {
        Self::with_endpoints(tokens, ApiEndpoints::default())
    }

    /// Creates a client against custom endpoints.
    pub fn with_endpoints(tokens: Arc<dyn TokenSource>, endpoints: ApiEndpoints) -> SyncResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| SyncError::upstream(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoints,
            tokens,
        })
    }

    /// Returns the configured endpoints.
    pub fn endpoints(&self) -> &ApiEndpoints {
        &self.endpoints
    }

    /// Sends an authenticated request and checks the response status.
    async fn send(&self, request: RequestBuilder) -> SyncResult<Response> {
        let token = self.tokens.access_token().await?;
        let response = request.bearer_auth(token).send().await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        debug!(status = status.as_u16(), body = %body, "API request failed");
        Err(SyncError::upstream_status(
            status.as_u16(),
            api_error_message(&body).unwrap_or_else(|| format!("request failed with status {}", status)),
        ))
    }
}

/// Builds `base/segments...`, percent-encoding each segment.
fn endpoint(base: &str, segments: &[&str]) -> SyncResult<Url> {
    let mut url =
        Url::parse(base).map_err(|e| SyncError::upstream(format!("invalid API base URL: {}", e)))?;
    url.path_segments_mut()
        .map_err(|_| SyncError::upstream(format!("API base URL cannot be a base: {}", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Extracts `error.message` from a Google API error body.
fn api_error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let error = value.get("error")?;
    error
        .get("message")
        .and_then(Value::as_str)
        .or_else(|| error.as_str())
        .map(str::to_owned)
}

#[async_trait]
impl DocumentClient for HttpDocumentClient {
    async fn create_file(&self, file: &NewFile) -> SyncResult<FileHandle> {
        let url = endpoint(&self.endpoints.drive, &["files"])?;
        let request = self.http.post(url).query(&[("fields", "id")]).json(file);
        Ok(self.send(request).await?.json().await?)
    }

    async fn grant_permission(&self, file_id: &str, grant: &PermissionGrant) -> SyncResult<()> {
        let url = endpoint(&self.endpoints.drive, &["files", file_id, "permissions"])?;
        self.send(self.http.post(url).json(grant)).await?;
        Ok(())
    }

    async fn get_document(&self, document_id: &str) -> SyncResult<Document> {
        let url = endpoint(&self.endpoints.docs, &["documents", document_id])?;
        let request = self.http.get(url).query(&[("fields", "body/content")]);
        Ok(self.send(request).await?.json().await?)
    }

    async fn batch_update(
        &self,
        document_id: &str,
        batch: &BatchUpdateRequest,
    ) -> SyncResult<BatchUpdateResponse> {
        let target = format!("{}:batchUpdate", document_id);
        let url = endpoint(&self.endpoints.docs, &["documents", &target])?;
        Ok(self.send(self.http.post(url).json(batch)).await?.json().await?)
    }

    async fn list_files(&self, folder_id: &str) -> SyncResult<Vec<DriveFile>> {
        let url = endpoint(&self.endpoints.drive, &["files"])?;
        let query = format!(
            "'{}' in parents and trashed = false",
            folder_id.replace('\\', "\\\\").replace('\'', "\\'")
        );
        let request = self.http.get(url).query(&[
            ("q", query.as_str()),
            (
                "fields",
                "files(id, name, mimeType, webViewLink, webContentLink)",
            ),
        ]);
        let list: FileList = self.send(request).await?.json().await?;
        Ok(list.files)
    }

    async fn file_mime_type(&self, file_id: &str) -> SyncResult<String> {
        let url = endpoint(&self.endpoints.drive, &["files", file_id])?;
        let request = self.http.get(url).query(&[("fields", "mimeType")]);
        let value: Value = self.send(request).await?.json().await?;
        value
            .get("mimeType")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| SyncError::upstream("response is missing mimeType"))
    }

    async fn export_text(&self, file_id: &str) -> SyncResult<String> {
        let url = endpoint(&self.endpoints.drive, &["files", file_id, "export"])?;
        let request = self
            .http
            .get(url)
            .query(&[("mimeType", PLAIN_TEXT_MIME_TYPE)]);
        Ok(self.send(request).await?.text().await?)
    }

    async fn download_text(&self, file_id: &str) -> SyncResult<String> {
        let url = endpoint(&self.endpoints.drive, &["files", file_id])?;
        let request = self.http.get(url).query(&[("alt", "media")]);
        Ok(self.send(request).await?.text().await?)
    }
}
