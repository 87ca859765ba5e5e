//! Drive file metadata and permissions.

use serde::{Deserialize, Serialize};

/// MIME type of a native Google Docs document.
pub const DOCUMENT_MIME_TYPE: &str = "application/vnd.google-apps.document";

/// MIME type used when exporting or serving plain text.
pub const PLAIN_TEXT_MIME_TYPE: &str = "text/plain";

/// Metadata for a file to be created with `files.create`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFile {
    /// File name.
    pub name: String,
    /// MIME type; a document type creates an empty native document.
    pub mime_type: String,
    /// Parent folder ids.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<String>,
}

impl NewFile {
    /// Describes an empty document named `name` inside `folder_id`.
    pub fn document(name: impl Into<String>, folder_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mime_type: DOCUMENT_MIME_TYPE.to_string(),
            parents: vec![folder_id.into()],
        }
    }
}

/// The id of a created file (`fields=id`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHandle {
    /// File id.
    pub id: String,
}

/// A file listed from a folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    /// File id.
    pub id: String,
    /// File name.
    #[serde(default)]
    pub name: String,
    /// MIME type.
    #[serde(default)]
    pub mime_type: String,
    /// Link to open the file in a browser.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_view_link: Option<String>,
    /// Direct download link (absent for native documents).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_content_link: Option<String>,
}

impl DriveFile {
    /// Returns true if this file is a native document.
    pub fn is_document(&self) -> bool {
        self.mime_type == DOCUMENT_MIME_TYPE
    }
}

/// Response of `files.list`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileList {
    /// Files matching the query.
    #[serde(default)]
    pub files: Vec<DriveFile>,
}

/// Body of `permissions.create`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionGrant {
    /// Role such as `writer` or `reader`.
    pub role: String,
    /// Grantee type, `user` for a single account.
    #[serde(rename = "type")]
    pub grantee_type: String,
    /// Grantee email address.
    pub email_address: String,
}

impl PermissionGrant {
    /// Grants `role` to the user account `email`.
    pub fn user(role: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            grantee_type: "user".to_string(),
            email_address: email.into(),
        }
    }
}

/// Builds the canonical viewer URL of a document.
pub fn document_url(host: &str, document_id: &str) -> String {
    format!("https://{}/document/d/{}", host, document_id)
}
