//! Configuration for the sync engine.

/// Default host of the document viewer.
pub const DEFAULT_VIEWER_HOST: &str = "docs.google.com";

/// Configuration for document sync.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Folder new documents are created in.
    pub folder_id: String,
    /// Account granted access to every created document, if any.
    pub default_collaborator: Option<String>,
    /// Role granted to the collaborator.
    pub collaborator_role: String,
    /// Host used to build viewer URLs.
    pub viewer_host: String,
    /// Prefix of generated document names.
    pub name_prefix: String,
}

impl SyncConfig {
    /// Creates a configuration targeting the given folder.
    pub fn new(folder_id: impl Into<String>) -> Self {
        Self {
            folder_id: folder_id.into(),
            default_collaborator: None,
            collaborator_role: "writer".to_string(),
            viewer_host: DEFAULT_VIEWER_HOST.to_string(),
            name_prefix: "Document_".to_string(),
        }
    }

    /// Sets the collaborator granted access to created documents.
    ///
    /// `None` disables the grant.
    pub fn with_default_collaborator(mut self, email: Option<String>) -> Self {
        self.default_collaborator = email.filter(|e| !e.trim().is_empty());
        self
    }

    /// Sets the role granted to the collaborator.
    pub fn with_collaborator_role(mut self, role: impl Into<String>) -> Self {
        self.collaborator_role = role.into();
        self
    }

    /// Sets the viewer host.
    pub fn with_viewer_host(mut self, host: impl Into<String>) -> Self {
        self.viewer_host = host.into();
        self
    }

    /// Sets the prefix of generated document names.
    pub fn with_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.name_prefix = prefix.into();
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new("")
    }
}
