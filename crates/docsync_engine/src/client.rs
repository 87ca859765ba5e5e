//! Document client abstraction.

use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use docsync_protocol::{
    BatchUpdateRequest, BatchUpdateResponse, Document, DriveFile, FileHandle, MutationRequest,
    NewFile, PermissionGrant, Reply, StructuralElement, BODY_START_INDEX, DOCUMENT_MIME_TYPE,
};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};

/// A document client talks to the document-hosting API.
///
/// This trait abstracts the network layer so the sync engine can run against
/// the real API or an in-memory fake.
#[async_trait]
pub trait DocumentClient: Send + Sync {
    /// Creates a file and returns its id.
    async fn create_file(&self, file: &NewFile) -> SyncResult<FileHandle>;

    /// Grants a principal access to a file.
    async fn grant_permission(&self, file_id: &str, grant: &PermissionGrant) -> SyncResult<()>;

    /// Fetches the structural metadata of a document body.
    async fn get_document(&self, document_id: &str) -> SyncResult<Document>;

    /// Applies a batch of mutations as one transaction.
    async fn batch_update(
        &self,
        document_id: &str,
        batch: &BatchUpdateRequest,
    ) -> SyncResult<BatchUpdateResponse>;

    /// Lists the non-trashed files in a folder.
    async fn list_files(&self, folder_id: &str) -> SyncResult<Vec<DriveFile>>;

    /// Returns the MIME type of a file.
    async fn file_mime_type(&self, file_id: &str) -> SyncResult<String>;

    /// Exports a native document as plain text.
    async fn export_text(&self, file_id: &str) -> SyncResult<String>;

    /// Downloads the raw content of a non-native file as text.
    async fn download_text(&self, file_id: &str) -> SyncResult<String>;
}

/// The primitive a recorded call went to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    /// `create_file`.
    CreateFile,
    /// `grant_permission`.
    GrantPermission,
    /// `get_document`.
    GetDocument,
    /// `batch_update`.
    BatchUpdate,
    /// `list_files`.
    ListFiles,
    /// `file_mime_type`.
    FileMimeType,
    /// `export_text`.
    ExportText,
    /// `download_text`.
    DownloadText,
}

/// A call observed by [`MemoryDocumentClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCall {
    /// A file was created.
    CreateFile {
        /// Requested file metadata.
        file: NewFile,
    },
    /// A permission grant was requested.
    GrantPermission {
        /// Target file.
        file_id: String,
        /// Requested grant.
        grant: PermissionGrant,
    },
    /// A document structure was fetched.
    GetDocument {
        /// Target document.
        document_id: String,
    },
    /// A batch mutation was submitted.
    BatchUpdate {
        /// Target document.
        document_id: String,
        /// Submitted mutations, in order.
        requests: Vec<MutationRequest>,
    },
    /// A folder was listed.
    ListFiles {
        /// Listed folder.
        folder_id: String,
    },
    /// A file's MIME type was read.
    FileMimeType {
        /// Target file.
        file_id: String,
    },
    /// A document was exported.
    ExportText {
        /// Target file.
        file_id: String,
    },
    /// A file was downloaded.
    DownloadText {
        /// Target file.
        file_id: String,
    },
}

impl ClientCall {
    /// Returns the primitive this call went to.
    pub fn primitive(&self) -> Primitive {
        match self {
            ClientCall::CreateFile { .. } => Primitive::CreateFile,
            ClientCall::GrantPermission { .. } => Primitive::GrantPermission,
            ClientCall::GetDocument { .. } => Primitive::GetDocument,
            ClientCall::BatchUpdate { .. } => Primitive::BatchUpdate,
            ClientCall::ListFiles { .. } => Primitive::ListFiles,
            ClientCall::FileMimeType { .. } => Primitive::FileMimeType,
            ClientCall::ExportText { .. } => Primitive::ExportText,
            ClientCall::DownloadText { .. } => Primitive::DownloadText,
        }
    }
}

#[derive(Debug, Clone)]
struct StoredFile {
    name: String,
    mime_type: String,
    parents: Vec<String>,
    trashed: bool,
    /// Body of a native document in UTF-16 units, without the terminal newline.
    body: Vec<u16>,
    /// Raw content of a non-native file.
    raw: String,
    permissions: Vec<PermissionGrant>,
}

impl StoredFile {
    fn is_document(&self) -> bool {
        self.mime_type == DOCUMENT_MIME_TYPE
    }

    /// Builds the structural elements the API reports for this body.
    ///
    /// A section break occupies `[0, 1)`. Each paragraph ends with a newline;
    /// the last one ends with the implicit terminal newline.
    fn structure(&self) -> Vec<StructuralElement> {
        let mut elements = vec![StructuralElement::ending_at(BODY_START_INDEX)];
        let mut start = BODY_START_INDEX;
        let mut offset = BODY_START_INDEX;
        for unit in &self.body {
            offset += 1;
            if *unit == u16::from(b'\n') {
                elements.push(StructuralElement::spanning(start, offset));
                start = offset;
            }
        }
        elements.push(StructuralElement::spanning(start, offset + 1));
        elements
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    files: HashMap<String, StoredFile>,
    next_id: u64,
    calls: Vec<ClientCall>,
    failing: HashSet<Primitive>,
}

impl MemoryState {
    fn record(&mut self, call: ClientCall) -> SyncResult<()> {
        let primitive = call.primitive();
        self.calls.push(call);
        if self.failing.contains(&primitive) {
            return Err(SyncError::upstream_status(
                503,
                format!("injected failure in {:?}", primitive),
            ));
        }
        Ok(())
    }

    fn file(&self, file_id: &str) -> SyncResult<&StoredFile> {
        self.files
            .get(file_id)
            .ok_or_else(|| not_found(file_id))
    }

    fn document_mut(&mut self, document_id: &str) -> SyncResult<&mut StoredFile> {
        let file = self
            .files
            .get_mut(document_id)
            .ok_or_else(|| not_found(document_id))?;
        if !file.is_document() {
            return Err(SyncError::upstream_status(
                400,
                "This operation is not supported for this document",
            ));
        }
        Ok(file)
    }
}

fn not_found(file_id: &str) -> SyncError {
    SyncError::upstream_status(404, format!("File not found: {}.", file_id))
}

fn invalid_request(message: impl Into<String>) -> SyncError {
    SyncError::upstream_status(400, message)
}

/// Applies a batch to a copy of `body`, following the API's index rules.
///
/// Index `i` addresses `body[i - 1]`; the terminal newline sits at
/// `body.len() + 1` and can be neither deleted nor inserted after.
fn apply_batch(body: &[u16], requests: &[MutationRequest]) -> SyncResult<Vec<u16>> {
    let mut working = body.to_vec();
    for (i, request) in requests.iter().enumerate() {
        let terminal = working.len() as u32 + BODY_START_INDEX;
        match request {
            MutationRequest::DeleteContentRange { range } => {
                if range.start_index < BODY_START_INDEX {
                    return Err(invalid_request(format!(
                        "Invalid requests[{}].deleteContentRange: The range cannot include the section break at index 0.",
                        i
                    )));
                }
                if range.is_empty() {
                    return Err(invalid_request(format!(
                        "Invalid requests[{}].deleteContentRange: The range should not be empty.",
                        i
                    )));
                }
                if range.end_index > terminal {
                    return Err(invalid_request(format!(
                        "Invalid requests[{}].deleteContentRange: Index {} must be less than the end index of the referenced segment, {}.",
                        i,
                        range.end_index,
                        terminal + 1
                    )));
                }
                let start = (range.start_index - BODY_START_INDEX) as usize;
                let end = (range.end_index - BODY_START_INDEX) as usize;
                working.drain(start..end);
            }
            MutationRequest::InsertText { location, text } => {
                if location.index < BODY_START_INDEX || location.index > terminal {
                    return Err(invalid_request(format!(
                        "Invalid requests[{}].insertText: Index {} must be within the bounds of an existing paragraph.",
                        i, location.index
                    )));
                }
                let at = (location.index - BODY_START_INDEX) as usize;
                working.splice(at..at, text.encode_utf16());
            }
        }
    }
    Ok(working)
}

/// An in-memory document client for testing.
///
/// Models native documents with the backing store's index conventions,
/// applies batches atomically, records every call and can be told to fail
/// individual primitives.
#[derive(Debug, Default)]
pub struct MemoryDocumentClient {
    state: Mutex<MemoryState>,
}

impl MemoryDocumentClient {
    /// Creates an empty client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a native document with the given id and text.
    pub fn insert_document(&self, document_id: &str, text: &str) {
        self.insert(
            document_id,
            StoredFile {
                name: document_id.to_string(),
                mime_type: DOCUMENT_MIME_TYPE.to_string(),
                parents: Vec::new(),
                trashed: false,
                body: text.encode_utf16().collect(),
                raw: String::new(),
                permissions: Vec::new(),
            },
        );
    }

    /// Adds a non-native file in `folder_id`.
    pub fn insert_file(&self, file_id: &str, folder_id: &str, mime_type: &str, content: &str) {
        self.insert(
            file_id,
            StoredFile {
                name: file_id.to_string(),
                mime_type: mime_type.to_string(),
                parents: vec![folder_id.to_string()],
                trashed: false,
                body: Vec::new(),
                raw: content.to_string(),
                permissions: Vec::new(),
            },
        );
    }

    fn insert(&self, file_id: &str, file: StoredFile) {
        self.state.lock().files.insert(file_id.to_string(), file);
    }

    /// Moves a file to the trash.
    pub fn trash(&self, file_id: &str) {
        if let Some(file) = self.state.lock().files.get_mut(file_id) {
            file.trashed = true;
        }
    }

    /// Returns the body text of a native document.
    pub fn text(&self, document_id: &str) -> Option<String> {
        let state = self.state.lock();
        let file = state.files.get(document_id)?;
        Some(String::from_utf16_lossy(&file.body))
    }

    /// Returns the permissions granted on a file.
    pub fn permissions(&self, file_id: &str) -> Vec<PermissionGrant> {
        self.state
            .lock()
            .files
            .get(file_id)
            .map(|f| f.permissions.clone())
            .unwrap_or_default()
    }

    /// Returns the number of stored files.
    pub fn file_count(&self) -> usize {
        self.state.lock().files.len()
    }

    /// Makes every subsequent call to `primitive` fail.
    pub fn fail(&self, primitive: Primitive) {
        self.state.lock().failing.insert(primitive);
    }

    /// Stops injecting failures into `primitive`.
    pub fn recover(&self, primitive: Primitive) {
        self.state.lock().failing.remove(&primitive);
    }

    /// Returns all recorded calls.
    pub fn calls(&self) -> Vec<ClientCall> {
        self.state.lock().calls.clone()
    }

    /// Returns the number of recorded calls.
    pub fn call_count(&self) -> usize {
        self.state.lock().calls.len()
    }

    /// Returns the requests of every recorded batch update, in order.
    pub fn batches(&self) -> Vec<Vec<MutationRequest>> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                ClientCall::BatchUpdate { requests, .. } => Some(requests.clone()),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl DocumentClient for MemoryDocumentClient {
    async fn create_file(&self, file: &NewFile) -> SyncResult<FileHandle> {
        let mut state = self.state.lock();
        state.record(ClientCall::CreateFile { file: file.clone() })?;

        state.next_id += 1;
        let id = format!("mem-{}", state.next_id);
        state.files.insert(
            id.clone(),
            StoredFile {
                name: file.name.clone(),
                mime_type: file.mime_type.clone(),
                parents: file.parents.clone(),
                trashed: false,
                body: Vec::new(),
                raw: String::new(),
                permissions: Vec::new(),
            },
        );
        Ok(FileHandle { id })
    }

    async fn grant_permission(&self, file_id: &str, grant: &PermissionGrant) -> SyncResult<()> {
        let mut state = self.state.lock();
        state.record(ClientCall::GrantPermission {
            file_id: file_id.to_string(),
            grant: grant.clone(),
        })?;

        let file = state
            .files
            .get_mut(file_id)
            .ok_or_else(|| not_found(file_id))?;
        file.permissions.push(grant.clone());
        Ok(())
    }

    async fn get_document(&self, document_id: &str) -> SyncResult<Document> {
        let mut state = self.state.lock();
        state.record(ClientCall::GetDocument {
            document_id: document_id.to_string(),
        })?;

        let file = state.document_mut(document_id)?;
        let mut document = Document::with_content(file.structure());
        document.document_id = Some(document_id.to_string());
        Ok(document)
    }

    async fn batch_update(
        &self,
        document_id: &str,
        batch: &BatchUpdateRequest,
    ) -> SyncResult<BatchUpdateResponse> {
        let mut state = self.state.lock();
        state.record(ClientCall::BatchUpdate {
            document_id: document_id.to_string(),
            requests: batch.requests.clone(),
        })?;

        let file = state.document_mut(document_id)?;
        file.body = apply_batch(&file.body, &batch.requests)?;
        Ok(BatchUpdateResponse {
            document_id: Some(document_id.to_string()),
            replies: vec![Reply::default(); batch.requests.len()],
        })
    }

    async fn list_files(&self, folder_id: &str) -> SyncResult<Vec<DriveFile>> {
        let mut state = self.state.lock();
        state.record(ClientCall::ListFiles {
            folder_id: folder_id.to_string(),
        })?;

        let mut files: Vec<DriveFile> = state
            .files
            .iter()
            .filter(|(_, f)| !f.trashed && f.parents.iter().any(|p| p == folder_id))
            .map(|(id, f)| DriveFile {
                id: id.clone(),
                name: f.name.clone(),
                mime_type: f.mime_type.clone(),
                web_view_link: Some(format!("https://drive.google.com/file/d/{}/view", id)),
                web_content_link: (!f.is_document())
                    .then(|| format!("https://drive.google.com/uc?id={}", id)),
            })
            .collect();
        files.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(files)
    }

    async fn file_mime_type(&self, file_id: &str) -> SyncResult<String> {
        let mut state = self.state.lock();
        state.record(ClientCall::FileMimeType {
            file_id: file_id.to_string(),
        })?;
        Ok(state.file(file_id)?.mime_type.clone())
    }

    async fn export_text(&self, file_id: &str) -> SyncResult<String> {
        let mut state = self.state.lock();
        state.record(ClientCall::ExportText {
            file_id: file_id.to_string(),
        })?;

        let file = state.document_mut(file_id)?;
        Ok(String::from_utf16_lossy(&file.body))
    }

    async fn download_text(&self, file_id: &str) -> SyncResult<String> {
        let mut state = self.state.lock();
        state.record(ClientCall::DownloadText {
            file_id: file_id.to_string(),
        })?;

        let file = state.file(file_id)?;
        if file.is_document() {
            return Err(invalid_request(
                "Only files with binary content can be downloaded. Use Export with Docs Editors files.",
            ));
        }
        Ok(file.raw.clone())
    }
}
