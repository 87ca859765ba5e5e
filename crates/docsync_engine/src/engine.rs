//! Document sync engine.

use crate::client::DocumentClient;
use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use docsync_protocol::{
    document_url, BatchUpdateRequest, Document, DriveFile, MutationRequest, NewFile,
    PermissionGrant, BODY_START_INDEX, DOCUMENT_MIME_TYPE,
};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

/// A document the engine created or rewrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncedDocument {
    /// Document id.
    pub document_id: String,
    /// Canonical viewer URL.
    pub url: String,
}

/// Computes the length of a document's body content.
///
/// The result is the largest `end_index - 1` across all structural elements,
/// seeded at 1 so an empty document still reports its boundary unit.
/// Elements may nest or overlap, so only the furthest boundary counts.
pub fn content_length(document: &Document) -> u32 {
    document
        .content()
        .unwrap_or_default()
        .iter()
        .filter_map(|element| element.end_index)
        .fold(BODY_START_INDEX, |max, end| max.max(end.saturating_sub(1)))
}

/// Builds the batch that replaces a body of `content_length` with `text`.
///
/// The delete, when present, always precedes the insert. An empty body gets
/// no delete because the API rejects empty ranges.
pub fn replace_requests(content_length: u32, text: &str) -> Vec<MutationRequest> {
    let mut requests = Vec::with_capacity(2);
    if content_length > BODY_START_INDEX {
        requests.push(MutationRequest::delete_range(BODY_START_INDEX, content_length));
    }
    requests.push(MutationRequest::insert_text(BODY_START_INDEX, text));
    requests
}

/// The sync engine creates and rewrites remote documents.
///
/// The engine holds no per-document state, so one instance can serve
/// concurrent requests for different documents. Concurrent replaces of the
/// same document are not coordinated: the last batch wins.
pub struct SyncEngine {
    config: SyncConfig,
    client: Arc<dyn DocumentClient>,
}

impl SyncEngine {
    /// Creates a new sync engine.
    pub fn new(config: SyncConfig, client: Arc<dyn DocumentClient>) -> Self {
        Self { config, client }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Returns the canonical viewer URL of a document.
    pub fn document_url(&self, document_id: &str) -> String {
        document_url(&self.config.viewer_host, document_id)
    }

    /// Creates a document in the target folder whose body is `text`.
    ///
    /// If the document is created but the text cannot be inserted, the error
    /// carries the id of the empty document.
    pub async fn create_document(&self, owner: &str, text: &str) -> SyncResult<SyncedDocument> {
        if text.is_empty() {
            return Err(SyncError::InvalidInput("Text is required".into()));
        }

        let file = NewFile::document(self.generate_name(), self.config.folder_id.clone());
        let handle = self.client.create_file(&file).await?;
        let document_id = handle.id;
        info!(document_id = %document_id, owner = %owner, name = %file.name, "created document");

        self.grant_collaborator(&document_id).await;

        let batch = BatchUpdateRequest::new(vec![MutationRequest::insert_text(
            BODY_START_INDEX,
            text,
        )]);
        if let Err(e) = self.client.batch_update(&document_id, &batch).await {
            return Err(SyncError::FailedToSeedContent {
                document_id,
                message: e.detail().to_string(),
            });
        }

        debug!(document_id = %document_id, len = text.len(), "seeded document content");
        Ok(SyncedDocument {
            url: self.document_url(&document_id),
            document_id,
        })
    }

    /// Makes the body of an existing document exactly `new_text`.
    ///
    /// Reads the body structure, then submits delete-then-insert as a single
    /// batch so readers never observe a half-updated document.
    pub async fn replace_content(
        &self,
        document_id: &str,
        new_text: &str,
    ) -> SyncResult<SyncedDocument> {
        if document_id.is_empty() || new_text.is_empty() {
            return Err(SyncError::InvalidInput(
                "File ID and text are required".into(),
            ));
        }

        let document = self.client.get_document(document_id).await?;
        let length = content_length(&document);
        let requests = replace_requests(length, new_text);
        debug!(
            document_id = %document_id,
            content_length = length,
            requests = requests.len(),
            "replacing document content"
        );

        self.client
            .batch_update(document_id, &BatchUpdateRequest::new(requests))
            .await?;

        info!(document_id = %document_id, "replaced document content");
        Ok(SyncedDocument {
            document_id: document_id.to_string(),
            url: self.document_url(document_id),
        })
    }

    /// Lists the files in the target folder.
    pub async fn list_documents(&self) -> SyncResult<Vec<DriveFile>> {
        self.client.list_files(&self.config.folder_id).await
    }

    /// Reads a file as plain text.
    ///
    /// Native documents are exported; other files are downloaded as-is.
    pub async fn read_text(&self, file_id: &str) -> SyncResult<String> {
        if file_id.is_empty() {
            return Err(SyncError::InvalidInput("File ID is required".into()));
        }

        let mime_type = self.client.file_mime_type(file_id).await?;
        if mime_type == DOCUMENT_MIME_TYPE {
            self.client.export_text(file_id).await
        } else {
            self.client.download_text(file_id).await
        }
    }

    /// Grants the configured collaborator access to a new document.
    ///
    /// Failure is logged and otherwise ignored; the owner keeps access.
    async fn grant_collaborator(&self, document_id: &str) {
        let Some(email) = self.config.default_collaborator.as_deref() else {
            return;
        };

        let grant = PermissionGrant::user(self.config.collaborator_role.clone(), email);
        match self.client.grant_permission(document_id, &grant).await {
            Ok(()) => debug!(document_id = %document_id, collaborator = %email, "granted access"),
            Err(e) => warn!(
                document_id = %document_id,
                collaborator = %email,
                error = %e,
                "failed to grant collaborator access"
            ),
        }
    }

    fn generate_name(&self) -> String {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        format!("{}{}", self.config.name_prefix, millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ClientCall, MemoryDocumentClient, Primitive};
    use docsync_protocol::StructuralElement;
    use proptest::prelude::*;

    fn engine_with(client: Arc<MemoryDocumentClient>, config: SyncConfig) -> SyncEngine {
        SyncEngine::new(config, client)
    }

    /// Records the level of every event emitted while installed.
    #[derive(Clone, Default)]
    struct LevelRecorder {
        levels: Arc<parking_lot::Mutex<Vec<tracing::Level>>>,
    }

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for LevelRecorder {
        fn on_event(
            &self,
            event: &tracing::Event<'_>,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            self.levels.lock().push(*event.metadata().level());
        }
    }

    fn doc(ends: &[Option<u32>]) -> Document {
        Document::with_content(
            ends.iter()
                .map(|end| StructuralElement {
                    start_index: None,
                    end_index: *end,
                })
                .collect(),
        )
    }

    #[test]
    fn content_length_takes_max_not_sum() {
        assert_eq!(content_length(&doc(&[Some(5), Some(12), Some(3)])), 11);
    }

    #[test]
    fn content_length_defaults_to_one() {
        assert_eq!(content_length(&Document::default()), 1);
        assert_eq!(content_length(&doc(&[])), 1);
        assert_eq!(content_length(&doc(&[None, None])), 1);
        assert_eq!(content_length(&doc(&[Some(1)])), 1);
        assert_eq!(content_length(&doc(&[Some(0)])), 1);
    }

    #[test]
    fn content_length_skips_missing_end() {
        assert_eq!(content_length(&doc(&[None, Some(13), None])), 12);
    }

    #[test]
    fn replace_requests_for_empty_body() {
        let requests = replace_requests(1, "hi");
        assert_eq!(requests, vec![MutationRequest::insert_text(1, "hi")]);
    }

    #[test]
    fn replace_requests_delete_first() {
        let requests = replace_requests(12, "hello");
        assert_eq!(
            requests,
            vec![
                MutationRequest::delete_range(1, 12),
                MutationRequest::insert_text(1, "hello"),
            ]
        );
    }

    proptest! {
        #[test]
        fn content_length_is_max_end_minus_one(ends in prop::collection::vec(prop::option::of(0u32..10_000), 0..20)) {
            let expected = ends
                .iter()
                .flatten()
                .map(|e| e.saturating_sub(1))
                .max()
                .unwrap_or(1)
                .max(1);
            prop_assert_eq!(content_length(&doc(&ends)), expected);
        }

        #[test]
        fn content_length_ignores_element_order(mut ends in prop::collection::vec(prop::option::of(0u32..10_000), 0..20)) {
            let forward = content_length(&doc(&ends));
            ends.reverse();
            prop_assert_eq!(content_length(&doc(&ends)), forward);
        }
    }

    #[tokio::test]
    async fn create_rejects_empty_text_without_calls() {
        let client = Arc::new(MemoryDocumentClient::new());
        let engine = engine_with(Arc::clone(&client), SyncConfig::new("folder"));

        let result = engine.create_document("alice", "").await;
        assert!(matches!(result, Err(SyncError::InvalidInput(_))));
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn create_seeds_text() {
        let client = Arc::new(MemoryDocumentClient::new());
        let engine = engine_with(Arc::clone(&client), SyncConfig::new("folder"));

        let created = engine.create_document("alice", "Dear Bob").await.unwrap();
        assert_eq!(client.text(&created.document_id).as_deref(), Some("Dear Bob"));
        assert_eq!(
            created.url,
            format!("https://docs.google.com/document/d/{}", created.document_id)
        );

        let calls = client.calls();
        match &calls[0] {
            ClientCall::CreateFile { file } => {
                assert!(file.name.starts_with("Document_"));
                assert_eq!(file.mime_type, DOCUMENT_MIME_TYPE);
                assert_eq!(file.parents, vec!["folder".to_string()]);
            }
            other => panic!("unexpected first call: {:?}", other),
        }
        assert_eq!(
            client.batches(),
            vec![vec![MutationRequest::insert_text(1, "Dear Bob")]]
        );
    }

    #[tokio::test]
    async fn create_grants_collaborator() {
        let client = Arc::new(MemoryDocumentClient::new());
        let config =
            SyncConfig::new("folder").with_default_collaborator(Some("bot@example.com".into()));
        let engine = engine_with(Arc::clone(&client), config);

        let created = engine.create_document("alice", "x").await.unwrap();
        let grants = client.permissions(&created.document_id);
        assert_eq!(grants, vec![PermissionGrant::user("writer", "bot@example.com")]);
    }

    #[tokio::test]
    async fn create_without_collaborator_skips_grant() {
        let client = Arc::new(MemoryDocumentClient::new());
        let engine = engine_with(Arc::clone(&client), SyncConfig::new("folder"));

        engine.create_document("alice", "x").await.unwrap();
        assert!(client
            .calls()
            .iter()
            .all(|c| c.primitive() != Primitive::GrantPermission));
    }

    #[tokio::test]
    async fn grant_failure_does_not_abort_create() {
        let client = Arc::new(MemoryDocumentClient::new());
        client.fail(Primitive::GrantPermission);
        let config =
            SyncConfig::new("folder").with_default_collaborator(Some("bot@example.com".into()));
        let engine = engine_with(Arc::clone(&client), config);

        let created = engine.create_document("alice", "still here").await.unwrap();
        assert_eq!(client.text(&created.document_id).as_deref(), Some("still here"));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn grant_failure_is_a_warning() {
        use tracing_subscriber::layer::SubscriberExt;

        let recorder = LevelRecorder::default();
        let _guard =
            tracing::subscriber::set_default(tracing_subscriber::registry().with(recorder.clone()));

        let client = Arc::new(MemoryDocumentClient::new());
        client.fail(Primitive::GrantPermission);
        let config =
            SyncConfig::new("folder").with_default_collaborator(Some("bot@example.com".into()));
        let engine = engine_with(Arc::clone(&client), config);
        engine.create_document("alice", "x").await.unwrap();

        let levels = recorder.levels.lock();
        assert!(levels.contains(&tracing::Level::WARN));
        assert!(!levels.contains(&tracing::Level::ERROR));
    }

    #[tokio::test]
    async fn create_failure_returns_no_document() {
        let client = Arc::new(MemoryDocumentClient::new());
        client.fail(Primitive::CreateFile);
        let engine = engine_with(Arc::clone(&client), SyncConfig::new("folder"));

        let err = engine.create_document("alice", "x").await.unwrap_err();
        assert!(matches!(err, SyncError::Upstream { .. }));
        assert!(err.orphaned_document().is_none());
        assert!(client.batches().is_empty());
    }

    #[tokio::test]
    async fn seed_failure_reports_orphan() {
        let client = Arc::new(MemoryDocumentClient::new());
        client.fail(Primitive::BatchUpdate);
        let engine = engine_with(Arc::clone(&client), SyncConfig::new("folder"));

        let err = engine.create_document("alice", "x").await.unwrap_err();
        let orphan = err.orphaned_document().unwrap().to_string();
        assert_eq!(err.kind(), "FAILED_TO_SEED_CONTENT");
        assert_eq!(client.text(&orphan).as_deref(), Some(""));
    }

    #[tokio::test]
    async fn replace_rejects_missing_input_without_calls() {
        let client = Arc::new(MemoryDocumentClient::new());
        let engine = engine_with(Arc::clone(&client), SyncConfig::new("folder"));

        assert!(matches!(
            engine.replace_content("", "text").await,
            Err(SyncError::InvalidInput(_))
        ));
        assert!(matches!(
            engine.replace_content("doc", "").await,
            Err(SyncError::InvalidInput(_))
        ));
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn replace_existing_content() {
        let client = Arc::new(MemoryDocumentClient::new());
        client.insert_document("abc123", "old content");
        let engine = engine_with(Arc::clone(&client), SyncConfig::new("folder"));

        let result = engine.replace_content("abc123", "hello").await.unwrap();
        assert_eq!(result.document_id, "abc123");
        assert_eq!(result.url, "https://docs.google.com/document/d/abc123");
        assert_eq!(client.text("abc123").as_deref(), Some("hello"));
        assert_eq!(
            client.batches(),
            vec![vec![
                MutationRequest::delete_range(1, 12),
                MutationRequest::insert_text(1, "hello"),
            ]]
        );
    }

    #[tokio::test]
    async fn replace_empty_document_skips_delete() {
        let client = Arc::new(MemoryDocumentClient::new());
        client.insert_document("empty", "");
        let engine = engine_with(Arc::clone(&client), SyncConfig::new("folder"));

        engine.replace_content("empty", "first").await.unwrap();
        let batches = client.batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].iter().filter(|r| r.is_delete()).count(), 0);
        assert_eq!(batches[0].iter().filter(|r| r.is_insert()).count(), 1);
        assert_eq!(client.text("empty").as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn replace_is_idempotent() {
        let client = Arc::new(MemoryDocumentClient::new());
        client.insert_document("doc", "something\nlonger");
        let engine = engine_with(Arc::clone(&client), SyncConfig::new("folder"));

        engine.replace_content("doc", "same text").await.unwrap();
        assert_eq!(client.text("doc").as_deref(), Some("same text"));
        engine.replace_content("doc", "same text").await.unwrap();
        assert_eq!(client.text("doc").as_deref(), Some("same text"));

        let batches = client.batches();
        let inserted = "same text".encode_utf16().count() as u32;
        assert_eq!(batches[1][0], MutationRequest::delete_range(1, 1 + inserted));
    }

    #[tokio::test]
    async fn replace_multi_paragraph_and_non_ascii() {
        let client = Arc::new(MemoryDocumentClient::new());
        client.insert_document("doc", "line one\nline two\n\u{1F600} three");
        let engine = engine_with(Arc::clone(&client), SyncConfig::new("folder"));

        engine.replace_content("doc", "new\nbody").await.unwrap();
        assert_eq!(client.text("doc").as_deref(), Some("new\nbody"));
    }

    #[tokio::test]
    async fn replace_missing_document_is_upstream_failure() {
        let client = Arc::new(MemoryDocumentClient::new());
        let engine = engine_with(Arc::clone(&client), SyncConfig::new("folder"));

        let err = engine.replace_content("nope", "x").await.unwrap_err();
        assert_eq!(err.kind(), "UPSTREAM_FAILURE");
        assert!(client.batches().is_empty());
    }

    #[tokio::test]
    async fn read_text_exports_documents_and_downloads_files() {
        let client = Arc::new(MemoryDocumentClient::new());
        client.insert_document("doc", "from docs");
        client.insert_file("txt", "folder", "text/plain", "from drive");
        let engine = engine_with(Arc::clone(&client), SyncConfig::new("folder"));

        assert_eq!(engine.read_text("doc").await.unwrap(), "from docs");
        assert_eq!(engine.read_text("txt").await.unwrap(), "from drive");

        let primitives: Vec<_> = client.calls().iter().map(|c| c.primitive()).collect();
        assert_eq!(
            primitives,
            vec![
                Primitive::FileMimeType,
                Primitive::ExportText,
                Primitive::FileMimeType,
                Primitive::DownloadText,
            ]
        );
    }

    #[tokio::test]
    async fn list_documents_uses_target_folder() {
        let client = Arc::new(MemoryDocumentClient::new());
        let engine = engine_with(Arc::clone(&client), SyncConfig::new("folder"));

        let created = engine.create_document("alice", "x").await.unwrap();
        let files = engine.list_documents().await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].id, created.document_id);
        assert!(files[0].is_document());
    }
}
