//! Batch mutation requests for `documents.batchUpdate`.

use serde::{Deserialize, Serialize};

/// First offset of the body that can be targeted by an edit.
///
/// Offset 0 is the section break that opens every document and must never be
/// the start of an insert or delete.
pub const BODY_START_INDEX: u32 = 1;

/// A position inside the document body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    /// Offset in UTF-16 code units.
    pub index: u32,
}

/// A half-open range `[start_index, end_index)` inside the document body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Range {
    /// Inclusive start offset.
    pub start_index: u32,
    /// Exclusive end offset.
    pub end_index: u32,
}

impl Range {
    /// Returns the number of units covered by the range.
    pub fn len(&self) -> u32 {
        self.end_index.saturating_sub(self.start_index)
    }

    /// Returns true if the range covers nothing.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A single content mutation.
///
/// Serialized externally tagged, e.g.
/// `{"deleteContentRange": {"range": {"startIndex": 1, "endIndex": 12}}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MutationRequest {
    /// Deletes the content in a range.
    #[serde(rename_all = "camelCase")]
    DeleteContentRange {
        /// Range to delete.
        range: Range,
    },
    /// Inserts text at a location.
    #[serde(rename_all = "camelCase")]
    InsertText {
        /// Insertion point.
        location: Location,
        /// Text to insert.
        text: String,
    },
}

impl MutationRequest {
    /// Creates a delete of `[start, end)`.
    pub fn delete_range(start: u32, end: u32) -> Self {
        Self::DeleteContentRange {
            range: Range {
                start_index: start,
                end_index: end,
            },
        }
    }

    /// Creates an insert of `text` at `index`.
    pub fn insert_text(index: u32, text: impl Into<String>) -> Self {
        Self::InsertText {
            location: Location { index },
            text: text.into(),
        }
    }

    /// Returns true if this is a delete request.
    pub fn is_delete(&self) -> bool {
        matches!(self, Self::DeleteContentRange { .. })
    }

    /// Returns true if this is an insert request.
    pub fn is_insert(&self) -> bool {
        matches!(self, Self::InsertText { .. })
    }
}

/// Body of a `documents.batchUpdate` call.
///
/// Requests are applied in order, as one transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchUpdateRequest {
    /// Ordered mutations.
    pub requests: Vec<MutationRequest>,
}

impl BatchUpdateRequest {
    /// Creates a batch from a list of mutations.
    pub fn new(requests: Vec<MutationRequest>) -> Self {
        Self { requests }
    }
}

/// Response of a `documents.batchUpdate` call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchUpdateResponse {
    /// Document the batch was applied to.
    #[serde(default)]
    pub document_id: Option<String>,
    /// One reply per request; empty objects for inserts and deletes.
    #[serde(default)]
    pub replies: Vec<Reply>,
}

/// Opaque per-request reply. Inserts and deletes reply with `{}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reply {}
