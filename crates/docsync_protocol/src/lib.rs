//! # Docsync Protocol
//!
//! Wire types for the document-hosting APIs used by docsync.
//!
//! This crate provides:
//! - Document structure (`Document`, `Body`, `StructuralElement`)
//! - Batch mutation requests (`MutationRequest`, `BatchUpdateRequest`)
//! - Drive file metadata and permission grants
//!
//! All types serialize to the camelCase JSON shape the REST endpoints
//! expect. This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod document;
mod drive;
mod mutation;

pub use document::{Body, Document, StructuralElement};
pub use drive::{
    document_url, DriveFile, FileHandle, FileList, NewFile, PermissionGrant, DOCUMENT_MIME_TYPE,
    PLAIN_TEXT_MIME_TYPE,
};
pub use mutation::{
    BatchUpdateRequest, BatchUpdateResponse, Location, MutationRequest, Range, Reply,
    BODY_START_INDEX,
};
