//! # Docsync Engine
//!
//! Document client and sync engine for docsync.
//!
//! This crate provides:
//! - `DocumentClient`, the capability the engine needs from the hosting API
//! - An HTTP client for the Drive v3 / Docs v1 REST APIs
//! - An in-memory client for tests
//! - `SyncEngine`: create-with-text and replace-all-content
//!
//! ## Replace-all-content
//!
//! The backing API has no "set body" primitive, only positional inserts and
//! deletes. A full replace is therefore one batch:
//! 1. Delete `[1, contentLength)` if the body has content
//! 2. Insert the new text at index 1
//!
//! ## Key Invariants
//!
//! - Offset 0 (the opening section break) is never targeted
//! - The delete always precedes the insert inside the batch
//! - An empty body never receives a delete
//! - Invalid input fails before any network call

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod client;
mod config;
mod engine;
mod error;
mod http;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use client::{ClientCall, DocumentClient, MemoryDocumentClient, Primitive};
pub use config::{SyncConfig, DEFAULT_VIEWER_HOST};
pub use engine::{content_length, replace_requests, SyncEngine, SyncedDocument};
pub use error::{SyncError, SyncResult};
pub use http::{ApiEndpoints, HttpDocumentClient, StaticToken, TokenSource, DOCS_API_BASE, DRIVE_API_BASE};
