//! # docsync server
//!
//! HTTP service that turns text into Google Docs documents on behalf of
//! signed-in users.
//!
//! This crate provides:
//! - Google sign-in (OAuth2 authorization-code flow with a CSRF `state`)
//! - Server-side sessions referenced by an HMAC-SHA256 signed cookie
//! - An auth gate in front of every document route
//! - Create, replace, list and read endpoints backed by [`docsync_engine`]
//!
//! # Authentication
//!
//! ```rust,ignore
//! use docsync_server::{authorize, Session};
//!
//! let session: Option<Session> = store.load(&id).await?;
//! match authorize(session.as_ref(), now_ms) {
//!     Ok(authorized) => { /* proceed as authorized.identity */ }
//!     Err(rejected) => return rejected.into_response(),
//! }
//! ```
//!
//! # Routes
//!
//! | Route | Gated |
//! |---|---|
//! | `GET /`, `GET /health` | no |
//! | `GET /auth/google`, `GET /auth/google/callback` | no |
//! | `GET /auth/user`, `POST /auth/login`, `GET /auth/logout` | no |
//! | `GET /profile` | yes |
//! | `POST /save-text`, `PUT /drive/update-file/:fileId` | yes |
//! | `GET /drive/files`, `GET /drive/file-content/:fileId` | yes |

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod auth;
mod config;
mod error;
mod handler;
mod oauth;
mod server;
mod session;

pub use auth::{authorize, require_session, Authorized, Rejected, SessionSigner, UNAUTHORIZED_MESSAGE};
pub use config::{
    OAuthConfig, ServerConfig, SessionConfig, DEFAULT_COOKIE_NAME, DEFAULT_FRONTEND_ORIGIN,
    GOOGLE_AUTH_URL, GOOGLE_TOKEN_URL, GOOGLE_USERINFO_URL,
};
pub use error::{ServerError, ServerResult};
pub use handler::{
    CallbackParams, DocumentResponse, FilesResponse, HandlerContext, TextBody, STATE_COOKIE,
};
pub use oauth::{generate_state, GoogleIdentityProvider, IdentityProvider};
pub use server::{router, DocSyncServer};
pub use session::{MemorySessionStore, Session, SessionStore, UserProfile};
