//! Authentication for the HTTP surface.
//!
//! Sessions are referenced by a cookie of the form `<session id>.<signature>`,
//! where the signature is an HMAC-SHA256 of the session id, base64url encoded
//! without padding. A cookie whose signature does not verify is treated as
//! absent.
//!
//! The gate itself is [`authorize`], a pure decision over the resolved session
//! and the current time. [`require_session`] wires it into axum.

use crate::error::{ServerError, ServerResult};
use crate::handler::HandlerContext;
use crate::session::{now_millis, Session, UserProfile};
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use axum_extra::extract::cookie::CookieJar;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use std::sync::Arc;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

/// Message returned with every gate rejection.
pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized! Please log in.";

/// Signs and verifies session cookie values.
#[derive(Clone)]
pub struct SessionSigner {
    mac: HmacSha256,
}

impl SessionSigner {
    /// Creates a signer keyed with `secret`.
    ///
    /// An empty secret is rejected.
    pub fn new(secret: &[u8]) -> ServerResult<Self> {
        if secret.is_empty() {
            return Err(ServerError::Config("session secret must not be empty".into()));
        }
        let mac = HmacSha256::new_from_slice(secret)
            .map_err(|e| ServerError::Config(format!("invalid session secret: {}", e)))?;
        Ok(Self { mac })
    }

    /// Produces the cookie value for `session_id`.
    pub fn sign(&self, session_id: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(session_id.as_bytes());
        let signature = mac.finalize().into_bytes();
        format!("{}.{}", session_id, URL_SAFE_NO_PAD.encode(signature))
    }

    /// Verifies a cookie value and returns the session id it carries.
    pub fn verify(&self, cookie_value: &str) -> Option<String> {
        let (session_id, signature) = cookie_value.rsplit_once('.')?;
        if session_id.is_empty() {
            return None;
        }
        let signature = URL_SAFE_NO_PAD.decode(signature).ok()?;

        let mut mac = self.mac.clone();
        mac.update(session_id.as_bytes());
        // Constant-time comparison.
        mac.verify_slice(&signature).ok()?;
        Some(session_id.to_string())
    }
}

impl std::fmt::Debug for SessionSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSigner").finish_non_exhaustive()
    }
}

/// A request that passed the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorized {
    /// Session id.
    pub session_id: String,
    /// The signed-in user.
    pub identity: UserProfile,
}

/// Why the gate refused a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejected {
    /// No live, authenticated session.
    Unauthenticated,
}

impl Rejected {
    /// Returns the stable machine-readable reason.
    pub fn reason(&self) -> &'static str {
        match self {
            Rejected::Unauthenticated => "UNAUTHENTICATED",
        }
    }
}

impl IntoResponse for Rejected {
    fn into_response(self) -> Response {
        let body = json!({
            "message": UNAUTHORIZED_MESSAGE,
            "reason": self.reason(),
        });
        (StatusCode::UNAUTHORIZED, Json(body)).into_response()
    }
}

/// Decides whether a request may proceed.
///
/// Passes only when a session is present, marked authenticated and not
/// expired at `now_ms`.
pub fn authorize(session: Option<&Session>, now_ms: u64) -> Result<Authorized, Rejected> {
    match session {
        Some(session) if session.authenticated && !session.is_expired(now_ms) => Ok(Authorized {
            session_id: session.id.clone(),
            identity: session.identity.clone(),
        }),
        _ => Err(Rejected::Unauthenticated),
    }
}

/// Middleware guarding routes that need a signed-in user.
///
/// On success the user's [`UserProfile`] is inserted into the request
/// extensions; on failure the request never reaches the handler.
pub async fn require_session(
    State(ctx): State<Arc<HandlerContext>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let session = ctx.resolve_session(&jar).await;
    match authorize(session.as_ref(), now_millis()) {
        Ok(authorized) => {
            request.extensions_mut().insert(authorized.identity);
            next.run(request).await
        }
        Err(rejected) => {
            debug!(path = %request.uri().path(), "rejected unauthenticated request");
            rejected.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn signer() -> SessionSigner {
        SessionSigner::new(b"test-secret-key-32-bytes-long!!").unwrap()
    }

    fn session(ttl: Duration) -> Session {
        Session::new(
            UserProfile {
                id: "1".into(),
                display_name: "Alice".into(),
                email: None,
                picture: None,
                provider: "google".into(),
            },
            ttl,
        )
    }

    #[test]
    fn sign_and_verify() {
        let signer = signer();
        let value = signer.sign("abc123");
        assert!(value.starts_with("abc123."));
        assert_eq!(signer.verify(&value).as_deref(), Some("abc123"));
    }

    #[test]
    fn reject_tampered_signature() {
        let signer = signer();
        let value = signer.sign("abc123");
        let (id, signature) = value.rsplit_once('.').unwrap();
        let first = signature.chars().next().unwrap();
        let flipped = if first == 'A' { 'B' } else { 'A' };
        let tampered = format!("{}.{}{}", id, flipped, &signature[1..]);
        assert!(signer.verify(&tampered).is_none());
    }

    #[test]
    fn reject_swapped_session_id() {
        let signer = signer();
        let value = signer.sign("abc123");
        let signature = value.rsplit_once('.').unwrap().1;
        assert!(signer.verify(&format!("other.{}", signature)).is_none());
    }

    #[test]
    fn reject_other_key() {
        let value = signer().sign("abc123");
        let other = SessionSigner::new(b"another-secret").unwrap();
        assert!(other.verify(&value).is_none());
    }

    #[test]
    fn reject_malformed_values() {
        let signer = signer();
        assert!(signer.verify("").is_none());
        assert!(signer.verify("no-dot").is_none());
        assert!(signer.verify(".sig").is_none());
        assert!(signer.verify("abc.!!!not-base64").is_none());
    }

    #[test]
    fn empty_secret_is_rejected() {
        assert!(SessionSigner::new(b"").is_err());
    }

    #[test]
    fn authorize_live_session() {
        let session = session(Duration::from_secs(60));
        let authorized = authorize(Some(&session), session.created_at_ms).unwrap();
        assert_eq!(authorized.session_id, session.id);
        assert_eq!(authorized.identity.display_name, "Alice");
    }

    #[test]
    fn reject_missing_session() {
        assert_eq!(authorize(None, 0), Err(Rejected::Unauthenticated));
    }

    #[test]
    fn reject_unauthenticated_session() {
        let mut session = session(Duration::from_secs(60));
        session.authenticated = false;
        assert_eq!(
            authorize(Some(&session), session.created_at_ms),
            Err(Rejected::Unauthenticated)
        );
    }

    #[test]
    fn reject_expired_session() {
        let session = session(Duration::from_secs(60));
        let later = session.expires_at_ms();
        assert_eq!(authorize(Some(&session), later), Err(Rejected::Unauthenticated));
    }

    #[test]
    fn rejection_reason() {
        assert_eq!(Rejected::Unauthenticated.reason(), "UNAUTHENTICATED");
        let response = Rejected::Unauthenticated.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
