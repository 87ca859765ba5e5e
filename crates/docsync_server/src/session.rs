//! Server-side sessions.
//!
//! A session is created after a successful sign-in and referenced from the
//! browser only by its id, carried in a signed cookie. The identity itself
//! never leaves the server except through `/auth/user`.

use crate::error::ServerResult;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::debug;
use uuid::Uuid;

/// The signed-in user, as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Provider-scoped user id.
    pub id: String,
    /// Human readable name.
    pub display_name: String,
    /// Primary email address, if shared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Avatar URL, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    /// Provider name, e.g. `google`.
    pub provider: String,
}

/// A server-side session.
#[derive(Debug, Clone)]
pub struct Session {
    /// Opaque session id.
    pub id: String,
    /// The user this session belongs to.
    pub identity: UserProfile,
    /// Whether the session completed sign-in.
    pub authenticated: bool,
    /// Creation time (Unix millis).
    pub created_at_ms: u64,
    /// Lifetime.
    pub ttl: Duration,
}

impl Session {
    /// Creates an authenticated session for `identity`, starting now.
    pub fn new(identity: UserProfile, ttl: Duration) -> Self {
        Self {
            id: Uuid::new_v4().simple().to_string(),
            identity,
            authenticated: true,
            created_at_ms: now_millis(),
            ttl,
        }
    }

    /// Returns the expiry time (Unix millis).
    pub fn expires_at_ms(&self) -> u64 {
        self.created_at_ms
            .saturating_add(self.ttl.as_millis().min(u64::MAX as u128) as u64)
    }

    /// Returns true if the session has expired at `now_ms`.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at_ms()
    }
}

/// Storage for sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Creates and stores a new session for `identity`.
    async fn create(&self, identity: UserProfile) -> ServerResult<Session>;

    /// Loads a live session. Expired sessions are reported as missing.
    async fn load(&self, session_id: &str) -> ServerResult<Option<Session>>;

    /// Removes a session. Removing an unknown id is not an error.
    async fn destroy(&self, session_id: &str) -> ServerResult<()>;

    /// Drops expired sessions, returning how many were removed.
    async fn purge_expired(&self) -> ServerResult<usize> {
        Ok(0)
    }
}

/// In-memory session store.
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    ttl: Duration,
}

impl MemorySessionStore {
    /// Creates an empty store issuing sessions that live for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Inserts a prepared session.
    pub fn insert(&self, session: Session) {
        self.sessions.write().insert(session.id.clone(), session);
    }

    /// Returns the number of stored sessions, including expired ones.
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    /// Returns true if no sessions are stored.
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, identity: UserProfile) -> ServerResult<Session> {
        let session = Session::new(identity, self.ttl);
        self.insert(session.clone());
        debug!(user = %session.identity.id, "session created");
        Ok(session)
    }

    async fn load(&self, session_id: &str) -> ServerResult<Option<Session>> {
        let now = now_millis();
        {
            let sessions = self.sessions.read();
            match sessions.get(session_id) {
                None => return Ok(None),
                Some(session) if !session.is_expired(now) => return Ok(Some(session.clone())),
                Some(_) => {}
            }
        }
        self.sessions.write().remove(session_id);
        Ok(None)
    }

    async fn destroy(&self, session_id: &str) -> ServerResult<()> {
        self.sessions.write().remove(session_id);
        Ok(())
    }

    async fn purge_expired(&self) -> ServerResult<usize> {
        let now = now_millis();
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired(now));
        Ok(before - sessions.len())
    }
}

/// Current time in Unix millis.
pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> UserProfile {
        UserProfile {
            id: "108".into(),
            display_name: "Alice".into(),
            email: Some("alice@example.com".into()),
            picture: None,
            provider: "google".into(),
        }
    }

    #[test]
    fn profile_wire_shape() {
        let json = serde_json::to_value(alice()).unwrap();
        assert_eq!(json["displayName"], "Alice");
        assert_eq!(json["provider"], "google");
        assert!(json.get("picture").is_none());
    }

    #[test]
    fn session_expiry() {
        let mut session = Session::new(alice(), Duration::from_secs(10));
        session.created_at_ms = 1_000;
        assert_eq!(session.expires_at_ms(), 11_000);
        assert!(!session.is_expired(10_999));
        assert!(session.is_expired(11_000));
    }

    #[test]
    fn session_ids_are_unique() {
        let a = Session::new(alice(), Duration::from_secs(1));
        let b = Session::new(alice(), Duration::from_secs(1));
        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn create_load_destroy() {
        let store = MemorySessionStore::new(Duration::from_secs(60));
        let session = store.create(alice()).await.unwrap();

        let loaded = store.load(&session.id).await.unwrap().unwrap();
        assert_eq!(loaded.identity, alice());
        assert!(loaded.authenticated);

        store.destroy(&session.id).await.unwrap();
        assert!(store.load(&session.id).await.unwrap().is_none());
        store.destroy(&session.id).await.unwrap();
    }

    #[tokio::test]
    async fn expired_sessions_are_dropped_on_load() {
        let store = MemorySessionStore::new(Duration::from_secs(60));
        let mut session = Session::new(alice(), Duration::from_secs(1));
        session.created_at_ms = 0;
        store.insert(session.clone());

        assert!(store.load(&session.id).await.unwrap().is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn purge_removes_only_expired() {
        let store = MemorySessionStore::new(Duration::from_secs(60));
        let live = store.create(alice()).await.unwrap();
        let mut stale = Session::new(alice(), Duration::from_secs(1));
        stale.created_at_ms = 0;
        store.insert(stale);

        assert_eq!(store.purge_expired().await.unwrap(), 1);
        assert_eq!(store.len(), 1);
        assert!(store.load(&live.id).await.unwrap().is_some());
    }
}
