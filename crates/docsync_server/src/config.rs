//! Server configuration.

use std::net::SocketAddr;
use std::time::Duration;

/// Default origin of the browser front end.
pub const DEFAULT_FRONTEND_ORIGIN: &str = "http://localhost:3000";

/// Default name of the session cookie.
pub const DEFAULT_COOKIE_NAME: &str = "docsync.sid";

/// Google's OAuth2 authorization endpoint.
pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Google's OAuth2 token endpoint.
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Google's OpenID userinfo endpoint.
pub const GOOGLE_USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";

/// Configuration for the HTTP server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,
    /// The single origin allowed to make credentialed cross-origin requests.
    pub frontend_origin: String,
    /// Where the browser lands after a successful sign-in.
    pub login_success_url: String,
    /// Where the browser lands after a failed sign-in.
    pub login_failure_url: String,
    /// Session cookie settings.
    pub session: SessionConfig,
    /// Identity provider settings.
    pub oauth: OAuthConfig,
}

impl ServerConfig {
    /// Creates a configuration bound to `bind_addr`.
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            frontend_origin: DEFAULT_FRONTEND_ORIGIN.to_string(),
            login_success_url: format!("{}/letter", DEFAULT_FRONTEND_ORIGIN),
            login_failure_url: format!("{}/login", DEFAULT_FRONTEND_ORIGIN),
            session: SessionConfig::default(),
            oauth: OAuthConfig::default(),
        }
    }

    /// Sets the front end origin and derives the sign-in landing pages from it.
    pub fn with_frontend(mut self, origin: impl Into<String>) -> Self {
        let origin = origin.into();
        let origin = origin.trim_end_matches('/').to_string();
        self.login_success_url = format!("{}/letter", origin);
        self.login_failure_url = format!("{}/login", origin);
        self.frontend_origin = origin;
        self
    }

    /// Sets the landing page after a successful sign-in.
    pub fn with_login_success_url(mut self, url: impl Into<String>) -> Self {
        self.login_success_url = url.into();
        self
    }

    /// Sets the landing page after a failed sign-in.
    pub fn with_login_failure_url(mut self, url: impl Into<String>) -> Self {
        self.login_failure_url = url.into();
        self
    }

    /// Sets the session configuration.
    pub fn with_session(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }

    /// Sets the identity provider configuration.
    pub fn with_oauth(mut self, oauth: OAuthConfig) -> Self {
        self.oauth = oauth;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(SocketAddr::from(([127, 0, 0, 1], 8000)))
    }
}

/// Session cookie settings.
#[derive(Clone)]
pub struct SessionConfig {
    /// Secret key used to sign session cookies.
    pub secret: Vec<u8>,
    /// Cookie name.
    pub cookie_name: String,
    /// Session lifetime, also used as the cookie's `Max-Age`.
    pub ttl: Duration,
    /// Whether the cookie is marked `Secure`.
    pub secure_cookie: bool,
}

impl SessionConfig {
    /// Creates a session configuration with the given signing secret.
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            ttl: Duration::from_secs(24 * 60 * 60), // 24 hours
            secure_cookie: false,
        }
    }

    /// Sets the cookie name.
    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    /// Sets the session lifetime.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Marks the cookie `Secure` (HTTPS only).
    pub fn with_secure_cookie(mut self, secure: bool) -> Self {
        self.secure_cookie = secure;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("cookie_name", &self.cookie_name)
            .field("ttl", &self.ttl)
            .field("secure_cookie", &self.secure_cookie)
            .finish_non_exhaustive()
    }
}

/// OAuth2 client settings for the identity provider.
#[derive(Clone)]
pub struct OAuthConfig {
    /// OAuth client id.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: String,
    /// Callback URL registered with the provider.
    pub redirect_url: String,
    /// Authorization endpoint.
    pub authorization_endpoint: String,
    /// Token endpoint.
    pub token_endpoint: String,
    /// Userinfo endpoint.
    pub userinfo_endpoint: String,
    /// Requested scopes.
    pub scopes: Vec<String>,
}

impl OAuthConfig {
    /// Creates a configuration for Google with the given client credentials.
    pub fn google(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_url: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_url: redirect_url.into(),
            authorization_endpoint: GOOGLE_AUTH_URL.to_string(),
            token_endpoint: GOOGLE_TOKEN_URL.to_string(),
            userinfo_endpoint: GOOGLE_USERINFO_URL.to_string(),
            scopes: vec!["profile".to_string(), "email".to_string()],
        }
    }

    /// Overrides the provider endpoints.
    pub fn with_endpoints(
        mut self,
        authorization: impl Into<String>,
        token: impl Into<String>,
        userinfo: impl Into<String>,
    ) -> Self {
        self.authorization_endpoint = authorization.into();
        self.token_endpoint = token.into();
        self.userinfo_endpoint = userinfo.into();
        self
    }

    /// Sets the requested scopes.
    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self::google("", "", "/auth/google/callback")
    }
}

impl std::fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("client_id", &self.client_id)
            .field("redirect_url", &self.redirect_url)
            .field("authorization_endpoint", &self.authorization_endpoint)
            .field("scopes", &self.scopes)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.port(), 8000);
        assert_eq!(config.frontend_origin, "http://localhost:3000");
        assert_eq!(config.login_success_url, "http://localhost:3000/letter");
        assert_eq!(config.login_failure_url, "http://localhost:3000/login");
        assert_eq!(config.session.cookie_name, "docsync.sid");
        assert_eq!(config.session.ttl, Duration::from_secs(86400));
    }

    #[test]
    fn frontend_derives_landing_pages() {
        let config = ServerConfig::default().with_frontend("https://app.example.com/");
        assert_eq!(config.frontend_origin, "https://app.example.com");
        assert_eq!(config.login_success_url, "https://app.example.com/letter");
        assert_eq!(config.login_failure_url, "https://app.example.com/login");
    }

    #[test]
    fn builder_pattern() {
        let session = SessionConfig::new(b"secret".to_vec())
            .with_cookie_name("sid")
            .with_ttl(Duration::from_secs(60))
            .with_secure_cookie(true);
        assert_eq!(session.cookie_name, "sid");
        assert_eq!(session.ttl, Duration::from_secs(60));
        assert!(session.secure_cookie);

        let oauth = OAuthConfig::google("id", "secret", "http://localhost/cb")
            .with_scopes(["openid"])
            .with_endpoints("http://a", "http://t", "http://u");
        assert_eq!(oauth.scopes, vec!["openid".to_string()]);
        assert_eq!(oauth.token_endpoint, "http://t");
    }

    #[test]
    fn debug_hides_secrets() {
        let session = SessionConfig::new(b"very-secret".to_vec());
        assert!(!format!("{:?}", session).contains("very-secret"));

        let oauth = OAuthConfig::google("id", "client-secret-value", "cb");
        assert!(!format!("{:?}", oauth).contains("client-secret-value"));
    }
}
