//! Sign-in through an OAuth2 identity provider.
//!
//! The server runs the authorization-code flow: `/auth/google` redirects the
//! browser to the provider with a random `state`, and the callback exchanges
//! the returned code for an access token, then reads the user's profile.

use crate::config::OAuthConfig;
use crate::error::{ServerError, ServerResult};
use crate::session::UserProfile;
use async_trait::async_trait;
use rand::distributions::Alphanumeric;
use rand::Rng;
use reqwest::{Client, Url};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Length of the CSRF `state` parameter.
const STATE_LEN: usize = 32;

/// Message shown when sign-in fails upstream.
const SIGN_IN_FAILED: &str = "Sign-in failed";

/// An OAuth2 identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Returns the URL the browser is sent to for consent.
    fn authorization_url(&self, state: &str) -> ServerResult<String>;

    /// Exchanges an authorization code for the signed-in user's profile.
    async fn exchange_code(&self, code: &str) -> ServerResult<UserProfile>;
}

/// Generates a random `state` value.
pub fn generate_state() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(STATE_LEN)
        .map(char::from)
        .collect()
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct GoogleUserInfo {
    sub: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    picture: Option<String>,
}

impl From<GoogleUserInfo> for UserProfile {
    fn from(info: GoogleUserInfo) -> Self {
        let display_name = info
            .name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .or_else(|| info.email.clone())
            .unwrap_or_else(|| info.sub.clone());
        Self {
            id: info.sub,
            display_name,
            email: info.email,
            picture: info.picture,
            provider: "google".to_string(),
        }
    }
}

/// Google as an identity provider.
pub struct GoogleIdentityProvider {
    config: OAuthConfig,
    http: Client,
}

impl GoogleIdentityProvider {
    /// Creates a provider from client settings.
    pub fn new(config: OAuthConfig) -> ServerResult<Self> {
        if config.client_id.is_empty() {
            return Err(ServerError::Config("OAuth client id is not set".into()));
        }
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ServerError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { config, http })
    }

    /// Returns the client settings.
    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    async fn fetch_access_token(&self, code: &str) -> ServerResult<String> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_url.as_str()),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
        ];
        let response = self
            .http
            .post(&self.config.token_endpoint)
            .form(&params)
            .send()
            .await
            .map_err(|e| ServerError::upstream(SIGN_IN_FAILED, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            debug!(status = status.as_u16(), body = %text, "token exchange rejected");
            return Err(ServerError::upstream(
                SIGN_IN_FAILED,
                format!("token exchange failed with status {}", status),
            ));
        }

        let tokens: TokenResponse = response
            .json()
            .await
            .map_err(|e| ServerError::upstream(SIGN_IN_FAILED, format!("invalid token response: {}", e)))?;
        Ok(tokens.access_token)
    }

    async fn fetch_profile(&self, access_token: &str) -> ServerResult<UserProfile> {
        let response = self
            .http
            .get(&self.config.userinfo_endpoint)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| ServerError::upstream(SIGN_IN_FAILED, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ServerError::upstream(
                SIGN_IN_FAILED,
                format!("userinfo request failed with status {}", status),
            ));
        }

        let info: GoogleUserInfo = response
            .json()
            .await
            .map_err(|e| ServerError::upstream(SIGN_IN_FAILED, format!("invalid userinfo response: {}", e)))?;
        Ok(info.into())
    }
}

#[async_trait]
impl IdentityProvider for GoogleIdentityProvider {
    fn authorization_url(&self, state: &str) -> ServerResult<String> {
        let scope = self.config.scopes.join(" ");
        let url = Url::parse_with_params(
            &self.config.authorization_endpoint,
            &[
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.redirect_url.as_str()),
                ("response_type", "code"),
                ("scope", scope.as_str()),
                ("prompt", "select_account"),
                ("state", state),
            ],
        )
        .map_err(|e| ServerError::Config(format!("invalid authorization endpoint: {}", e)))?;
        Ok(url.into())
    }

    async fn exchange_code(&self, code: &str) -> ServerResult<UserProfile> {
        let access_token = self.fetch_access_token(code).await?;
        let profile = self.fetch_profile(&access_token).await?;
        debug!(user = %profile.id, "identity resolved");
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> GoogleIdentityProvider {
        GoogleIdentityProvider::new(OAuthConfig::google(
            "client-1",
            "secret-1",
            "http://localhost:8000/auth/google/callback",
        ))
        .unwrap()
    }

    #[test]
    fn authorization_url_carries_parameters() {
        let url = provider().authorization_url("xyz").unwrap();
        let url = Url::parse(&url).unwrap();
        assert_eq!(url.host_str(), Some("accounts.google.com"));

        let params: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        let get = |key: &str| {
            params
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(get("client_id"), Some("client-1"));
        assert_eq!(get("scope"), Some("profile email"));
        assert_eq!(get("prompt"), Some("select_account"));
        assert_eq!(get("response_type"), Some("code"));
        assert_eq!(get("state"), Some("xyz"));
        assert_eq!(
            get("redirect_uri"),
            Some("http://localhost:8000/auth/google/callback")
        );
        assert!(get("client_secret").is_none());
    }

    #[test]
    fn missing_client_id_is_rejected() {
        assert!(GoogleIdentityProvider::new(OAuthConfig::default()).is_err());
    }

    #[test]
    fn states_are_random_alphanumeric() {
        let a = generate_state();
        let b = generate_state();
        assert_eq!(a.len(), STATE_LEN);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn userinfo_maps_to_profile() {
        let info: GoogleUserInfo = serde_json::from_str(
            r#"{"sub": "42", "name": "Alice Example", "email": "alice@example.com"}"#,
        )
        .unwrap();
        let profile = UserProfile::from(info);
        assert_eq!(profile.id, "42");
        assert_eq!(profile.display_name, "Alice Example");
        assert_eq!(profile.provider, "google");

        let info: GoogleUserInfo =
            serde_json::from_str(r#"{"sub": "43", "email": "bob@example.com"}"#).unwrap();
        assert_eq!(UserProfile::from(info).display_name, "bob@example.com");

        let info: GoogleUserInfo = serde_json::from_str(r#"{"sub": "44"}"#).unwrap();
        assert_eq!(UserProfile::from(info).display_name, "44");
    }
}
