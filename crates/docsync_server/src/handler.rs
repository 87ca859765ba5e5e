//! Request handlers.

use crate::auth::{authorize, SessionSigner};
use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::oauth::{generate_state, IdentityProvider};
use crate::session::{now_millis, Session, SessionStore, UserProfile};
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::{Extension, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use docsync_engine::{SyncEngine, SyncedDocument};
use docsync_protocol::DriveFile;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Name of the cookie holding the OAuth `state` during sign-in.
pub const STATE_COOKIE: &str = "docsync.oauth_state";

/// Path the `state` cookie is scoped to.
const STATE_COOKIE_PATH: &str = "/auth/google";

/// How long a sign-in attempt may take.
const STATE_TTL: Duration = Duration::from_secs(10 * 60);

/// Shared state for all handlers.
pub struct HandlerContext {
    config: ServerConfig,
    engine: SyncEngine,
    sessions: Arc<dyn SessionStore>,
    signer: SessionSigner,
    identity: Arc<dyn IdentityProvider>,
}

impl HandlerContext {
    /// Creates a handler context.
    ///
    /// Fails if the session secret is empty.
    pub fn new(
        config: ServerConfig,
        engine: SyncEngine,
        sessions: Arc<dyn SessionStore>,
        identity: Arc<dyn IdentityProvider>,
    ) -> ServerResult<Self> {
        let signer = SessionSigner::new(&config.session.secret)?;
        Ok(Self {
            config,
            engine,
            sessions,
            signer,
            identity,
        })
    }

    /// Returns the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns the session store.
    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }

    /// Resolves the session referenced by the request's cookie.
    ///
    /// Missing, unsigned, unknown and expired cookies all resolve to `None`.
    pub async fn resolve_session(&self, jar: &CookieJar) -> Option<Session> {
        let session_id = self.session_id(jar)?;
        match self.sessions.load(&session_id).await {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "failed to load session");
                None
            }
        }
    }

    /// Creates a session for `identity` and returns its cookie.
    pub async fn issue_session(&self, identity: UserProfile) -> ServerResult<Cookie<'static>> {
        let session = self.sessions.create(identity).await?;
        info!(user = %session.identity.id, "user signed in");
        Ok(self.session_cookie(self.signer.sign(&session.id)))
    }

    fn session_id(&self, jar: &CookieJar) -> Option<String> {
        let cookie = jar.get(&self.config.session.cookie_name)?;
        self.signer.verify(cookie.value())
    }

    fn session_cookie(&self, value: String) -> Cookie<'static> {
        let session = &self.config.session;
        Cookie::build((session.cookie_name.clone(), value))
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(session.secure_cookie)
            .path("/")
            .max_age(max_age(session.ttl))
            .build()
    }

    fn session_removal(&self) -> Cookie<'static> {
        let session = &self.config.session;
        Cookie::build((session.cookie_name.clone(), ""))
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(session.secure_cookie)
            .path("/")
            .build()
    }
}

fn max_age(ttl: Duration) -> time::Duration {
    time::Duration::seconds(i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX))
}

fn state_cookie(value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((STATE_COOKIE, value))
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .path(STATE_COOKIE_PATH)
        .max_age(max_age(STATE_TTL))
        .build()
}

fn state_removal() -> Cookie<'static> {
    Cookie::build((STATE_COOKIE, "")).path(STATE_COOKIE_PATH).build()
}

/// Body of the text endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct TextBody {
    /// The document text.
    #[serde(default)]
    pub text: Option<String>,
}

impl TextBody {
    fn into_text(body: Option<Json<TextBody>>) -> Option<String> {
        body.and_then(|Json(body)| body.text)
            .filter(|text| !text.is_empty())
    }
}

/// Response of the create and replace endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentResponse {
    /// Human readable outcome.
    pub message: String,
    /// Document id.
    pub file_id: String,
    /// Viewer URL.
    pub file_url: String,
}

impl DocumentResponse {
    fn new(message: &str, document: SyncedDocument) -> Self {
        Self {
            message: message.to_string(),
            file_id: document.document_id,
            file_url: document.url,
        }
    }
}

/// Response of `GET /drive/files`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilesResponse {
    /// Files in the target folder.
    pub files: Vec<DriveFile>,
}

/// Query parameters of the OAuth callback.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    /// Authorization code.
    pub code: Option<String>,
    /// The `state` echoed back by the provider.
    pub state: Option<String>,
    /// Error reported by the provider.
    pub error: Option<String>,
}

/// `GET /`
pub async fn index() -> Html<&'static str> {
    Html(r#"<a href="/auth/google">Login with Google</a>"#)
}

/// `GET /health`
pub async fn health() -> &'static str {
    "OK"
}

/// `GET /auth/google`: starts sign-in.
pub async fn auth_google(
    State(ctx): State<Arc<HandlerContext>>,
    jar: CookieJar,
) -> ServerResult<(CookieJar, Redirect)> {
    let state = generate_state();
    let url = ctx.identity.authorization_url(&state)?;
    let jar = jar.add(state_cookie(state, ctx.config.session.secure_cookie));
    Ok((jar, Redirect::to(&url)))
}

/// `GET /auth/google/callback`: completes sign-in.
pub async fn auth_callback(
    State(ctx): State<Arc<HandlerContext>>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> (CookieJar, Redirect) {
    let expected = jar.get(STATE_COOKIE).map(|c| c.value().to_string());
    let jar = jar.remove(state_removal());

    match complete_sign_in(&ctx, expected, params).await {
        Ok(cookie) => (
            jar.add(cookie),
            Redirect::to(&ctx.config.login_success_url),
        ),
        Err(e) => {
            warn!(error = %e, "sign-in failed");
            (jar, Redirect::to(&ctx.config.login_failure_url))
        }
    }
}

async fn complete_sign_in(
    ctx: &HandlerContext,
    expected_state: Option<String>,
    params: CallbackParams,
) -> ServerResult<Cookie<'static>> {
    if let Some(error) = params.error {
        return Err(ServerError::Unauthenticated(format!(
            "provider reported: {}",
            error
        )));
    }
    match (expected_state, params.state) {
        (Some(expected), Some(actual)) if !expected.is_empty() && expected == actual => {}
        _ => return Err(ServerError::Unauthenticated("state mismatch".into())),
    }
    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ServerError::Unauthenticated("missing authorization code".into()))?;

    let identity = ctx.identity.exchange_code(&code).await?;
    ctx.issue_session(identity).await
}

/// `GET /auth/user`: the signed-in user, if any.
pub async fn auth_user(State(ctx): State<Arc<HandlerContext>>, jar: CookieJar) -> Response {
    let session = ctx.resolve_session(&jar).await;
    match authorize(session.as_ref(), now_millis()) {
        Ok(authorized) => Json(authorized.identity).into_response(),
        Err(_) => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Not authenticated" })),
        )
            .into_response(),
    }
}

/// `POST /auth/login`: reports whether the caller is signed in.
pub async fn auth_login(State(ctx): State<Arc<HandlerContext>>, jar: CookieJar) -> Response {
    let session = ctx.resolve_session(&jar).await;
    match authorize(session.as_ref(), now_millis()) {
        Ok(authorized) => Json(json!({ "success": true, "user": authorized.identity })).into_response(),
        Err(_) => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "success": false, "message": "User not authenticated" })),
        )
            .into_response(),
    }
}

/// `GET /auth/logout`: ends the session and clears the cookie.
pub async fn auth_logout(
    State(ctx): State<Arc<HandlerContext>>,
    jar: CookieJar,
) -> ServerResult<(CookieJar, Json<serde_json::Value>)> {
    if let Some(session_id) = ctx.session_id(&jar) {
        ctx.sessions.destroy(&session_id).await.map_err(|e| {
            warn!(error = %e, "failed to destroy session");
            ServerError::SessionTeardown("Failed to destroy session".into())
        })?;
        info!("user signed out");
    }

    let jar = jar.remove(ctx.session_removal());
    Ok((jar, Json(json!({ "message": "Logged out successfully" }))))
}

/// `GET /profile`
pub async fn profile(Extension(user): Extension<UserProfile>) -> Json<serde_json::Value> {
    Json(json!({
        "name": user.display_name,
        "message": format!("Welcome, {}", user.display_name),
    }))
}

/// `GET /drive/files`
pub async fn list_files(State(ctx): State<Arc<HandlerContext>>) -> ServerResult<Json<FilesResponse>> {
    let files = ctx
        .engine
        .list_documents()
        .await
        .map_err(|e| ServerError::from_sync("Failed to fetch files", e))?;
    Ok(Json(FilesResponse { files }))
}

/// `GET /drive/file-content/:file_id`
pub async fn file_content(
    State(ctx): State<Arc<HandlerContext>>,
    Path(file_id): Path<String>,
) -> ServerResult<Response> {
    let text = ctx
        .engine
        .read_text(&file_id)
        .await
        .map_err(|e| ServerError::from_sync("Failed to fetch file content", e))?;
    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], text).into_response())
}

/// `POST /save-text`: creates a document holding the given text.
pub async fn save_text(
    State(ctx): State<Arc<HandlerContext>>,
    Extension(user): Extension<UserProfile>,
    body: Option<Json<TextBody>>,
) -> ServerResult<Json<DocumentResponse>> {
    let text = TextBody::into_text(body)
        .ok_or_else(|| ServerError::InvalidRequest("Text is required".into()))?;

    let document = ctx
        .engine
        .create_document(&user.display_name, &text)
        .await
        .map_err(|e| ServerError::from_sync("Failed to upload to Google Docs", e))?;
    Ok(Json(DocumentResponse::new(
        "File uploaded as Google Docs",
        document,
    )))
}

/// `PUT /drive/update-file/:file_id`: replaces a document's content.
pub async fn update_file(
    State(ctx): State<Arc<HandlerContext>>,
    Path(file_id): Path<String>,
    body: Option<Json<TextBody>>,
) -> ServerResult<Json<DocumentResponse>> {
    let text = TextBody::into_text(body);
    let (file_id, text) = match (file_id.trim(), text) {
        (id, Some(text)) if !id.is_empty() => (id.to_string(), text),
        _ => {
            return Err(ServerError::InvalidRequest(
                "File ID and text are required".into(),
            ))
        }
    };

    let document = ctx
        .engine
        .replace_content(&file_id, &text)
        .await
        .map_err(|e| ServerError::from_sync("Failed to update Google Docs file", e))?;
    Ok(Json(DocumentResponse::new(
        "File updated successfully",
        document,
    )))
}
