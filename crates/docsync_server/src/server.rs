//! Router assembly and the server loop.

use crate::auth::require_session;
use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::handler::{self, HandlerContext};
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post, put};
use axum::{middleware, Router};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

/// How often expired sessions are swept from the store.
const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// The docsync HTTP server.
///
/// # Example
///
/// ```rust,ignore
/// use docsync_server::{DocSyncServer, HandlerContext};
///
/// let context = HandlerContext::new(config, engine, sessions, identity)?;
/// DocSyncServer::new(context).run().await?;
/// ```
pub struct DocSyncServer {
    context: Arc<HandlerContext>,
}

impl DocSyncServer {
    /// Creates a server over a handler context.
    pub fn new(context: HandlerContext) -> Self {
        Self {
            context: Arc::new(context),
        }
    }

    /// Builds the router.
    pub fn router(&self) -> ServerResult<Router> {
        router(Arc::clone(&self.context))
    }

    /// Binds the configured address and serves until Ctrl-C.
    pub async fn run(self) -> ServerResult<()> {
        let listener = TcpListener::bind(self.context.config().bind_addr).await?;
        self.serve(listener, shutdown_signal()).await
    }

    /// Serves on `listener` until `shutdown` resolves.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> ServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.router()?;
        let sweeper = tokio::spawn(sweep_sessions(Arc::clone(&self.context)));

        info!(addr = %listener.local_addr()?, "docsync server listening");
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await;

        sweeper.abort();
        info!("docsync server stopped");
        Ok(result?)
    }
}

/// Builds the application router over `ctx`.
///
/// Document routes sit behind [`require_session`]; sign-in routes do not.
pub fn router(ctx: Arc<HandlerContext>) -> ServerResult<Router> {
    let cors = cors_layer(ctx.config())?;

    let protected = Router::new()
        .route("/profile", get(handler::profile))
        .route("/save-text", post(handler::save_text))
        .route("/drive/update-file/:file_id", put(handler::update_file))
        .route("/drive/files", get(handler::list_files))
        .route("/drive/file-content/:file_id", get(handler::file_content))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&ctx),
            require_session,
        ));

    let app = Router::new()
        .route("/", get(handler::index))
        .route("/health", get(handler::health))
        .route("/auth/google", get(handler::auth_google))
        .route("/auth/google/callback", get(handler::auth_callback))
        .route("/auth/user", get(handler::auth_user))
        .route("/auth/login", post(handler::auth_login))
        .route("/auth/logout", get(handler::auth_logout))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(ctx);

    Ok(app)
}

/// Allows credentialed requests from the configured front end only.
fn cors_layer(config: &ServerConfig) -> ServerResult<CorsLayer> {
    let origin = HeaderValue::from_str(&config.frontend_origin).map_err(|e| {
        ServerError::Config(format!(
            "invalid front end origin {:?}: {}",
            config.frontend_origin, e
        ))
    })?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]))
}

async fn sweep_sessions(ctx: Arc<HandlerContext>) {
    let mut interval = tokio::time::interval(SESSION_SWEEP_INTERVAL);
    interval.tick().await;
    loop {
        interval.tick().await;
        match ctx.sessions().purge_expired().await {
            Ok(0) => {}
            Ok(removed) => debug!(removed, "purged expired sessions"),
            Err(e) => warn!(error = %e, "session sweep failed"),
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cors_rejects_invalid_origin() {
        let config = ServerConfig::default().with_frontend("http://bad\norigin");
        assert!(cors_layer(&config).is_err());
    }

    #[test]
    fn cors_accepts_default_origin() {
        assert!(cors_layer(&ServerConfig::default()).is_ok());
    }
}
