//! Serve command implementation.

use super::ServeArgs;
use docsync_server::{
    DocSyncServer, GoogleIdentityProvider, HandlerContext, MemorySessionStore, OAuthConfig,
    ServerConfig, SessionConfig,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

/// Runs the serve command.
pub async fn run(args: ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = server_config(&args);
    let engine = args.api.engine()?;
    let sessions = Arc::new(MemorySessionStore::new(config.session.ttl));
    let identity = Arc::new(GoogleIdentityProvider::new(config.oauth.clone())?);

    info!(
        addr = %config.bind_addr,
        frontend = %config.frontend_origin,
        folder = %args.api.folder_id,
        "starting docsync server"
    );
    let context = HandlerContext::new(config, engine, sessions, identity)?;
    DocSyncServer::new(context).run().await?;
    Ok(())
}

/// Builds the server configuration from the command options.
///
/// Explicit landing pages override the ones derived from the front end URL.
fn server_config(args: &ServeArgs) -> ServerConfig {
    let session = SessionConfig::new(args.session_secret.clone().into_bytes())
        .with_secure_cookie(args.secure_cookie);
    let oauth = OAuthConfig::google(
        args.client_id.clone(),
        args.client_secret.clone(),
        args.callback_url.clone(),
    );
    let mut config = ServerConfig::new(SocketAddr::new(args.host, args.port))
        .with_frontend(args.frontend_url.clone())
        .with_session(session)
        .with_oauth(oauth);
    if let Some(url) = &args.login_success_url {
        config = config.with_login_success_url(url.clone());
    }
    if let Some(url) = &args.login_failure_url {
        config = config.with_login_failure_url(url.clone());
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::ApiArgs;

    fn args() -> ServeArgs {
        ServeArgs {
            host: "127.0.0.1".parse().unwrap(),
            port: 9000,
            session_secret: "secret".into(),
            client_id: "client".into(),
            client_secret: "shh".into(),
            callback_url: "http://localhost:9000/auth/google/callback".into(),
            frontend_url: "https://app.example.test/".into(),
            login_success_url: None,
            login_failure_url: None,
            secure_cookie: true,
            api: ApiArgs {
                folder_id: "f1".into(),
                api_token: "t".into(),
                default_collaborator: None,
                viewer_host: "docs.google.com".into(),
            },
        }
    }

    #[test]
    fn landing_pages_follow_frontend() {
        let config = server_config(&args());
        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.frontend_origin, "https://app.example.test");
        assert_eq!(config.login_success_url, "https://app.example.test/letter");
        assert_eq!(config.login_failure_url, "https://app.example.test/login");
        assert!(config.session.secure_cookie);
        assert_eq!(config.oauth.client_id, "client");
    }

    #[test]
    fn explicit_landing_pages_win() {
        let mut args = args();
        args.login_success_url = Some("https://app.example.test/welcome".into());
        args.login_failure_url = Some("https://app.example.test/denied".into());

        let config = server_config(&args);
        assert_eq!(config.login_success_url, "https://app.example.test/welcome");
        assert_eq!(config.login_failure_url, "https://app.example.test/denied");
    }
}
