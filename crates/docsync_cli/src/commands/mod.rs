//! CLI command implementations.

pub mod create;
pub mod replace;
pub mod serve;

use clap::Args;
use docsync_engine::{
    HttpDocumentClient, StaticToken, SyncConfig, SyncEngine, DEFAULT_VIEWER_HOST,
};
use std::path::PathBuf;
use std::sync::Arc;

/// Access to the document API.
#[derive(Args, Debug, Clone)]
pub struct ApiArgs {
    /// Folder new documents are created in and files are listed from
    #[arg(long, env = "GOOGLE_DRIVE_FOLDER_ID")]
    pub folder_id: String,

    /// Bearer token for the Drive and Docs APIs
    #[arg(long, env = "GOOGLE_API_TOKEN", hide_env_values = true)]
    pub api_token: String,

    /// Account granted writer access to every new document
    #[arg(long, env = "DEFAULT_COLLABORATOR")]
    pub default_collaborator: Option<String>,

    /// Host used to build document links
    #[arg(long, env = "DOCS_VIEWER_HOST", default_value = DEFAULT_VIEWER_HOST)]
    pub viewer_host: String,
}

impl ApiArgs {
    /// Builds a sync engine talking to the live API.
    pub fn engine(&self) -> Result<SyncEngine, Box<dyn std::error::Error>> {
        let tokens = Arc::new(StaticToken::new(self.api_token.clone()));
        let client = HttpDocumentClient::new(tokens)?;
        Ok(SyncEngine::new(self.sync_config(), Arc::new(client)))
    }

    /// Returns the engine configuration these options describe.
    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig::new(self.folder_id.clone())
            .with_default_collaborator(self.default_collaborator.clone())
            .with_viewer_host(self.viewer_host.clone())
    }
}

/// Where the document text comes from.
#[derive(Args, Debug, Clone)]
pub struct TextSource {
    /// The text itself
    #[arg(long, conflicts_with = "file", required_unless_present = "file")]
    pub text: Option<String>,

    /// Read the text from this file
    #[arg(long)]
    pub file: Option<PathBuf>,
}

impl TextSource {
    /// Returns the text, reading the file if one was given.
    pub fn read(&self) -> Result<String, Box<dyn std::error::Error>> {
        match (&self.text, &self.file) {
            (Some(text), _) => Ok(text.clone()),
            (None, Some(path)) => std::fs::read_to_string(path)
                .map_err(|e| format!("failed to read {}: {}", path.display(), e).into()),
            (None, None) => Err("either --text or --file is required".into()),
        }
    }
}

/// Options of the `serve` command.
#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1")]
    pub host: std::net::IpAddr,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 8000)]
    pub port: u16,

    /// Secret used to sign session cookies
    #[arg(long, env = "SESSION_SECRET", hide_env_values = true)]
    pub session_secret: String,

    /// OAuth client id
    #[arg(long, env = "GOOGLE_CLIENT_ID")]
    pub client_id: String,

    /// OAuth client secret
    #[arg(long, env = "GOOGLE_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: String,

    /// OAuth callback URL registered with Google
    #[arg(
        long,
        env = "GOOGLE_CALLBACK_URL",
        default_value = "http://localhost:8000/auth/google/callback"
    )]
    pub callback_url: String,

    /// Origin of the browser front end
    #[arg(long, env = "FRONTEND_URL", default_value = "http://localhost:3000")]
    pub frontend_url: String,

    /// Landing page after a successful sign-in [default: <frontend-url>/letter]
    #[arg(long, env = "LOGIN_SUCCESS_URL")]
    pub login_success_url: Option<String>,

    /// Landing page after a failed sign-in [default: <frontend-url>/login]
    #[arg(long, env = "LOGIN_FAILURE_URL")]
    pub login_failure_url: Option<String>,

    /// Mark the session cookie Secure (HTTPS only)
    #[arg(long)]
    pub secure_cookie: bool,

    #[command(flatten)]
    pub api: ApiArgs,
}
