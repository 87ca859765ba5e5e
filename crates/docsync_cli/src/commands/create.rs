//! Create command implementation.

use super::{ApiArgs, TextSource};
use tracing::info;

/// Runs the create command.
pub async fn run(source: &TextSource, api: &ApiArgs) -> Result<(), Box<dyn std::error::Error>> {
    let text = source.read()?;
    let engine = api.engine()?;

    let document = engine.create_document("docsync-cli", &text).await?;
    info!(document_id = %document.document_id, "document created");

    println!("Created document {}", document.document_id);
    println!("  URL: {}", document.url);
    Ok(())
}
