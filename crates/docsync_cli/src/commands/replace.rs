//! Replace command implementation.

use super::{ApiArgs, TextSource};

/// Runs the replace command.
pub async fn run(
    document_id: &str,
    source: &TextSource,
    api: &ApiArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let text = source.read()?;
    let engine = api.engine()?;

    let document = engine.replace_content(document_id, &text).await?;

    println!("Replaced content of {}", document.document_id);
    println!("  URL: {}", document.url);
    Ok(())
}
