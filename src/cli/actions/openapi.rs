use crate::api;
use anyhow::Result;

/// Print the `OpenAPI` document.
/// # Errors
/// Returns an error if the document cannot be serialized.
pub fn execute() -> Result<()> {
    let doc = api::openapi::openapi();
    let json = serde_json::to_string_pretty(&doc)?;
    println!("{json}");
    Ok(())
}
