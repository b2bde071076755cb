use crate::cli::actions::{bcrypt, keys, openapi, server, Action};
use anyhow::Result;

/// Run `action` to completion.
///
/// # Errors
/// Returns the action's failure.
pub async fn execute(action: Action) -> Result<()> {
    match action {
        Action::Server(args) => server::execute(args).await,
        Action::Bcrypt(args) => bcrypt::execute(&args),
        Action::Keys => keys::execute(),
        Action::OpenApi => openapi::execute(),
    }
}
