//! Confirmation prompt with a non-interactive fallback

use super::context::UiContext;
use crate::error::{ModcacheError, ModcacheResult};

/// Ask a yes/no question
///
/// Auto-yes answers `true`; without a terminal the default is returned.
pub async fn confirm(ctx: &UiContext, message: &str, default: bool) -> ModcacheResult<bool> {
    if ctx.auto_yes() {
        return Ok(true);
    }
    if !ctx.is_interactive() {
        return Ok(default);
    }

    // cliclack blocks on stdin
    let message = message.to_string();
    let answer = tokio::task::spawn_blocking(move || {
        cliclack::confirm(&message).initial_value(default).interact()
    })
    .await
    .map_err(|e| ModcacheError::User(format!("Prompt task failed: {}", e)))?;

    answer.map_err(|e| ModcacheError::User(format!("Prompt failed: {}", e)))
}
