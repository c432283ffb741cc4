//! Clear command - delete a cache file

use super::resolve_cache_file;
use crate::cache::CacheFile;
use crate::cli::args::ClearArgs;
use crate::config::Config;
use crate::error::ModcacheResult;
use crate::ui::{self, UiContext};

/// Execute the clear command
pub async fn execute(args: ClearArgs, config: &Config) -> ModcacheResult<()> {
    let path = resolve_cache_file(args.cache_file, config)?;
    let ctx = UiContext::detect().with_auto_yes(args.yes);

    if !path.exists() {
        ui::step_info(&ctx, &format!("No cache file at {}", path.display()));
        return Ok(());
    }

    let prompt = format!("Delete {}? The next build starts cold.", path.display());
    if !ui::confirm(&ctx, &prompt, false).await? {
        ui::step_warn_hint(&ctx, "Cache file kept", "Pass --yes to skip this prompt");
        return Ok(());
    }

    if CacheFile::new(&path).remove().await? {
        ui::step_ok_detail(&ctx, "Cache file deleted", &path.display().to_string());
    }
    Ok(())
}
