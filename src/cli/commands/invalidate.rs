//! Invalidate command - prune a cache file against the filesystem

use super::{read_existing, resolve_cache_file};
use crate::cache::CacheFile;
use crate::cli::args::{InvalidateArgs, OutputFormat};
use crate::config::Config;
use crate::engine::BuildCache;
use crate::error::ModcacheResult;
use crate::fs::LocalFs;
use crate::invalidate::InvalidationReport;
use crate::ui::{self, TaskSpinner, UiContext};
use std::sync::Arc;
use tracing::debug;

/// Execute the invalidate command
pub async fn execute(args: InvalidateArgs, config: &Config) -> ModcacheResult<()> {
    let path = resolve_cache_file(args.cache_file, config)?;
    let state = read_existing(&path).await?;
    let tracked = state.mtimes.len();

    let mut cache = BuildCache::new(state, Arc::new(LocalFs), config.cache.to_engine_options())?;

    let ctx = UiContext::detect();
    let mut spinner = TaskSpinner::new(&ctx);
    let fancy = args.format == OutputFormat::Table;
    if fancy {
        spinner.start(&format!("Checking {} tracked file(s)...", tracked));
    }
    let report = cache.invalidate_before_build().await;
    if fancy {
        spinner.stop(&summary(&report));
    }

    match args.format {
        OutputFormat::Table => print_report_table(&ctx, &report),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Plain => print_report_plain(&report),
    }

    if args.dry_run {
        debug!("Dry run, leaving {} untouched", path.display());
        if fancy && !report.is_empty() {
            ui::remark(&ctx, "Dry run: cache file not modified");
        }
        return Ok(());
    }
    if report.is_empty() {
        return Ok(());
    }

    CacheFile::new(&path).store(cache.state()).await?;
    if fancy {
        ui::step_ok_detail(&ctx, "Pruned cache written", &path.display().to_string());
    }
    Ok(())
}

fn summary(report: &InvalidationReport) -> String {
    if report.is_empty() {
        "Cache is up to date".to_string()
    } else {
        format!(
            "{} invalidated, {} deleted",
            report.invalidated.len(),
            report.deleted.len()
        )
    }
}

fn print_report_table(ctx: &UiContext, report: &InvalidationReport) {
    ui::path_list(ctx, "Invalidated", &report.invalidated);
    ui::path_list(ctx, "Deleted", &report.deleted);
}

fn print_report_plain(report: &InvalidationReport) {
    for path in &report.invalidated {
        println!("invalidated\t{}", path.display());
    }
    for path in &report.deleted {
        println!("deleted\t{}", path.display());
    }
}
