//! Show command - summarize a cache file

use super::{read_existing, resolve_cache_file};
use crate::cache::{CacheState, Timestamp};
use crate::cli::args::{OutputFormat, ShowArgs};
use crate::config::Config;
use crate::error::ModcacheResult;
use crate::ui::{self, UiContext};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Execute the show command
pub async fn execute(args: ShowArgs, config: &Config) -> ModcacheResult<()> {
    let path = resolve_cache_file(args.cache_file, config)?;
    let state = read_existing(&path).await?;
    let summary = CacheSummary::from_state(&path, &state);

    match args.format {
        OutputFormat::Table => print_summary_table(&UiContext::detect(), &summary),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        OutputFormat::Plain => {
            for package in &summary.packages {
                println!("{}", package.root.display());
            }
        }
    }

    Ok(())
}

#[derive(Debug, Serialize)]
struct CacheSummary {
    path: PathBuf,
    modules: usize,
    packages: Vec<PackageSummary>,
    tracked_files: usize,
    dependent_files: usize,
    newest_mtime: Option<Timestamp>,
}

#[derive(Debug, Serialize)]
struct PackageSummary {
    root: PathBuf,
    name: Option<String>,
    version: Option<String>,
    files: usize,
}

impl CacheSummary {
    fn from_state(path: &Path, state: &CacheState) -> Self {
        let by_root = state.files_by_package_root();
        let packages = state
            .packages
            .iter()
            .map(|(root, manifest)| PackageSummary {
                root: root.clone(),
                name: manifest.name().map(str::to_string),
                version: manifest.version().map(str::to_string),
                files: by_root.get(root).map_or(0, |files| files.len()),
            })
            .collect();

        Self {
            path: path.to_path_buf(),
            modules: state.modules.len(),
            packages,
            tracked_files: state.mtimes.len(),
            dependent_files: state.dependent_files.len(),
            newest_mtime: state.mtimes.values().max().copied(),
        }
    }
}

fn print_summary_table(ctx: &UiContext, summary: &CacheSummary) {
    ui::section(ctx, &format!("Cache {}", summary.path.display()));
    ui::key_value(ctx, "modules", &summary.modules.to_string());
    ui::key_value(ctx, "packages", &summary.packages.len().to_string());
    ui::key_value(ctx, "tracked files", &summary.tracked_files.to_string());
    ui::key_value(ctx, "dependent files", &summary.dependent_files.to_string());
    if let Some(newest) = summary.newest_mtime {
        ui::key_value(ctx, "newest mtime", &newest.to_string());
    }

    if summary.packages.is_empty() {
        return;
    }
    println!();
    println!("  {:<50} {:<30} {:>6}", "PACKAGE ROOT", "NAME", "FILES");
    println!("  {}", "-".repeat(88));
    for package in &summary.packages {
        let label = match (&package.name, &package.version) {
            (Some(name), Some(version)) => format!("{}@{}", name, version),
            (Some(name), None) => name.clone(),
            _ => "-".to_string(),
        };
        println!(
            "  {:<50} {:<30} {:>6}",
            package.root.display().to_string(),
            label,
            package.files
        );
    }
}
