//! modcache - incremental build cache invalidation
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use modcache::cli::{Cli, Commands};
use modcache::config::ConfigManager;
use modcache::error::ModcacheResult;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> ModcacheResult<()> {
    let cli = Cli::parse();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let config = config_manager.load().await?;

    // 0 = warn, 1 = info, 2+ = debug
    let filter = match cli.verbose {
        0 => EnvFilter::new("modcache=warn"),
        1 => EnvFilter::new("modcache=info"),
        _ => EnvFilter::new("modcache=debug"),
    };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .without_time();
    if config.general.json_logs() {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    modcache::ui::init_theme();

    match cli.command {
        Commands::Invalidate(args) => modcache::cli::commands::invalidate(args, &config).await,
        Commands::Show(args) => modcache::cli::commands::show(args, &config).await,
        Commands::Clear(args) => modcache::cli::commands::clear(args, &config).await,
        Commands::Config(args) => {
            modcache::cli::commands::config(args, &config, &config_manager).await
        }
    }
}
