//! Config command - show or edit configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::{Config, ConfigManager};
use crate::error::{ModcacheError, ModcacheResult};
use crate::ui::{self, UiContext};
use std::path::PathBuf;

/// Keys accepted by `config set`
const VALID_KEYS: &[&str] = &[
    "general.log_format",
    "cache.file",
    "cache.concurrency",
    "cache.manifest_name",
    "cache.isolation_dir",
];

/// Execute the config command
pub async fn execute(
    args: ConfigArgs,
    config: &Config,
    manager: &ConfigManager,
) -> ModcacheResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => show_config(config)?,
        Some(ConfigAction::Path) => println!("{}", manager.path().display()),
        Some(ConfigAction::Init { force }) => init_config(manager, force).await?,
        Some(ConfigAction::Set { key, value }) => {
            let ctx = UiContext::detect();
            let mut config = config.clone();
            if let Err(e) = set_value(&mut config, &key, &value) {
                ui::step_error_detail(&ctx, "Cannot set config value", &e.to_string());
                ui::remark(&ctx, &format!("Valid keys: {}", VALID_KEYS.join(", ")));
                return Err(e);
            }
            manager.save(&config).await?;
            ui::step_ok(&ctx, &format!("Set {} = {}", key, value));
        }
    }

    Ok(())
}

fn show_config(config: &Config) -> ModcacheResult<()> {
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

async fn init_config(manager: &ConfigManager, force: bool) -> ModcacheResult<()> {
    let ctx = UiContext::detect();
    let path = manager.path();

    if path.exists() && !force {
        ui::step_warn_hint(
            &ctx,
            &format!("Config already exists at {}", path.display()),
            "Use --force to overwrite",
        );
        return Ok(());
    }

    manager.save(&Config::default()).await?;
    ui::step_ok_detail(&ctx, "Configuration initialized", &path.display().to_string());
    Ok(())
}

/// Apply a dot-separated `key = value` to `config`
fn set_value(config: &mut Config, key: &str, value: &str) -> ModcacheResult<()> {
    let parts: Vec<&str> = key.split('.').collect();

    match parts.as_slice() {
        ["general", "log_format"] => match value {
            "text" | "json" => config.general.log_format = value.to_string(),
            _ => {
                return Err(ModcacheError::User(format!(
                    "Invalid log format: {}. Use text or json",
                    value
                )))
            }
        },
        ["cache", "file"] => {
            config.cache.file = (!value.is_empty()).then(|| PathBuf::from(value));
        }
        ["cache", "concurrency"] => config.cache.concurrency = parse_usize(value)?,
        ["cache", "manifest_name"] => config.cache.manifest_name = value.to_string(),
        ["cache", "isolation_dir"] => config.cache.isolation_dir = value.to_string(),
        _ => return Err(ModcacheError::User(format!("Unknown config key: {}", key))),
    }

    config.cache.to_engine_options().validate()
}

fn parse_usize(value: &str) -> ModcacheResult<usize> {
    value
        .parse()
        .map_err(|_| ModcacheError::User(format!("Invalid number: {}", value)))
}
