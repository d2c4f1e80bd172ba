//! Config command - manage configuration.

use anyhow::Result;
use clap::{Args, Subcommand};
use sugesto_store::{
    API_URL_ENV, Settings, SettingsStore, default_config_dir, default_settings_path,
    default_storage_path,
};
use tracing::info;

use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config subcommands.
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration.
    Show,

    /// Show configuration paths.
    Path,

    /// Set one value, e.g. `sugesto config set bulk_concurrency 4`.
    Set {
        /// Setting name.
        #[arg(value_parser = clap::builder::PossibleValuesParser::new(Settings::KEYS.iter().copied()))]
        key: String,

        /// New value.
        value: String,
    },

    /// Reset to defaults.
    Reset,
}

/// Runs the config command.
pub fn run(args: &ConfigArgs, cli: &Cli) -> Result<()> {
    match &args.action {
        ConfigAction::Show => show_config(cli),
        ConfigAction::Path => show_paths(cli),
        ConfigAction::Set { key, value } => set_value(key, value, cli),
        ConfigAction::Reset => reset_config(cli),
    }
}

fn show_config(cli: &Cli) -> Result<()> {
    let store = SettingsStore::load_default()?;
    let settings = store
        .get()
        .with_env_overrides()
        .with_api_url_override(cli.api_url.clone());

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            println!("{}", formatter.format_settings(&settings));
            if std::env::var_os(API_URL_ENV).is_some() {
                println!();
                println!("api_url is overridden by {API_URL_ENV}");
            }
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&settings)?);
        }
    }

    Ok(())
}

fn show_paths(cli: &Cli) -> Result<()> {
    let config_dir = default_config_dir();
    let settings_path = default_settings_path();
    let storage_path = default_storage_path();

    match cli.format {
        OutputFormat::Text => {
            println!("Configuration Paths");
            println!("{}", "─".repeat(40));
            println!();
            println!("Config dir:    {}", config_dir.display());
            println!("Settings file: {}", settings_path.display());
            println!("Storage file:  {}", storage_path.display());
        }
        OutputFormat::Json => {
            let paths = serde_json::json!({
                "config_dir": config_dir.display().to_string(),
                "settings_file": settings_path.display().to_string(),
                "storage_file": storage_path.display().to_string(),
            });
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&paths)?);
        }
    }

    Ok(())
}

fn set_value(key: &str, value: &str, _cli: &Cli) -> Result<()> {
    let store = SettingsStore::load_default()?;
    store.update(|settings| settings.set(key, value))?;
    store.save()?;

    info!(key, value, "Setting updated");
    println!("{key} set to: {value}");

    Ok(())
}

fn reset_config(_cli: &Cli) -> Result<()> {
    let path = default_settings_path();

    if path.exists() {
        std::fs::remove_file(&path)?;
        info!(path = %path.display(), "Settings reset");
        println!("Configuration reset to defaults");
    } else {
        println!("No configuration file to reset");
    }

    Ok(())
}
