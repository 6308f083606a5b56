use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;

use crate::cli::output::get_formatter;
use crate::models::{Config, OutputFormat};

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    #[command(about = "Write a configuration file with default values")]
    Init {
        #[arg(long, help = "Force overwrite existing config")]
        force: bool,
    },
    #[command(about = "Show the effective configuration")]
    Show,
    #[command(about = "Show the configuration file path")]
    Path,
}

pub fn handle_config(
    cmd: ConfigCommand,
    config: &Config,
    explicit_path: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    match cmd {
        ConfigCommand::Init { force } => handle_init(force, explicit_path, format),
        ConfigCommand::Show => handle_show(config, format),
        ConfigCommand::Path => handle_path(explicit_path),
    }
}

fn resolve_path(explicit_path: Option<&Path>) -> Result<PathBuf> {
    explicit_path
        .map(Path::to_path_buf)
        .or_else(Config::config_path)
        .ok_or_else(|| anyhow::anyhow!("could not determine config directory"))
}

fn handle_init(force: bool, explicit_path: Option<&Path>, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);
    let path = resolve_path(explicit_path)?;

    if path.exists() && !force {
        anyhow::bail!(
            "Config already exists at: {}\nUse --force to overwrite.",
            path.display()
        );
    }

    Config::default()
        .save_to(&path)
        .context("failed to write config")?;
    print!(
        "{}",
        formatter.format_message(&format!("Created config at: {}", path.display()))
    );
    Ok(())
}

/// The effective configuration with secrets masked.
fn redacted(config: &Config) -> Config {
    let mut shown = config.clone();
    if shown.vector_store.api_key.is_some() {
        shown.vector_store.api_key = Some("********".to_string());
    }
    shown
}

fn handle_show(config: &Config, format: OutputFormat) -> Result<()> {
    let shown = redacted(config);
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&shown)?),
        OutputFormat::Text => print!("{}", toml::to_string_pretty(&shown)?),
    }
    Ok(())
}

fn handle_path(explicit_path: Option<&Path>) -> Result<()> {
    let path = resolve_path(explicit_path)?;
    let state = if path.exists() { "active" } else { "would be" };
    println!("Config file ({}): {}", state, path.display());

    if let Ok(cwd) = std::env::current_dir() {
        let env_path = cwd.join(".env");
        if env_path.exists() {
            println!(".env file (active): {}", env_path.display());
        }
    }
    Ok(())
}
