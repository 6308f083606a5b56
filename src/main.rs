use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;

use pdfqa::cli::commands::{
    handle_ask, handle_chat, handle_clear, handle_config, handle_ingest, handle_run,
    handle_status,
};
use pdfqa::cli::output::get_formatter;
use pdfqa::cli::{Cli, Commands};
use pdfqa::logging;
use pdfqa::models::{Config, OutputFormat};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => fail(cli.format.unwrap_or_default(), &e),
    };
    let format = cli.format.unwrap_or(config.output.default_format);

    if let Err(e) = run(cli, &config, format).await {
        fail(format, &e);
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("failed to load configuration")?;

    if !matches!(cli.command, Commands::Config(_)) {
        config.validate()?;
    }
    Ok(config)
}

fn fail(format: OutputFormat, error: &anyhow::Error) -> ! {
    eprint!("{}", get_formatter(format).format_error(&format!("{error:#}")));
    std::process::exit(1);
}

async fn run(cli: Cli, config: &Config, format: OutputFormat) -> Result<()> {
    tokio::select! {
        result = run_command(cli, config, format) => result,
        _ = shutdown_signal() => {
            // A pending stdin read would keep the runtime from shutting down.
            eprintln!("\nReceived shutdown signal, exiting.");
            std::process::exit(130);
        }
    }
}

async fn run_command(cli: Cli, config: &Config, format: OutputFormat) -> Result<()> {
    match cli.command {
        Commands::Run(args) => handle_run(args, config, format).await,
        Commands::Ingest(args) => handle_ingest(args, config, format).await,
        Commands::Chat(args) => handle_chat(args, config).await,
        Commands::Ask(args) => handle_ask(args, config, format).await,
        Commands::Status => handle_status(config, format).await,
        Commands::Clear(args) => handle_clear(args, config, format).await,
        Commands::Config(cmd) => handle_config(cmd, config, cli.config.as_deref(), format),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
