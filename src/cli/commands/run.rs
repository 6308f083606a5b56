use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use super::pipeline::{IngestOptions, build_query_loop, chat, ingest, wants_progress};
use crate::cli::output::get_formatter;
use crate::models::{Config, OutputFormat};

#[derive(Debug, Args)]
pub struct RunArgs {
    /// PDF or text file to ask questions about
    #[arg(required = true)]
    pub file: PathBuf,

    /// Drop previously indexed segments first
    #[arg(long)]
    pub reset: bool,

    /// Show the page numbers each answer was drawn from
    #[arg(long)]
    pub sources: bool,
}

/// Ingest `file`, then answer questions about it until `exit`.
pub async fn handle_run(args: RunArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);
    let options = IngestOptions {
        reset: args.reset,
        boundary: None,
        progress: wants_progress(format),
    };

    let report = ingest(&args.file, config, options).await?;
    print!("{}", formatter.format_index_report(&report));

    let query_loop = build_query_loop(config, args.sources || config.output.show_sources)?;
    chat(&query_loop).await
}
