use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use super::pipeline::{IngestOptions, ingest, wants_progress};
use crate::cli::output::get_formatter;
use crate::models::{BoundaryPolicy, Config, OutputFormat};

#[derive(Debug, Args)]
pub struct IngestArgs {
    /// PDF or text file to index
    #[arg(required = true)]
    pub file: PathBuf,

    /// Drop the collection before indexing
    #[arg(long)]
    pub reset: bool,

    /// End segments at paragraph, sentence or word breaks when one is near
    #[arg(long)]
    pub natural_breaks: bool,
}

pub async fn handle_ingest(args: IngestArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);
    let options = IngestOptions {
        reset: args.reset,
        boundary: args.natural_breaks.then_some(BoundaryPolicy::Natural),
        progress: wants_progress(format),
    };

    let report = ingest(&args.file, config, options).await?;
    print!("{}", formatter.format_index_report(&report));
    Ok(())
}
