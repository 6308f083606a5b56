use anyhow::{Context, Result};
use clap::Args;

use super::pipeline::build_query_loop;
use crate::cli::output::get_formatter;
use crate::models::{Config, OutputFormat};

#[derive(Debug, Args)]
pub struct AskArgs {
    /// Question about the indexed document
    #[arg(required = true)]
    pub question: String,

    /// Show the page numbers the answer was drawn from
    #[arg(long)]
    pub sources: bool,
}

pub async fn handle_ask(args: AskArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let question = args.question.trim();
    if question.is_empty() {
        anyhow::bail!("question must not be empty");
    }

    let formatter = get_formatter(format);
    let query_loop = build_query_loop(config, false)?;
    let session = query_loop
        .answer(question)
        .await
        .context("could not answer the question")?;

    print!(
        "{}",
        formatter.format_answer(&session, args.sources || config.output.show_sources)
    );
    Ok(())
}
