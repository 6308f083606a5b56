use anyhow::Result;
use clap::Args;

use super::pipeline::{build_query_loop, chat};
use crate::models::Config;

#[derive(Debug, Args)]
pub struct ChatArgs {
    /// Show the page numbers each answer was drawn from
    #[arg(long)]
    pub sources: bool,
}

pub async fn handle_chat(args: ChatArgs, config: &Config) -> Result<()> {
    let query_loop = build_query_loop(config, args.sources || config.output.show_sources)?;
    chat(&query_loop).await
}
