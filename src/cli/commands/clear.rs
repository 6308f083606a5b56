use anyhow::Result;
use clap::Args;

use super::pipeline::open_store;
use crate::cli::output::get_formatter;
use crate::models::{Config, OutputFormat};

#[derive(Debug, Args)]
pub struct ClearArgs {
    /// Skip confirmation prompt
    #[arg(long, short = 'y')]
    pub force: bool,
}

pub async fn handle_clear(args: ClearArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);
    let collection = config.vector_store.collection.as_str();

    if !args.force {
        println!(
            "This will delete every indexed segment in '{}'. Continue? [y/N]",
            collection
        );
        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;
        if !input.trim().eq_ignore_ascii_case("y") {
            print!("{}", formatter.format_message("Cancelled."));
            return Ok(());
        }
    }

    let store = open_store(config)?;
    store.clear_collection(collection).await?;

    print!(
        "{}",
        formatter.format_message(&format!("Collection '{}' has been cleared.", collection))
    );
    Ok(())
}
