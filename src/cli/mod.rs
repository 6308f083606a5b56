//! Command-line interface for the PDF question-answering pipeline.

pub mod commands;
pub mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::models::OutputFormat;

/// Ask questions about a PDF, answered by a local model from the document's own text.
#[derive(Debug, Parser)]
#[command(name = "pdfqa")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[arg(long, short = 'c', global = true, env = "PDFQA_CONFIG", help = "Path to a config file")]
    pub config: Option<PathBuf>,

    #[arg(long, short = 'f', global = true, help = "Output format: text or json")]
    pub format: Option<OutputFormat>,

    #[arg(long, short = 'v', global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Index a document, then answer questions about it interactively
    Run(commands::RunArgs),

    /// Index a document without starting the question loop
    Ingest(commands::IngestArgs),

    /// Answer questions about already indexed documents
    Chat(commands::ChatArgs),

    /// Answer a single question and exit
    Ask(commands::AskArgs),

    /// Check Ollama and vector store status
    Status,

    /// Delete every indexed segment in the collection
    Clear(commands::ClearArgs),

    /// Manage configuration
    #[command(subcommand)]
    Config(commands::ConfigCommand),
}
