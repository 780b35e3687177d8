//! docsearch: ingest a folder into the local vector store, or ask it a question.
//!
//!   docsearch ingest --folder ./docs --patterns '*.txt,**/*.md'
//!   docsearch search --query "what does the annual plan cost?" -n 3

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use docsearch_core::config::Config;
use docsearch_rag::RagService;

const PREVIEW_CHARS: usize = 300;

#[derive(Parser)]
#[command(
    name = "docsearch",
    version,
    about = "Local document search with retrieval-augmented answers"
)]
struct Cli {
    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rebuild the vector store from a folder
    Ingest {
        /// Folder to ingest
        #[arg(long, default_value = ".")]
        folder: PathBuf,

        /// Comma-separated glob patterns (defaults to rag.supported_file_types)
        #[arg(long, value_delimiter = ',')]
        patterns: Option<Vec<String>>,
    },
    /// Answer a question from the ingested documents
    Search {
        #[arg(short, long)]
        query: String,

        /// Number of chunks to retrieve (defaults to search.default_limit)
        #[arg(short, long)]
        num_results: Option<usize>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    tracing_subscriber::fmt().with_env_filter(env_filter).with_target(false).init();

    let config = Config::load()?;
    let rag = RagService::from_config(config)?;
    debug!("Using vector store at {}", rag.store_path().display());

    match cli.command {
        Command::Ingest { folder, patterns } => {
            let report = rag.ingest(&folder, patterns.as_deref())?;
            match &report.store_path {
                Some(path) => println!(
                    "Indexed {} documents as {} chunks into {}",
                    report.num_documents,
                    report.num_chunks,
                    path.display()
                ),
                None => println!("No chunks produced; vector store removed"),
            }
            for skipped in &report.skipped_files {
                println!("  skipped {}: {}", skipped.path, skipped.reason);
            }
        }
        Command::Search { query, num_results } => {
            let answer = rag.search(&query, num_results)?;
            println!("\nAnswer:");
            println!("{}", "-".repeat(80));
            println!("{}", answer.answer);
            println!("{}", "-".repeat(80));
            println!("\nSources:");
            for source in &answer.sources {
                let preview: String = source.content.chars().take(PREVIEW_CHARS).collect();
                let truncated = source.content.chars().count() > PREVIEW_CHARS;
                let ellipsis = if truncated { "..." } else { "" };
                println!("\nRelevance: {:.2} (distance {:.4})", source.relevance, source.distance);
                println!("Source: {}", source.source);
                println!("Content: {}{}", preview, ellipsis);
                println!("{}", "-".repeat(80));
            }
        }
    }
    Ok(())
}
