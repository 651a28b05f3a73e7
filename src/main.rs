use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use ragline::commands::{delete, ingest, search, show_config};

#[derive(Parser)]
#[command(name = "ragline")]
#[command(about = "PDF ingestion and semantic search over a vector store")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the configuration file
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Ingest PDF files into the vector store
    Ingest {
        /// Files to ingest; defaults to every PDF in the upload directory
        files: Vec<PathBuf>,
    },
    /// Search indexed documents
    Search {
        /// Query text
        query: String,
        /// Number of results to return (clamped to 1-100)
        #[arg(long, default_value_t = 5)]
        top_k: usize,
    },
    /// Delete a source file and all chunks derived from it
    Delete {
        /// Source file name, e.g. "report.pdf"
        source: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { show } => {
            show_config(show)?;
        }
        Commands::Ingest { files } => {
            ingest(files)?;
        }
        Commands::Search { query, top_k } => {
            search(&query, top_k)?;
        }
        Commands::Delete { source } => {
            delete(&source)?;
        }
    }

    Ok(())
}
