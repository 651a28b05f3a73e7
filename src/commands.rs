use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::config::{Config, get_config_dir};
use crate::embedder::TeiEmbedder;
use crate::pipeline::{IngestionPipeline, RetrievalPipeline};
use crate::splitter::PdfSplitter;
use crate::storage::FileStorage;
use crate::store::{ChromaStore, VectorStore};
use crate::tokenizer::TeiTokenizer;
use crate::RagError;

/// Ingest PDF files into the vector store. With no explicit files, every PDF
/// in the upload directory is ingested.
#[inline]
pub fn ingest(files: Vec<PathBuf>) -> Result<()> {
    let config = load_config()?;
    let storage = open_storage(&config)?;

    let paths = if files.is_empty() {
        let names = storage.list_pdfs().context("Failed to list upload directory")?;
        if names.is_empty() {
            println!("No PDF files found in the upload directory.");
            return Ok(());
        }
        names
            .iter()
            .map(|name| storage.path(name))
            .collect::<crate::Result<Vec<_>>>()?
    } else {
        files
    };

    info!("Ingesting {} files", paths.len());

    let pipeline = build_ingestion_pipeline(&config)?;

    let bar = ProgressBar::new_spinner().with_style(
        ProgressStyle::with_template("{spinner} Ingesting {msg}")
            .expect("style template is valid"),
    );
    bar.set_message(format!("{} files", paths.len()));
    bar.enable_steady_tick(Duration::from_millis(100));

    let result = pipeline.process_files(&paths);
    bar.finish_and_clear();

    println!("{}", result.message);
    for source in &result.processed {
        println!("  ✓ {}", source);
    }
    for (source, error) in &result.failed {
        println!("  ✗ {}: {}", source, error);
    }

    if result.processed.is_empty() && !result.failed.is_empty() {
        anyhow::bail!("All files failed to ingest");
    }

    Ok(())
}

/// Search the vector store and print the nearest chunks.
#[inline]
pub fn search(query: &str, top_k: usize) -> Result<()> {
    let config = load_config()?;
    let pipeline = build_retrieval_pipeline(&config)?;

    let chunks = pipeline
        .retrieve(query, top_k)
        .context("Retrieval failed")?;

    if chunks.is_empty() {
        println!("No results found.");
        return Ok(());
    }

    println!("Top {} results:", chunks.len());
    for (rank, chunk) in chunks.iter().enumerate() {
        println!();
        println!(
            "{}. {} (page {}, chunk {})",
            rank + 1,
            chunk.metadata.source,
            chunk.metadata.page,
            chunk.metadata.chunk_index
        );
        println!("   {}", chunk.content);
    }

    Ok(())
}

/// Remove a source file and every chunk derived from it.
#[inline]
pub fn delete(source: &str) -> Result<()> {
    let config = load_config()?;
    let storage = open_storage(&config)?;

    let store = build_store(&config)?;
    let deleted = store
        .delete_by_source(source)
        .context("Failed to delete chunks from the vector store")?;
    println!("Deleted {} chunks for '{}'", deleted, source);

    match storage.delete(source) {
        Ok(()) => println!("Removed stored file '{}'", source),
        Err(RagError::FileNotFound(_)) => {
            warn!("'{}' was not in the upload directory", source);
        }
        Err(e) => return Err(e).context("Failed to remove the stored file"),
    }

    Ok(())
}

/// Print the active configuration, or write a default config file.
#[inline]
pub fn show_config(show: bool) -> Result<()> {
    let config = load_config()?;

    if show {
        let content =
            toml::to_string_pretty(&config).context("Failed to serialize configuration")?;
        println!("# {}", config.config_file_path().display());
        print!("{}", content);
        return Ok(());
    }

    if config.config_file_path().exists() {
        println!("Config file: {}", config.config_file_path().display());
    } else {
        config.save().context("Failed to write default config")?;
        println!("Wrote default config to {}", config.config_file_path().display());
    }

    Ok(())
}

fn load_config() -> Result<Config> {
    let config_dir = get_config_dir()?;
    Config::load(&config_dir).context("Failed to load configuration")
}

fn open_storage(config: &Config) -> Result<FileStorage> {
    let upload_dir = if config.ingestion.upload_dir.is_absolute() {
        config.ingestion.upload_dir.clone()
    } else {
        config.base_dir.join(&config.ingestion.upload_dir)
    };
    FileStorage::new(upload_dir)
        .context("Failed to open the upload directory")
}

fn build_store(config: &Config) -> Result<ChromaStore> {
    let base_url = config.chroma_url()?;
    Ok(ChromaStore::new(base_url, config.collection_name()))
}

fn build_ingestion_pipeline(config: &Config) -> Result<IngestionPipeline> {
    let tokenizer = TeiTokenizer::new(config.embedding.tokenize_url.clone());
    let loader = PdfSplitter::new(Box::new(tokenizer));
    let embedder = TeiEmbedder::new(config.embedding.api_url.clone());
    let store = build_store(config)?;

    Ok(
        IngestionPipeline::new(Box::new(loader), Box::new(embedder), Box::new(store))
            .with_batch_size(config.embedding.batch_size)
            .with_chunk_budget(config.ingestion.chunk_size, config.ingestion.chunk_overlap),
    )
}

fn build_retrieval_pipeline(config: &Config) -> Result<RetrievalPipeline> {
    let embedder = TeiEmbedder::new(config.embedding.api_url.clone());
    let store = build_store(config)?;
    Ok(RetrievalPipeline::new(Box::new(embedder), Box::new(store)))
}
