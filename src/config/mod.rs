// Configuration management module
// TOML-backed settings for the embedding service, vector store, and ingestion defaults

pub mod settings;

pub use settings::{ChromaConfig, Config, EmbeddingConfig, IngestionConfig};

/// Get the configuration directory path
#[inline]
pub fn get_config_dir() -> crate::Result<std::path::PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join("ragline"))
        .ok_or_else(|| crate::RagError::Config("Could not determine config directory".to_string()))
}
