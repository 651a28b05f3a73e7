
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

use crate::RagError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub chroma: ChromaConfig,
    #[serde(default)]
    pub ingestion: IngestionConfig,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// TEI embed endpoint, e.g. `http://localhost:8080/embed`
    pub api_url: Url,
    /// TEI tokenize endpoint, e.g. `http://localhost:8080/tokenize`
    pub tokenize_url: Url,
    pub model: String,
    /// Number of texts sent per embed request
    pub batch_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChromaConfig {
    pub host: String,
    pub port: u16,
    /// Base collection name; the model name is appended to avoid
    /// mixing vector spaces when the embedding model changes
    pub collection: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IngestionConfig {
    /// Token budget per chunk
    pub chunk_size: usize,
    /// Tokens of trailing context shared between adjacent chunks
    pub chunk_overlap: usize,
    pub upload_dir: PathBuf,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            api_url: Url::parse("http://localhost:8080/embed").expect("static URL is valid"),
            tokenize_url: Url::parse("http://localhost:8080/tokenize")
                .expect("static URL is valid"),
            model: "all-MiniLM-L6-v2".to_string(),
            batch_size: 16,
        }
    }
}

impl Default for ChromaConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8000,
            collection: "pdf_embeddings".to_string(),
        }
    }
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            chunk_size: 256,
            chunk_overlap: 50,
            upload_dir: PathBuf::from("uploads"),
        }
    }
}

impl Config {
    #[inline]
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join("config.toml");

        if !config_path.exists() {
            return Ok(Self {
                embedding: EmbeddingConfig::default(),
                chroma: ChromaConfig::default(),
                ingestion: IngestionConfig::default(),
                base_dir: config_dir.as_ref().to_path_buf(),
            });
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        config.base_dir = config_dir.as_ref().to_path_buf();

        config
            .validate()
            .context("Configuration validation failed")?;

        Ok(config)
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        fs::create_dir_all(&self.base_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                self.base_dir.display()
            )
        })?;

        let config_path = self.config_file_path();
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.base_dir.join("config.toml")
    }

    #[inline]
    pub fn validate(&self) -> Result<(), RagError> {
        self.embedding.validate()?;
        self.chroma.validate()?;
        self.ingestion.validate()?;
        Ok(())
    }

    /// Full collection name for the configured embedding model.
    ///
    /// Chunks embedded by different models live in different collections,
    /// so switching models never mixes incompatible vector spaces.
    #[inline]
    pub fn collection_name(&self) -> String {
        crate::store::collection_name(&self.chroma.collection, &self.embedding.model)
    }

    /// Chroma server base URL
    #[inline]
    pub fn chroma_url(&self) -> Result<Url, RagError> {
        let url_str = format!("http://{}:{}", self.chroma.host, self.chroma.port);
        Url::parse(&url_str)
            .map_err(|_| RagError::Config(format!("Invalid Chroma URL: {}", url_str)))
    }
}

impl EmbeddingConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), RagError> {
        if self.model.trim().is_empty() {
            return Err(RagError::Config(
                "Embedding model name cannot be empty".to_string(),
            ));
        }

        if self.batch_size == 0 || self.batch_size > 1000 {
            return Err(RagError::Config(format!(
                "Invalid embed batch size: {} (must be between 1 and 1000)",
                self.batch_size
            )));
        }

        Ok(())
    }
}

impl ChromaConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), RagError> {
        if self.port == 0 {
            return Err(RagError::Config(
                "Chroma port must be nonzero".to_string(),
            ));
        }

        if self.collection.trim().is_empty() {
            return Err(RagError::Config(
                "Collection name cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

impl IngestionConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), RagError> {
        if self.chunk_size == 0 {
            return Err(RagError::Config(
                "chunk_size must be greater than zero".to_string(),
            ));
        }

        if self.chunk_size <= self.chunk_overlap {
            return Err(RagError::Config(format!(
                "chunk_size ({}) must be greater than chunk_overlap ({})",
                self.chunk_size, self.chunk_overlap
            )));
        }

        Ok(())
    }
}
