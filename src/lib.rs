use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RagError>;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Count mismatch: {chunks} chunks vs {embeddings} embeddings")]
    ArgumentMismatch { chunks: usize, embeddings: usize },

    #[error("Transient network error: {0}")]
    Transient(String),

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Unparseable response from {service}: {detail}")]
    UnparseableResponse { service: String, detail: String },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub mod commands;
pub mod config;
pub mod embedder;
pub mod identity;
pub mod pipeline;
pub mod retry;
pub mod splitter;
pub mod storage;
pub mod store;
pub mod tokenizer;
