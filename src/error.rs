//! Error handling for unikmer
//!
//! A single error type covers the collaborator layer (input loading, config,
//! output) and the one validation the core performs on its window length.

use rayon::ThreadPoolBuildError;
use std::path::PathBuf;
use thiserror::Error;

/// Error type for all unikmer operations
#[derive(Error, Debug)]
pub enum UnikmerError {
    /// I/O errors (file operations)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Input path does not exist
    #[error("Input file '{}' does not exist", .0.display())]
    InputNotFound(PathBuf),

    /// Invalid FASTA format
    #[error("Invalid FASTA format at line {line}: {message}")]
    InvalidFasta { line: usize, message: String },

    /// Invalid k-mer length
    #[error("K-mer length {k} is invalid (must be at least {min})")]
    InvalidKmerLength { k: usize, min: usize },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Thread pool build error: {0}")]
    ThreadPoolBuildError(#[from] ThreadPoolBuildError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl UnikmerError {
    /// Create an InvalidFasta error with line number and message
    pub fn invalid_fasta(line: usize, message: impl Into<String>) -> Self {
        Self::InvalidFasta {
            line,
            message: message.into(),
        }
    }

    /// Create an InvalidKmerLength error
    pub fn invalid_kmer_length(k: usize, min: usize) -> Self {
        Self::InvalidKmerLength { k, min }
    }

    /// Create a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

/// Result type alias for unikmer operations
pub type Result<T> = std::result::Result<T, UnikmerError>;
