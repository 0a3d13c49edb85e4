//! Error types for the outline indexer.
//!
//! Only configuration and I/O problems surface as errors to callers of the
//! pipeline. Malformed model output and exhausted LLM retries are recovered
//! locally (see [`crate::json`] and [`crate::llm`]).

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our custom error.
pub type Result<T> = std::result::Result<T, OutlineError>;

/// Errors that can occur in the outline indexer.
#[derive(Error, Debug)]
pub enum OutlineError {
    /// Error reading or writing files.
    #[error("I/O error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error during serialization/deserialization.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The document path does not exist or holds no pages.
    #[error("Document not found at '{0}'")]
    DocumentNotFound(PathBuf),

    /// The index file does not exist.
    #[error("Index file not found at '{0}'")]
    IndexNotFound(PathBuf),

    /// Configuration error: unknown key, missing credential, bad file.
    #[error("Configuration error: {0}")]
    Config(String),

    /// LLM API error (non-success status or unusable response body).
    #[error("LLM API error: {0}")]
    LlmApi(String),

    /// LLM response parsing error.
    #[error("Failed to parse LLM response: {0}")]
    LlmParse(String),

    /// HTTP request error.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Failed to start the runtime backing a blocking client.
    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl OutlineError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<reqwest::Error> for OutlineError {
    fn from(err: reqwest::Error) -> Self {
        OutlineError::Http(err.to_string())
    }
}

impl From<serde_json::Error> for OutlineError {
    fn from(err: serde_json::Error) -> Self {
        OutlineError::LlmParse(err.to_string())
    }
}
