//! Shared error type for the ingestion pipeline.

use thiserror::Error;

/// Errors surfaced by the pipeline.
///
/// Nothing here is recovered internally: every stage propagates its failure
/// to the caller, which decides how to present it. The variants mirror the
/// pipeline stages so callers can match on the failing step.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The source document is missing, unreadable, or not a valid PDF.
    #[error("failed to load document: {0}")]
    Load(String),

    /// Chunking parameters are invalid (e.g. overlap >= chunk size).
    #[error("invalid splitter configuration: {0}")]
    SplitConfig(String),

    /// The embedding provider failed or returned malformed output.
    #[error("embedding provider error: {0}")]
    Embedding(String),

    /// The on-disk index could not be opened as a vector database.
    #[error("vector index is corrupt or unreadable: {0}")]
    CorruptIndex(String),

    /// A storage operation against an open index failed.
    #[error("vector index storage error: {0}")]
    Storage(String),

    /// Copying the upload into the durable uploads directory failed.
    #[error("failed to copy upload: {0}")]
    Copy(String),

    /// Other filesystem failures (directory bootstrap and the like).
    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for IngestError {
    fn from(err: std::io::Error) -> Self {
        IngestError::Io(err.to_string())
    }
}
