//! Configuration for the splitter and the upload pipeline.
//!
//! Both structs are built once at process start and stay immutable for the
//! lifetime of the [`Ingestor`](crate::ingestion::Ingestor) that owns them.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::types::IngestError;

/// Default chunk window, in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Default trailing-context overlap between consecutive chunks, in characters.
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// Configuration for [`RecursiveCharacterSplitter`](crate::splitter::RecursiveCharacterSplitter).
///
/// `separators` is tried in priority order when cutting text: paragraph
/// breaks first, then line breaks, then spaces. An empty string acts as the
/// terminal rung and cuts mid-word; when the ladder runs out the splitter
/// falls back to the same hard cut.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SplitterConfig {
    /// Maximum chunk length in characters.
    pub chunk_size: usize,
    /// Characters of trailing context carried from one chunk into the next.
    pub chunk_overlap: usize,
    /// Separator ladder, most preferred first.
    pub separators: Vec<String>,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            separators: vec![
                "\n\n".to_string(),
                "\n".to_string(),
                " ".to_string(),
                String::new(),
            ],
        }
    }
}

impl SplitterConfig {
    /// Rejects parameter combinations the splitter cannot honor.
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.chunk_size == 0 {
            return Err(IngestError::SplitConfig(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(IngestError::SplitConfig(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

/// Filesystem layout and chunking parameters for an [`Ingestor`](crate::ingestion::Ingestor).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IngestorConfig {
    /// Directory that keeps a durable copy of every processed source file.
    pub uploads_dir: PathBuf,
    /// Location of the SQLite vector index.
    pub index_path: PathBuf,
    /// Chunking parameters.
    pub splitter: SplitterConfig,
}

impl Default for IngestorConfig {
    fn default() -> Self {
        Self {
            uploads_dir: PathBuf::from("data/uploads"),
            index_path: PathBuf::from("data/index/chunks.sqlite"),
            splitter: SplitterConfig::default(),
        }
    }
}
