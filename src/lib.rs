//! ```text
//! PDF on disk ──► loader::load_pdf ──► Vec<PageRecord>
//!                                          │
//!                     splitter::RecursiveCharacterSplitter
//!                                          │
//!                                          ▼
//!                                     Vec<Chunk>
//!                                          │
//!            ingestion::batch::embed_chunks (EmbeddingModel)
//!                                          │
//!                                          ▼
//!                                   EmbeddedBatch ──► stores::sqlite::SqliteChunkIndex
//!                                                           │
//!                             count / search_similar ◄──────┘
//!
//! ingestion::upload::Ingestor sequences copy → load → split → embed → upsert
//! and reports an UploadResult per processed file.
//! ```
//!
pub mod config;
pub mod embedder;
pub mod ingestion;
pub mod loader;
pub mod splitter;
pub mod stores;
pub mod types;

pub use config::{IngestorConfig, SplitterConfig};
pub use ingestion::{EmbeddedBatch, Ingestor, UploadResult};
pub use loader::PageRecord;
pub use splitter::{Chunk, RecursiveCharacterSplitter};
pub use stores::{ChunkEntry, IndexState};
pub use types::IngestError;
