//! Upload orchestration: from a file handed over by the front end to
//! entries persisted in the vector index.
//!
//! * [`batch`] — pairs split chunks with their embedding vectors.
//! * [`upload`] — the sequential copy → load → split → embed → upsert
//!   pipeline and its [`UploadResult`] summary.

pub mod batch;
pub mod upload;

pub use batch::{EmbeddedBatch, embed_chunks};
pub use upload::{Ingestor, UploadResult};
