//! Persistence for chunk documents and their embedding vectors.
//!
//! The index is a single SQLite database holding two tables: `chunks`
//! (the metadata side table) and `chunks_embeddings` (a `vec0` virtual
//! table from `sqlite-vec` holding the vectors, correlated by rowid).
//! From this crate's perspective the index is append-only: entries are
//! added, never rewritten or removed.

pub mod sqlite;

use serde::{Deserialize, Serialize};

pub use sqlite::{ChunkEntry, SqliteChunkIndex};

/// Tagged result of opening an index, consumed uniformly by upsert.
///
/// `Empty` covers both a freshly created database and one that exists but
/// holds no entries; `Loaded` reports how many entries are already present.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexState {
    /// No entries persisted yet.
    Empty,
    /// An existing index with `entries` persisted chunks.
    Loaded {
        /// Number of persisted entries.
        entries: usize,
    },
}

impl IndexState {
    /// Number of entries currently persisted.
    pub fn entries(&self) -> usize {
        match self {
            IndexState::Empty => 0,
            IndexState::Loaded { entries } => *entries,
        }
    }
}
