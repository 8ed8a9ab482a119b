use std::mem::transmute;
use std::os::raw::c_char;
use std::path::{Path, PathBuf};
use std::sync::Once;

use rig::OneOrMany;
use rig::embeddings::{Embedding, EmbeddingModel};
use rig_sqlite::{Column, ColumnValue, SqliteVectorStore, SqliteVectorStoreTable};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use tokio_rusqlite::{Connection, ffi};

use super::IndexState;
use crate::ingestion::EmbeddedBatch;
use crate::types::IngestError;

/// A persisted chunk row: identity, provenance, and content.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChunkEntry {
    pub id: String,
    pub source: String,
    #[serde(deserialize_with = "deserialize_usize_field")]
    pub page_number: usize,
    #[serde(deserialize_with = "deserialize_usize_field")]
    pub chunk_index: usize,
    pub content: String,
    #[serde(deserialize_with = "deserialize_metadata_field")]
    pub metadata: serde_json::Value,
}

impl SqliteVectorStoreTable for ChunkEntry {
    fn name() -> &'static str {
        "chunks"
    }

    fn schema() -> Vec<Column> {
        vec![
            Column::new("id", "TEXT PRIMARY KEY"),
            Column::new("source", "TEXT").indexed(),
            Column::new("page_number", "TEXT"),
            Column::new("chunk_index", "TEXT"),
            Column::new("metadata", "TEXT"),
            Column::new("content", "TEXT"),
        ]
    }

    fn id(&self) -> String {
        self.id.clone()
    }

    fn column_values(&self) -> Vec<(&'static str, Box<dyn ColumnValue>)> {
        vec![
            ("id", Box::new(self.id.clone())),
            ("source", Box::new(self.source.clone())),
            ("page_number", Box::new(self.page_number.to_string())),
            ("chunk_index", Box::new(self.chunk_index.to_string())),
            ("metadata", Box::new(self.metadata.to_string())),
            ("content", Box::new(self.content.clone())),
        ]
    }
}

fn deserialize_usize_field<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Num(u64),
        Text(String),
    }

    match Repr::deserialize(deserializer)? {
        Repr::Num(value) => usize::try_from(value)
            .map_err(|_| de::Error::custom(format!("value {value} does not fit in usize"))),
        Repr::Text(text) => text
            .parse::<usize>()
            .map_err(|err| de::Error::custom(format!("unable to parse '{text}': {err}"))),
    }
}

fn deserialize_metadata_field<'de, D>(deserializer: D) -> Result<serde_json::Value, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    if let serde_json::Value::String(raw) = value {
        serde_json::from_str(&raw).map_or(Ok(serde_json::Value::String(raw)), Ok)
    } else {
        Ok(value)
    }
}

/// SQLite-backed vector index over [`ChunkEntry`] rows.
#[derive(Clone)]
pub struct SqliteChunkIndex<E>
where
    E: EmbeddingModel + 'static,
{
    inner: SqliteVectorStore<E, ChunkEntry>,
    /// Separate connection handle for direct queries not covered by
    /// rig-sqlite. This is a clone of the connection used by the store.
    conn: Connection,
    path: PathBuf,
}

impl<E> std::fmt::Debug for SqliteChunkIndex<E>
where
    E: EmbeddingModel + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteChunkIndex")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl<E> SqliteChunkIndex<E>
where
    E: EmbeddingModel + Clone + Send + Sync + 'static,
{
    /// Opens (creating if absent) the index at `path`.
    ///
    /// Registers the sqlite-vec extension once per process, then verifies
    /// the file answers as a vector-capable database. Malformed on-disk
    /// data fails with [`IngestError::CorruptIndex`]; opening a fresh path
    /// creates an empty index and is otherwise side-effect free, so two
    /// consecutive opens observe the same [`IndexState::Empty`].
    pub async fn open(path: impl AsRef<Path>, model: &E) -> Result<Self, IngestError> {
        Self::register_sqlite_vec()?;
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(&path)
            .await
            .map_err(|err| IngestError::CorruptIndex(err.to_string()))?;
        conn.call(|conn| {
            let result = conn.query_row("select vec_version()", [], |row| row.get::<_, String>(0));
            match result {
                Ok(_) => Ok(()),
                Err(err) => Err(tokio_rusqlite::Error::Rusqlite(err)),
            }
        })
        .await
        .map_err(|err| IngestError::CorruptIndex(err.to_string()))?;
        // Clone the handle for direct access before moving it into the store.
        let conn_for_queries = conn.clone();
        let store = SqliteVectorStore::new(conn, model)
            .await
            .map_err(|err| IngestError::CorruptIndex(err.to_string()))?;
        Ok(Self {
            inner: store,
            conn: conn_for_queries,
            path,
        })
    }

    /// Location of the underlying database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reports whether the index already holds entries.
    pub async fn state(&self) -> Result<IndexState, IngestError> {
        let entries = self.count().await?;
        if entries == 0 {
            Ok(IndexState::Empty)
        } else {
            Ok(IndexState::Loaded { entries })
        }
    }

    /// Appends an embedded batch to the index.
    ///
    /// Rows are inserted in a single write; existing entries are never
    /// touched, so a failure leaves prior persisted state intact. Returns
    /// the number of entries added.
    pub async fn upsert(&self, batch: EmbeddedBatch) -> Result<usize, IngestError> {
        if batch.is_empty() {
            return Ok(0);
        }
        let added = batch.chunk_count();
        let mut rows = Vec::with_capacity(added);
        for (entry, vector) in batch.into_entries() {
            let converted: Vec<f64> = vector.into_iter().map(f64::from).collect();
            let embedding = Embedding {
                document: entry.content.clone(),
                vec: converted,
            };
            rows.push((entry, OneOrMany::one(embedding)));
        }
        self.inner
            .add_rows(rows)
            .await
            .map_err(|err| IngestError::Storage(err.to_string()))?;
        tracing::info!(added, path = %self.path.display(), "appended entries to index");
        Ok(added)
    }

    /// Total number of persisted entries.
    pub async fn count(&self) -> Result<usize, IngestError> {
        self.conn
            .call(|conn| {
                let table_exists = conn
                    .query_row(
                        "SELECT name FROM sqlite_master WHERE type='table' AND name='chunks'",
                        [],
                        |_| Ok(()),
                    )
                    .is_ok();
                if !table_exists {
                    return Ok(0);
                }
                let count: i64 = conn
                    .query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;
                Ok(count as usize)
            })
            .await
            .map_err(|err| IngestError::Storage(err.to_string()))
    }

    /// Nearest-neighbor lookup over the stored vectors.
    ///
    /// Returns up to `top_k` entries ordered by cosine similarity, most
    /// similar first.
    pub async fn search_similar(
        &self,
        query_embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<(ChunkEntry, f32)>, IngestError> {
        let embedding_json = serde_json::to_string(query_embedding)
            .map_err(|err| IngestError::Storage(err.to_string()))?;

        self.conn
            .call(move |conn| {
                let mut stmt = conn
                    .prepare(&format!(
                        "SELECT c.id, c.source, c.page_number, c.chunk_index, c.content, c.metadata, \
                         vec_distance_cosine(e.embedding, vec_f32(?)) as distance \
                         FROM chunks c \
                         JOIN chunks_embeddings e ON e.rowid = c.rowid \
                         ORDER BY distance ASC \
                         LIMIT {}",
                        top_k
                    ))
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;

                let rows = stmt
                    .query_map([&embedding_json], |row| {
                        let entry = ChunkEntry {
                            id: row.get(0)?,
                            source: row.get(1)?,
                            page_number: row.get::<_, String>(2)?.parse().unwrap_or(0),
                            chunk_index: row.get::<_, String>(3)?.parse().unwrap_or(0),
                            content: row.get(4)?,
                            metadata: row
                                .get::<_, String>(5)
                                .map(|s| serde_json::from_str(&s).unwrap_or_default())
                                .unwrap_or_default(),
                        };
                        let distance: f32 = row.get(6)?;
                        // Cosine distance to similarity.
                        Ok((entry, 1.0 - distance))
                    })
                    .map_err(tokio_rusqlite::Error::Rusqlite)?;

                let mut results = Vec::new();
                for row in rows {
                    results.push(row.map_err(tokio_rusqlite::Error::Rusqlite)?);
                }
                Ok(results)
            })
            .await
            .map_err(|err| IngestError::Storage(err.to_string()))
    }

    fn register_sqlite_vec() -> Result<(), IngestError> {
        use std::sync::Mutex;

        static INIT: Once = Once::new();
        static INIT_RESULT: Mutex<Option<Result<(), String>>> = Mutex::new(None);

        INIT.call_once(|| {
            let result = unsafe {
                type SqliteExtensionInit = unsafe extern "C" fn(
                    *mut ffi::sqlite3,
                    *mut *mut c_char,
                    *const ffi::sqlite3_api_routines,
                ) -> i32;

                let init: unsafe extern "C" fn() = sqlite_vec::sqlite3_vec_init;
                let init_fn: SqliteExtensionInit =
                    transmute::<unsafe extern "C" fn(), SqliteExtensionInit>(init);
                let rc = ffi::sqlite3_auto_extension(Some(init_fn));
                if rc != 0 {
                    Err(format!(
                        "failed to register sqlite-vec extension (code {rc})"
                    ))
                } else {
                    Ok(())
                }
            };
            *INIT_RESULT.lock().expect("init result mutex poisoned") = Some(result);
        });

        INIT_RESULT
            .lock()
            .expect("init result mutex poisoned")
            .clone()
            .expect("init was called but result not set")
            .map_err(IngestError::Storage)
    }
}
