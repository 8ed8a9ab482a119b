//! The upload orchestrator.

use std::path::{Path, PathBuf};

use rig::embeddings::EmbeddingModel;
use tokio::fs;
use tokio::sync::Mutex;

use crate::config::IngestorConfig;
use crate::ingestion::batch::embed_chunks;
use crate::loader;
use crate::splitter::RecursiveCharacterSplitter;
use crate::stores::sqlite::SqliteChunkIndex;
use crate::types::IngestError;

/// Summary returned to the caller after a successful upload.
///
/// Ephemeral: rendered by the front end, never persisted.
#[derive(Clone, Debug, PartialEq)]
pub struct UploadResult {
    /// Durable copy of the uploaded file inside the uploads directory.
    pub saved_path: PathBuf,
    /// Number of chunks added to the index by this upload.
    pub chunk_count: usize,
    /// Location of the vector index the chunks were persisted to.
    pub index_location: PathBuf,
}

/// Sequences copy → load → split → embed → upsert for one upload at a time.
///
/// Constructed once at process start; configuration is immutable
/// afterwards. Index writes are serialized with an in-process lock, so two
/// concurrent `ingest` calls on the same `Ingestor` cannot interleave their
/// open→upsert sequences. Separate processes writing the same index path
/// are outside this guarantee and rely on SQLite's own locking.
pub struct Ingestor<E>
where
    E: EmbeddingModel + Clone + Send + Sync + 'static,
{
    config: IngestorConfig,
    splitter: RecursiveCharacterSplitter,
    model: E,
    index_lock: Mutex<()>,
}

impl<E> Ingestor<E>
where
    E: EmbeddingModel + Clone + Send + Sync + 'static,
{
    /// Builds an ingestor, validating the chunking configuration up front.
    pub fn new(config: IngestorConfig, model: E) -> Result<Self, IngestError> {
        let splitter = RecursiveCharacterSplitter::new(config.splitter.clone())?;
        Ok(Self {
            config,
            splitter,
            model,
            index_lock: Mutex::new(()),
        })
    }

    /// The configuration this ingestor was built with.
    pub fn config(&self) -> &IngestorConfig {
        &self.config
    }

    /// Creates the uploads directory and the index's parent directory.
    ///
    /// Called by [`ingest`](Self::ingest); exposed so a front end can
    /// bootstrap the layout at startup.
    pub async fn prepare(&self) -> Result<(), IngestError> {
        fs::create_dir_all(&self.config.uploads_dir).await?;
        if let Some(parent) = self.config.index_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        Ok(())
    }

    /// Processes one uploaded file end to end.
    ///
    /// The destination name is the sanitized `original_name` when provided,
    /// otherwise the sanitized file name of `tmp_path`. The copy is skipped
    /// when source and destination coincide. Any stage failure propagates
    /// unrecovered; entries persisted by earlier uploads are left intact.
    pub async fn ingest(
        &self,
        tmp_path: &Path,
        original_name: Option<&str>,
    ) -> Result<UploadResult, IngestError> {
        self.prepare().await?;

        let file_name = match original_name {
            Some(name) => name.to_string(),
            None => tmp_path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .ok_or_else(|| {
                    IngestError::Copy(format!(
                        "upload path has no file name: {}",
                        tmp_path.display()
                    ))
                })?,
        };
        let saved_path = self.config.uploads_dir.join(sanitize_file_name(&file_name));

        if saved_path != tmp_path {
            fs::copy(tmp_path, &saved_path).await.map_err(|err| {
                IngestError::Copy(format!(
                    "{} -> {}: {err}",
                    tmp_path.display(),
                    saved_path.display()
                ))
            })?;
        }
        tracing::info!(path = %saved_path.display(), "stored upload");

        let pages = loader::load_pdf(&saved_path).await?;
        let chunks = self.splitter.split_pages(&pages);

        // One open→upsert sequence per index path at a time.
        let _guard = self.index_lock.lock().await;
        let index = SqliteChunkIndex::open(&self.config.index_path, &self.model).await?;
        let batch = embed_chunks(&self.model, &chunks).await?;
        let chunk_count = index.upsert(batch).await?;

        tracing::info!(
            path = %saved_path.display(),
            pages = pages.len(),
            chunk_count,
            "upload ingested"
        );

        Ok(UploadResult {
            saved_path,
            chunk_count,
            index_location: self.config.index_path.clone(),
        })
    }
}

/// Normalizes an upload's file name into a safe path component.
///
/// Path separators and shell-hostile characters become underscores; the
/// extension survives because `.` is kept.
pub fn sanitize_file_name(input: &str) -> String {
    input
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_keeps_safe_names_intact() {
        assert_eq!(sanitize_file_name("report-2024.pdf"), "report-2024.pdf");
    }

    #[test]
    fn sanitize_flattens_path_separators() {
        assert_eq!(
            sanitize_file_name("../etc/passwd docs.pdf"),
            ".._etc_passwd_docs.pdf"
        );
    }

    #[test]
    fn sanitize_replaces_non_ascii() {
        assert_eq!(sanitize_file_name("résumé.pdf"), "r_sum_.pdf");
    }
}
