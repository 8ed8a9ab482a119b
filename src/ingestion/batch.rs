//! Pairing chunks with embedding vectors ahead of persistence.

use rig::embeddings::EmbeddingModel;
use uuid::Uuid;

use crate::splitter::Chunk;
use crate::stores::ChunkEntry;
use crate::types::IngestError;

/// Chunk entries paired with their vectors, ready for the index.
#[derive(Clone, Debug)]
pub struct EmbeddedBatch {
    entries: Vec<(ChunkEntry, Vec<f32>)>,
}

impl EmbeddedBatch {
    /// Number of entries that will be persisted.
    pub fn chunk_count(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Read-only access to the staged entries.
    pub fn entries(&self) -> &[(ChunkEntry, Vec<f32>)] {
        &self.entries
    }

    /// Consumes the batch and yields the underlying entries.
    pub fn into_entries(self) -> Vec<(ChunkEntry, Vec<f32>)> {
        self.entries
    }
}

/// Embeds every chunk and builds an [`EmbeddedBatch`].
///
/// Texts are sent to the model in groups of at most
/// `E::MAX_DOCUMENTS`; a provider failure or an embedding-count mismatch
/// fails the whole batch with [`IngestError::Embedding`]. Partial batches
/// are never produced.
pub async fn embed_chunks<E>(model: &E, chunks: &[Chunk]) -> Result<EmbeddedBatch, IngestError>
where
    E: EmbeddingModel,
{
    let mut entries = Vec::with_capacity(chunks.len());
    let group_size = E::MAX_DOCUMENTS.max(1);

    for group in chunks.chunks(group_size) {
        let texts: Vec<String> = group.iter().map(|chunk| chunk.content.clone()).collect();
        let embeddings = model
            .embed_texts(texts)
            .await
            .map_err(|err| IngestError::Embedding(err.to_string()))?;

        if embeddings.len() != group.len() {
            return Err(IngestError::Embedding(format!(
                "requested {} embeddings, provider returned {}",
                group.len(),
                embeddings.len()
            )));
        }

        for (chunk, embedding) in group.iter().zip(embeddings) {
            let vector: Vec<f32> = embedding.vec.iter().map(|value| *value as f32).collect();
            entries.push((entry_for(chunk), vector));
        }
    }

    tracing::debug!(chunks = chunks.len(), "embedded chunk batch");
    Ok(EmbeddedBatch { entries })
}

fn entry_for(chunk: &Chunk) -> ChunkEntry {
    ChunkEntry {
        id: Uuid::new_v4().to_string(),
        source: chunk.source_path.clone(),
        page_number: chunk.page_number,
        chunk_index: chunk.chunk_index,
        content: chunk.content.clone(),
        metadata: serde_json::json!({
            "source": chunk.source_path,
            "page": chunk.page_number,
        }),
    }
}
