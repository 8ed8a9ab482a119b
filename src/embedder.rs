//! Embedding model construction.
//!
//! The pipeline is generic over rig's [`EmbeddingModel`] trait; this module
//! provides the two concrete models it is normally run with: the OpenAI
//! text-embedding endpoint for real ingestion and a deterministic
//! hash-based model for tests and credential-free demo runs.

use rig::embeddings::embedding::{Embedding, EmbeddingError, EmbeddingModel};
use rig::prelude::*;
use rig::providers::openai;

use crate::types::IngestError;

/// Model identifier used when none is configured.
pub const DEFAULT_EMBEDDING_MODEL: &str = openai::TEXT_EMBEDDING_3_SMALL;

/// Builds an OpenAI embedding model from `OPENAI_API_KEY`.
pub fn openai_model_from_env() -> Result<openai::EmbeddingModel, IngestError> {
    let api_key = std::env::var("OPENAI_API_KEY")
        .map_err(|_| IngestError::Embedding("OPENAI_API_KEY is not set".to_string()))?;
    Ok(openai_model(&api_key, DEFAULT_EMBEDDING_MODEL))
}

/// Builds an OpenAI embedding model for an explicit key and model identifier.
pub fn openai_model(api_key: &str, model: &str) -> openai::EmbeddingModel {
    openai::Client::new(api_key)
        .expect("failed to construct OpenAI client")
        .embedding_model(model)
}

/// Deterministic embedding model that hashes text into a small vector.
///
/// Identical inputs always produce identical vectors, which makes index
/// round-trips and cache behavior testable without network access. Not
/// semantically meaningful.
#[derive(Clone, Debug, Default)]
pub struct HashEmbeddingModel;

impl HashEmbeddingModel {
    /// Dimensionality of the produced vectors.
    pub const DIMS: usize = 8;
}

impl EmbeddingModel for HashEmbeddingModel {
    const MAX_DOCUMENTS: usize = 64;

    type Client = ();

    fn make(_client: &Self::Client, _model: impl Into<String>, _dims: Option<usize>) -> Self {
        Self
    }

    fn ndims(&self) -> usize {
        Self::DIMS
    }

    fn embed_texts(
        &self,
        texts: impl IntoIterator<Item = String> + Send,
    ) -> impl std::future::Future<Output = Result<Vec<Embedding>, EmbeddingError>> + Send {
        let documents: Vec<String> = texts.into_iter().collect();
        async move {
            Ok(documents
                .into_iter()
                .map(|document| Embedding {
                    vec: hash_to_vec(&document),
                    document,
                })
                .collect())
        }
    }
}

fn hash_to_vec(text: &str) -> Vec<f64> {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    let seed = hasher.finish();
    (0..HashEmbeddingModel::DIMS)
        .map(|i| {
            let bits = seed.rotate_left((i * 8) as u32) ^ ((i as u64) << 24);
            (bits as f64) / u64::MAX as f64
        })
        .collect()
}
