//! Runs a similarity query against a populated index.
//!
//! ```bash
//! cargo run --example query_index -- "what does the report conclude"
//! ```
//!
//! The query must be embedded with the same model that produced the index,
//! so the model selection mirrors `upload_pipeline`: OpenAI when
//! `OPENAI_API_KEY` is set, the hash model otherwise.

use std::env;
use std::path::PathBuf;

use rig::embeddings::EmbeddingModel;
use tracing_subscriber::FmtSubscriber;

use pdfsmith::embedder::{DEFAULT_EMBEDDING_MODEL, HashEmbeddingModel, openai_model};
use pdfsmith::stores::sqlite::SqliteChunkIndex;
use pdfsmith::types::IngestError;

#[tokio::main]
async fn main() -> Result<(), IngestError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let query = env::args().skip(1).collect::<Vec<_>>().join(" ");
    if query.trim().is_empty() {
        println!("Provide a query: pass the question as arguments.");
        return Ok(());
    }

    let index_path = PathBuf::from(
        env::var("PDFSMITH_INDEX").unwrap_or_else(|_| "data/index/chunks.sqlite".to_string()),
    );

    match env::var("OPENAI_API_KEY") {
        Ok(api_key) => {
            let model_id = env::var("PDFSMITH_EMBEDDING_MODEL")
                .unwrap_or_else(|_| DEFAULT_EMBEDDING_MODEL.to_string());
            run(openai_model(&api_key, &model_id), index_path, &query).await
        }
        Err(_) => run(HashEmbeddingModel, index_path, &query).await,
    }
}

async fn run<E>(model: E, index_path: PathBuf, query: &str) -> Result<(), IngestError>
where
    E: EmbeddingModel + Clone + Send + Sync + 'static,
{
    let index = SqliteChunkIndex::open(&index_path, &model).await?;
    println!("index entries: {}", index.count().await?);

    let embeddings = model
        .embed_texts(vec![query.to_string()])
        .await
        .map_err(|err| IngestError::Embedding(err.to_string()))?;
    let query_vector: Vec<f32> = embeddings
        .first()
        .map(|embedding| embedding.vec.iter().map(|v| *v as f32).collect())
        .ok_or_else(|| IngestError::Embedding("provider returned no embedding".to_string()))?;

    let results = index.search_similar(&query_vector, 5).await?;
    if results.is_empty() {
        println!("no matches; ingest a document first");
        return Ok(());
    }

    println!("{:<6} | {:<5} | Preview", "Score", "Page");
    println!("{:-<6}-|-{:-<5}-|{:-<60}", "", "", "");
    for (entry, similarity) in results {
        let preview: String = entry.content.replace('\n', " ").chars().take(60).collect();
        println!("{:<6.3} | {:<5} | {}", similarity, entry.page_number, preview);
    }

    Ok(())
}

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let subscriber = FmtSubscriber::builder().with_env_filter("info").finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}
