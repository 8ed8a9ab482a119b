//! Ingests the PDFs named on the command line into the local vector index.
//!
//! ```bash
//! cargo run --example upload_pipeline -- report.pdf notes.pdf
//! ```
//!
//! Uses the OpenAI embedding endpoint when `OPENAI_API_KEY` is set and a
//! deterministic hash model otherwise, so the pipeline can be exercised
//! without credentials.

use std::env;
use std::path::PathBuf;

use rig::embeddings::EmbeddingModel;
use tracing_subscriber::FmtSubscriber;

use pdfsmith::config::{IngestorConfig, SplitterConfig};
use pdfsmith::embedder::{DEFAULT_EMBEDDING_MODEL, HashEmbeddingModel, openai_model};
use pdfsmith::ingestion::Ingestor;
use pdfsmith::types::IngestError;

#[tokio::main]
async fn main() -> Result<(), IngestError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let files: Vec<PathBuf> = env::args().skip(1).map(PathBuf::from).collect();
    if files.is_empty() {
        println!("Upload a PDF first: pass one or more PDF paths as arguments.");
        return Ok(());
    }

    let uploads_dir = env::var("PDFSMITH_UPLOADS").unwrap_or_else(|_| "data/uploads".to_string());
    let index_path =
        env::var("PDFSMITH_INDEX").unwrap_or_else(|_| "data/index/chunks.sqlite".to_string());
    let config = IngestorConfig {
        uploads_dir: PathBuf::from(uploads_dir),
        index_path: PathBuf::from(index_path),
        splitter: SplitterConfig::default(),
    };

    match env::var("OPENAI_API_KEY") {
        Ok(api_key) => {
            let model_id = env::var("PDFSMITH_EMBEDDING_MODEL")
                .unwrap_or_else(|_| DEFAULT_EMBEDDING_MODEL.to_string());
            run(openai_model(&api_key, &model_id), config, files).await
        }
        Err(_) => {
            println!("OPENAI_API_KEY not set; using deterministic hash embeddings");
            run(HashEmbeddingModel, config, files).await
        }
    }
}

async fn run<E>(model: E, config: IngestorConfig, files: Vec<PathBuf>) -> Result<(), IngestError>
where
    E: EmbeddingModel + Clone + Send + Sync + 'static,
{
    let ingestor = Ingestor::new(config, model)?;
    let mut total_chunks = 0usize;

    for file in &files {
        let original_name = file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());

        println!("→ Ingesting {}", file.display());
        let result = ingestor.ingest(file, original_name.as_deref()).await?;
        total_chunks += result.chunk_count;

        println!("   saved copy : {}", result.saved_path.display());
        println!("   chunks     : {}", result.chunk_count);
        println!("   index      : {}", result.index_location.display());
    }

    println!("\n✅ Upload complete!");
    println!("  files processed : {}", files.len());
    println!("  chunks indexed  : {}", total_chunks);
    Ok(())
}

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let subscriber = FmtSubscriber::builder().with_env_filter("info").finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}
