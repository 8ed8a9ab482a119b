//! End-to-end pipeline tests over a generated PDF fixture.
//!
//! The embedding model is the deterministic hash model, so every test runs
//! without network access and index round-trips are exactly reproducible.

use std::path::{Path, PathBuf};

use pdfsmith::config::{IngestorConfig, SplitterConfig};
use pdfsmith::embedder::HashEmbeddingModel;
use pdfsmith::ingestion::{Ingestor, embed_chunks};
use pdfsmith::loader::load_pdf;
use pdfsmith::splitter::Chunk;
use pdfsmith::stores::IndexState;
use pdfsmith::stores::sqlite::SqliteChunkIndex;
use pdfsmith::types::IngestError;

/// Builds a minimal but fully valid PDF with one text run per page.
fn minimal_pdf(pages: &[&str]) -> Vec<u8> {
    fn escape(text: &str) -> String {
        text.replace('\\', "\\\\")
            .replace('(', "\\(")
            .replace(')', "\\)")
    }

    let page_count = pages.len();
    let font_id = 3 + 2 * page_count;
    let kids: Vec<String> = (0..page_count)
        .map(|i| format!("{} 0 R", 3 + 2 * i))
        .collect();

    let mut objects: Vec<String> = Vec::new();
    objects.push("<< /Type /Catalog /Pages 2 0 R >>".to_string());
    objects.push(format!(
        "<< /Type /Pages /Kids [{}] /Count {} >>",
        kids.join(" "),
        page_count
    ));
    for (i, text) in pages.iter().enumerate() {
        let content = format!("BT /F1 12 Tf 72 720 Td ({}) Tj ET", escape(text));
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
             /Resources << /Font << /F1 {font_id} 0 R >> >> /Contents {} 0 R >>",
            4 + 2 * i
        ));
        objects.push(format!(
            "<< /Length {} >> stream\n{}\nendstream",
            content.len(),
            content
        ));
    }
    objects.push("<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string());

    let mut out = String::from("%PDF-1.4\n");
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.push_str(&format!("{} 0 obj\n{}\nendobj\n", i + 1, body));
    }

    let xref_offset = out.len();
    out.push_str(&format!("xref\n0 {}\n", objects.len() + 1));
    out.push_str("0000000000 65535 f \n");
    for offset in offsets {
        out.push_str(&format!("{offset:010} 00000 n \n"));
    }
    out.push_str(&format!(
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
        objects.len() + 1,
        xref_offset
    ));
    out.into_bytes()
}

fn test_config(root: &Path) -> IngestorConfig {
    IngestorConfig {
        uploads_dir: root.join("uploads"),
        index_path: root.join("index").join("chunks.sqlite"),
        splitter: SplitterConfig::default(),
    }
}

async fn write_fixture(dir: &Path, name: &str, pages: &[&str]) -> PathBuf {
    let path = dir.join(name);
    tokio::fs::write(&path, minimal_pdf(pages)).await.unwrap();
    path
}

#[tokio::test]
async fn fixture_pdf_loads_in_page_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(
        dir.path(),
        "two_pages.pdf",
        &["alpha page one", "beta page two"],
    )
    .await;

    let pages = load_pdf(&path).await.unwrap();
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0].page_number, 0);
    assert_eq!(pages[1].page_number, 1);
    assert!(pages[0].text.contains("alpha"));
    assert!(pages[1].text.contains("beta"));
    assert_eq!(pages[0].source_path, path);
}

#[tokio::test]
async fn open_fresh_index_is_empty_and_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chunks.sqlite");

    let first = SqliteChunkIndex::open(&path, &HashEmbeddingModel).await.unwrap();
    assert_eq!(first.state().await.unwrap(), IndexState::Empty);

    let second = SqliteChunkIndex::open(&path, &HashEmbeddingModel).await.unwrap();
    assert_eq!(second.state().await.unwrap(), IndexState::Empty);
    assert_eq!(second.count().await.unwrap(), 0);
}

#[tokio::test]
async fn corrupt_index_file_fails_to_open() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chunks.sqlite");
    tokio::fs::write(&path, b"definitely not a sqlite database")
        .await
        .unwrap();

    let err = SqliteChunkIndex::open(&path, &HashEmbeddingModel)
        .await
        .unwrap_err();
    assert!(matches!(err, IngestError::CorruptIndex(_)));
}

#[tokio::test]
async fn upsert_roundtrip_preserves_entries_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chunks.sqlite");
    let model = HashEmbeddingModel;

    let chunks: Vec<Chunk> = ["first chunk text", "second chunk text", "third chunk text"]
        .iter()
        .enumerate()
        .map(|(i, content)| Chunk {
            content: content.to_string(),
            page_number: 0,
            source_path: "roundtrip.pdf".to_string(),
            chunk_index: i,
        })
        .collect();

    let index = SqliteChunkIndex::open(&path, &model).await.unwrap();
    let batch = embed_chunks(&model, &chunks).await.unwrap();
    assert_eq!(index.upsert(batch).await.unwrap(), 3);
    assert_eq!(index.count().await.unwrap(), 3);

    // Reopen from disk: same entries, same metadata.
    let reopened = SqliteChunkIndex::open(&path, &model).await.unwrap();
    assert_eq!(reopened.state().await.unwrap(), IndexState::Loaded { entries: 3 });

    let query = embed_chunks(&model, &chunks[1..2]).await.unwrap();
    let (_, query_vector) = &query.entries()[0];
    let results = reopened.search_similar(query_vector, 3).await.unwrap();
    assert_eq!(results.len(), 3);

    // Identical text embeds to the identical vector, so the matching chunk
    // comes back first with similarity ~1.
    let (top, similarity) = &results[0];
    assert_eq!(top.content, "second chunk text");
    assert_eq!(top.source, "roundtrip.pdf");
    assert_eq!(top.metadata["page"], 0);
    assert!(*similarity > 0.999);
}

#[tokio::test]
async fn ingest_reports_the_entries_actually_added() {
    let dir = tempfile::tempdir().unwrap();
    let incoming = dir.path().join("incoming");
    tokio::fs::create_dir_all(&incoming).await.unwrap();
    let config = test_config(dir.path());

    let long_page = "lorem ipsum dolor sit amet ".repeat(120);
    let tmp = write_fixture(&incoming, "upload-tmp.pdf", &[&long_page, "short second page"]).await;

    let ingestor = Ingestor::new(config.clone(), HashEmbeddingModel).unwrap();
    let result = ingestor.ingest(&tmp, Some("report.pdf")).await.unwrap();

    assert_eq!(result.saved_path, config.uploads_dir.join("report.pdf"));
    assert!(tokio::fs::try_exists(&result.saved_path).await.unwrap());
    assert_eq!(result.index_location, config.index_path);
    assert!(result.chunk_count > 1, "long page should split");

    let index = SqliteChunkIndex::open(&config.index_path, &HashEmbeddingModel)
        .await
        .unwrap();
    assert_eq!(index.count().await.unwrap(), result.chunk_count);
}

#[tokio::test]
async fn second_ingest_appends_to_the_existing_index() {
    let dir = tempfile::tempdir().unwrap();
    let incoming = dir.path().join("incoming");
    tokio::fs::create_dir_all(&incoming).await.unwrap();
    let config = test_config(dir.path());

    let page = "append semantics check ".repeat(100);
    let tmp = write_fixture(&incoming, "again.pdf", &[&page]).await;

    let ingestor = Ingestor::new(config.clone(), HashEmbeddingModel).unwrap();
    let first = ingestor.ingest(&tmp, Some("again.pdf")).await.unwrap();
    let second = ingestor.ingest(&tmp, Some("again.pdf")).await.unwrap();
    assert_eq!(first.chunk_count, second.chunk_count);

    let index = SqliteChunkIndex::open(&config.index_path, &HashEmbeddingModel)
        .await
        .unwrap();
    assert_eq!(
        index.count().await.unwrap(),
        first.chunk_count + second.chunk_count
    );
}

#[tokio::test]
async fn missing_upload_is_a_copy_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());

    let ingestor = Ingestor::new(config.clone(), HashEmbeddingModel).unwrap();
    let err = ingestor
        .ingest(dir.path().join("nope.pdf").as_path(), Some("nope.pdf"))
        .await
        .unwrap_err();

    assert!(matches!(err, IngestError::Copy(_)));
    // The failed upload must not have touched the index.
    let index = SqliteChunkIndex::open(&config.index_path, &HashEmbeddingModel)
        .await
        .unwrap();
    assert_eq!(index.count().await.unwrap(), 0);
}

#[tokio::test]
async fn failed_load_leaves_prior_index_state_intact() {
    let dir = tempfile::tempdir().unwrap();
    let incoming = dir.path().join("incoming");
    tokio::fs::create_dir_all(&incoming).await.unwrap();
    let config = test_config(dir.path());

    let tmp = write_fixture(&incoming, "good.pdf", &["a perfectly valid page"]).await;
    let ingestor = Ingestor::new(config.clone(), HashEmbeddingModel).unwrap();
    let first = ingestor.ingest(&tmp, Some("good.pdf")).await.unwrap();

    // A non-PDF upload fails at the load stage...
    let bogus = incoming.join("bogus.pdf");
    tokio::fs::write(&bogus, b"not a pdf at all").await.unwrap();
    let err = ingestor.ingest(&bogus, Some("bogus.pdf")).await.unwrap_err();
    assert!(matches!(err, IngestError::Load(_)));

    // ...and the previously persisted entries are untouched.
    let index = SqliteChunkIndex::open(&config.index_path, &HashEmbeddingModel)
        .await
        .unwrap();
    assert_eq!(index.count().await.unwrap(), first.chunk_count);
}
