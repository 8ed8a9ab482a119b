//! PDF loading: one text record per page.

use std::path::{Path, PathBuf};

use tokio::task;

use crate::types::IngestError;

/// Text extracted from a single PDF page.
///
/// Records are ordered by `page_number` (zero-based, extraction order) and
/// immutable once produced.
#[derive(Clone, Debug, PartialEq)]
pub struct PageRecord {
    /// Extracted page text. May be empty for image-only pages.
    pub text: String,
    /// Zero-based page index.
    pub page_number: usize,
    /// Path the document was loaded from.
    pub source_path: PathBuf,
}

/// Reads the PDF at `path` and returns its pages in order.
///
/// Fails with [`IngestError::Load`] when the file is missing, unreadable,
/// or not parseable as a PDF. Has no side effects beyond reading the file.
pub async fn load_pdf(path: impl AsRef<Path>) -> Result<Vec<PageRecord>, IngestError> {
    let path = path.as_ref().to_path_buf();

    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|err| IngestError::Load(format!("{}: {err}", path.display())))?;

    // pdf-extract is synchronous and CPU-bound; keep it off the runtime.
    let pages = task::spawn_blocking(move || pdf_extract::extract_text_from_mem_by_pages(&bytes))
        .await
        .map_err(|err| IngestError::Load(format!("extraction task failed: {err}")))?
        .map_err(|err| IngestError::Load(format!("{}: {err}", path.display())))?;

    tracing::debug!(path = %path.display(), pages = pages.len(), "extracted pdf text");

    Ok(pages
        .into_iter()
        .enumerate()
        .map(|(page_number, text)| PageRecord {
            text,
            page_number,
            source_path: path.clone(),
        })
        .collect())
}
