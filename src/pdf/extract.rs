//! Page-by-page PDF text extraction via `lopdf`.
//!
//! ## Why spawn_blocking?
//!
//! `lopdf` parses the whole document synchronously and text extraction is
//! CPU-bound. `tokio::task::spawn_blocking` moves the work onto the blocking
//! thread pool so Tokio worker threads are not stalled by large documents.

use std::path::Path;

use lopdf::Document;
use tracing::{debug, warn};

use crate::error::Img2AltError;

/// Outcome of one extraction attempt.
///
/// Per-file problems are classifications, not errors; the only `Err` this
/// module produces is a panicked extraction task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// Text pulled from every readable page, joined with blank lines.
    /// May be empty (image-only documents).
    Text { text: String, pages: usize },
    /// The document is encrypted; no extraction was attempted.
    PasswordProtected,
    /// The container could not be parsed.
    Corrupted { detail: String },
}

/// Extract text from one PDF on the blocking pool.
pub async fn extract_file(path: &Path) -> Result<Extraction, Img2AltError> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || extract_file_blocking(&path))
        .await
        .map_err(|e| Img2AltError::Internal(format!("Extraction task panicked: {e}")))
}

/// Blocking implementation of [`extract_file`].
pub fn extract_file_blocking(path: &Path) -> Extraction {
    let doc = match Document::load(path) {
        Ok(doc) => doc,
        Err(e) => {
            return Extraction::Corrupted {
                detail: e.to_string(),
            }
        }
    };

    if doc.is_encrypted() {
        return Extraction::PasswordProtected;
    }

    let page_numbers = doc.get_pages();
    let pages = page_numbers.len();
    debug!("{}: {} pages", path.display(), pages);

    // One bad page never fails the document; it is logged and omitted.
    let mut chunks: Vec<String> = Vec::with_capacity(pages);
    for &number in page_numbers.keys() {
        match doc.extract_text(&[number]) {
            Ok(text) => chunks.push(text),
            Err(e) => warn!(
                "Skipping page {} of {}: {}",
                number,
                path.display(),
                e
            ),
        }
    }

    Extraction::Text {
        text: chunks.join("\n\n"),
        pages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn garbage_bytes_classify_as_corrupted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.pdf");
        tokio::fs::write(&path, b"%PDF-1.4 but then nothing useful")
            .await
            .unwrap();

        match extract_file(&path).await.unwrap() {
            Extraction::Corrupted { detail } => assert!(!detail.is_empty()),
            other => panic!("expected Corrupted, got {other:?}"),
        }
    }

    #[test]
    fn missing_file_classifies_as_corrupted_in_blocking_form() {
        // Callers check existence first; the blocking form itself treats an
        // unreadable path like any other unparsable input.
        let outcome = extract_file_blocking(Path::new("/nonexistent/x.pdf"));
        assert!(matches!(outcome, Extraction::Corrupted { .. }));
    }
}
