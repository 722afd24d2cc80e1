//! Inventory-driven PDF text extraction.
//!
//! A separate tool from captioning, sharing the crate's config/error/logging
//! conventions. One run loads a file inventory, extracts text from every PDF
//! it lists (highest-priority categories first), writes one
//! `<source>.extracted.md` per readable document, and finishes with an
//! aggregate JSON report plus a human-readable markdown summary.
//!
//! Per-file problems (encrypted, corrupted, missing, unwritable output) are
//! classified and recorded, never fatal; only an unreadable inventory aborts
//! the run.

pub mod extract;
pub mod inventory;
pub mod report;

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Local;
use tracing::{info, warn};

use crate::config::PdfConfig;
use crate::error::Img2AltError;
use extract::Extraction;
use inventory::{Inventory, InventoryEntry};
use report::{ExtractionReport, ExtractionStatus, FileRecord};

/// Extract text from every PDF in the configured inventory.
///
/// # Returns
/// `Ok(ExtractionReport)` once every file has been attempted and the report
/// and summary files are written, even if every extraction failed (check
/// the report's counters).
///
/// # Errors
/// Returns `Err(Img2AltError)` only for fatal errors:
/// - Inventory missing, unreadable, or malformed
/// - Report or summary file could not be written
pub async fn run_extraction(config: &PdfConfig) -> Result<ExtractionReport, Img2AltError> {
    let run_start = Instant::now();
    let extraction_date = Local::now().to_rfc3339();

    // ── Step 1: Load the inventory ───────────────────────────────────────
    info!("Loading inventory from {}", config.inventory_path.display());
    let inventory = Inventory::load(&config.inventory_path).await?;
    let pdfs = inventory.sorted_pdf_entries(config);
    info!("Found {} PDFs to process", pdfs.len());

    // ── Step 2: Process each PDF in priority order ───────────────────────
    let mut report = ExtractionReport::default();
    for (idx, entry) in pdfs.iter().enumerate() {
        info!(
            "[{}/{}] Processing: {} ({} bytes)",
            idx + 1,
            pdfs.len(),
            entry.filename,
            entry.size_bytes
        );
        report.push(process_entry(config, entry, &extraction_date).await);
    }

    // ── Step 3: Write the report and the summary ─────────────────────────
    let json = serde_json::to_vec_pretty(&report)
        .map_err(|e| Img2AltError::Internal(format!("serialising extraction report: {e}")))?;
    write_atomic(&config.report_path, &json).await?;

    let summary = report.render_summary(config, &extraction_date);
    write_atomic(&config.summary_path, summary.as_bytes()).await?;

    info!(
        "Extraction complete: {}/{} successful, {} need OCR, {} failed in {}ms",
        report.successful,
        report.total,
        report.needs_ocr,
        report.failed,
        run_start.elapsed().as_millis()
    );

    Ok(report)
}

/// Attempt one inventory entry and classify the outcome.
async fn process_entry(
    config: &PdfConfig,
    entry: &InventoryEntry,
    extraction_date: &str,
) -> FileRecord {
    let path = Path::new(&entry.path);

    // Existence check before handing the path to the parser, so a stale
    // inventory entry is reported as such rather than as a corrupt file.
    match tokio::fs::metadata(path).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("{}: file not found", entry.filename);
            return FileRecord::failure(entry, ExtractionStatus::FileNotFound, None);
        }
        Err(e) => {
            warn!("{}: {}", entry.filename, e);
            return FileRecord::failure(entry, ExtractionStatus::Error, Some(e.to_string()));
        }
    }

    let extraction = match extract::extract_file(path).await {
        Ok(extraction) => extraction,
        Err(e) => {
            warn!("{}: {}", entry.filename, e);
            return FileRecord::failure(entry, ExtractionStatus::Error, Some(e.to_string()));
        }
    };

    let (text, pages) = match extraction {
        Extraction::PasswordProtected => {
            warn!("{}: password protected", entry.filename);
            return FileRecord::failure(entry, ExtractionStatus::PasswordProtected, None);
        }
        Extraction::Corrupted { detail } => {
            warn!("{}: corrupted or unreadable: {}", entry.filename, detail);
            return FileRecord::failure(entry, ExtractionStatus::Corrupted, None);
        }
        Extraction::Text { text, pages } => (text, pages),
    };

    // Classification happens against the inventory-declared size: a large
    // file yielding almost no text is a scan that needs OCR, but its (thin)
    // markdown is still written so the pipeline after us sees every file.
    let chars = text.chars().count();
    let status = if chars < config.ocr_min_chars && entry.size_bytes > config.ocr_min_file_bytes {
        warn!(
            "{}: likely image-heavy PDF (needs OCR): {} chars from {} bytes",
            entry.filename, chars, entry.size_bytes
        );
        ExtractionStatus::NeedsOcr
    } else {
        info!("{}: {} pages, {} characters", entry.filename, pages, chars);
        ExtractionStatus::Success
    };

    let output_path = output_path_for(path);
    let markdown = render_extracted_markdown(entry, &text, pages, chars, extraction_date);
    match write_atomic(&output_path, markdown.as_bytes()).await {
        Ok(()) => FileRecord {
            path: entry.path.clone(),
            filename: entry.filename.clone(),
            status,
            pages,
            chars,
            output: Some(output_path.display().to_string()),
            size_bytes: entry.size_bytes,
            message: None,
        },
        Err(e) => {
            warn!("{}: could not save output: {}", entry.filename, e);
            FileRecord {
                path: entry.path.clone(),
                filename: entry.filename.clone(),
                status: ExtractionStatus::Error,
                pages,
                chars,
                output: None,
                size_bytes: entry.size_bytes,
                message: Some(format!("failed to write output: {e}")),
            }
        }
    }
}

/// `document.pdf` → `document.extracted.md`, same directory.
fn output_path_for(source: &Path) -> PathBuf {
    source.with_extension("extracted.md")
}

/// Per-PDF markdown: YAML frontmatter plus the raw extracted text.
fn render_extracted_markdown(
    entry: &InventoryEntry,
    text: &str,
    pages: usize,
    chars: usize,
    extraction_date: &str,
) -> String {
    let body = if text.is_empty() {
        "[No text content extracted]"
    } else {
        text
    };
    format!(
        "---\n\
         source: {filename}\n\
         source_path: {path}\n\
         extraction_date: {extraction_date}\n\
         page_count: {pages}\n\
         character_count: {chars}\n\
         ---\n\
         \n\
         # Extracted Text from {filename}\n\
         \n\
         {body}\n",
        filename = entry.filename,
        path = entry.path,
    )
}

/// Atomic write: temp file in the same directory, then rename.
async fn write_atomic(path: &Path, content: &[u8]) -> Result<(), Img2AltError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| Img2AltError::OutputWrite {
                path: path.to_path_buf(),
                source: e,
            })?;
    }

    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp_path = path.with_extension(format!("{ext}.tmp"));

    tokio::fs::write(&tmp_path, content)
        .await
        .map_err(|e| Img2AltError::OutputWrite {
            path: path.to_path_buf(),
            source: e,
        })?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Img2AltError::OutputWrite {
            path: path.to_path_buf(),
            source: e,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> InventoryEntry {
        InventoryEntry {
            kind: "pdf".into(),
            path: "/kb/guides/lighting.pdf".into(),
            filename: "lighting.pdf".into(),
            size_bytes: 204_800,
        }
    }

    #[test]
    fn output_lands_next_to_the_source() {
        assert_eq!(
            output_path_for(Path::new("/kb/guides/lighting.pdf")),
            Path::new("/kb/guides/lighting.extracted.md")
        );
        assert_eq!(
            output_path_for(Path::new("notes.v2.pdf")),
            Path::new("notes.v2.extracted.md")
        );
    }

    #[test]
    fn markdown_carries_frontmatter_and_heading() {
        let md = render_extracted_markdown(
            &entry(),
            "Key light at 45 degrees.",
            12,
            24,
            "2025-11-02T10:30:00-05:00",
        );
        assert!(md.starts_with("---\nsource: lighting.pdf\n"));
        assert!(md.contains("source_path: /kb/guides/lighting.pdf\n"));
        assert!(md.contains("extraction_date: 2025-11-02T10:30:00-05:00\n"));
        assert!(md.contains("page_count: 12\n"));
        assert!(md.contains("character_count: 24\n"));
        assert!(md.contains("# Extracted Text from lighting.pdf\n"));
        assert!(md.ends_with("Key light at 45 degrees.\n"));
    }

    #[test]
    fn empty_text_gets_a_placeholder_body() {
        let md = render_extracted_markdown(&entry(), "", 3, 0, "2025-11-02T10:30:00-05:00");
        assert!(md.contains("[No text content extracted]"));
    }

    #[tokio::test]
    async fn write_atomic_leaves_no_temp_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("report.json");
        write_atomic(&path, b"{}").await.unwrap();

        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"{}");
        assert!(!dir.path().join("report.json.tmp").exists());
    }
}
