//! Extraction report types and summary rendering.
//!
//! A run produces one [`ExtractionReport`]: per-file records plus the
//! aggregate counters, serialized as pretty JSON, and rendered as a markdown
//! summary grouped by path category.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::PdfConfig;
use crate::pdf::inventory::InventoryEntry;

/// Classification of one extraction attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStatus {
    /// Text extracted and written out.
    Success,
    /// Extraction "succeeded" but yielded almost no text from a large file;
    /// almost certainly a scanned document. The markdown is still written.
    NeedsOcr,
    /// Encrypted document; nothing extracted.
    PasswordProtected,
    /// The container could not be parsed.
    Corrupted,
    /// Anything else that went wrong; see the record's `message`.
    Error,
    /// The inventory names a file that no longer exists.
    FileNotFound,
}

impl fmt::Display for ExtractionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExtractionStatus::Success => "success",
            ExtractionStatus::NeedsOcr => "needs_ocr",
            ExtractionStatus::PasswordProtected => "password_protected",
            ExtractionStatus::Corrupted => "corrupted",
            ExtractionStatus::Error => "error",
            ExtractionStatus::FileNotFound => "file_not_found",
        };
        f.write_str(s)
    }
}

/// One file's outcome in the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: String,
    pub filename: String,
    pub status: ExtractionStatus,
    pub pages: usize,
    pub chars: usize,
    /// Path of the written `.extracted.md`, when one was written.
    pub output: Option<String>,
    pub size_bytes: u64,
    /// Failure detail for `error` records.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl FileRecord {
    /// A record for an attempt that produced no output file.
    pub fn failure(
        entry: &InventoryEntry,
        status: ExtractionStatus,
        message: Option<String>,
    ) -> Self {
        Self {
            path: entry.path.clone(),
            filename: entry.filename.clone(),
            status,
            pages: 0,
            chars: 0,
            output: None,
            size_bytes: entry.size_bytes,
            message,
        }
    }
}

/// Aggregate outcome of one extraction run.
///
/// Counter semantics: `password_protected` and `corrupted` both also count
/// into `failed`; `needs_ocr` does not (its markdown was written). So
/// `successful + needs_ocr + failed == total`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionReport {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub needs_ocr: usize,
    pub password_protected: usize,
    pub corrupted: usize,
    pub files: Vec<FileRecord>,
}

impl ExtractionReport {
    /// Append a record, maintaining the counters.
    pub fn push(&mut self, record: FileRecord) {
        self.total += 1;
        match record.status {
            ExtractionStatus::Success => self.successful += 1,
            ExtractionStatus::NeedsOcr => self.needs_ocr += 1,
            ExtractionStatus::PasswordProtected => {
                self.password_protected += 1;
                self.failed += 1;
            }
            ExtractionStatus::Corrupted => {
                self.corrupted += 1;
                self.failed += 1;
            }
            ExtractionStatus::Error | ExtractionStatus::FileNotFound => self.failed += 1,
        }
        self.files.push(record);
    }

    /// Percentage of files fully extracted.
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.successful as f64 / self.total as f64 * 100.0
    }

    /// Failures that are neither password-protected nor corrupted.
    pub fn other_failures(&self) -> usize {
        self.failed
            .saturating_sub(self.password_protected + self.corrupted)
    }

    /// Render the markdown summary document.
    pub fn render_summary(&self, config: &PdfConfig, extraction_date: &str) -> String {
        let mut md = String::new();

        md.push_str("# PDF Extraction Summary\n\n");
        md.push_str(&format!("**Extraction Date:** {extraction_date}\n\n"));

        md.push_str("## Overview Statistics\n\n");
        md.push_str(&format!("- **Total PDFs:** {}\n", self.total));
        md.push_str(&format!(
            "- **Successfully Extracted:** {} ({:.1}%)\n",
            self.successful,
            self.success_rate()
        ));
        md.push_str(&format!("- **Needs OCR (Image-heavy):** {}\n", self.needs_ocr));
        md.push_str(&format!("- **Failed:** {}\n", self.failed));
        md.push_str(&format!(
            "  - Password Protected: {}\n",
            self.password_protected
        ));
        md.push_str(&format!("  - Corrupted: {}\n", self.corrupted));
        md.push_str(&format!("  - Other Errors: {}\n", self.other_failures()));

        md.push_str("\n## Results by Category\n\n");
        for (category, stats) in self.category_stats(config) {
            md.push_str(&format!("### {category}\n"));
            md.push_str(&format!("- Total: {}\n", stats.total));
            md.push_str(&format!("- Successful: {}\n", stats.success));
            md.push_str(&format!("- Needs OCR: {}\n", stats.needs_ocr));
            md.push_str(&format!("- Failed: {}\n\n", stats.failed));
        }

        md.push_str("## Files Needing OCR\n\n");
        md.push_str(
            "These PDFs appear to be image-heavy (scanned documents or graphics) \
             and need OCR processing:\n\n",
        );
        let ocr_files: Vec<&FileRecord> = self
            .files
            .iter()
            .filter(|f| f.status == ExtractionStatus::NeedsOcr)
            .collect();
        if ocr_files.is_empty() {
            md.push_str("*None*\n");
        } else {
            for f in ocr_files {
                md.push_str(&format!(
                    "- `{}` ({} bytes, {} chars extracted)\n",
                    f.filename,
                    thousands(f.size_bytes),
                    f.chars
                ));
            }
        }

        md.push_str("\n## Failed Extractions\n\n");
        let failed_files: Vec<&FileRecord> = self
            .files
            .iter()
            .filter(|f| {
                !matches!(
                    f.status,
                    ExtractionStatus::Success | ExtractionStatus::NeedsOcr
                )
            })
            .collect();
        if failed_files.is_empty() {
            md.push_str("*None*\n");
        } else {
            for f in failed_files {
                md.push_str(&format!("- `{}` - Status: {}\n", f.filename, f.status));
            }
        }

        md.push_str("\n## Next Steps\n\n");
        md.push_str(&format!(
            "1. **OCR Processing:** {} PDFs need OCR to extract text from images\n",
            self.needs_ocr
        ));
        md.push_str(&format!(
            "2. **Review Failed:** {} PDFs failed extraction and should be reviewed\n",
            self.failed
        ));
        md.push_str(&format!(
            "3. **Text Available:** {} PDFs have extracted text ready for indexing\n",
            self.successful
        ));

        md.push_str("\n## Output Files\n\n");
        md.push_str(
            "All extracted text has been saved as `.extracted.md` files alongside \
             the original PDFs:\n",
        );
        md.push_str("- Format: `document.pdf` → `document.extracted.md`\n");
        md.push_str("- Contains: YAML frontmatter with metadata + extracted text\n");
        md.push_str("- Location: Same directory as source PDF\n\n");
        md.push_str(&format!(
            "Full extraction report: `{}`\n",
            config.report_path.display()
        ));

        md
    }

    /// Per-category counts, sorted by category name.
    fn category_stats<'a>(&self, config: &'a PdfConfig) -> BTreeMap<&'a str, CategoryStats> {
        let mut categories: BTreeMap<&'a str, CategoryStats> = BTreeMap::new();
        for record in &self.files {
            let stats = categories
                .entry(config.category_for(&record.path))
                .or_default();
            stats.total += 1;
            match record.status {
                ExtractionStatus::Success => stats.success += 1,
                ExtractionStatus::NeedsOcr => stats.needs_ocr += 1,
                _ => stats.failed += 1,
            }
        }
        categories
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct CategoryStats {
    total: usize,
    success: usize,
    needs_ocr: usize,
    failed: usize,
}

/// `12345678` → `12,345,678`.
fn thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(path: &str, status: ExtractionStatus) -> FileRecord {
        FileRecord {
            path: path.into(),
            filename: path.rsplit('/').next().unwrap().into(),
            status,
            pages: 3,
            chars: 4500,
            output: None,
            size_bytes: 250_000,
            message: None,
        }
    }

    #[test]
    fn counters_follow_status_semantics() {
        let mut report = ExtractionReport::default();
        report.push(record("/kb/a.pdf", ExtractionStatus::Success));
        report.push(record("/kb/b.pdf", ExtractionStatus::NeedsOcr));
        report.push(record("/kb/c.pdf", ExtractionStatus::PasswordProtected));
        report.push(record("/kb/d.pdf", ExtractionStatus::Corrupted));
        report.push(record("/kb/e.pdf", ExtractionStatus::FileNotFound));

        assert_eq!(report.total, 5);
        assert_eq!(report.successful, 1);
        assert_eq!(report.needs_ocr, 1);
        assert_eq!(report.password_protected, 1);
        assert_eq!(report.corrupted, 1);
        assert_eq!(report.failed, 3);
        assert_eq!(report.other_failures(), 1);
        assert_eq!(report.successful + report.needs_ocr + report.failed, report.total);
    }

    #[test]
    fn success_rate_handles_empty_report() {
        assert_eq!(ExtractionReport::default().success_rate(), 0.0);
    }

    #[test]
    fn statuses_serialize_snake_case() {
        let json = serde_json::to_string(&ExtractionStatus::PasswordProtected).unwrap();
        assert_eq!(json, r#""password_protected""#);
        assert_eq!(ExtractionStatus::NeedsOcr.to_string(), "needs_ocr");
    }

    #[test]
    fn error_message_omitted_when_absent() {
        let json = serde_json::to_string(&record("/kb/a.pdf", ExtractionStatus::Success)).unwrap();
        assert!(!json.contains("message"), "got: {json}");
        assert!(json.contains(r#""output":null"#), "got: {json}");
    }

    #[test]
    fn summary_groups_by_category_and_lists_problem_files() {
        let config = PdfConfig::default();
        let mut report = ExtractionReport::default();
        report.push(record(
            "/kb/the-marketing-lab/pricing.pdf",
            ExtractionStatus::Success,
        ));
        report.push(record(
            "/kb/the-marketing-lab/scan.pdf",
            ExtractionStatus::NeedsOcr,
        ));
        report.push(record("/kb/misc/old.pdf", ExtractionStatus::Corrupted));

        let md = report.render_summary(&config, "2025-11-02T10:30:00-05:00");
        assert!(md.contains("# PDF Extraction Summary"));
        assert!(md.contains("**Extraction Date:** 2025-11-02T10:30:00-05:00"));
        assert!(md.contains("### Marketing Lab"));
        assert!(md.contains("### Other Resources"));
        assert!(md.contains("- `scan.pdf` (250,000 bytes, 4500 chars extracted)"));
        assert!(md.contains("- `old.pdf` - Status: corrupted"));
        assert!(md.contains("- **Successfully Extracted:** 1 (33.3%)"));
    }

    #[test]
    fn summary_prints_none_for_empty_sections() {
        let config = PdfConfig::default();
        let mut report = ExtractionReport::default();
        report.push(record("/kb/a.pdf", ExtractionStatus::Success));

        let md = report.render_summary(&config, "2025-11-02T10:30:00-05:00");
        assert_eq!(md.matches("*None*").count(), 2);
    }

    #[test]
    fn thousands_separates_digit_groups() {
        assert_eq!(thousands(0), "0");
        assert_eq!(thousands(999), "999");
        assert_eq!(thousands(1000), "1,000");
        assert_eq!(thousands(12_345_678), "12,345,678");
    }
}
