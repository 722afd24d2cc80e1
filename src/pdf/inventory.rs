//! File inventory: the precomputed manifest of candidate files.
//!
//! The inventory is produced by a separate indexing step and consumed
//! read-only here. An unreadable or malformed inventory aborts the run
//! before any file is touched; it is the only fatal error class in the
//! extraction tool.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::PdfConfig;
use crate::error::Img2AltError;

/// One manifest entry. Unknown fields are ignored so the inventory schema
/// can grow without breaking this tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryEntry {
    /// File kind as recorded by the indexer (`"pdf"`, `"docx"`, …).
    #[serde(rename = "type")]
    pub kind: String,
    /// Absolute source path.
    pub path: String,
    pub filename: String,
    /// Size as recorded at index time; classification uses this value, not
    /// a fresh stat.
    pub size_bytes: u64,
}

/// The manifest: a JSON object with a `files` array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    pub files: Vec<InventoryEntry>,
}

impl Inventory {
    /// Read and parse the inventory file.
    pub async fn load(path: &Path) -> Result<Self, Img2AltError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| Img2AltError::InventoryRead {
                path: path.to_path_buf(),
                source: e,
            })?;
        serde_json::from_slice(&bytes).map_err(|e| Img2AltError::InventoryParse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Entries with `type == "pdf"`, in manifest order.
    pub fn pdf_entries(&self) -> impl Iterator<Item = &InventoryEntry> {
        self.files.iter().filter(|entry| entry.kind == "pdf")
    }

    /// PDF entries in processing order: ranked by the first priority
    /// keyword matching the (lowercased) path, manifest order within a
    /// rank, unmatched paths last.
    pub fn sorted_pdf_entries(&self, config: &PdfConfig) -> Vec<&InventoryEntry> {
        let mut entries: Vec<&InventoryEntry> = self.pdf_entries().collect();
        entries.sort_by_key(|entry| config.priority_for(&entry.path));
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(kind: &str, path: &str) -> InventoryEntry {
        InventoryEntry {
            kind: kind.into(),
            path: path.into(),
            filename: path.rsplit('/').next().unwrap().into(),
            size_bytes: 1024,
        }
    }

    #[test]
    fn parses_manifest_and_ignores_unknown_fields() {
        let raw = r#"{
            "generated": "2025-11-02",
            "files": [
                {"type": "pdf", "path": "/kb/a.pdf", "filename": "a.pdf",
                 "size_bytes": 12345, "sha256": "ignored"},
                {"type": "docx", "path": "/kb/b.docx", "filename": "b.docx",
                 "size_bytes": 99}
            ]
        }"#;
        let inventory: Inventory = serde_json::from_str(raw).unwrap();
        assert_eq!(inventory.files.len(), 2);
        assert_eq!(inventory.pdf_entries().count(), 1);
        assert_eq!(inventory.files[0].size_bytes, 12345);
    }

    #[test]
    fn missing_size_is_a_parse_error() {
        let raw = r#"{"files": [{"type": "pdf", "path": "/a.pdf", "filename": "a.pdf"}]}"#;
        assert!(serde_json::from_str::<Inventory>(raw).is_err());
    }

    #[test]
    fn priority_sort_is_stable_within_a_rank() {
        let inventory = Inventory {
            files: vec![
                entry("pdf", "/kb/misc/zeta.pdf"),
                entry("pdf", "/kb/guides/posing.pdf"),
                entry("pdf", "/kb/misc/alpha.pdf"),
                entry("pdf", "/kb/The-Marketing-Lab/pricing.pdf"),
                entry("csv", "/kb/guides/rates.csv"),
                entry("pdf", "/kb/guides/lighting.pdf"),
            ],
        };

        let sorted = inventory.sorted_pdf_entries(&PdfConfig::default());
        let paths: Vec<&str> = sorted.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(
            paths,
            [
                // keyword match is case-insensitive on the path
                "/kb/The-Marketing-Lab/pricing.pdf",
                "/kb/guides/posing.pdf",
                "/kb/guides/lighting.pdf",
                // unmatched entries keep their manifest order, after the rest
                "/kb/misc/zeta.pdf",
                "/kb/misc/alpha.pdf",
            ]
        );
    }

    #[tokio::test]
    async fn unreadable_inventory_is_fatal() {
        let err = Inventory::load(Path::new("/nonexistent/inventory.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, Img2AltError::InventoryRead { .. }), "got: {err}");
    }
}
