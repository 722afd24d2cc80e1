//! Error types for the img2alt library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Img2AltError`] — **Fatal**: the run (or a whole directory pass) cannot
//!   proceed at all (missing root, unreadable config, a caption store that is
//!   not valid JSON). Returned as `Err(Img2AltError)` from the top-level
//!   `run*` functions.
//!
//! * [`CaptionFailure`] — **Non-fatal**: a single image failed (unreadable
//!   file, connection refused, bad API response) but every other image is
//!   fine. Recorded inside [`crate::store::CaptionRecord`] so the next run
//!   can re-attempt exactly the failed images.
//!
//! The separation lets callers decide their own tolerance: abort on the first
//! image failure, log and continue, or mine the store for a post-run report.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// All fatal errors returned by the img2alt library.
///
/// Image-level failures use [`CaptionFailure`] and are stored in the
/// per-directory caption store rather than propagated here.
#[derive(Debug, Error)]
pub enum Img2AltError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The content root was not found at the given path.
    #[error("content root not found: '{path}'\nCheck the path exists and is a directory.")]
    RootNotFound { path: PathBuf },

    /// A directory listing failed mid-walk.
    #[error("failed to read directory '{path}': {source}")]
    DirRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Could not read the run-config file.
    #[error("failed to read config file '{path}': {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The run-config file is not valid JSON.
    #[error("failed to parse config file '{path}': {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Builder validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Caption store errors ──────────────────────────────────────────────
    /// A caption store file exists but could not be read.
    #[error("failed to read caption store '{path}': {source}")]
    StoreRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A caption store file exists but cannot be parsed as a JSON object.
    ///
    /// Fatal for that directory only: the orchestrator logs it, skips the
    /// directory, and continues with the rest of the run.
    #[error("caption store '{path}' is not a valid JSON object: {detail}")]
    StoreParse { path: PathBuf, detail: String },

    /// Could not persist a caption store to disk.
    #[error("failed to write caption store '{path}': {source}")]
    StoreWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── PDF inventory errors ──────────────────────────────────────────────
    /// Could not read the inventory file. Aborts the extraction run.
    #[error("failed to read inventory '{path}': {source}")]
    InventoryRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The inventory file is not valid JSON. Aborts the extraction run.
    #[error("failed to parse inventory '{path}': {source}")]
    InventoryParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output file (extracted text, report).
    #[error("failed to write output file '{path}': {source}")]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Coarse classification of a single-image failure.
///
/// Persisted verbatim in the caption store (`snake_case`), so renaming a
/// variant is a storage format change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The image file could not be read or its format not determined.
    Encoding,
    /// The endpoint could not be reached, or the request timed out.
    Transport,
    /// The endpoint answered, but with a non-success status or an
    /// unusable body.
    Api,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FailureKind::Encoding => "encoding",
            FailureKind::Transport => "transport",
            FailureKind::Api => "api",
        };
        f.write_str(s)
    }
}

/// A non-fatal error for a single image.
///
/// Stored in the caption store instead of the caption, marking the image for
/// re-attempt on the next run. The overall run always continues.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("{kind} error: {message}")]
pub struct CaptionFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl CaptionFailure {
    pub fn encoding(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Encoding,
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Transport,
            message: message.into(),
        }
    }

    pub fn api(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Api,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_display_names_kind_and_message() {
        let f = CaptionFailure::transport("connection refused");
        let msg = f.to_string();
        assert!(msg.contains("transport"), "got: {msg}");
        assert!(msg.contains("connection refused"), "got: {msg}");
    }

    #[test]
    fn failure_kind_serialises_snake_case() {
        let json = serde_json::to_string(&FailureKind::Api).unwrap();
        assert_eq!(json, "\"api\"");
        let back: FailureKind = serde_json::from_str("\"transport\"").unwrap();
        assert_eq!(back, FailureKind::Transport);
    }

    #[test]
    fn store_parse_display_names_path() {
        let e = Img2AltError::StoreParse {
            path: PathBuf::from("/photos/weddings/alt-text.json"),
            detail: "expected value at line 1".into(),
        };
        assert!(e.to_string().contains("alt-text.json"));
    }

    #[test]
    fn invalid_config_display() {
        let e = Img2AltError::InvalidConfig("timeout must be at least 1s".into());
        assert!(e.to_string().contains("timeout"));
    }
}
