//! # img2alt
//!
//! Resumable alt-text generation for image directories using a locally
//! hosted vision model, plus an inventory-driven PDF text extractor.
//!
//! ## Why this crate?
//!
//! Captioning a photography archive with a local vision model takes hours:
//! tens of seconds per image, thousands of images, and the inference server
//! goes away whenever the machine sleeps. The loop here is built around that
//! reality — every caption is persisted the moment it arrives, resolved
//! images are never re-sent, and failures are recorded exactly where the
//! next run will pick them up. Kill the process at any point and re-run; it
//! continues from the image it was on.
//!
//! ## Pipeline Overview
//!
//! ```text
//! content root
//!  │
//!  ├─ 1. Discover  immediate subdirectories + their jpg/jpeg/png/webp files
//!  ├─ 2. Resume    load alt-text.json, skip records that already resolved
//!  ├─ 3. Encode    image bytes → base64 data URL (MIME sniffed, not assumed)
//!  ├─ 4. Caption   one chat-completions POST per image, no retry
//!  ├─ 5. Polish    strip option preambles and quotes, optional length cap
//!  └─ 6. Persist   rewrite alt-text.json atomically after every image
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use img2alt::CaptionConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Endpoint defaults to LM Studio at http://127.0.0.1:1234
//!     let config = CaptionConfig::builder()
//!         .root("content/blog")
//!         .build()?;
//!     let summary = img2alt::run(&config).await?;
//!     eprintln!(
//!         "{} captioned, {} skipped, {} failed",
//!         summary.generated, summary.skipped, summary.errored
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `img2alt` and `pdfextract` binaries (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! img2alt = { version = "0.3", default-features = false }
//! ```
//!
//! ## Choosing a Model
//!
//! Any model the endpoint serves works; these are the two this tool was
//! tuned against:
//!
//! | Model | Notes |
//! |-------|-------|
//! | `qwen/qwen3-vl-8b` | Default — fast enough for batch runs on a laptop |
//! | `gemma-3-12b-it`   | Better prose, roughly twice as slow |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod client;
pub mod config;
pub mod error;
pub mod pdf;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod run;
pub mod store;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use client::{CaptionRequest, Captioner, HttpCaptioner};
pub use config::{
    CaptionConfig, CaptionConfigBuilder, CategoryRule, DirectoryRule, FileConfig, PdfConfig,
    ResolvedRule,
};
pub use error::{CaptionFailure, FailureKind, Img2AltError};
pub use pdf::report::{ExtractionReport, ExtractionStatus, FileRecord};
pub use pdf::run_extraction;
pub use progress::{CaptionProgress, NoopProgress, SharedProgress};
pub use run::{audit, run, run_sync, DirectorySummary, RunSummary};
pub use store::{CaptionRecord, CaptionStore, TaggedCaption};
