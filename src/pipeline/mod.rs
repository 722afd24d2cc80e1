//! Pipeline stages for the captioning run.
//!
//! Each submodule implements exactly one transformation step.
//! Keeping stages separate makes each independently testable and lets us
//! adjust one step (say, the cleanup rules) without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! discover ──▶ encode ──▶ client ──▶ postprocess
//! (dirs/files) (base64)   (VLM)      (cleanup)
//! ```
//!
//! 1. [`discover`]    — enumerate content directories and the images inside
//!    them, in sorted order with dotfiles excluded
//! 2. [`encode`]      — read each file, sniff its MIME type, and wrap it in a
//!    base64 data URL for the multimodal request body
//! 3. [`crate::client`] — the one stage with network I/O; a single POST per
//!    image, no retry
//! 4. [`postprocess`] — deterministic text-cleanup rules to fix model quirks
//!    (option lists, stray labels, wrapping quotes)

pub mod discover;
pub mod encode;
pub mod postprocess;
