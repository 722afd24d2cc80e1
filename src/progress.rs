//! Progress-callback trait for per-image captioning events.
//!
//! Inject an [`Arc<dyn CaptionProgress>`] via
//! [`crate::config::CaptionConfigBuilder::progress`] to receive real-time
//! events as the run walks directories and captions images.
//!
//! # Why callbacks instead of channels?
//!
//! The callback approach is the least-invasive integration point: callers can
//! forward events to a channel, a WebSocket, a database record, or a terminal
//! progress bar — without the library knowing anything about how the host
//! application communicates. The trait is `Send + Sync` so it works correctly
//! when directories are processed concurrently.
//!
//! # Example
//!
//! ```rust
//! use img2alt::{CaptionConfig, CaptionProgress};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     captioned: AtomicUsize,
//! }
//!
//! impl CaptionProgress for CountingCallback {
//!     fn on_image_captioned(&self, dir: &str, name: &str, caption_len: usize) {
//!         let done = self.captioned.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("[{done}] {dir}/{name} ({caption_len} chars)");
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { captioned: AtomicUsize::new(0) });
//!
//! let config = CaptionConfig::builder()
//!     .progress(counter as Arc<dyn CaptionProgress>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the orchestrator as it processes directories and images.
///
/// Implementations must be `Send + Sync` (directories may be processed
/// concurrently when the concurrency knob is raised). All methods have
/// default no-op implementations so callers only override what they care
/// about.
pub trait CaptionProgress: Send + Sync {
    /// Called once before any directory is processed.
    fn on_run_start(&self, total_dirs: usize) {
        let _ = total_dirs;
    }

    /// Called when a directory pass begins.
    ///
    /// # Arguments
    /// * `dir`          — directory name (not the full path)
    /// * `total_images` — images discovered in the directory
    /// * `pending`      — images that will actually be attempted
    fn on_directory_start(&self, dir: &str, total_images: usize, pending: usize) {
        let _ = (dir, total_images, pending);
    }

    /// Called just before the captioning request is sent for an image.
    fn on_image_start(&self, dir: &str, name: &str) {
        let _ = (dir, name);
    }

    /// Called when an image receives a caption and the store is persisted.
    fn on_image_captioned(&self, dir: &str, name: &str, caption_len: usize) {
        let _ = (dir, name, caption_len);
    }

    /// Called when an image attempt fails and the failure is recorded.
    fn on_image_failed(&self, dir: &str, name: &str, error: &str) {
        let _ = (dir, name, error);
    }

    /// Called when an image is skipped because its record is already
    /// resolved.
    fn on_image_skipped(&self, dir: &str, name: &str) {
        let _ = (dir, name);
    }

    /// Called when a directory pass ends, with its counters.
    fn on_directory_complete(&self, dir: &str, generated: usize, skipped: usize, errored: usize) {
        let _ = (dir, generated, skipped, errored);
    }

    /// Called once after all directories have been attempted.
    fn on_run_complete(&self, dirs: usize, generated: usize, skipped: usize, errored: usize) {
        let _ = (dirs, generated, skipped, errored);
    }
}

/// A no-op implementation for callers that don't need progress events.
///
/// This is the default when no callback is configured.
pub struct NoopProgress;

impl CaptionProgress for NoopProgress {}

/// Convenience alias matching the type stored in
/// [`crate::config::CaptionConfig`].
pub type SharedProgress = Arc<dyn CaptionProgress>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct TrackingCallback {
        starts: AtomicUsize,
        captioned: AtomicUsize,
        failed: AtomicUsize,
        skipped: AtomicUsize,
    }

    impl CaptionProgress for TrackingCallback {
        fn on_image_start(&self, _dir: &str, _name: &str) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_image_captioned(&self, _dir: &str, _name: &str, _caption_len: usize) {
            self.captioned.fetch_add(1, Ordering::SeqCst);
        }

        fn on_image_failed(&self, _dir: &str, _name: &str, _error: &str) {
            self.failed.fetch_add(1, Ordering::SeqCst);
        }

        fn on_image_skipped(&self, _dir: &str, _name: &str) {
            self.skipped.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgress;
        cb.on_run_start(3);
        cb.on_directory_start("weddings", 10, 4);
        cb.on_image_start("weddings", "a.jpg");
        cb.on_image_captioned("weddings", "a.jpg", 42);
        cb.on_image_failed("weddings", "b.jpg", "timeout");
        cb.on_image_skipped("weddings", "c.jpg");
        cb.on_directory_complete("weddings", 1, 1, 1);
        cb.on_run_complete(3, 1, 1, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback {
            starts: AtomicUsize::new(0),
            captioned: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            skipped: AtomicUsize::new(0),
        };

        tracker.on_image_start("d", "a.jpg");
        tracker.on_image_captioned("d", "a.jpg", 50);
        tracker.on_image_start("d", "b.jpg");
        tracker.on_image_failed("d", "b.jpg", "HTTP 500");
        tracker.on_image_skipped("d", "c.jpg");

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.captioned.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.failed.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.skipped.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: SharedProgress = Arc::new(NoopProgress);
        cb.on_run_start(10);
        cb.on_image_captioned("d", "a.jpg", 512);
    }
}
