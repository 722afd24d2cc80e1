//! Captioning run orchestration.
//!
//! A run walks every content directory under the configured root and brings
//! its `alt-text.json` up to date: images with a usable caption are skipped,
//! everything else (new images and recorded failures) is captioned once and
//! the store is rewritten after every single image. Interrupting a run at any
//! point therefore loses at most the image in flight, and re-running picks up
//! exactly where the previous run stopped.
//!
//! Directories are independent of each other — each owns its store for the
//! duration of its pass — so the `concurrency` knob may process whole
//! directories in parallel. Images inside a directory are always sequential.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::client::{CaptionRequest, Captioner, HttpCaptioner};
use crate::config::{CaptionConfig, ResolvedRule};
use crate::error::{CaptionFailure, Img2AltError};
use crate::pipeline::{discover, encode, postprocess};
use crate::store::CaptionStore;

/// Counts for one content directory.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DirectorySummary {
    /// Directory name (not the full path).
    pub directory: String,
    /// Images found in the directory.
    pub images: usize,
    /// Captions generated (and persisted) this run.
    pub generated: usize,
    /// Images skipped because they were already resolved.
    pub skipped: usize,
    /// Attempts that ended in a recorded failure.
    pub errored: usize,
    pub duration_ms: u64,
}

/// Aggregate counts for a whole run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    /// Per-directory breakdown, sorted by directory name.
    pub directories: Vec<DirectorySummary>,
    /// Directories skipped because their store file could not be parsed.
    pub failed_directories: Vec<String>,
    pub generated: usize,
    pub skipped: usize,
    pub errored: usize,
    pub total_duration_ms: u64,
}

impl RunSummary {
    /// Total images seen across all processed directories.
    pub fn total_images(&self) -> usize {
        self.directories.iter().map(|d| d.images).sum()
    }

    /// Images that still need a caption (absent or failed records).
    pub fn pending(&self) -> usize {
        self.total_images()
            .saturating_sub(self.skipped + self.generated)
    }
}

/// Caption every unresolved image under `config.root`.
///
/// This is the primary entry point for the library.
///
/// # Returns
/// `Ok(RunSummary)` on completion, even if some images failed
/// (check `summary.errored`) or some directories were skipped over a
/// corrupt store (check `summary.failed_directories`).
///
/// # Errors
/// Returns `Err(Img2AltError)` only for fatal errors:
/// - Root directory missing or unreadable
/// - A store file that could not be written back
pub async fn run(config: &CaptionConfig) -> Result<RunSummary, Img2AltError> {
    let total_start = Instant::now();
    info!("Starting captioning run under {}", config.root.display());

    // ── Step 1: Resolve the captioner ────────────────────────────────────
    let captioner = resolve_captioner(config)?;

    // ── Step 2: List content directories ─────────────────────────────────
    let dirs = discover::list_content_dirs(&config.root).await?;
    info!("Found {} content directories", dirs.len());

    if let Some(ref cb) = config.progress {
        cb.on_run_start(dirs.len());
    }

    // ── Step 3: Process each directory ───────────────────────────────────
    let mut summary = RunSummary::default();
    if config.concurrency <= 1 {
        for dir in &dirs {
            let result = process_directory(&captioner, config, dir).await;
            fold_directory(&mut summary, dir, result)?;
        }
    } else {
        let results: Vec<(&PathBuf, Result<DirectorySummary, Img2AltError>)> =
            stream::iter(dirs.iter().map(|dir| {
                let captioner = Arc::clone(&captioner);
                async move {
                    let result = process_directory(&captioner, config, dir).await;
                    (dir, result)
                }
            }))
            .buffer_unordered(config.concurrency)
            .collect()
            .await;
        for (dir, result) in results {
            fold_directory(&mut summary, dir, result)?;
        }
    }

    // Completion order is nondeterministic under concurrency; sort for
    // consistent output.
    summary.directories.sort_by(|a, b| a.directory.cmp(&b.directory));
    summary.total_duration_ms = total_start.elapsed().as_millis() as u64;

    info!(
        "Run complete: {} generated, {} skipped, {} errored in {}ms",
        summary.generated, summary.skipped, summary.errored, summary.total_duration_ms
    );

    if let Some(ref cb) = config.progress {
        cb.on_run_complete(
            summary.directories.len(),
            summary.generated,
            summary.skipped,
            summary.errored,
        );
    }

    Ok(summary)
}

/// Synchronous wrapper around [`run`].
///
/// Creates a temporary tokio runtime internally.
pub fn run_sync(config: &CaptionConfig) -> Result<RunSummary, Img2AltError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Img2AltError::Internal(format!("Failed to create tokio runtime: {e}")))?
        .block_on(run(config))
}

/// Scan the content tree without captioning anything.
///
/// Contacts no endpoint and writes nothing. In the returned summary,
/// `skipped` counts resolved records, `errored` counts stored failure
/// records awaiting a retry, and `generated` is always zero; the number of
/// images a real run would attempt is [`RunSummary::pending`].
pub async fn audit(config: &CaptionConfig) -> Result<RunSummary, Img2AltError> {
    let total_start = Instant::now();
    let dirs = discover::list_content_dirs(&config.root).await?;

    let mut summary = RunSummary::default();
    for dir in &dirs {
        let name = dir_name(dir);
        let store = match CaptionStore::load(dir).await {
            Ok(store) => store,
            Err(e @ Img2AltError::StoreParse { .. }) => {
                warn!("Skipping directory {}: {}", dir.display(), e);
                summary.failed_directories.push(name);
                continue;
            }
            Err(e) => return Err(e),
        };
        let images = discover::discover_images(dir).await?;
        let resolved = images.iter().filter(|f| store.is_resolved(f)).count();
        let stored_failures = images
            .iter()
            .filter(|f| store.get(f).is_some_and(|r| r.is_failure()))
            .count();

        summary.skipped += resolved;
        summary.errored += stored_failures;
        summary.directories.push(DirectorySummary {
            directory: name,
            images: images.len(),
            skipped: resolved,
            errored: stored_failures,
            ..Default::default()
        });
    }

    summary.total_duration_ms = total_start.elapsed().as_millis() as u64;
    Ok(summary)
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Resolve the captioning client, most-specific first.
///
/// 1. **Pre-built captioner** (`config.captioner`) — the caller constructed
///    the client themselves; used as-is. Tests inject scripted
///    implementations here.
/// 2. **HTTP client** built from `config.endpoint` + `config.timeout_secs`.
fn resolve_captioner(config: &CaptionConfig) -> Result<Arc<dyn Captioner>, Img2AltError> {
    if let Some(ref captioner) = config.captioner {
        return Ok(Arc::clone(captioner));
    }
    Ok(Arc::new(HttpCaptioner::new(
        &config.endpoint,
        config.timeout_secs,
    )?))
}

/// Merge one directory's outcome into the run summary.
///
/// A corrupt store is fatal for its directory only: the directory is
/// recorded and the run moves on. Everything else propagates.
fn fold_directory(
    summary: &mut RunSummary,
    dir: &Path,
    result: Result<DirectorySummary, Img2AltError>,
) -> Result<(), Img2AltError> {
    match result {
        Ok(d) => {
            summary.generated += d.generated;
            summary.skipped += d.skipped;
            summary.errored += d.errored;
            summary.directories.push(d);
            Ok(())
        }
        Err(e @ Img2AltError::StoreParse { .. }) => {
            warn!("Skipping directory {}: {}", dir.display(), e);
            summary.failed_directories.push(dir_name(dir));
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// One full pass over a single content directory.
async fn process_directory(
    captioner: &Arc<dyn Captioner>,
    config: &CaptionConfig,
    dir: &Path,
) -> Result<DirectorySummary, Img2AltError> {
    let dir_start = Instant::now();
    let name = dir_name(dir);
    let rule = config.rule_for(&name);
    let prompt = rule.rendered_prompt();

    let mut store = CaptionStore::load(dir).await?;
    let images = discover::discover_images(dir).await?;
    let pending = images.iter().filter(|f| !store.is_resolved(f)).count();
    info!(
        "{}: {} images, {} pending (model {})",
        name,
        images.len(),
        pending,
        rule.model
    );

    if let Some(ref cb) = config.progress {
        cb.on_directory_start(&name, images.len(), pending);
    }

    let mut summary = DirectorySummary {
        directory: name.clone(),
        images: images.len(),
        ..Default::default()
    };

    for filename in &images {
        if store.is_resolved(filename) {
            debug!("{}/{}: already resolved, skipping", name, filename);
            summary.skipped += 1;
            if let Some(ref cb) = config.progress {
                cb.on_image_skipped(&name, filename);
            }
            continue;
        }

        if let Some(ref cb) = config.progress {
            cb.on_image_start(&name, filename);
        }

        match caption_image(captioner, config, &rule, &prompt, dir, filename).await {
            Ok(text) => {
                debug!("{}/{}: \"{}\"", name, filename, text);
                if let Some(ref cb) = config.progress {
                    cb.on_image_captioned(&name, filename, text.chars().count());
                }
                store.put_caption(filename.as_str(), text);
                summary.generated += 1;
            }
            Err(failure) => {
                warn!("{}/{}: {}", name, filename, failure);
                if let Some(ref cb) = config.progress {
                    cb.on_image_failed(&name, filename, &failure.to_string());
                }
                store.put_failure(filename.as_str(), failure);
                summary.errored += 1;
            }
        }

        // Persist after every image so a crash loses at most the attempt
        // in flight.
        store.persist(dir).await?;
    }

    summary.duration_ms = dir_start.elapsed().as_millis() as u64;
    info!(
        "{}: {} generated, {} skipped, {} errored in {}ms",
        name, summary.generated, summary.skipped, summary.errored, summary.duration_ms
    );

    if let Some(ref cb) = config.progress {
        cb.on_directory_complete(&name, summary.generated, summary.skipped, summary.errored);
    }

    Ok(summary)
}

/// Encode, caption, and clean a single image.
async fn caption_image(
    captioner: &Arc<dyn Captioner>,
    config: &CaptionConfig,
    rule: &ResolvedRule<'_>,
    prompt: &str,
    dir: &Path,
    filename: &str,
) -> Result<String, CaptionFailure> {
    let image = encode::encode_image(&dir.join(filename)).await?;
    let request = CaptionRequest {
        image,
        prompt: prompt.to_string(),
        model: rule.model.to_string(),
        max_tokens: config.max_tokens,
        temperature: config.temperature,
    };

    let raw = captioner.caption(&request).await?;

    let mut text = postprocess::clean_caption(&raw);
    if let Some(max) = config.max_caption_len {
        text = postprocess::truncate_caption(&text, max);
    }
    // The client rejects an empty response body; this catches captions that
    // were nothing but noise the cleanup rules removed.
    if text.is_empty() {
        return Err(CaptionFailure::api("caption was empty after cleanup"));
    }
    Ok(text)
}

/// Directory name as a store/config key.
fn dir_name(dir: &Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| dir.display().to_string())
}
