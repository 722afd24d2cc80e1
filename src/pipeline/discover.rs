//! Filesystem discovery: content directories under the root, and the image
//! files inside each directory.
//!
//! Enumeration order is part of the crate's contract: directories and images
//! are both processed in sorted filename order, so two runs over the same
//! tree attempt images in the same sequence and logs stay comparable.

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::Img2AltError;

/// Extensions treated as images, compared case-insensitively.
pub const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

/// List the content directories directly under `root`, sorted by name.
///
/// Hidden directories (leading `.`) are ignored. Files at the root level are
/// ignored too: captions live in per-directory stores, so a loose image with
/// no directory has nowhere to record to.
pub async fn list_content_dirs(root: &Path) -> Result<Vec<PathBuf>, Img2AltError> {
    let meta = tokio::fs::metadata(root)
        .await
        .map_err(|_| Img2AltError::RootNotFound {
            path: root.to_path_buf(),
        })?;
    if !meta.is_dir() {
        return Err(Img2AltError::RootNotFound {
            path: root.to_path_buf(),
        });
    }

    let mut entries = tokio::fs::read_dir(root)
        .await
        .map_err(|e| Img2AltError::DirRead {
            path: root.to_path_buf(),
            source: e,
        })?;

    let mut dirs = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| Img2AltError::DirRead {
            path: root.to_path_buf(),
            source: e,
        })?
    {
        let file_type = entry
            .file_type()
            .await
            .map_err(|e| Img2AltError::DirRead {
                path: entry.path(),
                source: e,
            })?;
        if !file_type.is_dir() {
            continue;
        }
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        dirs.push(entry.path());
    }

    dirs.sort();
    Ok(dirs)
}

/// List the image filenames in `dir`, sorted.
///
/// Dotfiles are excluded, matching is case-insensitive on the extension, and
/// subdirectories are not descended into.
pub async fn discover_images(dir: &Path) -> Result<Vec<String>, Img2AltError> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| Img2AltError::DirRead {
            path: dir.to_path_buf(),
            source: e,
        })?;

    let mut images = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| Img2AltError::DirRead {
            path: dir.to_path_buf(),
            source: e,
        })?
    {
        let file_type = entry
            .file_type()
            .await
            .map_err(|e| Img2AltError::DirRead {
                path: entry.path(),
                source: e,
            })?;
        if !file_type.is_file() {
            continue;
        }
        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(raw) => {
                // Store keys are JSON strings, so the name must be UTF-8.
                warn!("Skipping non-UTF-8 filename: {:?}", raw);
                continue;
            }
        };
        if is_image_filename(&name) {
            images.push(name);
        }
    }

    images.sort();
    Ok(images)
}

/// True when `name` is a visible file with an image extension.
pub fn is_image_filename(name: &str) -> bool {
    if name.starts_with('.') {
        return false;
    }
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => IMAGE_EXTENSIONS
            .iter()
            .any(|candidate| ext.eq_ignore_ascii_case(candidate)),
        _ => false,
    }
}
