//! Image encoding: file bytes → base64 data URL with a sniffed MIME type.
//!
//! OpenAI-compatible vision endpoints accept images as base64 data URLs
//! embedded in the JSON request body. The MIME type in the URL is sniffed
//! from the file's magic bytes rather than assumed from the extension, so a
//! PNG renamed to `.jpg` is still sent as `image/png`; the extension is only
//! a fallback for files whose magic bytes are unknown to the `image` crate.

use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::ImageFormat;
use tracing::debug;

use crate::error::CaptionFailure;

/// An image ready for the chat-completions request body.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    /// MIME type resolved by [`sniff_format`], e.g. `image/jpeg`.
    pub mime_type: &'static str,
    /// `data:<mime>;base64,<payload>` URL carrying the whole file.
    pub data_url: String,
}

/// Read an image file and encode it for the API request.
///
/// # Errors
/// [`CaptionFailure::encoding`] when the file cannot be read or its format
/// cannot be determined from either magic bytes or extension. Recorded
/// per-image; never aborts the run.
pub async fn encode_image(path: &Path) -> Result<EncodedImage, CaptionFailure> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| CaptionFailure::encoding(format!("reading '{}': {e}", path.display())))?;

    let format = sniff_format(&bytes, path).ok_or_else(|| {
        CaptionFailure::encoding(format!(
            "cannot determine image format of '{}'",
            path.display()
        ))
    })?;
    let mime_type = format.to_mime_type();

    let b64 = STANDARD.encode(&bytes);
    debug!(
        "Encoded {} → {} bytes base64 ({})",
        path.display(),
        b64.len(),
        mime_type
    );

    Ok(EncodedImage {
        mime_type,
        data_url: format!("data:{mime_type};base64,{b64}"),
    })
}

/// Determine the image format from magic bytes, falling back to the file
/// extension when the content is unrecognised.
pub fn sniff_format(bytes: &[u8], path: &Path) -> Option<ImageFormat> {
    image::guess_format(bytes)
        .ok()
        .or_else(|| path.extension().and_then(ImageFormat::from_extension))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";
    const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0];

    #[test]
    fn sniff_prefers_magic_bytes_over_extension() {
        // PNG content behind a .jpg name is still PNG
        let path = PathBuf::from("photo.jpg");
        let mut bytes = PNG_MAGIC.to_vec();
        bytes.extend_from_slice(&[0u8; 16]);
        assert_eq!(sniff_format(&bytes, &path), Some(ImageFormat::Png));
    }

    #[test]
    fn sniff_falls_back_to_extension() {
        let path = PathBuf::from("photo.webp");
        assert_eq!(
            sniff_format(b"no known magic here", &path),
            Some(ImageFormat::WebP)
        );
    }

    #[test]
    fn sniff_unknown_content_and_extension_is_none() {
        let path = PathBuf::from("notes.txt");
        assert_eq!(sniff_format(b"plain text", &path), None);
    }

    #[tokio::test]
    async fn encode_builds_a_jpeg_data_url() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("a.jpg");
        let mut bytes = JPEG_MAGIC.to_vec();
        bytes.extend_from_slice(&[0u8; 32]);
        tokio::fs::write(&path, &bytes).await.unwrap();

        let encoded = encode_image(&path).await.unwrap();
        assert_eq!(encoded.mime_type, "image/jpeg");
        assert!(encoded.data_url.starts_with("data:image/jpeg;base64,"));

        let payload = encoded.data_url.split(',').nth(1).unwrap();
        assert_eq!(STANDARD.decode(payload).unwrap(), bytes);
    }

    #[tokio::test]
    async fn encode_missing_file_is_an_encoding_failure() {
        let err = encode_image(Path::new("/nonexistent/a.jpg"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, crate::error::FailureKind::Encoding);
    }
}
