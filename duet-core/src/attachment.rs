//! Image attachments embedded as `data:` URIs

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Largest raw file accepted as an attachment
pub const MAX_ATTACHMENT_BYTES: u64 = 500_000;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AttachmentError {
    /// Rejected before reading; nothing is sent
    #[error("{path:?} is {size} bytes; attachments must be at most {limit} bytes")]
    TooLarge { path: PathBuf, size: u64, limit: u64 },

    #[error("failed to read {path:?}: {reason}")]
    Read { path: PathBuf, reason: String },
}

/// MIME type guessed from the file extension
pub fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

/// Build a self-contained `data:` URI
pub fn encode_data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// Check the size limit, then read and encode the file.
///
/// The size check uses file metadata so oversized files are never read.
pub async fn encode_file(path: &Path, limit: u64) -> Result<String, AttachmentError> {
    let read_error = |e: std::io::Error| AttachmentError::Read {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };

    let size = tokio::fs::metadata(path).await.map_err(read_error)?.len();
    if size > limit {
        return Err(AttachmentError::TooLarge {
            path: path.to_path_buf(),
            size,
            limit,
        });
    }

    let bytes = tokio::fs::read(path).await.map_err(read_error)?;
    debug!(?path, size, "Encoded attachment");
    Ok(encode_data_uri(mime_for(path), &bytes))
}
