//! Image attachments encoded as base64 data-URIs.

use base64::{engine::general_purpose::STANDARD, Engine};
use std::path::Path;

use crate::error::ChatError;

const FALLBACK_MIME: &str = "application/octet-stream";

/// Read an image file and encode it as a data-URI
pub async fn load_data_uri(path: &Path) -> Result<String, ChatError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| ChatError::ImageRead {
            path: path.to_path_buf(),
            source,
        })?;

    let mime = sniff_mime(&bytes)
        .or_else(|| mime_from_extension(path))
        .unwrap_or(FALLBACK_MIME);

    Ok(encode_data_uri(&bytes, mime))
}

pub fn encode_data_uri(bytes: &[u8], mime: &str) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// Identify common image formats by their magic bytes
pub fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    match bytes {
        [0x89, b'P', b'N', b'G', ..] => Some("image/png"),
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        [b'G', b'I', b'F', b'8', ..] => Some("image/gif"),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some("image/webp"),
        [b'B', b'M', ..] => Some("image/bmp"),
        _ => None,
    }
}

fn mime_from_extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "bmp" => Some("image/bmp"),
        "svg" => Some("image/svg+xml"),
        _ => None,
    }
}

/// Short human-readable label for a data-URI, e.g. `image/png, 12.4 KB`
pub fn describe(data_uri: &str) -> String {
    let Some(rest) = data_uri.strip_prefix("data:") else {
        return "attachment".to_string();
    };
    let (mime, payload) = rest.split_once(',').unwrap_or((rest, ""));
    let mime = mime.trim_end_matches(";base64");
    let mime = if mime.is_empty() { FALLBACK_MIME } else { mime };

    // Decoded size without decoding: 3 bytes per 4 chars minus padding.
    let padding = payload.bytes().rev().take_while(|b| *b == b'=').count();
    let size = (payload.len() / 4 * 3).saturating_sub(padding);

    format!("{}, {}", mime, human_size(size))
}

fn human_size(bytes: usize) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
