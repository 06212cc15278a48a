use crate::ai::{ChatError, ChatResult, InlineImage};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64_STANDARD};
use std::path::{Path, PathBuf};

const DEFAULT_MIME: &str = "image/jpeg";

/// Local path for an image reference (`file://` URIs or plain paths).
pub fn image_path(image_uri: &str) -> PathBuf {
    PathBuf::from(image_uri.strip_prefix("file://").unwrap_or(image_uri))
}

/// MIME type from the file extension, `image/jpeg` when unknown.
pub fn mime_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());
    match extension.as_deref() {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("heic") => "image/heic",
        Some("heif") => "image/heif",
        _ => DEFAULT_MIME,
    }
}

/// Reads and base64-encodes an attached image for the LLM request.
pub async fn load_inline_image(image_uri: &str) -> ChatResult<InlineImage> {
    let path = image_path(image_uri);
    let bytes = tokio::fs::read(&path).await.map_err(|err| {
        tracing::warn!(path = %path.display(), error = %err, "failed to read image");
        ChatError::ImageUnreadable
    })?;
    Ok(InlineImage {
        mime_type: mime_type(&path).to_string(),
        data: BASE64_STANDARD.encode(bytes),
    })
}
