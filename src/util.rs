use anyhow::{Context, Result};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use image::{DynamicImage, ImageFormat};
use sha2::{Digest, Sha256};
use std::io::Cursor;
use std::path::Path;
use time::format_description::well_known::Rfc3339;

pub fn ensure_dir(p: &Path) -> Result<()> {
    std::fs::create_dir_all(p).with_context(|| format!("create_dir_all {}", p.display()))
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(bytes);
    format!("{:x}", h.finalize())
}

pub fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

/// Decodes the payload of a `data:<mime>;base64,<payload>` string.
/// A bare base64 string is accepted as well.
pub fn decode_data_uri(raw: &str) -> Result<Vec<u8>> {
    let raw = raw.trim();
    let payload = if raw.starts_with("data:") {
        raw.split_once(',')
            .map(|(_, p)| p)
            .with_context(|| "data URI has no payload")?
    } else {
        raw
    };
    STANDARD
        .decode(payload.trim())
        .with_context(|| "invalid base64 payload")
}

pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png)
        .with_context(|| "encoding PNG")?;
    Ok(buf.into_inner())
}

/// Shrinks `img` to fit in a `max_side` square, keeping the aspect ratio.
/// Images already inside the bound are returned unchanged.
pub fn thumbnail(img: &DynamicImage, max_side: u32) -> DynamicImage {
    let max_side = max_side.max(1);
    if img.width() <= max_side && img.height() <= max_side {
        return img.clone();
    }
    img.thumbnail(max_side, max_side)
}

pub fn media_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("avif") => "image/avif",
        Some("txt") => "text/plain",
        Some("csv") => "text/csv",
        Some("json") => "application/json",
        Some("pdf") => "application/pdf",
        Some("doc") => "application/msword",
        Some("docx") => {
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        }
        _ => "application/octet-stream",
    }
}

pub fn looks_like_url(s: &str) -> bool {
    let s = s.to_ascii_lowercase();
    s.starts_with("http://") || s.starts_with("https://") || s.starts_with("file://")
}
