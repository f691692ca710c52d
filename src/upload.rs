use axum::http::HeaderValue;
use std::path::Path;
use tracing::warn;
use uuid::Uuid;

/// Random on-disk name for an upload, keeping a short alphanumeric extension
/// of the original name when there is one.
pub fn stored_filename(original: &str) -> String {
    let id = Uuid::new_v4().simple().to_string();
    match extension(original) {
        Some(ext) => format!("{id}.{ext}"),
        None => id,
    }
}

fn extension(original: &str) -> Option<String> {
    let ext = Path::new(original).extension()?.to_str()?;
    if ext.is_empty() || ext.len() > 16 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Strips any client-side directory components from a submitted filename.
pub fn original_filename(submitted: &str) -> &str {
    submitted
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(submitted)
}

/// Whitespace-separated token count of the text content. Bytes that are not
/// valid UTF-8 are dropped before splitting.
pub fn count_words(bytes: &[u8]) -> usize {
    let mut text = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        text.push_str(chunk.valid());
    }
    text.split_whitespace().count()
}

pub async fn save(upload_dir: &Path, stored_filename: &str, bytes: &[u8]) -> std::io::Result<()> {
    tokio::fs::write(upload_dir.join(stored_filename), bytes).await
}

/// Removes a stored file whose record could not be written.
pub async fn discard(upload_dir: &Path, stored_filename: &str) {
    if let Err(err) = tokio::fs::remove_file(upload_dir.join(stored_filename)).await {
        warn!(stored = %stored_filename, error = %err, "failed to remove orphaned upload");
    }
}

/// `Content-Disposition` value presenting `filename` as the download name.
pub fn attachment_header(filename: &str) -> HeaderValue {
    let fallback: String = filename
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c == ' ' || c.is_ascii_graphic() => c,
            _ => '_',
        })
        .collect();

    let value = format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        percent_encode(filename)
    );
    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

// RFC 5987 attr-char set.
fn percent_encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'!' | b'#' | b'$' | b'&' | b'+' | b'-' | b'.' | b'^'
            | b'_' | b'`' | b'|' | b'~' => out.push(byte as char),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}
