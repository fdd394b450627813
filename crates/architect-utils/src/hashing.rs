//! Content hashing for version deduplication.

/// BLAKE3 hex digest of `content` after line-ending normalization.
///
/// CRLF and LF variants of the same text hash identically so that a backend
/// switching platforms does not produce spurious new versions.
#[must_use]
pub fn content_hash(content: &str) -> String {
    let normalized = crate::atomic_write::normalize_line_endings(content);
    blake3::hash(normalized.as_bytes()).to_hex().to_string()
}
