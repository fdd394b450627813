//! Atomic file writes: temp file in the target directory, fsync, rename.
//!
//! Readers of a version index never observe a half-written file; they see
//! either the previous index or the new one.

use anyhow::{Context, Result};
use camino::Utf8Path;
use std::fs;
use std::io::Write;
use tempfile::NamedTempFile;

#[cfg(target_os = "windows")]
use std::{thread, time::Duration};

/// Atomically replace `path` with `content` (LF line endings).
///
/// Returns the number of rename retries that were needed (always 0 off Windows).
pub fn write_file_atomic(path: &Utf8Path, content: &str) -> Result<u32> {
    let normalized = normalize_line_endings(content);

    let dir = path.parent().unwrap_or_else(|| Utf8Path::new("."));
    fs::create_dir_all(dir).with_context(|| format!("Failed to create directory: {dir}"))?;

    let mut temp_file = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temporary file in: {dir}"))?;
    temp_file
        .write_all(normalized.as_bytes())
        .context("Failed to write content to temporary file")?;
    temp_file
        .as_file()
        .sync_all()
        .context("Failed to fsync temporary file")?;

    persist(temp_file, path).with_context(|| format!("Failed to atomically write file: {path}"))
}

/// Normalize CRLF and lone CR to LF.
#[must_use]
pub fn normalize_line_endings(content: &str) -> String {
    content.replace("\r\n", "\n").replace('\r', "\n")
}

#[cfg(not(target_os = "windows"))]
fn persist(temp_file: NamedTempFile, target: &Utf8Path) -> Result<u32> {
    temp_file
        .persist(target.as_std_path())
        .map(|_| 0)
        .map_err(|e| anyhow::anyhow!(e.error))
}

// Antivirus and indexers briefly hold handles on Windows; retry with a
// bounded backoff (<= 250ms total).
#[cfg(target_os = "windows")]
fn persist(mut temp_file: NamedTempFile, target: &Utf8Path) -> Result<u32> {
    const MAX_RETRIES: u32 = 5;
    let mut retries = 0;
    loop {
        match temp_file.persist(target.as_std_path()) {
            Ok(_) => return Ok(retries),
            Err(err) if retries < MAX_RETRIES => {
                thread::sleep(Duration::from_millis(10 * 2_u64.pow(retries)));
                retries += 1;
                temp_file = err.file;
            }
            Err(err) => return Err(anyhow::anyhow!(err.error)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_normalize_line_endings() {
        assert_eq!(
            normalize_line_endings("line1\r\nline2\r\nline3"),
            "line1\nline2\nline3"
        );
        assert_eq!(
            normalize_line_endings("mixed\r\nline\nending\r"),
            "mixed\nline\nending\n"
        );
    }

    #[test]
    fn test_atomic_write_creates_parent_and_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        let path_buf = temp_dir.path().join("versions").join("erd.json");
        let path = Utf8Path::from_path(path_buf.as_path()).unwrap();

        write_file_atomic(path, "first").unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "first");

        write_file_atomic(path, "second\r\n").unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "second\n");
    }

    #[test]
    fn test_atomic_write_leaves_no_temp_files() {
        let temp_dir = TempDir::new().unwrap();
        let path_buf = temp_dir.path().join("index.json");
        let path = Utf8Path::from_path(path_buf.as_path()).unwrap();

        write_file_atomic(path, "{}").unwrap();

        let entries: Vec<_> = fs::read_dir(temp_dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }
}
