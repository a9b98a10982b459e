//! Atomic file replacement.

use std::io::Write;
use std::path::Path;

use crate::error::{KegError, KegResult};

/// Write bytes atomically:
/// - ensure parent directory exists
/// - write to a temp file in the same directory
/// - fsync file + rename into place
pub(crate) fn atomic_write(path: &Path, content: &[u8]) -> KegResult<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent).map_err(|e| KegError::io(parent, e))?;

    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .unwrap_or("node");
    let temp_path = parent.join(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4()));

    let result = (|| {
        let mut temp_file =
            std::fs::File::create(&temp_path).map_err(|e| KegError::io(&temp_path, e))?;
        temp_file
            .write_all(content)
            .map_err(|e| KegError::io(&temp_path, e))?;
        temp_file
            .sync_all()
            .map_err(|e| KegError::io(&temp_path, e))?;
        std::fs::rename(&temp_path, path).map_err(|e| KegError::io(path, e))
    })();

    if result.is_err() {
        let _ = std::fs::remove_file(&temp_path);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atomic_write_replaces_and_leaves_no_temp() -> Result<(), Box<dyn std::error::Error>> {
        let tmp = tempfile::TempDir::new()?;
        let target = tmp.path().join("nested/meta.yaml");
        atomic_write(&target, b"title: one\n")?;
        atomic_write(&target, b"title: two\n")?;
        assert_eq!(std::fs::read_to_string(&target)?, "title: two\n");
        let leftovers = std::fs::read_dir(tmp.path().join("nested"))?
            .filter_map(Result::ok)
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
            .count();
        assert_eq!(leftovers, 0);
        Ok(())
    }
}
