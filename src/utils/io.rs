//! File I/O primitives with consistent error handling.

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Read file contents with standardized error handling.
pub fn read_file(path: &Path, operation: &str) -> Result<String> {
    fs::read_to_string(path).map_err(|e| {
        Error::internal_io(
            e.to_string(),
            Some(format!("{} ({})", operation, path.display())),
        )
    })
}

/// Read and deserialize a JSON file.
pub fn read_json<T: DeserializeOwned>(path: &Path, operation: &str) -> Result<T> {
    let content = read_file(path, operation)?;
    serde_json::from_str(&content).map_err(|e| {
        Error::internal_json(
            e.to_string(),
            Some(format!("{} ({})", operation, path.display())),
        )
    })
}

/// Create a directory and its parents if missing.
pub fn ensure_dir(path: &Path, operation: &str) -> Result<()> {
    fs::create_dir_all(path).map_err(|e| {
        Error::internal_io(
            e.to_string(),
            Some(format!("{} ({})", operation, path.display())),
        )
    })
}

/// Delete a file or directory tree. Missing paths are not an error.
///
/// Returns whether anything was removed.
pub fn remove_path(path: &Path, operation: &str) -> Result<bool> {
    let result = match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::internal_io(
            e.to_string(),
            Some(format!("{} ({})", operation, path.display())),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn read_file_succeeds_for_existing_file() {
        let mut temp = NamedTempFile::new().unwrap();
        writeln!(temp, "test content").unwrap();

        let content = read_file(temp.path(), "test read").unwrap();
        assert!(content.contains("test content"));
    }

    #[test]
    fn read_file_returns_error_for_missing_file() {
        let err = read_file(Path::new("/nonexistent/path.txt"), "test read").unwrap_err();
        assert_eq!(err.code.as_str(), "internal.io_error");
    }

    #[test]
    fn read_json_reports_parse_errors() {
        let mut temp = NamedTempFile::new().unwrap();
        write!(temp, "{{ nope").unwrap();

        let err = read_json::<serde_json::Value>(temp.path(), "test json").unwrap_err();
        assert_eq!(err.code.as_str(), "internal.json_error");
    }

    #[test]
    fn remove_path_handles_files_dirs_and_missing() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("dist/web");
        ensure_dir(&nested, "test mkdir").unwrap();
        let file = dir.path().join("Dockerfile");
        fs::write(&file, "FROM scratch").unwrap();

        assert!(remove_path(&dir.path().join("dist"), "test rm").unwrap());
        assert!(remove_path(&file, "test rm").unwrap());
        assert!(!remove_path(&file, "test rm").unwrap());
        assert!(!dir.path().join("dist").exists());
    }
}
