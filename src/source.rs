//! Source files as handed from the walker to the parser adapters.

use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// One file read from disk, tagged with the language it will be parsed as.
///
/// Immutable once read. The content is kept as raw bytes; nothing assumes
/// the file is valid UTF-8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    path: PathBuf,
    language: String,
    content: Vec<u8>,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>, language: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            language: language.into(),
            content: content.into(),
        }
    }

    /// Read `path` from disk. IO failures keep their kind in the error
    /// taxonomy, so an unreadable file surfaces as `PermissionDenied`.
    pub fn read(path: impl AsRef<Path>, language: impl Into<String>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read(path).map_err(|e| Error::from_io(path, e))?;
        Ok(Self::new(path, language, content))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Path as it appears in match records
    pub fn display_path(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_source_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.js");
        std::fs::write(&path, "function a() {}").unwrap();

        let file = SourceFile::read(&path, "javascript").unwrap();
        assert_eq!(file.path(), path.as_path());
        assert_eq!(file.language(), "javascript");
        assert_eq!(file.content(), b"function a() {}");
        assert_eq!(file.len(), 15);
    }

    #[test]
    fn test_read_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = SourceFile::read(dir.path().join("gone.js"), "javascript").unwrap_err();
        assert!(matches!(err, Error::PathNotFound(_)));
    }
}
