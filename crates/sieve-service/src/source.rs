//! Filter list sources
//!
//! The core only ever sees lines of text. Where they come from (the
//! subscription downloader's cache, the user's local rule file) is hidden
//! behind `FilterListSource`.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::{Result, ServiceError};

pub trait FilterListSource {
    /// Name used in log messages.
    fn name(&self) -> &str;

    /// All lines of the list.
    fn read_lines(&self) -> Result<Vec<String>>;
}

/// A filter list stored on disk.
#[derive(Debug, Clone)]
pub struct FileSource {
    name: String,
    path: PathBuf,
    optional: bool,
}

impl FileSource {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            optional: false,
        }
    }

    /// A source whose absence just means "no rules", such as the local rule
    /// file before the first custom rule is added.
    pub fn optional(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            optional: true,
            ..Self::new(name, path)
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FilterListSource for FileSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn read_lines(&self) -> Result<Vec<String>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if self.optional && e.kind() == ErrorKind::NotFound => {
                debug!("'{}' not present at '{}'", self.name, self.path.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(ServiceError::io(&self.path, e)),
        };

        // Invalid UTF-8 only spoils the lines it appears in.
        let text = String::from_utf8_lossy(&bytes);
        Ok(text.lines().map(str::to_string).collect())
    }
}

/// A filter list already held in memory.
#[derive(Debug, Clone)]
pub struct TextSource {
    name: String,
    text: String,
}

impl TextSource {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }
}

impl FilterListSource for TextSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn read_lines(&self) -> Result<Vec<String>> {
        Ok(self.text.lines().map(str::to_string).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_required_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = FileSource::new("easylist", dir.path().join("missing.txt"));
        assert!(matches!(source.read_lines(), Err(ServiceError::Io { .. })));
    }

    #[test]
    fn test_missing_optional_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let source = FileSource::optional("local", dir.path().join("missing.txt"));
        assert!(source.read_lines().unwrap().is_empty());
    }

    #[test]
    fn test_invalid_utf8_keeps_other_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("list.txt");
        fs::write(&path, b"||ads.example.com^\n\xff\xfe\n##.ad\n").unwrap();

        let lines = FileSource::new("list", &path).read_lines().unwrap();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "||ads.example.com^");
        assert_eq!(lines[2], "##.ad");
    }

    #[test]
    fn test_text_source() {
        let source = TextSource::new("inline", "a\r\nb\n");
        assert_eq!(source.read_lines().unwrap(), vec!["a", "b"]);
    }
}
