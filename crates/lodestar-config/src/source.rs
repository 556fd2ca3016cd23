//! Byte sources consumed by the document reader.
//!
//! [`FileSource`] reads from disk; [`MemorySource`] serves fixed content so
//! tests can drive the reader without touching the file system. Both go
//! through the same parsing path.

use std::fs;
use std::path::{Path, PathBuf};

use crate::ReadFailure;

/// Concrete syntax of a configuration document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocumentFormat {
    /// JSON document.
    #[default]
    Json,
    /// TOML document.
    Toml,
}

impl DocumentFormat {
    /// Detect format from file extension.
    ///
    /// `.toml` selects TOML; every other extension, or none, selects JSON.
    pub fn from_path(path: &Path) -> Self {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        match extension.as_deref() {
            Some("toml") => Self::Toml,
            _ => Self::Json,
        }
    }
}

/// Something the document reader can pull raw bytes from.
pub trait ByteSource {
    /// Name used in events and diagnostics, usually the path.
    fn name(&self) -> String;

    /// Syntax of the content.
    fn format(&self) -> DocumentFormat;

    /// Reads the complete content.
    fn read_bytes(&self) -> Result<Vec<u8>, ReadFailure>;
}

/// A document on the local file system.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    format: DocumentFormat,
}

impl FileSource {
    /// Creates a source for `path`, inferring the format from its extension.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let format = DocumentFormat::from_path(&path);
        Self { path, format }
    }

    /// Overrides the inferred format.
    #[must_use]
    pub fn with_format(mut self, format: DocumentFormat) -> Self {
        self.format = format;
        self
    }

    /// The file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ByteSource for FileSource {
    fn name(&self) -> String {
        self.path.display().to_string()
    }

    fn format(&self) -> DocumentFormat {
        self.format
    }

    fn read_bytes(&self) -> Result<Vec<u8>, ReadFailure> {
        fs::read(&self.path).map_err(|e| ReadFailure::from_io(&self.path, &e))
    }
}

/// Fixed in-memory content.
///
/// # Example
///
/// ```
/// use lodestar_config::{ByteSource, DocumentFormat, MemorySource};
///
/// let source = MemorySource::json("inline", r#"{"debug": true}"#);
/// assert_eq!(source.format(), DocumentFormat::Json);
/// assert_eq!(source.read_bytes().unwrap(), br#"{"debug": true}"#);
/// ```
#[derive(Debug, Clone)]
pub struct MemorySource {
    name: String,
    format: DocumentFormat,
    bytes: Vec<u8>,
}

impl MemorySource {
    /// Creates a source serving `bytes`.
    pub fn new(name: impl Into<String>, format: DocumentFormat, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            format,
            bytes: bytes.into(),
        }
    }

    /// Shorthand for a JSON document.
    pub fn json(name: impl Into<String>, content: &str) -> Self {
        Self::new(name, DocumentFormat::Json, content)
    }

    /// Shorthand for a TOML document.
    pub fn toml(name: impl Into<String>, content: &str) -> Self {
        Self::new(name, DocumentFormat::Toml, content)
    }
}

impl ByteSource for MemorySource {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn format(&self) -> DocumentFormat {
        self.format
    }

    fn read_bytes(&self) -> Result<Vec<u8>, ReadFailure> {
        Ok(self.bytes.clone())
    }
}
