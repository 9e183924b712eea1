//! Reading and rewriting document files.
//!
//! Target documents are owned by the external collectors; the file on disk is
//! the only persisted state. [`TargetFile`] performs the read-modify-write
//! cycle: parse fully, let the caller patch, serialize fully, and only then
//! rewind, write and truncate. A failure before the write leaves the file as
//! it was.
//!
//! There is no locking. Two processes rewriting the same file concurrently
//! race; callers must serialize invocations per target document.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::{Document, DocumentError};

/// Text formats a document can be read from or written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// YAML (`.yml`, `.yaml`).
    Yaml,
    /// JSON (`.json`).
    Json,
    /// TOML (`.toml`).
    Toml,
}

impl Format {
    /// Pick a format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self, DocumentError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        match extension.as_deref() {
            Some("yml" | "yaml") => Ok(Self::Yaml),
            Some("json") => Ok(Self::Json),
            Some("toml") => Ok(Self::Toml),
            _ => Err(DocumentError::UnsupportedFormat(path.display().to_string())),
        }
    }

    /// Pick a format from its name (`yaml`, `json`, `toml`).
    pub fn from_name(name: &str) -> Result<Self, DocumentError> {
        match name.to_lowercase().as_str() {
            "yaml" | "yml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            "toml" => Ok(Self::Toml),
            other => Err(DocumentError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Yaml => "YAML",
            Self::Json => "JSON",
            Self::Toml => "TOML",
        })
    }
}

/// Parse document text.
///
/// `source_name` only labels errors. An empty YAML input parses as `Null`.
pub fn parse_str(content: &str, format: Format, source_name: &str) -> Result<Document, DocumentError> {
    let parse_error = |message: String| DocumentError::Parse {
        source_name: source_name.to_string(),
        format,
        message,
    };

    match format {
        Format::Yaml => serde_yaml::from_str::<serde_yaml::Value>(content)
            .map(Document::from)
            .map_err(|e| parse_error(e.to_string())),
        Format::Json => serde_json::from_str::<serde_json::Value>(content)
            .map(Document::from)
            .map_err(|e| parse_error(e.to_string())),
        Format::Toml => toml::from_str::<toml::Value>(content)
            .map(Document::from)
            .map_err(|e| parse_error(e.to_string())),
    }
}

/// Render a document as text.
pub fn render(document: &Document, format: Format) -> Result<String, DocumentError> {
    let serialize_error = |message: String| DocumentError::Serialize { format, message };

    match format {
        Format::Yaml => serde_yaml::to_string(document).map_err(|e| serialize_error(e.to_string())),
        Format::Json => serde_json::to_string_pretty(document)
            .map(|mut s| {
                s.push('\n');
                s
            })
            .map_err(|e| serialize_error(e.to_string())),
        Format::Toml => toml::to_string(document).map_err(|e| serialize_error(e.to_string())),
    }
}

/// Read and parse a document file, choosing the format by extension.
pub fn load(path: impl AsRef<Path>) -> Result<Document, DocumentError> {
    let path = path.as_ref();
    let format = Format::from_path(path)?;
    let content = std::fs::read_to_string(path).map_err(|e| DocumentError::io(path, e))?;
    parse_str(&content, format, &path.display().to_string())
}

/// Read a file as text without opening it for writing.
pub fn read_text(path: impl AsRef<Path>) -> Result<String, DocumentError> {
    let path = path.as_ref();
    std::fs::read_to_string(path).map_err(|e| DocumentError::io(path, e))
}

/// Create or replace a plain text file.
pub fn write_text(path: impl AsRef<Path>, content: &str) -> Result<(), DocumentError> {
    let path = path.as_ref();
    std::fs::write(path, content).map_err(|e| DocumentError::io(path, e))
}

/// An open target document, rewritten in place.
#[derive(Debug)]
pub struct TargetFile {
    path: PathBuf,
    format: Format,
    file: File,
}

impl TargetFile {
    /// Open an existing document for reading and writing.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, DocumentError> {
        let path = path.into();
        let format = Format::from_path(&path)?;
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| DocumentError::io(&path, e))?;

        Ok(Self { path, format, file })
    }

    /// Path this file was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Format chosen from the file extension.
    pub fn format(&self) -> Format {
        self.format
    }

    /// Read the current raw contents from the start of the file.
    pub fn read_text(&mut self) -> Result<String, DocumentError> {
        let mut content = String::new();
        self.file
            .seek(SeekFrom::Start(0))
            .and_then(|_| self.file.read_to_string(&mut content))
            .map_err(|e| DocumentError::io(&self.path, e))?;
        Ok(content)
    }

    /// Read and parse the current contents.
    pub fn read_document(&mut self) -> Result<Document, DocumentError> {
        let content = self.read_text()?;
        parse_str(&content, self.format, &self.path.display().to_string())
    }

    /// Replace the file contents with `document`.
    ///
    /// The document is fully serialized before the file is touched. The file
    /// is then rewound, written and truncated at the new end so no bytes of a
    /// longer previous version survive.
    pub fn rewrite(&mut self, document: &Document) -> Result<(), DocumentError> {
        let rendered = render(document, self.format)?;
        self.write_all_truncated(rendered.as_bytes())
            .map_err(|e| DocumentError::io(&self.path, e))
    }

    fn write_all_truncated(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(bytes)?;
        let end = self.file.stream_position()?;
        self.file.set_len(end)?;
        self.file.flush()
    }
}
