//! Error types for iati-json
//!
//! Every failure of a conversion is reported as exactly one [`ConvertError`]. There is no
//! degraded output: a call either fully succeeds or returns the first error it met.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Position in source text
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Pos {
    pub offset: usize,
    pub line: u32,
    pub col: u32,
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.offset, self.line, self.col)
    }
}

impl Pos {
    pub const fn new(offset: usize, line: u32, col: u32) -> Self {
        Self { offset, line, col }
    }

    /// Computes the 1-based line and column of a byte offset in `input`.
    ///
    /// Offsets past the end are clamped to the end of the input.
    pub fn locate(input: &str, offset: usize) -> Self {
        let offset = offset.min(input.len());
        let mut line: u32 = 1;
        let mut col: u32 = 1;
        for (idx, ch) in input.char_indices() {
            if idx >= offset {
                break;
            }
            if ch == '\n' {
                line = line.saturating_add(1);
                col = 1;
            } else {
                col = col.saturating_add(1);
            }
        }
        Self { offset, line, col }
    }
}

/// Why a source could not be read
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadFailure {
    NotFound,
    PermissionDenied,
    InvalidEncoding,
    Other,
}

impl fmt::Display for ReadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not found"),
            Self::PermissionDenied => write!(f, "permission denied"),
            Self::InvalidEncoding => write!(f, "unsupported text encoding"),
            Self::Other => write!(f, "unreadable"),
        }
    }
}

impl From<io::ErrorKind> for ReadFailure {
    fn from(kind: io::ErrorKind) -> Self {
        match kind {
            io::ErrorKind::NotFound => Self::NotFound,
            io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            io::ErrorKind::InvalidData => Self::InvalidEncoding,
            _ => Self::Other,
        }
    }
}

/// Main error type for iati-json
#[derive(Error, Debug)]
pub enum ConvertError {
    /// The document is not well-formed XML
    #[error("parse error at {pos}: {reason}")]
    Parse { reason: String, pos: Pos },

    /// A file or directory could not be read
    #[error("cannot read {}: {failure}", path.display())]
    SourceRead {
        path: PathBuf,
        failure: ReadFailure,
        #[source]
        source: Option<io::Error>,
    },

    /// The input is neither an XML file, a directory, nor XML text
    #[error("unsupported source: {reason}")]
    UnsupportedSource { reason: String },

    /// The destination file could not be created or written
    #[error("cannot write {}: {source}", path.display())]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ConvertError {
    pub fn parse(reason: impl Into<String>, pos: Pos) -> Self {
        Self::Parse {
            reason: reason.into(),
            pos,
        }
    }

    pub fn source_read(path: &Path, source: io::Error) -> Self {
        Self::SourceRead {
            path: path.to_path_buf(),
            failure: source.kind().into(),
            source: Some(source),
        }
    }

    pub fn invalid_encoding(path: &Path) -> Self {
        Self::SourceRead {
            path: path.to_path_buf(),
            failure: ReadFailure::InvalidEncoding,
            source: None,
        }
    }

    pub fn unsupported(reason: impl Into<String>) -> Self {
        Self::UnsupportedSource {
            reason: reason.into(),
        }
    }

    pub fn output_write(path: &Path, source: io::Error) -> Self {
        Self::OutputWrite {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Prefixes the reason of a parse or unsupported-source error with the file it came from.
    ///
    /// Read and write errors already name their path and are returned unchanged.
    pub fn in_file(self, path: &Path) -> Self {
        match self {
            Self::Parse { reason, pos } => Self::Parse {
                reason: format!("{}: {reason}", path.display()),
                pos,
            },
            Self::UnsupportedSource { reason } => Self::UnsupportedSource {
                reason: format!("{}: {reason}", path.display()),
            },
            other => other,
        }
    }

    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Parse { .. })
    }

    /// Position of a parse error, if this is one
    pub fn pos(&self) -> Option<Pos> {
        match self {
            Self::Parse { pos, .. } => Some(*pos),
            _ => None,
        }
    }
}

/// Result type alias for iati-json
pub type Result<T> = std::result::Result<T, ConvertError>;
