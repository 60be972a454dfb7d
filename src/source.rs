//! Input source abstraction

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{ConvertError, Result};

/// Where a conversion reads its XML from
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Source {
    /// A single XML document on disk
    File(PathBuf),
    /// A directory walked for `.xml` documents
    Directory(PathBuf),
    /// XML text held in memory
    Text(String),
}

impl Source {
    /// Classifies a caller-supplied string
    ///
    /// Text whose first non-whitespace character is `<` is taken as XML; anything else must
    /// name an existing regular file or directory.
    pub fn resolve(input: &str) -> Result<Self> {
        let trimmed = input.trim_start_matches('\u{feff}').trim_start();
        if trimmed.starts_with('<') {
            return Ok(Self::Text(input.to_string()));
        }
        if trimmed.is_empty() {
            return Err(ConvertError::unsupported("empty source"));
        }
        Self::from_path(input)
    }

    /// Classifies an existing path as a file or a directory
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let metadata = fs::metadata(path).map_err(|e| ConvertError::source_read(path, e))?;

        let source = if metadata.is_dir() {
            Self::Directory(path.to_path_buf())
        } else if metadata.is_file() {
            Self::File(path.to_path_buf())
        } else {
            return Err(ConvertError::unsupported(format!(
                "{} is neither a regular file nor a directory",
                path.display()
            )));
        };
        info!(source = %source.describe(), "resolved source");
        Ok(source)
    }

    /// Short human readable description for logs
    pub fn describe(&self) -> String {
        match self {
            Self::File(path) => format!("file {}", path.display()),
            Self::Directory(path) => format!("directory {}", path.display()),
            Self::Text(text) => format!("{} bytes of xml text", text.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReadFailure;

    #[test]
    fn test_xml_text_resolves_without_touching_disk() {
        assert_eq!(
            Source::resolve("  <a/>").ok(),
            Some(Source::Text("  <a/>".to_string()))
        );
        assert!(matches!(
            Source::resolve("\u{feff}<?xml version=\"1.0\"?><a/>"),
            Ok(Source::Text(_))
        ));
    }

    #[test]
    fn test_directory_and_file_resolution() {
        let dir = env!("CARGO_MANIFEST_DIR");
        assert!(matches!(Source::resolve(dir), Ok(Source::Directory(_))));

        let manifest = format!("{dir}/Cargo.toml");
        assert!(matches!(Source::resolve(&manifest), Ok(Source::File(_))));
    }

    #[test]
    fn test_missing_path_is_read_error() {
        match Source::resolve("definitely/not/here.xml") {
            Err(ConvertError::SourceRead { failure, .. }) => {
                assert_eq!(failure, ReadFailure::NotFound);
            }
            other => panic!("expected SourceRead, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_source_is_unsupported() {
        assert!(matches!(
            Source::resolve("   "),
            Err(ConvertError::UnsupportedSource { .. })
        ));
    }

    #[test]
    fn test_describe() {
        assert_eq!(Source::Text("<a/>".into()).describe(), "4 bytes of xml text");
        assert_eq!(
            Source::Directory(PathBuf::from("data")).describe(),
            "directory data"
        );
    }
}
