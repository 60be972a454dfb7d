//! Conversion settings and the JSON key conventions

use std::fmt;

/// Maximum element nesting depth (512), far beyond any IATI document
pub const DEFAULT_MAX_DEPTH: usize = 512;
/// IATI organisation files share activity directories but are not activity data
pub const DEFAULT_EXCLUDED_SUFFIX: &str = "-org.xml";
/// Extension of files picked up from a directory
pub const XML_EXTENSION: &str = "xml";

/// Keys used to encode XML attributes and text inside JSON objects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyConvention;

impl KeyConvention {
    /// Prepended to an attribute name to form its object key
    pub const ATTRIBUTE_PREFIX: &'static str = "@";
    /// Key holding an element's text when the element also has attributes or children
    pub const TEXT_KEY: &'static str = "#text";

    pub fn attribute_key(name: &str) -> String {
        let mut key = String::with_capacity(Self::ATTRIBUTE_PREFIX.len() + name.len());
        key.push_str(Self::ATTRIBUTE_PREFIX);
        key.push_str(name);
        key
    }
}

/// Configuration for the XML tree builder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserConfig {
    /// Maximum nesting depth of elements
    pub max_depth: usize,
    /// Retry a failed parse after removing `<http://...>` pseudo-tags
    pub strip_bracketed_urls: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            strip_bracketed_urls: true,
        }
    }
}

impl fmt::Display for ParserConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ParserConfig {{ max_depth: {}, strip_bracketed_urls: {} }}",
            self.max_depth, self.strip_bracketed_urls
        )
    }
}

/// Configuration for directory discovery and aggregation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkConfig {
    /// File name suffixes skipped during the walk
    pub excluded_suffixes: Vec<String>,
    /// Map files on the rayon pool
    pub parallel: bool,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            excluded_suffixes: vec![DEFAULT_EXCLUDED_SUFFIX.to_string()],
            parallel: true,
        }
    }
}

impl WalkConfig {
    pub fn is_excluded(&self, file_name: &str) -> bool {
        self.excluded_suffixes
            .iter()
            .any(|suffix| file_name.ends_with(suffix.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_key() {
        assert_eq!(KeyConvention::attribute_key("ref"), "@ref");
        assert_eq!(KeyConvention::attribute_key("xml:lang"), "@xml:lang");
    }

    #[test]
    fn test_walk_config_exclusion() {
        let config = WalkConfig::default();
        assert!(config.is_excluded("gb-1-org.xml"));
        assert!(!config.is_excluded("gb-1-activities.xml"));

        let config = WalkConfig {
            excluded_suffixes: Vec::new(),
            parallel: false,
        };
        assert!(!config.is_excluded("gb-1-org.xml"));
    }

    #[test]
    fn test_parser_config_display() {
        let display = ParserConfig::default().to_string();
        assert!(display.contains("max_depth: 512"));
    }
}
